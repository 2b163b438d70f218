//! Client-side filtering and ordering over fetched documents.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::Profile;

/// Length of the preview shown on project and post cards.
pub const CARD_EXCERPT: usize = 150;
/// Length of the biography shown on the Explore listing.
pub const BIO_EXCERPT: usize = 60;

/// Profiles whose name or bio contains `term`, ignoring case.
///
/// The term is matched as typed, whitespace included. An empty term matches
/// everything.
pub fn filter_profiles<'a>(profiles: &'a [Profile], term: &str) -> Vec<&'a Profile> {
	let term = term.to_lowercase();

	if term.is_empty() {
		return profiles.iter().collect();
	}

	profiles
		.iter()
		.filter(|profile| {
			profile.name.to_lowercase().contains(&term)
				|| profile
					.bio
					.as_deref()
					.is_some_and(|bio| bio.to_lowercase().contains(&term))
		})
		.collect()
}

/// Sorts by creation time, most recent first. The store gives no ordering.
pub fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
	items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn excerpt(text: &str, max: usize) -> Cow<'_, str> {
	match text.char_indices().nth(max) {
		Some((end, _)) => Cow::Owned(format!("{}...", text[..end].trim_end())),
		None => Cow::Borrowed(text),
	}
}
