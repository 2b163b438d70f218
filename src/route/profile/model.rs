use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::content::{CreateProfile, Profile};
use crate::{
	content::{search, Content},
	route::{post::model::PostCard, project::model::ProjectCard},
};

/// A profile as shown to visitors, with its avatar resolved to a URL.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileView {
	#[serde(flatten)]
	pub profile: Profile,
	/// Where the avatar image can be fetched, if one was uploaded.
	pub avatar_url: Option<String>,
}

impl ProfileView {
	pub fn new(content: &Content, profile: Profile) -> Self {
		Self {
			avatar_url: content.avatar_url(&profile),
			profile,
		}
	}
}

/// A profile as listed on the Explore page.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileCard {
	#[serde(flatten)]
	pub profile: ProfileView,
	/// The start of the biography.
	pub bio_excerpt: Option<String>,
}

impl ProfileCard {
	pub fn new(content: &Content, profile: Profile) -> Self {
		let bio_excerpt = profile
			.bio
			.as_deref()
			.map(|bio| search::excerpt(bio, search::BIO_EXCERPT).into_owned());

		Self {
			profile: ProfileView::new(content, profile),
			bio_excerpt,
		}
	}
}

/// A developer's public page.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PublicProfile {
	pub profile: ProfileView,
	/// The developer's projects, newest first.
	pub projects: Vec<ProjectCard>,
	/// The developer's posts, newest first.
	pub posts: Vec<PostCard>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SearchInput {
	/// Only list profiles whose name or biography contains this, ignoring case.
	#[validate(length(max = 128))]
	pub q: Option<String>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UsernameInput {
	pub username: String,
}

/// The editable part of a profile.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct SaveProfileInput {
	#[validate(custom(function = "crate::validate::name_field"))]
	pub name: String,
	/// The public handle. Derived from the account name when absent.
	pub username: Option<String>,
	pub bio: Option<String>,
	pub website: Option<String>,
	pub github: Option<String>,
	pub twitter: Option<String>,
	pub linkedin: Option<String>,
}

impl SaveProfileInput {
	pub fn into_profile(self, default_username: impl FnOnce() -> String) -> CreateProfile {
		CreateProfile {
			name: self.name.trim().to_owned(),
			username: self
				.username
				.map_or_else(default_username, |username| username.trim().to_lowercase()),
			bio: self.bio,
			website: self.website,
			github: self.github,
			twitter: self.twitter,
			linkedin: self.linkedin,
		}
	}
}
