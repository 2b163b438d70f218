use std::fmt;

use serde_json::Value;

use super::{Content, Entity, Profile};
use crate::backend::{self, Blob, BlobId, Fields};

/// The image types accepted as avatars. Nothing that can carry script.
pub const AVATAR_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Whether a `Content-Type` names one of [`AVATAR_TYPES`], parameters ignored.
pub fn is_avatar_type(content_type: &str) -> bool {
	let essence = content_type.split(';').next().unwrap_or_default().trim();

	AVATAR_TYPES
		.iter()
		.any(|allowed| essence.eq_ignore_ascii_case(allowed))
}

/// A step of the avatar replacement that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarStep {
	StoreBlob,
	UpdateProfile,
}

impl fmt::Display for AvatarStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::StoreBlob => "storing the new image",
			Self::UpdateProfile => "pointing the profile at the new image",
		})
	}
}

/// The outcome of a successful avatar replacement.
#[derive(Debug)]
pub struct AvatarReplaced {
	pub profile: Profile,
	/// The previous image if deleting it failed. It stays in storage,
	/// referenced by nothing.
	pub orphaned: Option<BlobId>,
}

#[derive(Debug, thiserror::Error)]
#[error("avatar replacement failed while {step}: {source}")]
pub struct AvatarError {
	pub step: AvatarStep,
	#[source]
	pub source: backend::Error,
	/// A blob left in storage with no profile referencing it.
	pub orphaned: Option<BlobId>,
}

impl Content {
	/// Replaces the avatar of `profile` with a new image.
	///
	/// Runs three steps in order, none of them compensated:
	///
	/// 1. store the new blob: on failure nothing changed
	/// 2. point the profile at it: on failure the new blob is orphaned
	/// 3. delete the previous blob: on failure the previous blob is orphaned,
	///    but the replacement itself succeeded
	///
	/// The previous blob is never touched before the new one is stored, so the
	/// profile cannot end up referencing a missing image.
	#[tracing::instrument(skip(self, profile, blob), fields(profile = %profile.id))]
	pub async fn replace_avatar(&self, profile: &Profile, blob: Blob) -> Result<AvatarReplaced, AvatarError> {
		let stored = self.upload_avatar(blob).await.map_err(|source| AvatarError {
			step: AvatarStep::StoreBlob,
			source,
			orphaned: None,
		})?;

		let mut fields = Fields::new();

		fields.insert("avatar_id".into(), Value::String(stored.id.to_string()));

		let updated = match self
			.documents
			.update(Profile::COLLECTION, profile.id, fields)
			.await
			.and_then(Profile::from_document)
		{
			Ok(updated) => updated,
			Err(source) => {
				tracing::warn!(monotonic_counter.orphaned_blobs = 1_u64, blob = %stored.id, error = %source, "profile update failed, new avatar orphaned");

				return Err(AvatarError {
					step: AvatarStep::UpdateProfile,
					source,
					orphaned: Some(stored.id),
				});
			}
		};

		let mut orphaned = None;

		if let Some(previous) = profile.avatar_id {
			if let Err(error) = self.delete_avatar(previous).await {
				tracing::warn!(monotonic_counter.orphaned_blobs = 1_u64, blob = %previous, %error, "could not delete previous avatar, leaving it orphaned");

				orphaned = Some(previous);
			}
		}

		Ok(AvatarReplaced {
			profile: updated,
			orphaned,
		})
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use parking_lot::Mutex;
	use uuid::Uuid;

	use super::*;
	use crate::{
		backend::{BlobRef, BlobStore, MemoryBackend},
		content::test::{account, profile_input},
	};

	#[test]
	fn test_avatar_types() {
		assert!(is_avatar_type("image/png"));
		assert!(is_avatar_type("IMAGE/JPEG; charset=binary"));
		assert!(!is_avatar_type("image/svg+xml"));
		assert!(!is_avatar_type("text/html"));
		assert!(!is_avatar_type(""));
	}

	#[derive(Debug, Clone, PartialEq, Eq)]
	enum Call {
		Store(BlobId),
		Delete(BlobId),
	}

	/// Wraps the memory backend, recording calls and failing on demand.
	struct RecordingBlobs {
		inner: MemoryBackend,
		calls: Mutex<Vec<Call>>,
		fail_store: bool,
		fail_delete: bool,
	}

	impl RecordingBlobs {
		fn new(fail_store: bool, fail_delete: bool) -> Self {
			Self {
				inner: MemoryBackend::default(),
				calls: Mutex::default(),
				fail_store,
				fail_delete,
			}
		}

		fn calls(&self) -> Vec<Call> {
			self.calls.lock().clone()
		}
	}

	#[axum::async_trait]
	impl BlobStore for RecordingBlobs {
		async fn store(&self, bucket: &str, id: BlobId, blob: Blob) -> backend::Result<BlobRef> {
			self.calls.lock().push(Call::Store(id));

			if self.fail_store {
				return Err(backend::Error::Unavailable("storage is down".into()));
			}

			self.inner.store(bucket, id, blob).await
		}

		async fn fetch(&self, bucket: &str, id: BlobId) -> backend::Result<Blob> {
			self.inner.fetch(bucket, id).await
		}

		async fn delete(&self, bucket: &str, id: BlobId) -> backend::Result<()> {
			self.calls.lock().push(Call::Delete(id));

			if self.fail_delete {
				return Err(backend::Error::Unavailable("storage is down".into()));
			}

			BlobStore::delete(&self.inner, bucket, id).await
		}

		fn preview_url(&self, bucket: &str, id: BlobId) -> String {
			self.inner.preview_url(bucket, id)
		}
	}

	fn image() -> Blob {
		Blob {
			content_type: "image/png".into(),
			bytes: vec![0x89, b'P', b'N', b'G'],
		}
	}

	async fn setup(blobs: Arc<RecordingBlobs>) -> (Content, Profile) {
		let documents = Arc::new(MemoryBackend::default());
		let content = Content::new(documents, blobs, "files");
		let profile = content
			.save_profile(&account("ada"), profile_input("ada"))
			.await
			.unwrap();

		(content, profile)
	}

	#[tokio::test]
	async fn test_replace_deletes_previous_once_after_store() {
		let blobs = Arc::new(RecordingBlobs::new(false, false));
		let (content, profile) = setup(blobs.clone()).await;

		let first = content.replace_avatar(&profile, image()).await.unwrap();
		let first_id = first.profile.avatar_id.unwrap();

		assert_eq!(blobs.calls(), [Call::Store(first_id)]);

		let second = content
			.replace_avatar(&first.profile, image())
			.await
			.unwrap();
		let second_id = second.profile.avatar_id.unwrap();

		assert_ne!(first_id, second_id);
		assert_eq!(second.orphaned, None);
		assert_eq!(
			blobs.calls(),
			[
				Call::Store(first_id),
				Call::Store(second_id),
				Call::Delete(first_id)
			]
		);
		assert_eq!(blobs.inner.blob_count(), 1);
		assert_eq!(
			content.avatar_url(&second.profile),
			Some(format!("http://localhost:3000/files/files/{second_id}"))
		);
	}

	#[tokio::test]
	async fn test_failed_store_never_deletes_previous() {
		let blobs = Arc::new(RecordingBlobs::new(true, false));
		let (content, mut profile) = setup(blobs.clone()).await;

		profile.avatar_id = Some(Uuid::new_v4());

		let error = content.replace_avatar(&profile, image()).await.unwrap_err();

		assert_eq!(error.step, AvatarStep::StoreBlob);
		assert_eq!(error.orphaned, None);
		assert!(blobs
			.calls()
			.iter()
			.all(|call| matches!(call, Call::Store(..))));
	}

	#[tokio::test]
	async fn test_failed_profile_update_reports_new_blob() {
		let blobs = Arc::new(RecordingBlobs::new(false, false));
		let (content, mut profile) = setup(blobs.clone()).await;

		profile.id = Uuid::new_v4();

		let error = content.replace_avatar(&profile, image()).await.unwrap_err();

		assert_eq!(error.step, AvatarStep::UpdateProfile);
		assert!(error.source.is_not_found());
		assert_eq!(blobs.calls(), [Call::Store(error.orphaned.unwrap())]);
	}

	#[tokio::test]
	async fn test_failed_delete_reports_previous_blob() {
		let blobs = Arc::new(RecordingBlobs::new(false, true));
		let (content, profile) = setup(blobs.clone()).await;

		let first = content.replace_avatar(&profile, image()).await.unwrap();
		let first_id = first.profile.avatar_id.unwrap();
		let second = content
			.replace_avatar(&first.profile, image())
			.await
			.unwrap();

		assert_eq!(second.orphaned, Some(first_id));
		assert_ne!(second.profile.avatar_id, Some(first_id));
	}
}
