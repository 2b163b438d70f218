//! The content-access layer: one typed operation per entity and verb,
//! translated into calls on the document and blob stores.
//!
//! Nothing here validates input shape, see [`crate::validate`]. Ownership is
//! only checked by the `*_owned` operations, which treat a document owned by
//! someone else exactly like a missing one.

mod avatar;
pub mod model;
pub mod search;

use std::sync::Arc;

use serde::{de::DeserializeOwned, ser::Error as _, Serialize};
use serde_json::Value;

pub use avatar::{is_avatar_type, AvatarError, AvatarReplaced, AvatarStep, AVATAR_TYPES};
pub use model::{
	BlogPost, CreateBlogPost, CreateProfile, CreateProject, Profile, Project, UpdateBlogPost,
	UpdateProfile, UpdateProject,
};

use crate::backend::{
	self, Account, AccountId, Blob, BlobId, BlobRef, Blobs, Document, DocumentId, Documents,
	Fields, Filter,
};

/// A document type stored in its own collection and owned by one account.
///
/// Implemented through the `#[model]` attribute.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
	const COLLECTION: &'static str;
	/// The field holding the owning account's id. Written once, at creation.
	const OWNER_FIELD: &'static str;

	type Create: Serialize + Send + Sync;
	type Update: Serialize + Send + Sync;

	fn id(&self) -> DocumentId;

	fn owner(&self) -> AccountId;

	fn from_document(document: Document) -> backend::Result<Self> {
		Ok(serde_json::from_value(document.into_value())?)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Backend(#[from] backend::Error),
	#[error("username {0} is already taken")]
	UsernameTaken(String),
}

/// Serializes an input into the JSON object written to the store.
fn to_fields<T: Serialize>(value: &T) -> backend::Result<Fields> {
	match serde_json::to_value(value)? {
		Value::Object(fields) => Ok(fields),
		_ => Err(serde_json::Error::custom("input must serialize to an object").into()),
	}
}

/// Derives a default public handle from a display name.
///
/// Lowercases the name, joins whitespace-separated words with `-` and drops
/// anything a username cannot contain.
pub fn username_from_name(name: &str) -> String {
	name.split_whitespace()
		.map(|word| {
			word.chars()
				.flat_map(char::to_lowercase)
				.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
				.collect::<String>()
		})
		.filter(|word| !word.is_empty())
		.collect::<Vec<_>>()
		.join("-")
}

/// Handle to the content stores.
///
/// Cheap to clone, meant to be shared through the application state.
#[derive(Clone)]
pub struct Content {
	documents: Documents,
	blobs: Blobs,
	bucket: Arc<str>,
}

impl Content {
	pub fn new(documents: Documents, blobs: Blobs, bucket: &str) -> Self {
		Self {
			documents,
			blobs,
			bucket: bucket.into(),
		}
	}

	/// Stores a new document owned by `owner` under a fresh id.
	#[tracing::instrument(skip(self, input), fields(collection = E::COLLECTION))]
	pub async fn create<E: Entity>(&self, owner: AccountId, input: &E::Create) -> backend::Result<E> {
		let mut fields = to_fields(input)?;

		fields.insert(E::OWNER_FIELD.into(), Value::String(owner.to_string()));

		let document = self
			.documents
			.create(E::COLLECTION, DocumentId::new_v4(), fields)
			.await?;

		tracing::info!(monotonic_counter.documents_created = 1_u64, id = %document.id, "document created");

		E::from_document(document)
	}

	/// Merges the present fields of `input` into the document.
	///
	/// The owner field is dropped if present, so ownership never changes.
	#[tracing::instrument(skip(self, input), fields(collection = E::COLLECTION))]
	pub async fn update<E: Entity>(&self, id: DocumentId, input: &E::Update) -> backend::Result<E> {
		let mut fields = to_fields(input)?;

		fields.remove(E::OWNER_FIELD);

		let document = self.documents.update(E::COLLECTION, id, fields).await?;

		E::from_document(document)
	}

	#[tracing::instrument(skip(self), fields(collection = E::COLLECTION))]
	pub async fn delete<E: Entity>(&self, id: DocumentId) -> backend::Result<()> {
		self.documents.delete(E::COLLECTION, id).await
	}

	pub async fn get<E: Entity>(&self, id: DocumentId) -> backend::Result<E> {
		E::from_document(self.documents.get(E::COLLECTION, id).await?)
	}

	/// Fetches a document, failing with `NotFound` if `owner` does not own it.
	pub async fn get_owned<E: Entity>(&self, id: DocumentId, owner: AccountId) -> backend::Result<E> {
		let entity = self.get::<E>(id).await?;

		if entity.owner() != owner {
			return Err(backend::Error::not_found(E::COLLECTION, id));
		}

		Ok(entity)
	}

	pub async fn update_owned<E: Entity>(
		&self,
		id: DocumentId,
		owner: AccountId,
		input: &E::Update,
	) -> backend::Result<E> {
		self.get_owned::<E>(id, owner).await?;
		self.update::<E>(id, input).await
	}

	pub async fn delete_owned<E: Entity>(&self, id: DocumentId, owner: AccountId) -> backend::Result<()> {
		self.get_owned::<E>(id, owner).await?;
		self.delete::<E>(id).await
	}

	/// Every document matching all filters, in store order.
	pub async fn list<E: Entity>(&self, filters: &[Filter]) -> backend::Result<Vec<E>> {
		self.documents
			.list(E::COLLECTION, filters)
			.await?
			.into_iter()
			.map(E::from_document)
			.collect()
	}

	/// Every document owned by `owner`, in store order. Empty when none match.
	pub async fn list_by_owner<E: Entity>(&self, owner: AccountId) -> backend::Result<Vec<E>> {
		self.list::<E>(&[Filter::equal(E::OWNER_FIELD, owner)])
			.await
	}

	pub async fn list_all<E: Entity>(&self) -> backend::Result<Vec<E>> {
		self.list::<E>(&[]).await
	}

	/// The profile of an account, if it has saved one yet.
	pub async fn profile_by_owner(&self, owner: AccountId) -> backend::Result<Option<Profile>> {
		Ok(self.list_by_owner::<Profile>(owner).await?.into_iter().next())
	}

	/// Looks a profile up by its public handle. Absence is `Ok(None)`.
	pub async fn profile_by_username(&self, username: &str) -> backend::Result<Option<Profile>> {
		let username = username.trim().to_lowercase();
		let profiles = self
			.list::<Profile>(&[Filter::equal("username", username)])
			.await?;

		Ok(profiles.into_iter().next())
	}

	/// Creates the account's profile on first save, updates it afterwards.
	///
	/// The username is lowercased and must not be held by another account.
	/// Optional fields left out of a later save keep their stored value.
	#[tracing::instrument(skip(self, account, input), fields(account = %account.id))]
	pub async fn save_profile(&self, account: &Account, mut input: CreateProfile) -> Result<Profile, Error> {
		input.username = input.username.trim().to_lowercase();

		let holders = self
			.list::<Profile>(&[Filter::equal("username", &input.username)])
			.await?;

		if holders.iter().any(|profile| profile.user_id != account.id) {
			return Err(Error::UsernameTaken(input.username));
		}

		let profile = match self.profile_by_owner(account.id).await? {
			Some(existing) => {
				let mut fields = to_fields(&input)?;

				fields.remove(Profile::OWNER_FIELD);
				fields.retain(|_, value| !value.is_null());

				let document = self
					.documents
					.update(Profile::COLLECTION, existing.id, fields)
					.await?;

				Profile::from_document(document)?
			}
			None => {
				tracing::info!(username = %input.username, "creating profile");

				self.create::<Profile>(account.id, &input).await?
			}
		};

		Ok(profile)
	}

	/// Stores an avatar image under a fresh id.
	pub async fn upload_avatar(&self, blob: Blob) -> backend::Result<BlobRef> {
		self.blobs.store(&self.bucket, BlobId::new_v4(), blob).await
	}

	pub async fn delete_avatar(&self, id: BlobId) -> backend::Result<()> {
		self.blobs.delete(&self.bucket, id).await
	}

	pub async fn fetch_blob(&self, bucket: &str, id: BlobId) -> backend::Result<Blob> {
		self.blobs.fetch(bucket, id).await
	}

	pub fn avatar_url(&self, profile: &Profile) -> Option<String> {
		profile
			.avatar_id
			.map(|id| self.blobs.preview_url(&self.bucket, id))
	}
}
