//! Seams to the external services the application delegates to.
//!
//! The document store, the blob store and the auth provider are consumed
//! only through the traits in this module, so the rest of the crate never
//! knows whether it talks to Postgres or to the in-memory backend.

pub mod memory;
mod password;
pub mod postgres;

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

pub type DocumentId = Uuid;
pub type AccountId = Uuid;
pub type BlobId = Uuid;
pub type SessionToken = Uuid;

/// The JSON object holding a document's fields.
pub type Fields = serde_json::Map<String, Value>;

pub type Documents = Arc<dyn DocumentStore>;
pub type Blobs = Arc<dyn BlobStore>;
pub type Auth = Arc<dyn AuthProvider>;

/// Keys assigned by the store, never written by callers.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// An error returned by one of the external services.
///
/// `NotFound` and `NoSession` are expected outcomes that callers branch on,
/// the other variants are faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{collection} {id} not found")]
	NotFound { collection: String, id: String },
	#[error("{0}")]
	Auth(String),
	#[error("no active session")]
	NoSession,
	#[error("backend unavailable: {0}")]
	Unavailable(String),
	#[error("malformed document: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("password hashing error")]
	Argon(#[from] argon2::Error),
}

impl Error {
	pub fn not_found(collection: &str, id: impl ToString) -> Self {
		Self::NotFound {
			collection: collection.to_owned(),
			id: id.to_string(),
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}

	/// Whether the error is an expected branch rather than a fault.
	pub fn is_expected(&self) -> bool {
		matches!(self, Self::NotFound { .. } | Self::NoSession | Self::Auth(..))
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A document as stored, with its store-assigned metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	pub id: DocumentId,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub fields: Fields,
}

impl Document {
	/// Flattens the document into a single JSON object, metadata included.
	pub fn into_value(self) -> Value {
		let mut fields = self.fields;

		fields.insert("id".into(), Value::String(self.id.to_string()));
		fields.insert("created_at".into(), serde_json::json!(self.created_at));
		fields.insert("updated_at".into(), serde_json::json!(self.updated_at));

		Value::Object(fields)
	}
}

/// An equality filter over a single field, written as `field=value`.
///
/// Filters passed together are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
	pub field: String,
	pub value: String,
}

impl Filter {
	pub fn equal(field: impl Into<String>, value: impl ToString) -> Self {
		Self {
			field: field.into(),
			value: value.to_string(),
		}
	}

	/// String fields compare by content, anything else by its JSON text.
	pub fn matches(&self, fields: &Fields) -> bool {
		match fields.get(&self.field) {
			Some(Value::String(value)) => *value == self.value,
			Some(Value::Null) | None => false,
			Some(value) => value.to_string() == self.value,
		}
	}
}

#[derive(Debug, thiserror::Error)]
#[error("filter must look like field=value, got {0:?}")]
pub struct FilterParseError(String);

impl FromStr for Filter {
	type Err = FilterParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split_once('=') {
			Some((field, value)) if !field.is_empty() => Ok(Self::equal(field, value)),
			_ => Err(FilterParseError(s.to_owned())),
		}
	}
}

impl fmt::Display for Filter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}={}", self.field, self.value)
	}
}

/// A stored file, such as an avatar image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
	pub content_type: String,
	pub bytes: Vec<u8>,
}

/// A reference to a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct BlobRef {
	pub id: BlobId,
	pub bucket: String,
	pub size: usize,
}

/// An account held by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Account {
	/// The unique identifier of the account.
	pub id: AccountId,
	/// The email address used to log in.
	pub email: String,
	/// The display name chosen at signup.
	pub name: String,
	/// The creation time of the account.
	pub created_at: DateTime<Utc>,
}

/// A document database organised in collections.
#[axum::async_trait]
pub trait DocumentStore: Send + Sync {
	async fn create(&self, collection: &str, id: DocumentId, fields: Fields) -> Result<Document>;

	async fn get(&self, collection: &str, id: DocumentId) -> Result<Document>;

	/// Returns every document matching all filters, in no guaranteed order.
	async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

	/// Merges `fields` into the stored document.
	async fn update(&self, collection: &str, id: DocumentId, fields: Fields) -> Result<Document>;

	/// Fails with [`Error::NotFound`] when the document is already gone.
	async fn delete(&self, collection: &str, id: DocumentId) -> Result<()>;
}

/// A file store organised in buckets.
#[axum::async_trait]
pub trait BlobStore: Send + Sync {
	async fn store(&self, bucket: &str, id: BlobId, blob: Blob) -> Result<BlobRef>;

	async fn fetch(&self, bucket: &str, id: BlobId) -> Result<Blob>;

	async fn delete(&self, bucket: &str, id: BlobId) -> Result<()>;

	/// Derives the public preview URL of a file, without checking it exists.
	fn preview_url(&self, bucket: &str, id: BlobId) -> String;
}

/// An authentication provider handing out session tokens.
#[axum::async_trait]
pub trait AuthProvider: Send + Sync {
	/// Fails with [`Error::NoSession`] when the token names no live session.
	async fn who_am_i(&self, token: SessionToken) -> Result<Account>;

	async fn create_session(&self, email: &str, password: &str) -> Result<SessionToken>;

	async fn destroy_session(&self, token: SessionToken) -> Result<()>;

	async fn create_account(
		&self,
		id: AccountId,
		email: &str,
		password: &str,
		name: &str,
	) -> Result<Account>;
}

/// Removes the store-assigned keys from a set of fields about to be written.
pub(crate) fn strip_reserved(fields: &mut Fields) {
	for key in RESERVED_FIELDS {
		fields.remove(key);
	}
}

/// Joins a public base URL and a preview path.
pub(crate) fn preview_url(base: &str, bucket: &str, id: BlobId) -> String {
	format!("{}/files/{bucket}/{id}", base.trim_end_matches('/'))
}
