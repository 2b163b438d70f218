use std::collections::HashMap;

use argon2::Argon2;
use chrono::Utc;
use parking_lot::RwLock;

use super::{
	password::{hash_password, EMAIL_TAKEN, INVALID_CREDENTIALS, KEY_LENGTH},
	Account, AccountId, AuthProvider, Blob, BlobId, BlobRef, BlobStore, Document, DocumentId,
	DocumentStore, Error, Fields, Filter, Result, SessionToken,
};

struct StoredAccount {
	account: Account,
	password: [u8; KEY_LENGTH],
}

/// An in-process backend holding everything in memory.
///
/// Used by the tests, and as a stand-in when no database is configured.
/// Nothing survives a restart.
pub struct MemoryBackend {
	public_url: String,
	hasher: Argon2<'static>,
	documents: RwLock<HashMap<String, HashMap<DocumentId, Document>>>,
	blobs: RwLock<HashMap<(String, BlobId), Blob>>,
	accounts: RwLock<HashMap<AccountId, StoredAccount>>,
	sessions: RwLock<HashMap<SessionToken, AccountId>>,
}

impl MemoryBackend {
	pub fn new(public_url: impl Into<String>) -> Self {
		Self {
			public_url: public_url.into(),
			hasher: Argon2::default(),
			documents: RwLock::default(),
			blobs: RwLock::default(),
			accounts: RwLock::default(),
			sessions: RwLock::default(),
		}
	}

	/// The number of blobs currently held, across all buckets.
	pub fn blob_count(&self) -> usize {
		self.blobs.read().len()
	}
}

impl Default for MemoryBackend {
	fn default() -> Self {
		Self::new("http://localhost:3000")
	}
}

#[axum::async_trait]
impl DocumentStore for MemoryBackend {
	async fn create(&self, collection: &str, id: DocumentId, mut fields: Fields) -> Result<Document> {
		super::strip_reserved(&mut fields);

		let mut documents = self.documents.write();
		let collection = documents.entry(collection.to_owned()).or_default();

		if collection.contains_key(&id) {
			return Err(Error::Unavailable(format!(
				"document with the requested id {id} already exists"
			)));
		}

		let now = Utc::now();
		let document = Document {
			id,
			created_at: now,
			updated_at: now,
			fields,
		};

		collection.insert(id, document.clone());
		Ok(document)
	}

	async fn get(&self, collection: &str, id: DocumentId) -> Result<Document> {
		self.documents
			.read()
			.get(collection)
			.and_then(|documents| documents.get(&id))
			.cloned()
			.ok_or_else(|| Error::not_found(collection, id))
	}

	async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
		let documents = self.documents.read();
		let Some(documents) = documents.get(collection) else {
			return Ok(Vec::new());
		};

		Ok(documents
			.values()
			.filter(|document| filters.iter().all(|filter| filter.matches(&document.fields)))
			.cloned()
			.collect())
	}

	async fn update(&self, collection: &str, id: DocumentId, mut fields: Fields) -> Result<Document> {
		super::strip_reserved(&mut fields);

		let mut documents = self.documents.write();
		let document = documents
			.get_mut(collection)
			.and_then(|documents| documents.get_mut(&id))
			.ok_or_else(|| Error::not_found(collection, id))?;

		document.fields.extend(fields);
		document.updated_at = Utc::now();

		Ok(document.clone())
	}

	async fn delete(&self, collection: &str, id: DocumentId) -> Result<()> {
		self.documents
			.write()
			.get_mut(collection)
			.and_then(|documents| documents.remove(&id))
			.map(|_| ())
			.ok_or_else(|| Error::not_found(collection, id))
	}
}

#[axum::async_trait]
impl BlobStore for MemoryBackend {
	async fn store(&self, bucket: &str, id: BlobId, blob: Blob) -> Result<BlobRef> {
		let size = blob.bytes.len();

		self.blobs.write().insert((bucket.to_owned(), id), blob);

		Ok(BlobRef {
			id,
			bucket: bucket.to_owned(),
			size,
		})
	}

	async fn fetch(&self, bucket: &str, id: BlobId) -> Result<Blob> {
		self.blobs
			.read()
			.get(&(bucket.to_owned(), id))
			.cloned()
			.ok_or_else(|| Error::not_found(bucket, id))
	}

	async fn delete(&self, bucket: &str, id: BlobId) -> Result<()> {
		self.blobs
			.write()
			.remove(&(bucket.to_owned(), id))
			.map(|_| ())
			.ok_or_else(|| Error::not_found(bucket, id))
	}

	fn preview_url(&self, bucket: &str, id: BlobId) -> String {
		super::preview_url(&self.public_url, bucket, id)
	}
}

#[axum::async_trait]
impl AuthProvider for MemoryBackend {
	async fn who_am_i(&self, token: SessionToken) -> Result<Account> {
		let account_id = self
			.sessions
			.read()
			.get(&token)
			.copied()
			.ok_or(Error::NoSession)?;

		self.accounts
			.read()
			.get(&account_id)
			.map(|stored| stored.account.clone())
			.ok_or(Error::NoSession)
	}

	async fn create_session(&self, email: &str, password: &str) -> Result<SessionToken> {
		let account_id = {
			let accounts = self.accounts.read();
			let stored = accounts
				.values()
				.find(|stored| stored.account.email.eq_ignore_ascii_case(email))
				.ok_or_else(|| Error::Auth(INVALID_CREDENTIALS.into()))?;

			let hashed = hash_password(&self.hasher, password, &stored.account.id)?;

			if stored.password != hashed {
				return Err(Error::Auth(INVALID_CREDENTIALS.into()));
			}

			stored.account.id
		};

		let token = SessionToken::new_v4();

		self.sessions.write().insert(token, account_id);
		Ok(token)
	}

	async fn destroy_session(&self, token: SessionToken) -> Result<()> {
		self.sessions
			.write()
			.remove(&token)
			.map(|_| ())
			.ok_or(Error::NoSession)
	}

	async fn create_account(
		&self,
		id: AccountId,
		email: &str,
		password: &str,
		name: &str,
	) -> Result<Account> {
		let hashed = hash_password(&self.hasher, password, &id)?;
		let mut accounts = self.accounts.write();

		if accounts
			.values()
			.any(|stored| stored.account.email.eq_ignore_ascii_case(email))
		{
			return Err(Error::Auth(EMAIL_TAKEN.into()));
		}

		let account = Account {
			id,
			email: email.to_owned(),
			name: name.to_owned(),
			created_at: Utc::now(),
		};

		accounts.insert(
			id,
			StoredAccount {
				account: account.clone(),
				password: hashed,
			},
		);

		Ok(account)
	}
}
