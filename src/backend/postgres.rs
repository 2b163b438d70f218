use argon2::Argon2;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
	password::{hash_password, EMAIL_TAKEN, INVALID_CREDENTIALS},
	Account, AccountId, AuthProvider, Blob, BlobId, BlobRef, BlobStore, Document, DocumentId,
	DocumentStore, Error, Fields, Filter, Result, SessionToken,
};

/// A backend storing documents, files and accounts in Postgres.
///
/// Documents live in a single JSONB table keyed by collection, so the
/// application keeps defining document shapes rather than the schema.
pub struct PgBackend {
	pool: PgPool,
	hasher: Argon2<'static>,
	public_url: String,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
	id: Uuid,
	fields: Json<Fields>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
	fn from(row: DocumentRow) -> Self {
		Self {
			id: row.id,
			created_at: row.created_at,
			updated_at: row.updated_at,
			fields: row.fields.0,
		}
	}
}

#[derive(sqlx::FromRow)]
struct AccountRow {
	id: Uuid,
	email: String,
	name: String,
	password: Vec<u8>,
	created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
	fn from(row: AccountRow) -> Self {
		Self {
			id: row.id,
			email: row.email,
			name: row.name,
			created_at: row.created_at,
		}
	}
}

#[derive(sqlx::FromRow)]
struct BlobRow {
	content_type: String,
	bytes: Vec<u8>,
}

impl PgBackend {
	/// Connects to the database and applies any pending migrations.
	pub async fn connect(database_url: &str, public_url: impl Into<String>) -> Result<Self> {
		let pool = PgPoolOptions::new()
			.max_connections(16)
			.connect(database_url)
			.await?;

		sqlx::migrate!().run(&pool).await?;

		tracing::info!("connected to postgres, migrations applied");

		Ok(Self::from_pool(pool, public_url))
	}

	pub fn from_pool(pool: PgPool, public_url: impl Into<String>) -> Self {
		Self {
			pool,
			hasher: Argon2::default(),
			public_url: public_url.into(),
		}
	}
}

#[axum::async_trait]
impl DocumentStore for PgBackend {
	async fn create(&self, collection: &str, id: DocumentId, mut fields: Fields) -> Result<Document> {
		super::strip_reserved(&mut fields);

		let row = sqlx::query_as::<_, DocumentRow>(
			r#"
				INSERT INTO document (id, collection, fields)
				VALUES ($1, $2, $3)
				RETURNING id, fields, created_at, updated_at
			"#,
		)
		.bind(id)
		.bind(collection)
		.bind(Json(&fields))
		.fetch_one(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref d) if d.constraint() == Some("document_pkey") => {
				Error::Unavailable(format!("document with the requested id {id} already exists"))
			}
			e => Error::Database(e),
		})?;

		Ok(row.into())
	}

	async fn get(&self, collection: &str, id: DocumentId) -> Result<Document> {
		let row = sqlx::query_as::<_, DocumentRow>(
			r#"
				SELECT id, fields, created_at, updated_at FROM document
				WHERE collection = $1 AND id = $2
			"#,
		)
		.bind(collection)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(Document::from)
			.ok_or_else(|| Error::not_found(collection, id))
	}

	async fn list(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
		let mut query = QueryBuilder::<Postgres>::new(
			"SELECT id, fields, created_at, updated_at FROM document WHERE collection = ",
		);

		query.push_bind(collection);

		for filter in filters {
			query
				.push(" AND fields ->> ")
				.push_bind(&filter.field)
				.push(" = ")
				.push_bind(&filter.value);
		}

		let rows = query
			.build_query_as::<DocumentRow>()
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.into_iter().map(Document::from).collect())
	}

	async fn update(&self, collection: &str, id: DocumentId, mut fields: Fields) -> Result<Document> {
		super::strip_reserved(&mut fields);

		let row = sqlx::query_as::<_, DocumentRow>(
			r#"
				UPDATE document
				SET fields = fields || $3, updated_at = now()
				WHERE collection = $1 AND id = $2
				RETURNING id, fields, created_at, updated_at
			"#,
		)
		.bind(collection)
		.bind(id)
		.bind(Json(&fields))
		.fetch_optional(&self.pool)
		.await?;

		row.map(Document::from)
			.ok_or_else(|| Error::not_found(collection, id))
	}

	async fn delete(&self, collection: &str, id: DocumentId) -> Result<()> {
		let status = sqlx::query("DELETE FROM document WHERE collection = $1 AND id = $2")
			.bind(collection)
			.bind(id)
			.execute(&self.pool)
			.await?;

		if status.rows_affected() == 0 {
			return Err(Error::not_found(collection, id));
		}

		Ok(())
	}
}

#[axum::async_trait]
impl BlobStore for PgBackend {
	async fn store(&self, bucket: &str, id: BlobId, blob: Blob) -> Result<BlobRef> {
		let size = blob.bytes.len();

		sqlx::query("INSERT INTO blob (id, bucket, content_type, bytes) VALUES ($1, $2, $3, $4)")
			.bind(id)
			.bind(bucket)
			.bind(blob.content_type)
			.bind(blob.bytes)
			.execute(&self.pool)
			.await?;

		Ok(BlobRef {
			id,
			bucket: bucket.to_owned(),
			size,
		})
	}

	async fn fetch(&self, bucket: &str, id: BlobId) -> Result<Blob> {
		let row = sqlx::query_as::<_, BlobRow>(
			"SELECT content_type, bytes FROM blob WHERE bucket = $1 AND id = $2",
		)
		.bind(bucket)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		let row = row.ok_or_else(|| Error::not_found(bucket, id))?;

		Ok(Blob {
			content_type: row.content_type,
			bytes: row.bytes,
		})
	}

	async fn delete(&self, bucket: &str, id: BlobId) -> Result<()> {
		let status = sqlx::query("DELETE FROM blob WHERE bucket = $1 AND id = $2")
			.bind(bucket)
			.bind(id)
			.execute(&self.pool)
			.await?;

		if status.rows_affected() == 0 {
			return Err(Error::not_found(bucket, id));
		}

		Ok(())
	}

	fn preview_url(&self, bucket: &str, id: BlobId) -> String {
		super::preview_url(&self.public_url, bucket, id)
	}
}

#[axum::async_trait]
impl AuthProvider for PgBackend {
	async fn who_am_i(&self, token: SessionToken) -> Result<Account> {
		let account = sqlx::query_as::<_, AccountRow>(
			r#"
				SELECT * FROM account WHERE id = (
					SELECT account_id FROM session WHERE id = $1
				)
			"#,
		)
		.bind(token)
		.fetch_optional(&self.pool)
		.await?;

		account.map(Account::from).ok_or(Error::NoSession)
	}

	async fn create_session(&self, email: &str, password: &str) -> Result<SessionToken> {
		let account = sqlx::query_as::<_, AccountRow>(
			"SELECT * FROM account WHERE lower(email) = lower($1)",
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		let Some(account) = account else {
			return Err(Error::Auth(INVALID_CREDENTIALS.into()));
		};

		let hashed = hash_password(&self.hasher, password, &account.id)?;

		if account.password != hashed {
			return Err(Error::Auth(INVALID_CREDENTIALS.into()));
		}

		let token = sqlx::query_scalar::<_, Uuid>(
			"INSERT INTO session (account_id) VALUES ($1) RETURNING id",
		)
		.bind(account.id)
		.fetch_one(&self.pool)
		.await?;

		Ok(token)
	}

	async fn destroy_session(&self, token: SessionToken) -> Result<()> {
		let status = sqlx::query("DELETE FROM session WHERE id = $1")
			.bind(token)
			.execute(&self.pool)
			.await?;

		if status.rows_affected() == 0 {
			return Err(Error::NoSession);
		}

		Ok(())
	}

	async fn create_account(
		&self,
		id: AccountId,
		email: &str,
		password: &str,
		name: &str,
	) -> Result<Account> {
		let hashed = hash_password(&self.hasher, password, &id)?;

		let account = sqlx::query_as::<_, AccountRow>(
			r#"
				INSERT INTO account (id, email, name, password) VALUES ($1, $2, $3, $4)
				RETURNING *
			"#,
		)
		.bind(id)
		.bind(email)
		.bind(name)
		.bind(&hashed[..])
		.fetch_one(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref d) if d.constraint() == Some("account_email_key") => {
				Error::Auth(EMAIL_TAKEN.into())
			}
			e => Error::Database(e),
		})?;

		Ok(account.into())
	}
}
