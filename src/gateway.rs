//! The session gateway: who the current visitor is, and how that changes.
//!
//! A gateway wraps the auth provider for a single visitor, holding the
//! session token the way a browser holds its cookie. The current identity is
//! published on a [`tokio::sync::watch`] channel so every view handed the
//! gateway can follow it without a global.

use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::watch;

use crate::backend::{self, Account, AccountId, Auth, SessionToken};

/// What the gateway currently knows about the visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "state", content = "account", rename_all = "snake_case")]
pub enum Identity {
	/// No lookup has completed yet.
	Unknown,
	/// There is no active session.
	Anonymous,
	Authenticated(Account),
}

impl Identity {
	pub fn account(&self) -> Option<&Account> {
		match self {
			Self::Authenticated(account) => Some(account),
			_ => None,
		}
	}
}

/// A failed signup, split by how far it got.
#[derive(Debug, thiserror::Error)]
pub enum SignupError {
	/// The account could not be created. Nothing changed.
	#[error("{0}")]
	CreateAccount(#[source] backend::Error),
	/// The account exists, but logging in to it failed. The visitor should
	/// be asked to log in.
	#[error("account created, but logging in failed: {source}")]
	Login {
		account: AccountId,
		#[source]
		source: backend::Error,
	},
}

pub struct SessionGateway {
	auth: Auth,
	token: Option<SessionToken>,
	identity: watch::Sender<Identity>,
	error: Option<String>,
}

impl SessionGateway {
	/// Creates a gateway in the [`Identity::Unknown`] state.
	///
	/// `token` is the session the visitor presented, if any. Nothing is
	/// checked until [`SessionGateway::refresh`] runs.
	pub fn new(auth: Auth, token: Option<SessionToken>) -> Self {
		let (identity, _) = watch::channel(Identity::Unknown);

		Self {
			auth,
			token,
			identity,
			error: None,
		}
	}

	pub fn identity(&self) -> Identity {
		self.identity.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<Identity> {
		self.identity.subscribe()
	}

	/// The session token the visitor should hold from now on.
	pub fn token(&self) -> Option<SessionToken> {
		self.token
	}

	/// The last error recorded by a login, logout or signup.
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	fn publish(&self, identity: Identity) {
		self.identity.send_replace(identity);
	}

	/// Asks the provider who the visitor is.
	///
	/// Any failure leaves the visitor anonymous. A missing session is the
	/// normal case for visitors and is not reported.
	pub async fn refresh(&mut self) -> Identity {
		let identity = match self.token {
			None => Identity::Anonymous,
			Some(token) => match self.auth.who_am_i(token).await {
				Ok(account) => Identity::Authenticated(account),
				Err(backend::Error::NoSession) => {
					self.token = None;
					Identity::Anonymous
				}
				Err(error) => {
					tracing::warn!(%error, "identity lookup failed, treating visitor as anonymous");
					Identity::Anonymous
				}
			},
		};

		self.publish(identity.clone());
		identity
	}

	/// Opens a session for the credentials, then looks the account up.
	///
	/// On failure the identity is left as it was and the provider's error is
	/// returned and recorded.
	#[tracing::instrument(skip(self, password))]
	pub async fn login(&mut self, email: &str, password: &str) -> backend::Result<Account> {
		let result = self.open_session(email, password).await;

		match result {
			Ok(account) => {
				self.error = None;
				Ok(account)
			}
			Err(error) => {
				self.error = Some(error.to_string());
				Err(error)
			}
		}
	}

	async fn open_session(&mut self, email: &str, password: &str) -> backend::Result<Account> {
		let token = self.auth.create_session(email, password).await?;
		let account = match self.auth.who_am_i(token).await {
			Ok(account) => account,
			Err(error) => {
				// The token is never handed out, so its session is closed
				if let Err(teardown) = self.auth.destroy_session(token).await {
					tracing::warn!(error = %teardown, "could not close the session of a failed login");
				}

				return Err(error);
			}
		};

		tracing::info!(monotonic_counter.logins = 1_u64, account = %account.id, "logged in");

		self.token = Some(token);
		self.publish(Identity::Authenticated(account.clone()));

		Ok(account)
	}

	/// Tears down the current session.
	///
	/// If the provider fails to do so, the visitor stays authenticated and
	/// the error is recorded and returned. A provider reporting that the
	/// session is already gone counts as a logout.
	#[tracing::instrument(skip(self))]
	pub async fn logout(&mut self) -> backend::Result<()> {
		let Some(token) = self.token else {
			self.publish(Identity::Anonymous);
			return Ok(());
		};

		match self.auth.destroy_session(token).await {
			Ok(()) | Err(backend::Error::NoSession) => {
				self.token = None;
				self.error = None;
				self.publish(Identity::Anonymous);

				Ok(())
			}
			Err(error) => {
				tracing::warn!(%error, "logout failed, session kept");

				self.error = Some(error.to_string());
				Err(error)
			}
		}
	}

	/// Creates an account, then logs in to it with the same credentials.
	///
	/// The two steps are not atomic, see [`SignupError`].
	#[tracing::instrument(skip(self, password))]
	pub async fn signup(&mut self, email: &str, password: &str, name: &str) -> Result<Account, SignupError> {
		let id = AccountId::new_v4();

		if let Err(error) = self.auth.create_account(id, email, password, name).await {
			self.error = Some(error.to_string());
			return Err(SignupError::CreateAccount(error));
		}

		tracing::info!(monotonic_counter.signups = 1_u64, account = %id, "account created");

		self.login(email, password)
			.await
			.map_err(|source| SignupError::Login {
				account: id,
				source,
			})
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use super::*;
	use crate::{
		backend::{AuthProvider, MemoryBackend},
		test::FlakyAuth,
	};

	async fn registered(auth: Auth) -> SessionGateway {
		auth.create_account(AccountId::new_v4(), "ada@example.com", "hunter22", "Ada")
			.await
			.unwrap();

		SessionGateway::new(auth, None)
	}

	#[tokio::test]
	async fn test_startup_without_session_is_anonymous() {
		let auth: Auth = Arc::new(MemoryBackend::default());
		let mut gateway = SessionGateway::new(auth.clone(), None);

		assert_eq!(gateway.identity(), Identity::Unknown);
		assert_eq!(gateway.refresh().await, Identity::Anonymous);
		assert_eq!(gateway.error(), None);

		let mut stale = SessionGateway::new(auth, Some(SessionToken::new_v4()));

		assert_eq!(stale.refresh().await, Identity::Anonymous);
		assert_eq!(stale.token(), None);
		assert_eq!(stale.error(), None);
	}

	#[tokio::test]
	async fn test_wrong_credentials_stay_anonymous() {
		let mut gateway = registered(Arc::new(MemoryBackend::default())).await;

		gateway.refresh().await;

		let error = gateway.login("ada@example.com", "wrong-password").await.unwrap_err();

		assert!(matches!(error, backend::Error::Auth(..)));
		assert_eq!(gateway.identity(), Identity::Anonymous);
		assert_eq!(gateway.error(), Some(error.to_string().as_str()));
		assert_eq!(gateway.token(), None);
	}

	#[tokio::test]
	async fn test_login_publishes_identity() {
		let mut gateway = registered(Arc::new(MemoryBackend::default())).await;
		let mut changes = gateway.subscribe();

		let account = gateway.login("ada@example.com", "hunter22").await.unwrap();

		assert!(changes.has_changed().unwrap());
		assert_eq!(
			*changes.borrow_and_update(),
			Identity::Authenticated(account.clone())
		);
		assert!(gateway.token().is_some());
		assert_eq!(gateway.refresh().await.account(), Some(&account));
	}

	#[tokio::test]
	async fn test_logout_clears_session() {
		let auth: Auth = Arc::new(MemoryBackend::default());
		let mut gateway = registered(auth.clone()).await;

		gateway.login("ada@example.com", "hunter22").await.unwrap();

		let token = gateway.token().unwrap();

		gateway.logout().await.unwrap();

		assert_eq!(gateway.identity(), Identity::Anonymous);
		assert_eq!(gateway.token(), None);
		assert!(matches!(
			auth.who_am_i(token).await,
			Err(backend::Error::NoSession)
		));
	}

	#[tokio::test]
	async fn test_failed_logout_keeps_session() {
		let mut gateway = registered(Arc::new(FlakyAuth {
			fail_logout: true,
			..FlakyAuth::default()
		}))
		.await;
		let account = gateway.login("ada@example.com", "hunter22").await.unwrap();

		assert!(gateway.logout().await.is_err());
		assert_eq!(gateway.identity(), Identity::Authenticated(account));
		assert!(gateway.token().is_some());
		assert!(gateway.error().is_some());
	}

	#[tokio::test]
	async fn test_signup_logs_in() {
		let mut gateway = SessionGateway::new(Arc::new(MemoryBackend::default()), None);

		let account = gateway
			.signup("grace@example.com", "cobol!", "Grace")
			.await
			.unwrap();

		assert_eq!(account.name, "Grace");
		assert_eq!(gateway.identity(), Identity::Authenticated(account));
	}

	#[tokio::test]
	async fn test_signup_with_taken_email_fails_first_step() {
		let mut gateway = registered(Arc::new(MemoryBackend::default())).await;

		let error = gateway
			.signup("ada@example.com", "hunter22", "Ada again")
			.await
			.unwrap_err();

		assert!(matches!(error, SignupError::CreateAccount(backend::Error::Auth(..))));
		assert_eq!(gateway.identity(), Identity::Unknown);
	}

	#[tokio::test]
	async fn test_failed_lookup_closes_new_session() {
		let auth = Arc::new(FlakyAuth {
			fail_lookup: true,
			..FlakyAuth::default()
		});
		let mut gateway = registered(auth.clone()).await;

		let error = gateway.login("ada@example.com", "hunter22").await.unwrap_err();

		assert!(matches!(error, backend::Error::Unavailable(..)));
		assert_eq!(gateway.token(), None);
		assert_eq!(gateway.identity(), Identity::Unknown);

		let destroyed = auth.destroyed.lock().clone();

		assert_eq!(destroyed.len(), 1);
		assert!(matches!(
			auth.inner.who_am_i(destroyed[0]).await,
			Err(backend::Error::NoSession)
		));
	}

	#[tokio::test]
	async fn test_signup_with_failed_login_keeps_account() {
		let auth = Arc::new(FlakyAuth {
			fail_login: true,
			..FlakyAuth::default()
		});
		let mut gateway = SessionGateway::new(auth.clone(), None);

		let error = gateway
			.signup("grace@example.com", "cobol!", "Grace")
			.await
			.unwrap_err();

		let SignupError::Login { account, source } = error else {
			panic!("expected the login step to fail, got {error:?}");
		};

		assert!(matches!(source, backend::Error::Unavailable(..)));
		assert_eq!(gateway.identity(), Identity::Unknown);
		assert_eq!(gateway.token(), None);
		assert!(gateway.error().is_some());

		// The account was created, and logging in to it works once the provider recovers
		let token = auth
			.inner
			.create_session("grace@example.com", "cobol!")
			.await
			.unwrap();

		assert_eq!(auth.inner.who_am_i(token).await.unwrap().id, account);
	}

	#[test]
	fn test_identity_serializes_with_state() {
		assert_eq!(
			serde_json::to_value(Identity::Anonymous).unwrap(),
			serde_json::json!({ "state": "anonymous" })
		);
	}
}
