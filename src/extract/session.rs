use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::request,
};

use crate::{
	backend::{Account, Auth, SessionToken},
	error::AppError,
	gateway::{Identity, SessionGateway},
	openapi::SECURITY_SCHEME_SESSION,
	session,
};

/// Extracts the session and related account from the request.
///
/// If there is no session cookie, or the session it names is no longer
/// active, an [`AppError::Unauthenticated`] is returned.
///
/// ```ignore
/// async fn route(session: Session) {
///   println!("{:?}", session.account);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub token: SessionToken,
	pub account: Account,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Auth: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Gateway(mut gateway) = Gateway::from_request_parts(parts, state).await?;

		match (gateway.refresh().await, gateway.token()) {
			(Identity::Authenticated(account), Some(token)) => Ok(Self { token, account }),
			_ => Err(AppError::Unauthenticated),
		}
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// A session gateway for the visitor, holding the session cookie they sent.
///
/// Nothing is checked yet, the gateway starts out as [`Identity::Unknown`].
pub struct Gateway(pub SessionGateway);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Gateway
where
	Auth: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let token = session::token_from_headers(&parts.headers);

		Ok(Self(SessionGateway::new(Auth::from_ref(state), token)))
	}
}

impl OperationInput for Gateway {}

/// The identity of the visitor, anonymous when they have no active session.
///
/// Unlike [`Session`], this never rejects a request.
#[derive(Debug)]
pub struct Visitor(pub Identity);

impl Visitor {
	pub fn account(&self) -> Option<&Account> {
		self.0.account()
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Visitor
where
	Auth: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Gateway(mut gateway) = Gateway::from_request_parts(parts, state).await?;

		Ok(Self(gateway.refresh().await))
	}
}

impl OperationInput for Visitor {}
