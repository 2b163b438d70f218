use aide::axum::IntoApiResponse;
use axum::{
	http::{header, StatusCode},
	response::IntoResponse,
};
use macros::route;

use crate::{
	backend::{self, SessionToken},
	error::AppError,
	extract::{Gateway, Json, Visitor},
	gateway::SignupError,
	openapi::tag,
	session,
};

use super::{model, Error, RouteError};

/// The headers that hand the visitor their new session.
fn session_cookie(token: Option<SessionToken>) -> [(header::HeaderName, String); 1] {
	let cookie = token.map_or_else(session::clear_cookie, session::create_cookie);

	[(header::SET_COOKIE, cookie.to_string())]
}

/// Log in
/// Logs in to an account, returning it along with a session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Account>"))]
pub async fn login(
	Gateway(mut gateway): Gateway,
	Json(auth): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, AppError> {
	let account = gateway.login(&auth.email, &auth.password).await?;

	Ok((session_cookie(gateway.token()), Json(account)).into_response())
}

/// Log out
/// Ends the current session. The session cookie is only cleared once the session is gone.
#[route(tag = tag::AUTH, response(status = 204, description = "Logged out successfully."))]
pub async fn logout(Gateway(mut gateway): Gateway) -> Result<impl IntoApiResponse, AppError> {
	gateway.logout().await?;

	Ok((session_cookie(None), StatusCode::NO_CONTENT).into_response())
}

/// Register
/// Creates an account and logs in to it. If logging in fails after the account was created, the error says so and the account can be logged in to normally.
#[route(tag = tag::AUTH, response(status = 200, description = "Registered and logged in.", shape = "Json<model::Account>"))]
pub async fn register(
	Gateway(mut gateway): Gateway,
	Json(auth): Json<model::RegisterInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let account = gateway
		.signup(&auth.email, &auth.password, auth.name.trim())
		.await
		.map_err(|error| match error {
			SignupError::CreateAccount(backend::Error::Auth(reason)) => {
				RouteError::from(Error::AccountRejected(reason))
			}
			SignupError::CreateAccount(error) => RouteError::from(error),
			SignupError::Login { account, source } => {
				tracing::warn!(%account, error = %source, "account created without a session");

				RouteError::from(Error::LoginAfterSignup {
					account,
					reason: source.to_string(),
				})
			}
		})?;

	Ok((session_cookie(gateway.token()), Json(account)).into_response())
}

/// Get identity
/// Returns who the visitor is. Visitors without a session are anonymous, which is not an error.
#[route(tag = tag::AUTH)]
pub async fn get_me(Visitor(identity): Visitor) -> Json<model::Identity> {
	Json(identity)
}
