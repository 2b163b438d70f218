use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{backend::AccountId, error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("account_rejected")]
	AccountRejected(String),
	#[error("login_after_signup_failed")]
	LoginAfterSignup { account: AccountId, reason: String },
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/login", post_with(login, login_docs))
		.api_route("/logout", post_with(logout, logout_docs))
		.api_route("/register", post_with(register, register_docs))
		.api_route("/me", get_with(get_me, get_me_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::AccountRejected(..) => StatusCode::CONFLICT,
			Self::LoginAfterSignup { .. } => StatusCode::UNAUTHORIZED,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::AccountRejected(reason) => message.content(reason).into_vec(),
			Self::LoginAfterSignup { account, reason } => message
				.content("Your account was created, but logging in failed. Please log in.")
				.detail("account", account.to_string())
				.detail("reason", reason)
				.into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_signup_flow() {
		let app = app();

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "john@smith.com",
				"name": "John Smith",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 200);
		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));
		assert_eq!(response.json::<serde_json::Value>()["name"], "John Smith");

		let response = app.get("/auth/me").await;

		assert_eq!(response.status_code(), 200);

		let identity = response.json::<serde_json::Value>();

		assert_eq!(identity["state"], "authenticated");
		assert_eq!(identity["account"]["email"], "john@smith.com");

		let response = app.post("/auth/logout").await;

		assert_eq!(response.status_code(), 204);
		assert_eq!(
			app.get("/auth/me").await.json::<serde_json::Value>()["state"],
			"anonymous"
		);

		let response = app
			.post("/auth/login")
			.json(&json!({
				"email": "john@smith.com",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			app.get("/auth/me").await.json::<serde_json::Value>()["state"],
			"authenticated"
		);
	}

	#[tokio::test]
	async fn test_anonymous_me_is_not_an_error() {
		let app = app();

		let response = app.get("/auth/me").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "state": "anonymous" })
		);
	}

	#[tokio::test]
	async fn test_wrong_password_shows_provider_message() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		app.post("/auth/logout").await;

		let response = app
			.post("/auth/login")
			.json(&json!({
				"email": "ada@example.com",
				"password": "not-the-password",
			}))
			.await;

		assert_eq!(response.status_code(), 401);

		let body = response.json::<serde_json::Value>();

		assert_eq!(body["errors"][0]["code"], "auth_failed");
		assert_eq!(
			body["errors"][0]["content"],
			"Invalid credentials. Please check the email and password."
		);
	}

	#[tokio::test]
	async fn test_register_validation() {
		let app = app();

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "not-an-email",
				"name": "J",
				"password": "12345",
			}))
			.await;

		assert_eq!(response.status_code(), 400);

		let body = response.json::<serde_json::Value>();
		let mut fields = body["errors"]
			.as_array()
			.unwrap()
			.iter()
			.map(|error| error["field"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		fields.sort();

		assert_eq!(fields, ["email", "name", "password"]);
	}

	#[tokio::test]
	async fn test_duplicate_email_is_rejected() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "ADA@example.com",
				"name": "Ada Again",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["code"],
			"account_rejected"
		);
	}

	#[tokio::test]
	async fn test_register_reports_failed_login() {
		let app = app_with_auth(std::sync::Arc::new(FlakyAuth {
			fail_login: true,
			..FlakyAuth::default()
		}));

		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "grace@example.com",
				"name": "Grace Hopper",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 401);

		let body = response.json::<serde_json::Value>();
		let error = &body["errors"][0];

		assert_eq!(error["code"], "login_after_signup_failed");
		assert!(error["details"]["account"]
			.as_str()
			.unwrap()
			.parse::<uuid::Uuid>()
			.is_ok());

		assert_eq!(
			app.get("/auth/me").await.json::<serde_json::Value>()["state"],
			"anonymous"
		);

		// The account exists, so registering again is rejected
		let response = app
			.post("/auth/register")
			.json(&json!({
				"email": "grace@example.com",
				"name": "Grace Hopper",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), 409);
	}
}
