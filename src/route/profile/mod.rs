use aide::axum::{
	routing::{get_with, put_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{content, error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_user")]
	UnknownUser(String),
	#[error("no_profile")]
	NoProfile,
	#[error("username_taken")]
	UsernameTaken(String),
	#[error("not_an_image")]
	NotAnImage(String),
}

pub type RouteError = error::RouteError<Error>;

impl From<content::Error> for RouteError {
	fn from(error: content::Error) -> Self {
		match error {
			content::Error::Backend(error) => error.into(),
			content::Error::UsernameTaken(username) => Error::UsernameTaken(username).into(),
		}
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", get_with(list_profiles, list_profiles_docs))
		.api_route(
			"/me",
			get_with(get_own_profile, get_own_profile_docs).put_with(save_profile, save_profile_docs),
		)
		.api_route("/me/avatar", put_with(replace_avatar, replace_avatar_docs))
		.api_route("/:username", get_with(get_profile, get_profile_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) | Self::NoProfile => StatusCode::NOT_FOUND,
			Self::UsernameTaken(..) => StatusCode::CONFLICT,
			Self::NotAnImage(..) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UnknownUser(username) => message
				.content("The developer you're looking for doesn't exist or has been removed.")
				.detail("username", username),
			Self::NoProfile => message.content("You have not created your profile yet."),
			Self::UsernameTaken(username) => message
				.content("This username is already taken.")
				.field("username")
				.detail("username", username),
			Self::NotAnImage(content_type) => message
				.content("Avatars must be PNG, JPEG, GIF or WebP images.")
				.detail("content_type", content_type)
				.detail("accepted", content::AVATAR_TYPES.to_vec()),
		}
		.into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_first_save_creates_then_updates() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;

		let response = app.get("/profiles/me").await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["code"],
			"no_profile"
		);

		let created = app
			.put("/profiles/me")
			.json(&json!({ "name": "Ada Lovelace", "bio": "First programmer" }))
			.await;

		assert_eq!(created.status_code(), 200);

		let created = created.json::<serde_json::Value>();

		assert_eq!(created["username"], "ada-lovelace");
		assert_eq!(created["avatar_url"], serde_json::Value::Null);

		let updated = app
			.put("/profiles/me")
			.json(&json!({ "name": "Ada King", "username": "countess" }))
			.await
			.json::<serde_json::Value>();

		assert_eq!(updated["id"], created["id"]);
		assert_eq!(updated["name"], "Ada King");
		assert_eq!(updated["username"], "countess");
		assert_eq!(updated["bio"], "First programmer");
	}

	#[tokio::test]
	async fn test_saving_requires_session() {
		let app = app();

		let response = app
			.put("/profiles/me")
			.json(&json!({ "name": "Nobody" }))
			.await;

		assert_eq!(response.status_code(), 401);
	}

	#[tokio::test]
	async fn test_username_is_unique() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;

		app.post("/auth/logout").await;
		register(&app, "grace@example.com", "Grace Hopper").await;

		let response = app
			.put("/profiles/me")
			.json(&json!({ "name": "Grace Hopper", "username": "ADA" }))
			.await;

		assert_eq!(response.status_code(), 409);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["field"],
			"username"
		);
	}

	#[tokio::test]
	async fn test_public_profile_aggregate() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;
		create_project(&app, "Analytical Engine").await;
		create_post(&app, "Notes on the engine").await;

		app.post("/auth/logout").await;

		let response = app.get("/profiles/ada").await;

		assert_eq!(response.status_code(), 200);

		let page = response.json::<serde_json::Value>();

		assert_eq!(page["profile"]["name"], "Ada Lovelace");
		assert_eq!(page["projects"][0]["title"], "Analytical Engine");
		assert_eq!(page["projects"][0]["tech_tags"], json!(["rust", "axum"]));
		assert_eq!(page["posts"][0]["title"], "Notes on the engine");

		let response = app.get("/profiles/nobody").await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["code"],
			"unknown_user"
		);
	}

	#[tokio::test]
	async fn test_explore_search() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;
		app.post("/auth/logout").await;
		register(&app, "grace@example.com", "Grace Hopper").await;
		save_profile(&app, "Grace Hopper", "grace").await;

		let all = app.get("/profiles").await.json::<Vec<serde_json::Value>>();

		assert_eq!(all.len(), 2);

		let found = app
			.get("/profiles")
			.add_query_param("q", "HOPPER")
			.await
			.json::<Vec<serde_json::Value>>();

		assert_eq!(found.len(), 1);
		assert_eq!(found[0]["username"], "grace");
	}

	#[tokio::test]
	async fn test_avatar_upload_and_preview() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;

		let response = app
			.put("/profiles/me/avatar")
			.content_type("text/plain")
			.bytes(b"hello".to_vec().into())
			.await;

		assert_eq!(response.status_code(), 415);

		let response = app
			.put("/profiles/me/avatar")
			.content_type("image/png")
			.bytes(PNG.to_vec().into())
			.await;

		assert_eq!(response.status_code(), 200);

		let avatar_url = response.json::<serde_json::Value>()["avatar_url"]
			.as_str()
			.unwrap()
			.to_owned();
		let path = avatar_url.trim_start_matches(PUBLIC_URL);

		assert!(path.starts_with("/files/files/"));

		let preview = app.get(path).await;

		assert_eq!(preview.status_code(), 200);
		assert_eq!(preview.header("content-type"), "image/png");
		assert_eq!(preview.header("x-content-type-options"), "nosniff");
		assert_eq!(preview.as_bytes().as_ref(), PNG);
	}

	#[tokio::test]
	async fn test_svg_avatar_is_rejected() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;

		let response = app
			.put("/profiles/me/avatar")
			.content_type("image/svg+xml")
			.bytes(br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#.to_vec().into())
			.await;

		assert_eq!(response.status_code(), 415);

		let body = response.json::<serde_json::Value>();

		assert_eq!(body["errors"][0]["details"]["content_type"], "image/svg+xml");

		let profile = app.get("/profiles/me").await.json::<serde_json::Value>();

		assert_eq!(profile["avatar_url"], serde_json::Value::Null);
	}
}
