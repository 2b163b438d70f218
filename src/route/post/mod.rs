use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_post")]
	UnknownPost(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_posts, get_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/me", get_with(get_user_posts, get_user_posts_docs))
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string()).content("The post does not exist.");
		let Self::UnknownPost(post) = self;

		message.detail("post", post.to_string()).into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_post_page_renders_markdown() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;
		save_profile(&app, "Ada Lovelace", "ada").await;

		let post = app
			.post("/posts")
			.json(&json!({
				"title": "On engines",
				"content": format!("# Engines\n\n```rust\nfn main() {{}}\n```\n\n<script>alert(1)</script>\n\n{}", "x".repeat(50)),
			}))
			.await
			.json::<serde_json::Value>();

		app.post("/auth/logout").await;

		let page = app
			.get(&format!("/posts/{}", post["id"].as_str().unwrap()))
			.await
			.json::<serde_json::Value>();
		let html = page["html"].as_str().unwrap();

		assert!(html.contains("<h1>Engines</h1>"));
		assert!(html.contains(r#"class="language-rust""#));
		assert_eq!(page["languages"], json!(["rust"]));
		assert!(!html.contains("<script>"));
		assert_eq!(page["author"]["username"], "ada");
		assert_eq!(page["title"], "On engines");
	}

	#[tokio::test]
	async fn test_short_content_is_rejected() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;

		let response = app
			.post("/posts")
			.json(&json!({ "title": "Hi", "content": "too short" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"]
				.as_array()
				.unwrap()
				.len(),
			2
		);
	}

	#[tokio::test]
	async fn test_own_posts_newest_first() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;

		for title in ["First post", "Second post", "Third post"] {
			create_post(&app, title).await;
		}

		let titles = app
			.get("/posts/me")
			.await
			.json::<Vec<serde_json::Value>>()
			.into_iter()
			.map(|post| post["title"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		assert_eq!(titles, ["Third post", "Second post", "First post"]);
	}

	#[tokio::test]
	async fn test_foreign_post_is_unknown() {
		let app = app();

		register(&app, "ada@example.com", "Ada Lovelace").await;

		let id = create_post(&app, "Mine").await;

		app.post("/auth/logout").await;
		register(&app, "grace@example.com", "Grace Hopper").await;

		let response = app
			.put(&format!("/posts/{id}"))
			.json(&json!({ "title": "Stolen" }))
			.await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["code"],
			"unknown_post"
		);

		let response = app.delete(&format!("/posts/{id}")).await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(app.get(&format!("/posts/{id}")).await.status_code(), 200);
	}
}
