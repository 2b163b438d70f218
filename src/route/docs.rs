use std::sync::Arc;

use aide::{
	axum::{
		routing::{get, get_with},
		ApiRouter, IntoApiResponse,
	},
	openapi::OpenApi,
	scalar::Scalar,
};
use axum::{response::IntoResponse, Extension};

use crate::extract::Json;

pub const API_JSON_PATH: &str = "/docs/private/api.json";

pub fn routes<S>() -> ApiRouter<S>
where
	S: Clone + Send + Sync + 'static,
{
	ApiRouter::new()
		.api_route(
			"/",
			get_with(
				Scalar::new(API_JSON_PATH).with_title("Devfolio").axum_handler(),
				|op| op.description("This documentation page."),
			),
		)
		.route("/private/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
	Json(api.as_ref()).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_openapi_document() {
		let app = app();

		let response = app.get(super::API_JSON_PATH).await;

		assert_eq!(response.status_code(), 200);

		let api = response.json::<serde_json::Value>();

		assert_eq!(api["info"]["title"], "Devfolio");
		assert!(api["paths"]["/profiles/{username}"]["get"].is_object());
		assert!(api["paths"]["/projects/{id}"]["delete"].is_object());
		assert!(api["components"]["securitySchemes"]["Session"].is_object());
	}
}
