use aide::axum::{routing::get_with, ApiRouter, IntoApiResponse};
use axum::{
	body::Bytes,
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
};
use macros::route;
use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
	content::Content,
	error::{self, OrUnknown},
	extract::Path,
	openapi::tag,
	AppState,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_file")]
	UnknownFile { bucket: String, id: Uuid },
}

pub type RouteError = error::RouteError<Error>;

#[derive(Deserialize, Validate, JsonSchema)]
pub struct FileInput {
	/// The bucket the file is stored in.
	#[validate(length(min = 1, max = 64))]
	pub bucket: String,
	pub id: Uuid,
}

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().api_route("/:bucket/:id", get_with(get_file, get_file_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownFile { .. } => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string()).content("The file does not exist.");
		let Self::UnknownFile { bucket, id } = self;

		message
			.detail("bucket", bucket)
			.detail("id", id.to_string())
			.into_vec()
	}
}

/// Get file
/// Returns a stored file, such as an avatar, with its original content type. Browsers are told not to sniff a different one.
#[route(tag = tag::FILE, response(status = 200, description = "The file contents."))]
pub async fn get_file(
	State(content): State<Content>,
	Path(path): Path<FileInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let blob = content
		.fetch_blob(&path.bucket, path.id)
		.await
		.or_unknown(|| Error::UnknownFile {
			bucket: path.bucket.clone(),
			id: path.id,
		})?;

	Ok((
		[
			(header::CONTENT_TYPE, blob.content_type),
			(header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_owned()),
			(header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_owned()),
		],
		Bytes::from(blob.bytes),
	)
		.into_response())
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_unknown_file() {
		let app = app();

		let response = app
			.get(&format!("/files/files/{}", uuid::Uuid::new_v4()))
			.await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<serde_json::Value>()["errors"][0]["code"],
			"unknown_file"
		);
	}
}
