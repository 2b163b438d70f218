mod session;

pub use session::{Gateway, Session, Visitor};

use aide::OperationIo;
use axum::{
	body::{Body, Bytes},
	extract::{FromRequest, FromRequestParts, Request},
	http::{header, request, HeaderMap, Response},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use crate::{backend::Blob, error::AppError};

/// Runs the input's validation rules, rejecting it with every failing field.
fn validated<T: Validate>(input: T) -> Result<T, AppError> {
	input.validate()?;

	Ok(input)
}

/// A JSON body, checked against its schema while deserializing and then
/// against its validation rules.
///
/// Also usable as a response, in which case it is plain JSON.
///
/// ```ignore
/// async fn route(Json(project): Json<CreateProject>) -> Json<Project> {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(
	input_with = "axum_jsonschema::Json<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
	fn into_response(self) -> Response<Body> {
		axum::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: DeserializeOwned + Validate + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let axum_jsonschema::Json(input) = axum_jsonschema::Json::<T>::from_request(req, state).await?;

		validated(input).map(Self)
	}
}

/// A validated query string, such as the explore search.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Query<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: DeserializeOwned + Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Query(input) = axum::extract::Query::<T>::from_request_parts(parts, state).await?;

		validated(input).map(Self)
	}
}

/// Validated path parameters, such as a document id.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Path<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: DeserializeOwned + Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Path(input) = axum::extract::Path::<T>::from_request_parts(parts, state).await?;

		validated(input).map(Self)
	}
}

/// A raw upload: the body bytes along with their `Content-Type`.
///
/// Requests without a content type, or with an empty body, are rejected.
#[derive(OperationIo)]
#[aide(input_with = "Bytes")]
pub struct Upload(pub Blob);

fn content_type(headers: &HeaderMap) -> Option<String> {
	let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?.trim();

	(!value.is_empty()).then(|| value.to_owned())
}

#[axum::async_trait]
impl<S> FromRequest<S> for Upload
where
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let content_type = content_type(req.headers()).ok_or(AppError::MissingContentType)?;
		let bytes = Bytes::from_request(req, state).await?;

		if bytes.is_empty() {
			return Err(AppError::EmptyBody);
		}

		Ok(Self(Blob {
			content_type,
			bytes: bytes.to_vec(),
		}))
	}
}
