use std::borrow::Cow;

use aide::{
	gen::GenContext,
	openapi::{Operation, Response as ApiResponse},
	OperationOutput,
};
use axum::{
	body::Body,
	extract::rejection,
	http::{header, HeaderValue, Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::backend;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error, as presented to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A stable, machine-readable identifier of the error.
	pub code: Cow<'a, str>,
	/// A human-readable description of the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<Cow<'a, str>>,
	/// The input field the error relates to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Additional structured information about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl<'a> Message<'a> {
	pub fn new(code: impl Into<Cow<'a, str>>) -> Self {
		Self {
			code: code.into(),
			content: None,
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn content(mut self, content: impl Into<Cow<'a, str>>) -> Self {
		self.content = Some(content.into());
		self
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub errors: Vec<Message<'static>>,
}

impl ErrorResponse {
	fn into_response_with(self, status: StatusCode) -> Response<Body> {
		(status, Json(self)).into_response()
	}
}

/// How a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn into_errors(self) -> Vec<Message<'static>>;
}

/// Errors shared by every route.
///
/// The Display implementation is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0:?}")]
	Json(axum_jsonschema::JsonSchemaRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("body error: {0}")]
	Body(#[from] rejection::BytesRejection),
	#[error("missing content type")]
	MissingContentType,
	#[error("empty body")]
	EmptyBody,
	#[error("not authenticated")]
	Unauthenticated,
	#[error(transparent)]
	Backend(#[from] backend::Error),
	#[error("rate limit: {0}")]
	RateLimit(#[from] GovernorError),
}

impl From<axum_jsonschema::JsonSchemaRejection> for AppError {
	fn from(rejection: axum_jsonschema::JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

impl AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..)
			| Self::Json(..)
			| Self::Query(..)
			| Self::Path(..)
			| Self::Body(..)
			| Self::MissingContentType
			| Self::EmptyBody => StatusCode::BAD_REQUEST,
			Self::Unauthenticated => StatusCode::UNAUTHORIZED,
			Self::Backend(error) => match error {
				backend::Error::NotFound { .. } => StatusCode::NOT_FOUND,
				backend::Error::Auth(..) | backend::Error::NoSession => StatusCode::UNAUTHORIZED,
				backend::Error::Unavailable(..) => StatusCode::SERVICE_UNAVAILABLE,
				_ => StatusCode::INTERNAL_SERVER_ERROR,
			},
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<Message<'static>> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let message = Message::new(error.code.clone()).field(field.clone());

						match &error.message {
							Some(content) => message.content(content.clone()),
							None => message,
						}
					})
				})
				.collect(),
			Self::Json(rejection) => {
				tracing::debug!(?rejection, "rejected request body");

				Message::new("invalid_body")
					.content("The request body is not valid for this endpoint.")
					.into_vec()
			}
			Self::Query(rejection) => Message::new("invalid_query")
				.content(rejection.body_text())
				.into_vec(),
			Self::Path(rejection) => Message::new("invalid_path")
				.content(rejection.body_text())
				.into_vec(),
			Self::Body(rejection) => Message::new("invalid_body")
				.content(rejection.body_text())
				.into_vec(),
			Self::MissingContentType => Message::new("missing_content_type")
				.content("The request needs a Content-Type header.")
				.into_vec(),
			Self::EmptyBody => Message::new("empty_body")
				.content("The request body is empty.")
				.into_vec(),
			Self::Unauthenticated => Message::new("unauthenticated")
				.content("You need to be logged in to do this.")
				.into_vec(),
			Self::Backend(error) => backend_errors(error),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => {
				Message::new("rate_limited")
					.content("Too many requests, slow down.")
					.detail("wait_time", wait_time)
					.into_vec()
			}
			Self::RateLimit(error) => {
				tracing::error!(%error, "rate limiter failed");

				Message::new("internal_error").into_vec()
			}
		}
	}
}

/// Presents a backend error, logging the faults.
///
/// Expected outcomes keep their message, since they are meant to be shown
/// verbatim. Faults are replaced by a generic one.
fn backend_errors(error: backend::Error) -> Vec<Message<'static>> {
	if !error.is_expected() {
		tracing::error!(%error, "backend error");
	}

	match error {
		backend::Error::NotFound { collection, id } => Message::new("not_found")
			.content("The requested resource does not exist.")
			.detail("collection", collection)
			.detail("id", id)
			.into_vec(),
		backend::Error::Auth(message) => Message::new("auth_failed").content(message).into_vec(),
		backend::Error::NoSession => Message::new("unauthenticated")
			.content("You need to be logged in to do this.")
			.into_vec(),
		backend::Error::Unavailable(..) => Message::new("unavailable")
			.content("The service is temporarily unavailable.")
			.into_vec(),
		_ => Message::new("internal_error").into_vec(),
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();
		let headers = match &self {
			Self::RateLimit(GovernorError::TooManyRequests { headers, .. }) => headers.clone(),
			_ => None,
		};

		let mut response = ErrorResponse {
			errors: self.into_errors(),
		}
		.into_response_with(status);

		if let Some(headers) = headers {
			response.headers_mut().extend(headers);
		}

		if status == StatusCode::UNAUTHORIZED {
			response
				.headers_mut()
				.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
		}

		response
	}
}

/// An error returned from a route: either one of its own, or a shared one.
#[derive(Debug)]
pub enum RouteError<E> {
	App(AppError),
	Route(E),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> From<backend::Error> for RouteError<E> {
	fn from(error: backend::Error) -> Self {
		Self::App(error.into())
	}
}

impl<E> From<validator::ValidationErrors> for RouteError<E> {
	fn from(error: validator::ValidationErrors) -> Self {
		Self::App(error.into())
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();

				ErrorResponse {
					errors: error.into_errors(),
				}
				.into_response_with(status)
			}
		}
	}
}

impl OperationOutput for AppError {
	type Inner = ErrorResponse;

	fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<ApiResponse> {
		Json::<ErrorResponse>::operation_response(ctx, operation)
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = ErrorResponse;

	fn operation_response(ctx: &mut GenContext, operation: &mut Operation) -> Option<ApiResponse> {
		Json::<ErrorResponse>::operation_response(ctx, operation)
	}
}

/// Turns a backend `NotFound` into a route-specific error.
pub trait OrUnknown<T> {
	fn or_unknown<E>(self, unknown: impl FnOnce() -> E) -> Result<T, RouteError<E>>;
}

impl<T> OrUnknown<T> for backend::Result<T> {
	fn or_unknown<E>(self, unknown: impl FnOnce() -> E) -> Result<T, RouteError<E>> {
		self.map_err(|error| match error {
			backend::Error::NotFound { .. } => RouteError::Route(unknown()),
			error => RouteError::from(error),
		})
	}
}
