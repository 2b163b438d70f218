#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod openapi;
pub mod ratelimit;
pub mod render;
pub mod route;
pub mod session;
pub mod trace;
pub mod validate;


use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use backend::{Auth, Blobs, Documents};
use content::Content;

pub type AppState = State;

/// The shared application state.
///
/// Everything in here is a handle to one of the external services, so it is
/// cheap to clone for every request.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub content: Content,
	pub auth: Auth,
}

impl State {
	pub fn new(documents: Documents, blobs: Blobs, auth: Auth, avatar_bucket: &str) -> Self {
		Self {
			content: Content::new(documents, blobs, avatar_bucket),
			auth,
		}
	}
}

/// The rate limits applied to the API, see [`ratelimit`].
pub struct RateLimits {
	pub default: ratelimit::Config,
	/// Applied to the authentication routes on top of the default one.
	pub secure: ratelimit::Config,
}

/// Builds the application, with its OpenAPI document served under `/docs`.
///
/// Rate limits need the peer address, so they are only usable when the
/// router is served with connect info.
pub fn router(state: State, limits: Option<RateLimits>) -> Router {
	let mut auth = route::auth::routes();

	if let Some(limits) = &limits {
		auth = auth.layer(GovernorLayer {
			config: limits.secure.clone(),
		});
	}

	let mut api = OpenApi::default();
	let app = ApiRouter::new()
		.nest("/auth", auth)
		.nest("/profiles", route::profile::routes())
		.nest("/projects", route::project::routes())
		.nest("/posts", route::post::routes())
		.nest("/files", route::file::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.with_state(state);

	let app = match limits {
		Some(limits) => app.layer(GovernorLayer {
			config: limits.default,
		}),
		None => app,
	};

	app.layer(CompressionLayer::new())
		.layer(CorsLayer::very_permissive())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(TraceLayer::new_for_http())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
