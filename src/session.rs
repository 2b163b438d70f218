use axum::http::{header, HeaderMap};

use crate::backend::SessionToken;

pub const COOKIE_NAME: &str = "session";

/// Creates a session cookie with no expiry
pub fn create_cookie(token: SessionToken) -> cookie::Cookie<'static> {
	cookie::Cookie::build((COOKIE_NAME, token.to_string()))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(cookie::SameSite::Lax)
		.path("/")
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one
pub fn clear_cookie() -> cookie::Cookie<'static> {
	cookie::Cookie::build(COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(cookie::time::Duration::ZERO)
		.into()
}

/// Reads the session token from the request cookies.
///
/// A cookie that is not a valid token is treated as absent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<SessionToken> {
	headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == COOKIE_NAME)
		.and_then(|cookie| cookie.value().parse().ok())
}
