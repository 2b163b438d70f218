use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_SESSION: &str = "Session";

const DESCRIPTION: &str = "\
A developer portfolio: public profiles, showcased projects and Markdown blog posts.

Visitors can browse every profile without an account. Signing up opens a session, \
carried by the `session` cookie, which is needed to edit your own profile, projects \
and posts. Content owned by someone else is reported as not found.";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const PROFILE: &str = "Profile";
	pub const PROJECT: &str = "Project";
	pub const POST: &str = "Post";
	pub const FILE: &str = "File";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Devfolio")
		.summary("A developer portfolio")
		.description(DESCRIPTION)
		.tag(Tag {
			name: tag::AUTH.into(),
			description: Some("Accounts and sessions".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::PROFILE.into(),
			description: Some("Public developer profiles".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::PROJECT.into(),
			description: Some("Showcased projects".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Blog posts".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::FILE.into(),
			description: Some("Stored files, such as avatars".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				errors: error::Message::new("error_code")
					.content("error message")
					.field("optional field")
					.detail("key", "value")
					.into_vec(),
			})
		})
}
