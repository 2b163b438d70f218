use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown_project")]
	UnknownProject(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", post_with(create_project, create_project_docs))
		.api_route("/me", get_with(get_user_projects, get_user_projects_docs))
		.api_route(
			"/:id",
			get_with(get_project, get_project_docs)
				.put_with(update_project, update_project_docs)
				.delete_with(delete_project, delete_project_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownProject(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		let message = error::Message::new(self.to_string()).content("The project does not exist.");
		let Self::UnknownProject(project) = self;

		message.detail("project", project.to_string()).into_vec()
	}
}
