use axum::extract::State;
use macros::route;

use crate::{
	content::{search, Content},
	error::OrUnknown,
	extract::{Json, Path, Session},
	openapi::tag,
};

use super::{model, Error, RouteError};

/// Get own projects
/// Returns your projects, newest first.
#[route(tag = tag::PROJECT)]
pub async fn get_user_projects(
	State(content): State<Content>,
	session: Session,
) -> Result<Json<Vec<model::ProjectCard>>, RouteError> {
	let mut projects = content
		.list_by_owner::<model::Project>(session.account.id)
		.await?;

	search::newest_first(&mut projects, |project| project.created_at);

	Ok(Json(
		projects.into_iter().map(model::ProjectCard::from).collect(),
	))
}

/// Get single project
/// Returns a single project by its unique id.
#[route(tag = tag::PROJECT)]
pub async fn get_project(
	State(content): State<Content>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::ProjectCard>, RouteError> {
	let project = content
		.get::<model::Project>(path.id)
		.await
		.or_unknown(|| Error::UnknownProject(path.id))?;

	Ok(Json(project.into()))
}

/// Create project
/// Adds a project to your profile.
#[route(tag = tag::PROJECT)]
pub async fn create_project(
	State(content): State<Content>,
	session: Session,
	Json(input): Json<model::CreateProject>,
) -> Result<Json<model::ProjectCard>, RouteError> {
	let project = content
		.create::<model::Project>(session.account.id, &input)
		.await?;

	Ok(Json(project.into()))
}

/// Update project
/// Updates the given fields of one of your projects.
#[route(tag = tag::PROJECT)]
pub async fn update_project(
	State(content): State<Content>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateProject>,
) -> Result<Json<model::ProjectCard>, RouteError> {
	let project = content
		.update_owned::<model::Project>(path.id, session.account.id, &input)
		.await
		.or_unknown(|| Error::UnknownProject(path.id))?;

	Ok(Json(project.into()))
}

/// Delete project
/// Deletes one of your projects.
#[route(tag = tag::PROJECT)]
pub async fn delete_project(
	State(content): State<Content>,
	session: Session,
	Path(path): Path<model::IdInput>,
) -> Result<(), RouteError> {
	content
		.delete_owned::<model::Project>(path.id, session.account.id)
		.await
		.or_unknown(|| Error::UnknownProject(path.id))
}
