use axum::extract::State;
use macros::route;

use crate::{
	content::{self, search, BlogPost, Content, Project},
	extract::{Json, Path, Query, Session, Upload},
	openapi::tag,
	route::{post::model::PostCard, project::model::ProjectCard},
};

use super::{model, Error, RouteError};

async fn own_profile(content: &Content, session: &Session) -> Result<model::Profile, RouteError> {
	content
		.profile_by_owner(session.account.id)
		.await?
		.ok_or_else(|| Error::NoProfile.into())
}

/// List profiles
/// Returns every profile for the Explore page, newest first, optionally filtered by a search term.
#[route(tag = tag::PROFILE)]
pub async fn list_profiles(
	State(content): State<Content>,
	Query(search): Query<model::SearchInput>,
) -> Result<Json<Vec<model::ProfileCard>>, RouteError> {
	let mut profiles = content.list_all::<model::Profile>().await?;

	search::newest_first(&mut profiles, |profile| profile.created_at);

	let term = search.q.unwrap_or_default();
	let cards = search::filter_profiles(&profiles, &term)
		.into_iter()
		.map(|profile| model::ProfileCard::new(&content, profile.clone()))
		.collect();

	Ok(Json(cards))
}

/// Get own profile
/// Returns the profile of the authenticated account.
#[route(tag = tag::PROFILE)]
pub async fn get_own_profile(
	State(content): State<Content>,
	session: Session,
) -> Result<Json<model::ProfileView>, RouteError> {
	let profile = own_profile(&content, &session).await?;

	Ok(Json(model::ProfileView::new(&content, profile)))
}

/// Save own profile
/// Creates the profile of the authenticated account on first save, and updates it afterwards. Without a username, one is derived from the account name.
#[route(tag = tag::PROFILE)]
pub async fn save_profile(
	State(content): State<Content>,
	session: Session,
	Json(input): Json<model::SaveProfileInput>,
) -> Result<Json<model::ProfileView>, RouteError> {
	let input = input.into_profile(|| content::username_from_name(&session.account.name));

	validator::Validate::validate(&input)?;

	let profile = content.save_profile(&session.account, input).await?;

	Ok(Json(model::ProfileView::new(&content, profile)))
}

/// Replace avatar
/// Stores the request body as the new avatar image, then deletes the previous one. The body must be a PNG, JPEG, GIF or WebP image, described by the Content-Type header.
#[route(tag = tag::PROFILE)]
pub async fn replace_avatar(
	State(content): State<Content>,
	session: Session,
	Upload(blob): Upload,
) -> Result<Json<model::ProfileView>, RouteError> {
	if !content::is_avatar_type(&blob.content_type) {
		return Err(Error::NotAnImage(blob.content_type).into());
	}

	let profile = own_profile(&content, &session).await?;
	let replaced = content
		.replace_avatar(&profile, blob)
		.await
		.map_err(|error| RouteError::from(error.source))?;

	Ok(Json(model::ProfileView::new(&content, replaced.profile)))
}

/// Get profile
/// Returns a developer's public page: their profile, projects and posts.
#[route(tag = tag::PROFILE)]
pub async fn get_profile(
	State(content): State<Content>,
	Path(path): Path<model::UsernameInput>,
) -> Result<Json<model::PublicProfile>, RouteError> {
	let profile = content
		.profile_by_username(&path.username)
		.await?
		.ok_or(Error::UnknownUser(path.username))?;

	let mut projects = content.list_by_owner::<Project>(profile.user_id).await?;
	let mut posts = content.list_by_owner::<BlogPost>(profile.user_id).await?;

	search::newest_first(&mut projects, |project| project.created_at);
	search::newest_first(&mut posts, |post| post.created_at);

	Ok(Json(model::PublicProfile {
		profile: model::ProfileView::new(&content, profile),
		projects: projects.into_iter().map(ProjectCard::from).collect(),
		posts: posts.into_iter().map(PostCard::from).collect(),
	}))
}
