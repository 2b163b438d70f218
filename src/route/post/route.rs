use axum::extract::State;
use macros::route;

use crate::{
	content::{search, Content},
	error::OrUnknown,
	extract::{Json, Path, Session},
	openapi::tag,
	render,
	route::profile::model::ProfileView,
};

use super::{model, Error, RouteError};

/// Get own posts
/// Returns your posts, newest first.
#[route(tag = tag::POST)]
pub async fn get_user_posts(
	State(content): State<Content>,
	session: Session,
) -> Result<Json<Vec<model::PostCard>>, RouteError> {
	let mut posts = content
		.list_by_owner::<model::BlogPost>(session.account.id)
		.await?;

	search::newest_first(&mut posts, |post| post.created_at);

	Ok(Json(posts.into_iter().map(model::PostCard::from).collect()))
}

/// Get all posts
/// Returns the posts of every developer, newest first.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(content): State<Content>,
) -> Result<Json<Vec<model::PostCard>>, RouteError> {
	let mut posts = content.list_all::<model::BlogPost>().await?;

	search::newest_first(&mut posts, |post| post.created_at);

	Ok(Json(posts.into_iter().map(model::PostCard::from).collect()))
}

/// Get single post
/// Returns a single post by its unique id, rendered to HTML, along with its author.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(content): State<Content>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::PostPage>, RouteError> {
	let post = content
		.get::<model::BlogPost>(path.id)
		.await
		.or_unknown(|| Error::UnknownPost(path.id))?;

	let author = content
		.profile_by_owner(post.user_id)
		.await?
		.map(|profile| ProfileView::new(&content, profile));

	Ok(Json(model::PostPage {
		html: render::markdown_to_html(&post.content),
		languages: render::code_languages(&post.content),
		post,
		author,
	}))
}

/// Create post
/// Creates a new post, written in Markdown.
#[route(tag = tag::POST)]
pub async fn create_post(
	State(content): State<Content>,
	session: Session,
	Json(input): Json<model::CreateBlogPost>,
) -> Result<Json<model::BlogPost>, RouteError> {
	let post = content
		.create::<model::BlogPost>(session.account.id, &input)
		.await?;

	Ok(Json(post))
}

/// Update post
/// Updates the given fields of one of your posts.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(content): State<Content>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdateBlogPost>,
) -> Result<Json<model::BlogPost>, RouteError> {
	let post = content
		.update_owned::<model::BlogPost>(path.id, session.account.id, &input)
		.await
		.or_unknown(|| Error::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Delete post
/// Deletes one of your posts.
#[route(tag = tag::POST)]
pub async fn delete_post(
	State(content): State<Content>,
	session: Session,
	Path(path): Path<model::IdInput>,
) -> Result<(), RouteError> {
	content
		.delete_owned::<model::BlogPost>(path.id, session.account.id)
		.await
		.or_unknown(|| Error::UnknownPost(path.id))
}
