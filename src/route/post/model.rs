use schemars::JsonSchema;
use serde::Serialize;

pub use crate::{
	content::{BlogPost, CreateBlogPost, UpdateBlogPost},
	route::model::IdInput,
};
use crate::{content::search, route::profile::model::ProfileView};

/// A post as listed on cards, with the start of its content.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostCard {
	#[serde(flatten)]
	pub post: BlogPost,
	pub excerpt: String,
}

impl From<BlogPost> for PostCard {
	fn from(post: BlogPost) -> Self {
		Self {
			excerpt: search::excerpt(&post.content, search::CARD_EXCERPT).into_owned(),
			post,
		}
	}
}

/// A post as shown on its own page.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostPage {
	#[serde(flatten)]
	pub post: BlogPost,
	/// The content rendered to HTML. Raw HTML in the source is escaped.
	pub html: String,
	/// The languages of the fenced code blocks, for loading highlighters.
	pub languages: Vec<String>,
	/// The author's profile, absent if they have not created one.
	pub author: Option<ProfileView>,
}
