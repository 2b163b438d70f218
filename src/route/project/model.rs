use schemars::JsonSchema;
use serde::Serialize;

pub use crate::{
	content::{CreateProject, Project, UpdateProject},
	route::model::IdInput,
};
use crate::content::search;

/// A project as shown on cards and its own page.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ProjectCard {
	#[serde(flatten)]
	pub project: Project,
	/// The entries of the tech stack, in order.
	pub tech_tags: Vec<String>,
	/// The start of the description.
	pub excerpt: String,
}

impl From<Project> for ProjectCard {
	fn from(project: Project) -> Self {
		Self {
			tech_tags: project.tech_tags().into_iter().map(str::to_owned).collect(),
			excerpt: search::excerpt(&project.description, search::CARD_EXCERPT).into_owned(),
			project,
		}
	}
}
