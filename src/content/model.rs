use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::backend::{AccountId, BlobId, DocumentId};

/// A developer's public profile. Each account owns at most one.
#[model(collection = "users")]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate)]
pub struct Profile {
	/// The unique identifier of the profile.
	#[model(id)]
	pub id: DocumentId,
	/// The account that owns the profile.
	#[model(owner)]
	pub user_id: AccountId,
	/// The name displayed on the profile.
	#[validate(custom(function = "crate::validate::name_field"))]
	pub name: String,
	/// The public handle, used as the profile's address.
	#[validate(custom(function = "crate::validate::username_field"))]
	pub username: String,
	/// A short free-form biography.
	pub bio: Option<String>,
	pub website: Option<String>,
	pub github: Option<String>,
	pub twitter: Option<String>,
	pub linkedin: Option<String>,
	/// The stored avatar image, replaced through the avatar endpoint only.
	#[model(skip)]
	pub avatar_id: Option<BlobId>,
	/// The creation time of the profile.
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	/// The last modification time of the profile.
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

/// A project showcased on a profile.
#[model(collection = "projects")]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate)]
pub struct Project {
	/// The unique identifier of the project.
	#[model(id)]
	pub id: DocumentId,
	/// The account that owns the project.
	#[model(owner)]
	pub user_id: AccountId,
	/// The title of the project.
	#[validate(custom(function = "crate::validate::title_field"))]
	pub title: String,
	/// What the project is and does.
	#[validate(custom(function = "crate::validate::description_field"))]
	pub description: String,
	/// Comma-separated technologies, such as `rust, postgres`.
	#[validate(custom(function = "crate::validate::tech_stack_field"))]
	pub tech_stack: String,
	/// The project's repository.
	pub github_url: Option<String>,
	/// Where the project can be seen running.
	pub live_url: Option<String>,
	/// The creation time of the project.
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

impl Project {
	/// The individual entries of the tech stack, trimmed, empty ones dropped.
	pub fn tech_tags(&self) -> Vec<&str> {
		self.tech_stack
			.split(',')
			.map(str::trim)
			.filter(|tag| !tag.is_empty())
			.collect()
	}
}

/// A blog post written in Markdown.
#[model(collection = "blogs")]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate)]
pub struct BlogPost {
	/// The unique identifier of the post.
	#[model(id)]
	pub id: DocumentId,
	/// The account that wrote the post.
	#[model(owner)]
	pub user_id: AccountId,
	/// The title of the post.
	#[validate(custom(function = "crate::validate::title_field"))]
	pub title: String,
	/// The content of the post in Markdown format.
	#[validate(custom(function = "crate::validate::blog_content_field"))]
	pub content: String,
	/// The creation time of the post, assigned by the store.
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
	use uuid::Uuid;
	use validator::Validate;

	use super::*;

	fn project(tech_stack: &str) -> Project {
		Project {
			id: Uuid::new_v4(),
			user_id: Uuid::new_v4(),
			title: "devlink".into(),
			description: "a developer portfolio".into(),
			tech_stack: tech_stack.into(),
			github_url: None,
			live_url: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	#[test]
	fn test_tech_tags() {
		assert_eq!(
			project(" rust,postgres , ,axum ").tech_tags(),
			["rust", "postgres", "axum"]
		);
		assert!(project(" , ").tech_tags().is_empty());
	}

	#[test]
	fn test_create_input_validation() {
		let valid = CreateProject {
			title: "abc".into(),
			description: "0123456789".into(),
			tech_stack: "go".into(),
			github_url: None,
			live_url: None,
		};

		assert!(valid.validate().is_ok());

		let invalid = CreateProject {
			title: " ab ".into(),
			..valid
		};
		let errors = invalid.validate().unwrap_err();

		assert!(errors.field_errors().contains_key("title"));
	}

	#[test]
	fn test_update_input_skips_absent_fields() {
		let update = UpdateBlogPost {
			title: Some("A better title".into()),
			content: None,
		};

		assert!(update.validate().is_ok());
		assert_eq!(
			serde_json::to_value(&update).unwrap(),
			serde_json::json!({ "title": "A better title" })
		);
	}

	#[test]
	fn test_inputs_ignore_system_fields() {
		let input: CreateBlogPost = serde_json::from_value(serde_json::json!({
			"title": "Hello",
			"content": "world",
			"user_id": Uuid::new_v4(),
			"id": Uuid::new_v4(),
		}))
		.unwrap();

		assert_eq!(input.title, "Hello");
	}
}
