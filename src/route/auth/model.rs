use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

pub use crate::{backend::Account, gateway::Identity};

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(custom(function = "crate::validate::email_field"))]
	pub email: String,
	/// Only checked against the stored password, never for shape.
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct RegisterInput {
	/// The address used to log in.
	#[validate(custom(function = "crate::validate::email_field"))]
	pub email: String,
	/// The name displayed on the account.
	#[validate(custom(function = "crate::validate::name_field"))]
	pub name: String,
	#[validate(custom(function = "crate::validate::password_field"))]
	pub password: String,
}
