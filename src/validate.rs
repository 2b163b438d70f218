//! Shape checks run on user-submitted fields before a write is attempted.
//!
//! The plain functions are total and do no I/O. The `*_field` variants wrap
//! the same rules for use with `#[validate(custom(function = ...))]`, so the
//! generated input types reject bad submissions at the HTTP boundary. The
//! content-access layer never re-checks them.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

pub const MIN_PASSWORD: usize = 6;
pub const MIN_NAME: usize = 2;
pub const MIN_TITLE: usize = 3;
pub const MIN_DESCRIPTION: usize = 10;
pub const MIN_TECH_STACK: usize = 2;
pub const MIN_BLOG_CONTENT: usize = 50;

static EMAIL: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static USERNAME: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{2,31}$").expect("username pattern is valid"));

/// Length in characters, not bytes, after trimming surrounding whitespace.
fn trimmed_len(value: &str) -> usize {
	value.trim().chars().count()
}

pub fn validate_email(email: &str) -> bool {
	EMAIL.is_match(email)
}

/// The password is taken as typed, surrounding whitespace included.
pub fn validate_password(password: &str) -> bool {
	password.chars().count() >= MIN_PASSWORD
}

pub fn validate_name(name: &str) -> bool {
	trimmed_len(name) >= MIN_NAME
}

pub fn validate_project(title: &str, description: &str, tech_stack: &str) -> bool {
	trimmed_len(title) >= MIN_TITLE
		&& trimmed_len(description) >= MIN_DESCRIPTION
		&& trimmed_len(tech_stack) >= MIN_TECH_STACK
}

pub fn validate_blog(title: &str, content: &str) -> bool {
	trimmed_len(title) >= MIN_TITLE && trimmed_len(content) >= MIN_BLOG_CONTENT
}

/// Lowercase letters, digits, `-` and `_`, 3 to 32 long, not starting with a symbol.
pub fn validate_username(username: &str) -> bool {
	USERNAME.is_match(username)
}

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
	let mut error = ValidationError::new(code);

	error.message = Some(message.into());
	error
}

fn min_length(value: &str, min: usize, code: &'static str) -> Result<(), ValidationError> {
	if trimmed_len(value) >= min {
		return Ok(());
	}

	let mut error = error(code, format!("must be at least {min} characters"));

	error.add_param(Cow::Borrowed("min"), &min);
	Err(error)
}

pub fn email_field(email: &str) -> Result<(), ValidationError> {
	if validate_email(email) {
		Ok(())
	} else {
		Err(error("email", "must be a valid email address"))
	}
}

pub fn password_field(password: &str) -> Result<(), ValidationError> {
	if validate_password(password) {
		Ok(())
	} else {
		Err(error(
			"password",
			format!("must be at least {MIN_PASSWORD} characters"),
		))
	}
}

pub fn name_field(name: &str) -> Result<(), ValidationError> {
	min_length(name, MIN_NAME, "name")
}

pub fn title_field(title: &str) -> Result<(), ValidationError> {
	min_length(title, MIN_TITLE, "title")
}

pub fn description_field(description: &str) -> Result<(), ValidationError> {
	min_length(description, MIN_DESCRIPTION, "description")
}

pub fn tech_stack_field(tech_stack: &str) -> Result<(), ValidationError> {
	min_length(tech_stack, MIN_TECH_STACK, "tech_stack")
}

pub fn blog_content_field(content: &str) -> Result<(), ValidationError> {
	min_length(content, MIN_BLOG_CONTENT, "content")
}

pub fn username_field(username: &str) -> Result<(), ValidationError> {
	if validate_username(username) {
		Ok(())
	} else {
		Err(error(
			"username",
			"must be 3 to 32 lowercase letters, digits, dashes or underscores",
		))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_email() {
		assert!(validate_email("a@b.co"));
		assert!(validate_email("ada.lovelace+dev@example.org"));
		assert!(!validate_email("not-an-email"));
		assert!(!validate_email("a@b"));
		assert!(!validate_email("a b@c.de"));
		assert!(!validate_email("@b.co"));
	}

	#[test]
	fn test_password_boundary() {
		assert!(!validate_password("12345"));
		assert!(validate_password("123456"));
		assert!(validate_password("      "));
	}

	#[test]
	fn test_name_is_trimmed() {
		assert!(validate_name("Al"));
		assert!(!validate_name(" A "));
		assert!(!validate_name(""));
	}

	#[test]
	fn test_project_thresholds() {
		assert!(validate_project("abc", "0123456789", "go"));
		assert!(validate_project("  abc  ", " 0123456789 ", " go "));
		assert!(!validate_project("ab", "0123456789", "go"));
		assert!(!validate_project("abc", "012345678", "go"));
		assert!(!validate_project("abc", "0123456789", "g"));
		assert!(!validate_project("abc ", "0123456789", " g "));
	}

	#[test]
	fn test_blog_thresholds() {
		let content = "x".repeat(MIN_BLOG_CONTENT);

		assert!(validate_blog("abc", &content));
		assert!(!validate_blog("ab", &content));
		assert!(!validate_blog("abc", &content[1..]));
		assert!(!validate_blog("abc", &format!("   {}   ", &content[1..])));
	}

	#[test]
	fn test_lengths_count_chars() {
		// Three characters, nine bytes
		assert!(validate_project("日本語", "0123456789", "go"));
	}

	#[test]
	fn test_username() {
		assert!(validate_username("ada-lovelace"));
		assert!(validate_username("dev_42"));
		assert!(!validate_username("ad"));
		assert!(!validate_username("Ada"));
		assert!(!validate_username("-ada"));
		assert!(!validate_username("ada lovelace"));
	}

	#[test]
	fn test_field_messages() {
		let error = title_field("ab").unwrap_err();

		assert_eq!(error.code, "title");
		assert_eq!(
			error.message.as_deref(),
			Some("must be at least 3 characters")
		);
		assert!(title_field("abc").is_ok());
		assert!(email_field("a@b.co").is_ok());
		assert!(password_field("12345").is_err());
	}
}
