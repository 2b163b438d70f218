pub mod auth;
pub mod docs;
pub mod file;
pub mod model;
pub mod post;
pub mod profile;
pub mod project;
