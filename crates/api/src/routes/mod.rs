pub mod auth;
pub mod invitation;
pub mod member;
pub mod project;
pub mod tenant;
