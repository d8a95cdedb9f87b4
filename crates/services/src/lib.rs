pub mod auth;
pub mod dao;
pub mod notify;
pub mod rbac;

pub use auth::AuthService;
pub use dao::*;
pub use notify::{LogNotifier, Notifier};
