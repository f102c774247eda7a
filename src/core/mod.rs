pub mod auth;
pub mod error;
pub mod mailer;
pub mod notifier;
pub mod rate_limit;
