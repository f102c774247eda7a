pub mod announcements;
pub mod appearance;
pub mod auth;
pub mod notifications;
pub mod portfolios;
pub mod reference;
pub mod reviews;
pub mod submissions;
pub mod system;
pub mod templates;
pub mod uploads;
pub mod users;
