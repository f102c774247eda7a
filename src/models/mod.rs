pub mod announcement;
pub mod appearance;
pub mod education;
pub mod portfolio;
pub mod review;
pub mod template;
pub mod user;
pub mod validation;
