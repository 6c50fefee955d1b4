pub mod access;
pub mod ai;
pub mod auth;
pub mod engagement;
pub mod error;
pub mod moderation;
pub mod search;
pub mod uploads;
pub mod users;
pub mod videos;

pub use error::{ServiceError, ServiceResult};
