pub mod comment;
pub mod engagement;
pub mod media;
pub mod moderation;
pub mod tier;
pub mod user;
pub mod video;
