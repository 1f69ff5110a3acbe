pub mod media;
pub mod review;
pub mod schedule;
pub mod user;
pub mod user_media;
