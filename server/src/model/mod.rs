pub mod car;
pub mod comment;
pub mod enums;
pub mod post;
pub mod report;
pub mod tag;
pub mod user;
