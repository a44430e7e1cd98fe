pub mod course;
pub mod event;
pub mod lesson;
pub mod resource;
pub mod user;
