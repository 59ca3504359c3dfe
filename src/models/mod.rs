//! Data models for job board entities

mod alert;
mod application;
mod job;
mod message;
mod user;

pub use alert::*;
pub use application::*;
pub use job::*;
pub use message::*;
pub use user::*;
