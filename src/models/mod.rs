//! Data models for marketplace entities

mod catalog;
mod message;
mod user;

pub use catalog::*;
pub use message::*;
pub use user::*;
