//! Data models for upstream inbox entities.
//!
//! - `InboxThread`, `Message`, `UserRef`: items as the upstream returns them
//! - `InboxPage`, `ThreadPage`: one page of a paginated listing
//! - `Page`: the shape shared by every paginated response

pub mod message;
pub mod page;

pub use message::{InboxThread, Message, UserRef};
pub use page::{InboxPage, Page, ThreadPage};
