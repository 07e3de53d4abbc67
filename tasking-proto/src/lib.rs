//! Shared data model for the Tasking Manager JSON API.

pub mod activity;
pub mod codec;
pub mod grid;
pub mod lock;
pub mod project;
pub mod task;
