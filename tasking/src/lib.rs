//! `tasking`: task selection client for the Tasking Manager.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod controller;
pub mod list;
pub mod mapsync;
pub mod poll;
pub mod selection;
pub mod session;
pub mod suggest;
pub mod sync;
pub mod ui;
