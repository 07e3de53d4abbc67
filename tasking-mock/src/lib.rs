//! Mock Tasking Manager backend.
//!
//! Serves one gridded project over the same REST paths as the real API so
//! the client can be developed and tested without a backend. Tokens are
//! usernames: `Authorization: Token alice` acts as `alice`.

pub mod config;
pub mod server;
pub mod store;
