//! herd server library.
//!
//! The crate ships the `herd-server` binary; the library surface exists so
//! integration tests can build the router against a real database.

pub mod age;
pub mod api;
pub mod config;
pub mod db;
pub mod password;
pub mod state;
