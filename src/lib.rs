// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod types;
pub mod ws;

// Background tasks of a session
pub mod broadcast;
