//! Core process state shared across the server.

mod state;

pub use state::Shutdown;
