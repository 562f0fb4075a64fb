//! Shared `SQLite` utilities.

mod connection;

pub use connection::{acquire_lock, configure_connection, open_configured};
