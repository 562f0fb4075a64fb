//! Business logic services.
//!
//! Services sit between callers and the storage layer. They hold no mutable
//! state of their own.

pub mod suggestion;

pub use suggestion::SuggestionEngine;
