//! SM-2 review scheduling for kanji, vocabulary, grammar and sentence
//! pattern flashcards, with pluggable progress storage.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduler;
#[cfg(test)]
mod scheduler_tests;
pub mod srs;
pub mod store;

pub use error::{Result, ReviewError, StoreError};
pub use models::{ContentType, LearnerKey, ProgressItem, ProgressStats, ReviewAction};
pub use scheduler::ReviewScheduler;
pub use store::{MemoryStore, ProgressStore, SyncStore};
