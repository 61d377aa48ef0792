//! Classical concert listings with AI-generated track descriptions.
//!
//! Administrators register concerts and their programs; every track gets one
//! description per selected prompt template, generated through an
//! OpenAI-compatible chat completions API and stored in SQLite.

pub mod catalog;
pub mod concert_store;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod llm;
pub mod sqlite_persistence;
pub mod templates;
pub mod user;

pub use error::{Error, Result};
