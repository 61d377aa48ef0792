//! Common test infrastructure
//!
//! Integration tests import from this module only: a scripted LLM provider,
//! a store wrapper that fails selected writes, and `TestEnv`, which wires a
//! temp-dir SQLite store, registry, pipeline, workflow and catalog together.

mod constants;
mod fixtures;
mod llm;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{
    admin_session, regular_session, test_templates, FlakyStore, RecordingProgress, TestEnv,
};
#[allow(unused_imports)]
pub use llm::{Behavior, ScriptedLlm};
