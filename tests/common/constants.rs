//! Shared constants for integration tests

// ============================================================================
// Sessions
// ============================================================================

pub const ADMIN_EMAIL: &str = "admin@example.com";

pub const REGULAR_EMAIL: &str = "listener@example.com";

// ============================================================================
// Templates
// ============================================================================

/// Names of the templates installed by `TestEnv`. Each body starts with
/// `[<name>]` so the scripted provider can tell them apart.
pub const TEMPLATE_A: &str = "A";
pub const TEMPLATE_B: &str = "B";
pub const TEMPLATE_C: &str = "C";

// ============================================================================
// Tracks
// ============================================================================

pub const TRACK_TITLE: &str = "Symphony No. 40";
pub const TRACK_COMPOSER: &str = "Mozart";
