//! Description generation: one template at a time, or a batch per track.

mod generator;
mod pipeline;
mod progress;

pub use generator::{
    build_messages, fallback_text, DescriptionGenerator, GenerationOutcome, GeneratorSettings,
    DEFAULT_GENERATION_TIMEOUT, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use pipeline::{BatchDescriptionPipeline, BatchOptions, BatchResult, DEFAULT_MAX_CONCURRENCY};
pub use progress::{LogProgress, ProgressObserver};
