//! Collaborator implementations
//!
//! `local` provides a self-contained analytics engine and chart
//! renderer backed by deterministic synthetic data, useful for the
//! console platform and for tests. `openai` talks to an
//! OpenAI-compatible chat-completions endpoint for AI commentary.

pub mod local;
pub mod openai;

pub use local::{LocalAnalytics, LocalChartRenderer};
pub use openai::{CannedAnalyst, OpenAiAnalyst};
