//! Courseta Answer - bounded-latency answer synthesis
//!
//! Turns the persisted snapshot plus a student question into a grounded
//! answer: assemble a truncated context block, call the completion
//! service under a hard wall-clock budget, and defensively parse whatever
//! the model sends back.

pub mod context;
pub mod llm_client;
pub mod pipeline;

pub use context::{assemble_context, MAX_CONTEXT_CHARS};
pub use llm_client::{ChatMessage, CompletionApi, CompletionClient};
pub use pipeline::{AnswerPipeline, ModelReply, ANSWER_BUDGET};
