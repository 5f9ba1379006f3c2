//! Core data models for chat requests and reasoning outcomes.

mod chat;
mod reasoning;

pub use chat::{
    AssistantMessage, ChatChunk, ChatCompletion, ChatMessage, ChatRequest, ChunkChoice,
    CompletionChoice, Delta, Role,
};
pub use reasoning::{CallMode, ReasoningOutcome, NO_REASONING_MESSAGE, TIMEOUT_MESSAGE};
