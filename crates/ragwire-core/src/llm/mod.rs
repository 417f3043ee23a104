//! LLM integration
//!
//! Only chat completion is needed here: the query enhancer sends a single
//! prompt and parses the reply.

mod client;

pub use client::{ChatMessage, LLMClient, OpenAICompatClient};
