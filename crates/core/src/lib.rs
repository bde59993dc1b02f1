//! # RelicBot Core
//!
//! Domain types, collaborator traits, and error definitions for the RelicBot
//! pull-request observability agent. This crate has **no HTTP dependencies**:
//! it defines the model that the provider, GitHub, New Relic, and tool crates
//! implement against.
//!
//! ## Collaborators
//!
//! Every external system is a trait here:
//! - [`Provider`]: an LLM backend (Anthropic, OpenAI-compatible)
//! - [`SourceControl`]: the repository host (GitHub)
//! - [`MetricsBackend`]: the telemetry store (New Relic)
//! - [`ToolExecutor`]: the tool registry the conversation driver dispatches to
//!
//! Tests swap any of them for in-memory fakes.

pub mod error;
pub mod message;
pub mod metrics;
pub mod provider;
pub mod scm;
pub mod tool;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MetricsError, ProviderError, ScmError, ToolError};
pub use message::{Conversation, ConversationId, Message, Role};
pub use metrics::{Entity, MetricsBackend};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StopReason, ToolDefinition};
pub use scm::{CodeSearchHit, CodeSearchResult, FileContent, PrFile, PrInfo, SourceControl};
pub use tool::{ToolCall, ToolExecutor, ToolKind, ToolResult};
