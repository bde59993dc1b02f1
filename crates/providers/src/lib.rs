//! LLM Provider implementations for RelicBot.
//!
//! All providers implement the `relicbot_core::Provider` trait.
//! [`build_from_config`] selects one based on configuration.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
