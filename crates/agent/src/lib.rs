//! The RelicBot analysis run.
//!
//! One run evaluates one pull request:
//!
//! 1. **Fetch** the PR and skip it when the change is too small
//! 2. **Build context** (app name from the deploy config, the instruction
//!    document, the initial prompt)
//! 3. **Converse** with the model, executing requested tools and feeding
//!    the results back, until it ends its turn or the iteration ceiling hits
//! 4. **Publish** the last assistant text as a PR comment
//!
//! Any failure along the way becomes a single error comment.

pub mod context;
pub mod loop_runner;
pub mod prompt;
pub mod publisher;
pub mod run;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{AppNameSource, DEFAULT_APP_NAME, load_context, resolve_app_name};
pub use loop_runner::{Completion, ConversationDriver, DriveSummary};
pub use prompt::build_initial_prompt;
pub use publisher::{ANALYSIS_HEADER, final_text, publish};
pub use run::{Agent, RunOutcome, SMALL_PR_THRESHOLD, post_failure};
