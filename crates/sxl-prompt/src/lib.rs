//! sxl-prompt: turns a registered action catalog and the DSL grammars those
//! actions reference into model-facing prompt text, in SXL or JSON mode (§4.6).

pub mod builder;

pub use builder::{build, PromptContributor, PromptMode};
