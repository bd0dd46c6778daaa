//! sxl-engine: the facade crate. Re-exports the planning/execution runtime's
//! component crates and carries the one contract-only surface that has no
//! in-core implementation: pending-turn state across conversation turns.

pub use sxl_exec as exec;
pub use sxl_grammar as grammar;
pub use sxl_planner as planner;
pub use sxl_prompt as prompt;
pub use sxl_syntax as syntax;

use serde_json::Value;

/// Carries a conversation's pending, not-yet-resolved parameters across turns —
/// e.g. a slot an earlier plan left unfilled and a later user utterance fills in.
///
/// Specified only at its contract surface (§2, component 10): the conversation
/// manager, its persistence, and its wiring into an LLM chat loop are external
/// collaborators this crate does not implement.
pub trait PendingTurnState: Send + Sync {
    /// Records a value the next turn's plan resolution should see.
    fn set_pending(&self, key: &str, value: Value);

    /// Reads back a previously recorded value, if any.
    fn pending(&self, key: &str) -> Option<Value>;

    /// Clears a resolved (or abandoned) pending value.
    fn clear_pending(&self, key: &str);
}
