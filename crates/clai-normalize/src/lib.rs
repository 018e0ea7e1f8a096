// Command normalization pipeline:
// sanitize -> alias expansion -> tokenize -> slot replacement -> template id
//
// The whole crate is deterministic and side-effect free for a fixed
// configuration; ingest and suggest both depend on identical raw commands
// resolving to identical template ids across restarts.

mod alias;
mod normalize;
mod sanitize;
mod slots;
mod token;

pub use alias::AliasMap;
pub use normalize::{template_id_for, Normalized, NormalizeOptions, Normalizer};
pub use sanitize::sanitize_raw;
pub use slots::{classify_token, rule_registry, SlotRule};
pub use token::tokenize;
