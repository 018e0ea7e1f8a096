mod error;
mod event;
mod scope;
pub mod stats;
mod suggest;
mod wire;

pub use error::{ServiceError, ServiceResult};
pub use event::{
    CommandEvent, CommandTemplate, GitInfo, Session, SessionEnd, SlotKind, SlotValue,
    MAX_CMD_RAW_BYTES,
};
pub use scope::Scope;
pub use suggest::{
    FeedbackAction, QueryFilter, Risk, SuggestContext, SuggestResponse, Suggestion,
    SuggestionSource, DEFAULT_TOP_K, MAX_TOP_K,
};
pub use wire::{RpcRequest, ShimEvent, WireError, WireResponse};
