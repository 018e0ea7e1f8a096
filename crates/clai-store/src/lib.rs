// Durable local store. Single connection, single writer; readers use
// read-only companion connections over the same WAL file.

mod error;
mod records;
mod schema;
mod store;

pub use error::{Error, Result};
pub use records::{
    AggregateTuning, ApplyOutcome, CommandStatRow, EventApply, NewCommandEvent, SlotStatRow,
    TransitionRow,
};
pub use schema::SCHEMA_VERSION;
pub use store::{Store, DEFAULT_BUSY_TIMEOUT_MS};
