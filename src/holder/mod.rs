/* src/holder/mod.rs */

//!
//! Atomically published state for lock-free readers.

mod cell;
mod entry;
mod event;
mod meta;

pub use cell::{DEFAULT_EVENT_CAPACITY, LiveCell};
pub use entry::Entry;
pub use event::HoldEvent;
pub use meta::Meta;
