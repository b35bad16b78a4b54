/* src/controller/mod.rs */

//!
//! Reloadable components backed by files on disk.
//!
//! - [`LiveFile`] - one typed document kept live in a [`LiveCell`](crate::holder::LiveCell)

mod error;
mod live;

pub use error::LiveError;
pub use live::{LiveFile, LiveFileBuilder};
