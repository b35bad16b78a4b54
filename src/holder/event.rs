/* src/holder/event.rs */

use std::sync::Arc;

use super::Meta;

/// Emitted by a [`LiveCell`](super::LiveCell) after each publish.
#[derive(Debug)]
pub enum HoldEvent<T> {
	Replaced {
		old: Arc<T>,
		new: Arc<T>,
		meta: Meta,
	},
}

impl<T> Clone for HoldEvent<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Replaced { old, new, meta } => Self::Replaced {
				old: Arc::clone(old),
				new: Arc::clone(new),
				meta: meta.clone(),
			},
		}
	}
}
