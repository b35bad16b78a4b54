/* src/holder/entry.rs */

use std::sync::Arc;

use super::Meta;

/// A published value together with its metadata.
#[derive(Debug)]
pub struct Entry<T> {
	/// The value wrapped in Arc so readers can hold it past the next swap.
	pub value: Arc<T>,
	pub meta: Meta,
}

impl<T> Clone for Entry<T> {
	fn clone(&self) -> Self {
		Self {
			value: Arc::clone(&self.value),
			meta: self.meta.clone(),
		}
	}
}
