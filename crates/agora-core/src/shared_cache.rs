//! Shared response cache
//!
//! Holds rendered documents (such as the client settings JSON) that are
//! expensive to build and cheap to invalidate.

use lru::LruCache;
use std::num::NonZeroUsize;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(99);

/// LRU cache of rendered documents keyed by string
pub struct SharedCache {
	cache: parking_lot::Mutex<LruCache<String, String>>,
}

impl SharedCache {
	pub fn new(capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
		Self { cache: parking_lot::Mutex::new(LruCache::new(capacity)) }
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.cache.lock().get(key).cloned()
	}

	pub fn put(&self, key: impl Into<String>, value: String) {
		self.cache.lock().put(key.into(), value);
	}

	/// Returns whether the key was present
	pub fn delete(&self, key: &str) -> bool {
		self.cache.lock().pop(key).is_some()
	}

	/// Invalidate everything
	pub fn clear(&self) {
		self.cache.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.cache.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.lock().is_empty()
	}
}

impl Default for SharedCache {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY.get())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_put_get_delete() {
		let cache = SharedCache::new(10);
		cache.put("a", "1".into());
		assert_eq!(cache.get("a").as_deref(), Some("1"));
		assert!(cache.delete("a"));
		assert!(!cache.delete("a"));
		assert!(cache.get("a").is_none());
	}

	#[test]
	fn test_evicts_least_recently_used() {
		let cache = SharedCache::new(2);
		cache.put("a", "1".into());
		cache.put("b", "2".into());
		let _ = cache.get("a");
		cache.put("c", "3".into());
		assert!(cache.get("b").is_none());
		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn test_zero_capacity_falls_back() {
		let cache = SharedCache::new(0);
		cache.put("a", "1".into());
		assert_eq!(cache.get("a").as_deref(), Some("1"));
	}
}

// vim: ts=4
