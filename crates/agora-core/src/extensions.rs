//! Type-erased extension map for AppState
//!
//! Feature crates (categories, admin) park their services here, keyed by type,
//! and fetch them back through `app.ext::<T>()`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::prelude::*;

#[derive(Default)]
pub struct Extensions {
	map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace the value of type `T`
	pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
		self.map.insert(TypeId::of::<T>(), Box::new(val));
	}

	/// Register a service once; a second registration of the same type is an error
	pub fn register<T: Send + Sync + 'static>(&mut self, val: T) -> ClResult<()> {
		let type_id = TypeId::of::<T>();
		if self.map.contains_key(&type_id) {
			return Err(Error::Internal(format!(
				"Extension {} registered twice",
				std::any::type_name::<T>()
			)));
		}
		debug!("Registered extension {}", std::any::type_name::<T>());
		self.map.insert(type_id, Box::new(val));
		Ok(())
	}

	pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.map.get(&TypeId::of::<T>())?.downcast_ref::<T>()
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_insert_and_get() {
		let mut ext = Extensions::new();
		ext.insert(42u32);
		ext.insert(String::from("forum"));

		assert_eq!(ext.get::<u32>(), Some(&42));
		assert_eq!(ext.get::<String>().map(String::as_str), Some("forum"));
		assert!(ext.get::<i64>().is_none());
		assert_eq!(ext.len(), 2);
	}

	#[test]
	fn test_register_once() {
		let mut ext = Extensions::new();
		ext.register(SiteId(3)).unwrap();
		assert!(matches!(ext.register(SiteId(4)), Err(Error::Internal(_))));
		assert_eq!(ext.get::<SiteId>(), Some(&SiteId(3)));
	}
}

// vim: ts=4
