//! Common types used throughout Agora.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

// SiteId //
//********//
/// Identifies one site of a multisite deployment. Every cache and every
/// persisted override is keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u32);

impl std::fmt::Display for SiteId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Default for SiteId {
	fn default() -> Self {
		SiteId(1)
	}
}

// GroupId //
//*********//
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl std::fmt::Display for GroupId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

// CategoryId //
//************//
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl std::fmt::Display for CategoryId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

// Timestamp //
//***********//
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Timestamp {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_secs().try_into().unwrap_or(i64::MAX))
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

// Viewer //
//********//
/// The party a permission check is made for.
///
/// Built by the authentication layer and placed into the request extensions;
/// `user_id == None` means an anonymous visitor.
#[derive(Clone, Debug, Default)]
pub struct Viewer {
	pub user_id: Option<i64>,
	pub is_admin: bool,
	pub is_staged: bool,
	pub group_ids: Box<[GroupId]>,
}

impl Viewer {
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn is_anonymous(&self) -> bool {
		self.user_id.is_none()
	}

	pub fn in_group(&self, group_id: GroupId) -> bool {
		self.group_ids.contains(&group_id)
	}
}

// ApiResponse //
//*************//
/// Envelope of JSON API responses
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
	pub data: T,
	pub time: Timestamp,
}

impl<T> ApiResponse<T> {
	pub fn new(data: T) -> Self {
		Self { data, time: Timestamp::now() }
	}
}

// Patch //
//*******//
/// Field of a partial update: absent, explicitly null, or a new value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
	#[default]
	Undefined,
	Null,
	Value(T),
}

impl<T> Patch<T> {
	pub fn is_undefined(&self) -> bool {
		matches!(self, Patch::Undefined)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Patch::Null)
	}

	pub fn is_value(&self) -> bool {
		matches!(self, Patch::Value(_))
	}

	pub fn value(&self) -> Option<&T> {
		match self {
			Patch::Value(v) => Some(v),
			_ => None,
		}
	}

	/// `None` when undefined, `Some(None)` when null
	pub fn as_option(&self) -> Option<Option<&T>> {
		match self {
			Patch::Undefined => None,
			Patch::Null => Some(None),
			Patch::Value(v) => Some(Some(v)),
		}
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
		match self {
			Patch::Undefined => Patch::Undefined,
			Patch::Null => Patch::Null,
			Patch::Value(v) => Patch::Value(f(v)),
		}
	}
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(match Option::<T>::deserialize(deserializer)? {
			Some(v) => Patch::Value(v),
			None => Patch::Null,
		})
	}
}

impl<T: Serialize> Serialize for Patch<T> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self {
			Patch::Value(v) => v.serialize(serializer),
			_ => serializer.serialize_none(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Deserialize)]
	struct Update {
		#[serde(default)]
		name: Patch<String>,
		#[serde(default)]
		parent: Patch<i64>,
	}

	#[test]
	fn test_patch_fields() {
		let update: Update = serde_json::from_str(r#"{"parent": null}"#).unwrap();
		assert!(update.name.is_undefined());
		assert!(update.parent.is_null());

		let update: Update = serde_json::from_str(r#"{"name": "News", "parent": 3}"#).unwrap();
		assert_eq!(update.name.value().map(String::as_str), Some("News"));
		assert_eq!(update.parent.as_option(), Some(Some(&3)));
		assert_eq!(update.parent.map(|p| p * 2), Patch::Value(6));
	}
}

// vim: ts=4
