//! Category permission resolution
//!
//! Turns a group → permission mapping into the stored form: a
//! `read_restricted` flag plus normalized `(group, permission)` tuples.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use agora_types::meta_adapter::Group;

use crate::prelude::*;

// PermissionType //
//****************//
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
	Full,
	CreatePost,
	Readonly,
}

impl PermissionType {
	pub const ALL: [PermissionType; 3] =
		[PermissionType::Full, PermissionType::CreatePost, PermissionType::Readonly];

	/// Persisted numeric code
	pub fn code(self) -> i32 {
		match self {
			PermissionType::Full => 1,
			PermissionType::CreatePost => 2,
			PermissionType::Readonly => 3,
		}
	}

	pub fn from_code(code: i32) -> Option<PermissionType> {
		Self::ALL.into_iter().find(|p| p.code() == code)
	}

	pub fn name(self) -> &'static str {
		match self {
			PermissionType::Full => "full",
			PermissionType::CreatePost => "create_post",
			PermissionType::Readonly => "readonly",
		}
	}

	pub fn from_name(name: &str) -> Option<PermissionType> {
		Self::ALL.into_iter().find(|p| p.name() == name)
	}
}

impl std::fmt::Display for PermissionType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

// AutoGroup //
//***********//
/// Groups maintained by the system with fixed ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoGroup {
	Everyone,
	Admins,
	Moderators,
	Staff,
	TrustLevel0,
	TrustLevel1,
	TrustLevel2,
	TrustLevel3,
	TrustLevel4,
}

pub const EVERYONE: GroupId = GroupId(0);

impl AutoGroup {
	pub const ALL: [AutoGroup; 9] = [
		AutoGroup::Everyone,
		AutoGroup::Admins,
		AutoGroup::Moderators,
		AutoGroup::Staff,
		AutoGroup::TrustLevel0,
		AutoGroup::TrustLevel1,
		AutoGroup::TrustLevel2,
		AutoGroup::TrustLevel3,
		AutoGroup::TrustLevel4,
	];

	pub fn id(self) -> GroupId {
		GroupId(match self {
			AutoGroup::Everyone => 0,
			AutoGroup::Admins => 1,
			AutoGroup::Moderators => 2,
			AutoGroup::Staff => 3,
			AutoGroup::TrustLevel0 => 10,
			AutoGroup::TrustLevel1 => 11,
			AutoGroup::TrustLevel2 => 12,
			AutoGroup::TrustLevel3 => 13,
			AutoGroup::TrustLevel4 => 14,
		})
	}

	pub fn key(self) -> &'static str {
		match self {
			AutoGroup::Everyone => "everyone",
			AutoGroup::Admins => "admins",
			AutoGroup::Moderators => "moderators",
			AutoGroup::Staff => "staff",
			AutoGroup::TrustLevel0 => "trust_level_0",
			AutoGroup::TrustLevel1 => "trust_level_1",
			AutoGroup::TrustLevel2 => "trust_level_2",
			AutoGroup::TrustLevel3 => "trust_level_3",
			AutoGroup::TrustLevel4 => "trust_level_4",
		}
	}

	pub fn from_key(key: &str) -> Option<AutoGroup> {
		Self::ALL.into_iter().find(|g| g.key().eq_ignore_ascii_case(key))
	}

	pub fn from_id(id: GroupId) -> Option<AutoGroup> {
		Self::ALL.into_iter().find(|g| g.id() == id)
	}
}

// References //
//************//
/// Group as written by a caller: numeric id or name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GroupRef {
	Id(i64),
	Name(String),
}

impl GroupRef {
	/// Map keys arrive as strings; numeric ones are ids
	pub fn parse(s: &str) -> GroupRef {
		match s.trim().parse::<i64>() {
			Ok(id) => GroupRef::Id(id),
			Err(_) => GroupRef::Name(s.to_string()),
		}
	}
}

impl From<AutoGroup> for GroupRef {
	fn from(group: AutoGroup) -> Self {
		GroupRef::Id(group.id().0)
	}
}

/// Permission as written by a caller: code or name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionRef {
	Code(i32),
	Name(String),
}

impl From<PermissionType> for PermissionRef {
	fn from(permission: PermissionType) -> Self {
		PermissionRef::Code(permission.code())
	}
}

impl PermissionRef {
	pub fn resolve(&self) -> ClResult<PermissionType> {
		match self {
			PermissionRef::Code(code) => PermissionType::from_code(*code),
			PermissionRef::Name(name) => PermissionType::from_name(name),
		}
		.ok_or_else(|| Error::InvalidParameters(format!("unknown permission type {:?}", self)))
	}
}

// GroupResolver //
//***************//
/// Resolves group references against the automatic and custom groups of a site
#[derive(Debug, Clone)]
pub struct GroupResolver {
	by_name: HashMap<String, GroupId>,
	names: HashMap<GroupId, String>,
}

impl GroupResolver {
	pub fn new(groups: &[Group]) -> Self {
		let mut resolver = Self { by_name: HashMap::new(), names: HashMap::new() };
		for auto in AutoGroup::ALL {
			resolver.add(auto.id(), auto.key());
		}
		for group in groups {
			resolver.add(group.id, &group.name);
		}
		resolver
	}

	fn add(&mut self, id: GroupId, name: &str) {
		self.by_name.insert(name.to_lowercase(), id);
		self.names.insert(id, name.to_string());
	}

	pub fn resolve(&self, group: &GroupRef) -> ClResult<GroupId> {
		match group {
			GroupRef::Id(id) if self.names.contains_key(&GroupId(*id)) => Ok(GroupId(*id)),
			GroupRef::Name(name) => self
				.by_name
				.get(&name.trim().to_lowercase())
				.copied()
				.ok_or_else(|| Error::InvalidParameters(format!("unknown group '{}'", name))),
			GroupRef::Id(id) => Err(Error::InvalidParameters(format!("unknown group id {}", id))),
		}
	}

	pub fn name(&self, id: GroupId) -> Option<&str> {
		self.names.get(&id).map(String::as_str)
	}
}

// Resolution //
//************//
/// Resolve a permission mapping into `(read_restricted, tuples)`.
///
/// `everyone` with `full` is the unrestricted default and needs no rows, so it
/// yields `(false, [])`. Any other `everyone` entry keeps the rows but lifts
/// the read restriction.
pub fn resolve_permissions(
	entries: &[(GroupRef, PermissionRef)],
	groups: &GroupResolver,
) -> ClResult<(bool, Vec<(GroupId, PermissionType)>)> {
	let mapped = entries
		.iter()
		.map(|(group, permission)| Ok((groups.resolve(group)?, permission.resolve()?)))
		.collect::<ClResult<Vec<_>>>()?;

	let mut read_restricted = true;
	for (group_id, permission) in &mapped {
		if *group_id == EVERYONE {
			if *permission == PermissionType::Full {
				return Ok((false, Vec::new()));
			}
			read_restricted = false;
		}
	}
	Ok((read_restricted, mapped))
}

/// Groups of `child` that the parent does not grant anything to.
///
/// Empty when compatible. A parent granting `everyone` is compatible with
/// any child.
pub fn check_permissions_compatibility(
	parent: &[(GroupId, PermissionType)],
	child: &[(GroupId, PermissionType)],
) -> Vec<GroupId> {
	let parent_groups: HashSet<GroupId> = parent.iter().map(|(group, _)| *group).collect();
	if parent_groups.contains(&EVERYONE) {
		return Vec::new();
	}
	let mut only_child: Vec<GroupId> =
		child.iter().map(|(group, _)| *group).filter(|group| !parent_groups.contains(group)).collect();
	only_child.sort();
	only_child.dedup();
	only_child
}

#[cfg(test)]
mod tests {
	use super::*;

	fn resolver() -> GroupResolver {
		GroupResolver::new(&[Group { id: GroupId(100), name: "Designers".into() }])
	}

	fn entry(group: &str, permission: PermissionType) -> (GroupRef, PermissionRef) {
		(GroupRef::parse(group), permission.into())
	}

	#[test]
	fn test_everyone_full_is_unrestricted() {
		let res = resolve_permissions(&[entry("everyone", PermissionType::Full)], &resolver());
		assert_eq!(res.unwrap(), (false, vec![]));
	}

	#[test]
	fn test_everyone_readonly() {
		let res = resolve_permissions(&[entry("everyone", PermissionType::Readonly)], &resolver());
		assert_eq!(res.unwrap(), (false, vec![(EVERYONE, PermissionType::Readonly)]));
	}

	#[test]
	fn test_staff_only_is_restricted() {
		let res = resolve_permissions(&[entry("staff", PermissionType::Full)], &resolver());
		assert_eq!(res.unwrap(), (true, vec![(AutoGroup::Staff.id(), PermissionType::Full)]));
	}

	#[test]
	fn test_everyone_full_short_circuits_other_entries() {
		let entries = [entry("designers", PermissionType::CreatePost), entry("everyone", PermissionType::Full)];
		assert_eq!(resolve_permissions(&entries, &resolver()).unwrap(), (false, vec![]));
	}

	#[test]
	fn test_references_by_id_name_and_code() {
		let entries = [
			(GroupRef::Id(100), PermissionRef::Name("create_post".into())),
			(GroupRef::Name("TRUST_LEVEL_2".into()), PermissionRef::Code(3)),
		];
		let (restricted, tuples) = resolve_permissions(&entries, &resolver()).unwrap();
		assert!(restricted);
		assert_eq!(
			tuples,
			vec![(GroupId(100), PermissionType::CreatePost), (GroupId(12), PermissionType::Readonly)]
		);
	}

	#[test]
	fn test_unknown_references() {
		let r = resolver();
		assert!(resolve_permissions(&[entry("nobody", PermissionType::Full)], &r).is_err());
		assert!(resolve_permissions(&[(GroupRef::Id(999), PermissionRef::Code(1))], &r).is_err());
		assert!(resolve_permissions(&[(GroupRef::Id(0), PermissionRef::Code(9))], &r).is_err());
		assert!(resolve_permissions(&[(GroupRef::Id(0), PermissionRef::Name("admin".into()))], &r).is_err());
	}

	#[test]
	fn test_empty_mapping_is_restricted() {
		assert_eq!(resolve_permissions(&[], &resolver()).unwrap(), (true, vec![]));
	}

	#[test]
	fn test_compatibility() {
		let staff = AutoGroup::Staff.id();
		let designers = GroupId(100);
		let parent = [(staff, PermissionType::Full)];

		assert!(check_permissions_compatibility(&parent, &[(staff, PermissionType::Readonly)]).is_empty());
		assert_eq!(
			check_permissions_compatibility(&parent, &[(designers, PermissionType::Full), (staff, PermissionType::Full)]),
			vec![designers]
		);
		let open_parent = [(EVERYONE, PermissionType::Readonly)];
		assert!(check_permissions_compatibility(&open_parent, &[(designers, PermissionType::Full)]).is_empty());
	}

	#[test]
	fn test_auto_group_lookup() {
		assert_eq!(AutoGroup::from_key("Moderators"), Some(AutoGroup::Moderators));
		assert_eq!(AutoGroup::from_id(GroupId(14)), Some(AutoGroup::TrustLevel4));
		assert_eq!(resolver().name(GroupId(3)), Some("staff"));
	}
}

// vim: ts=4
