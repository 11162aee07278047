//! Category model with staged permissions

use serde::Serialize;

use agora_types::meta_adapter::CategoryData;

use crate::permission::{GroupRef, GroupResolver, PermissionRef, PermissionType, resolve_permissions};
use crate::prelude::*;

pub const MAX_NAME_LENGTH: usize = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
	/// `None` until the first save
	pub id: Option<CategoryId>,
	pub name: String,
	pub slug: String,
	pub parent_category_id: Option<CategoryId>,
	pub read_restricted: bool,
	pub position: i32,
	pub email_in: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub created_at: Option<Timestamp>,

	/// Permission tuples written on the next save
	#[serde(skip)]
	staged_permissions: Option<Vec<(GroupId, PermissionType)>>,
}

impl Category {
	pub fn new(name: impl Into<String>) -> Self {
		let name = name.into();
		Self {
			id: None,
			slug: slugify(&name),
			name,
			parent_category_id: None,
			read_restricted: false,
			position: 0,
			email_in: None,
			created_at: None,
			staged_permissions: None,
		}
	}

	pub fn from_data(data: &CategoryData) -> Self {
		Self {
			id: Some(data.id),
			name: data.name.to_string(),
			slug: data.slug.to_string(),
			parent_category_id: data.parent_category_id,
			read_restricted: data.read_restricted,
			position: data.position,
			email_in: data.email_in.as_deref().map(str::to_string),
			created_at: Some(data.created_at),
			staged_permissions: None,
		}
	}

	pub fn is_new(&self) -> bool {
		self.id.is_none()
	}

	/// Resolve and stage a permission mapping, updating `read_restricted`
	pub fn set_permissions(
		&mut self,
		entries: &[(GroupRef, PermissionRef)],
		groups: &GroupResolver,
	) -> ClResult<()> {
		let (read_restricted, tuples) = resolve_permissions(entries, groups)?;
		self.read_restricted = read_restricted;
		self.staged_permissions = Some(tuples);
		Ok(())
	}

	/// Stage `full` permission for every named group
	pub fn set_group_names<S: AsRef<str>>(&mut self, names: &[S], groups: &GroupResolver) -> ClResult<()> {
		let entries: Vec<_> = names
			.iter()
			.map(|name| (GroupRef::Name(name.as_ref().to_string()), PermissionType::Full.into()))
			.collect();
		self.set_permissions(&entries, groups)
	}

	pub fn staged_permissions(&self) -> Option<&[(GroupId, PermissionType)]> {
		self.staged_permissions.as_deref()
	}

	pub(crate) fn clear_staged_permissions(&mut self) {
		self.staged_permissions = None;
	}
}

/// URL slug of a category name
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	for c in name.trim().chars().flat_map(char::to_lowercase) {
		if c.is_alphanumeric() {
			slug.push(c);
		} else if !slug.is_empty() && !slug.ends_with('-') {
			slug.push('-');
		}
	}
	while slug.ends_with('-') {
		slug.pop();
	}
	slug
}

// ValidationErrors //
//******************//
/// Validation failures collected while saving a category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
	errors: Vec<(&'static str, &'static str)>,
}

impl ValidationErrors {
	pub fn add(&mut self, field: &'static str, code: &'static str) {
		self.errors.push((field, code));
	}

	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}

	pub fn into_result(self) -> ClResult<()> {
		if self.is_empty() { Ok(()) } else { Err(Error::ValidationError(self.to_string())) }
	}
}

impl std::fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (i, (field, code)) in self.errors.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{}: {}", field, code)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::permission::{AutoGroup, EVERYONE};

	#[test]
	fn test_slugify() {
		assert_eq!(slugify("Site Feedback"), "site-feedback");
		assert_eq!(slugify("  Q&A -- Help!  "), "q-a-help");
		assert_eq!(slugify("Über Café"), "über-café");
		assert_eq!(slugify("!!!"), "");
	}

	#[test]
	fn test_set_permissions_stages() {
		let groups = GroupResolver::new(&[]);
		let mut category = Category::new("Staff");
		assert!(category.staged_permissions().is_none());

		category.set_permissions(&[(GroupRef::parse("staff"), PermissionType::Full.into())], &groups).unwrap();
		assert!(category.read_restricted);
		assert_eq!(category.staged_permissions(), Some(&[(AutoGroup::Staff.id(), PermissionType::Full)][..]));

		category
			.set_permissions(&[(GroupRef::parse("everyone"), PermissionType::Readonly.into())], &groups)
			.unwrap();
		assert!(!category.read_restricted);
		assert_eq!(category.staged_permissions(), Some(&[(EVERYONE, PermissionType::Readonly)][..]));
	}

	#[test]
	fn test_failed_resolution_keeps_previous_state() {
		let groups = GroupResolver::new(&[]);
		let mut category = Category::new("General");
		assert!(category.set_group_names(&["ghosts"], &groups).is_err());
		assert!(!category.read_restricted);
		assert!(category.staged_permissions().is_none());
	}

	#[test]
	fn test_group_names() {
		let groups = GroupResolver::new(&[]);
		let mut category = Category::new("Mods");
		category.set_group_names(&["moderators", "admins"], &groups).unwrap();
		assert_eq!(
			category.staged_permissions(),
			Some(
				&[
					(AutoGroup::Moderators.id(), PermissionType::Full),
					(AutoGroup::Admins.id(), PermissionType::Full)
				][..]
			)
		);
	}

	#[test]
	fn test_validation_errors() {
		let mut errors = ValidationErrors::default();
		assert!(errors.clone().into_result().is_ok());
		errors.add("parent_category_id", "depth");
		errors.add("base", "permission_conflict");
		match errors.into_result() {
			Err(Error::ValidationError(msg)) => {
				assert_eq!(msg, "parent_category_id: depth, base: permission_conflict");
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}
}

// vim: ts=4
