//! Custom groups
//!
//! Automatic groups have fixed ids below [`FIRST_CUSTOM_ID`] and are never
//! stored.

use sqlx::{Row, SqlitePool};

use agora_types::meta_adapter::Group;
use agora_types::prelude::*;

use crate::collect_res;

const FIRST_CUSTOM_ID: i64 = 100;

pub(crate) async fn list(db: &SqlitePool, site_id: SiteId) -> ClResult<Vec<Group>> {
	let rows = sqlx::query("SELECT group_id, name FROM user_groups WHERE site_id = ? ORDER BY group_id")
		.bind(site_id.0)
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	collect_res(rows.iter().map(|row| {
		Ok(Group {
			id: GroupId(row.try_get("group_id")?),
			name: row.try_get::<String, _>("name")?.into(),
		})
	}))
}

pub(crate) async fn create(db: &SqlitePool, site_id: SiteId, name: &str) -> ClResult<GroupId> {
	let mut tx = db
		.begin()
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	let exists = sqlx::query("SELECT 1 FROM user_groups WHERE site_id = ? AND name = ?")
		.bind(site_id.0)
		.bind(name)
		.fetch_optional(&mut *tx)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;
	if exists.is_some() {
		return Err(Error::InvalidParameters(format!("group '{}' already exists", name)));
	}

	let id: i64 = sqlx::query_scalar(
		"INSERT INTO user_groups (site_id, group_id, name)
		SELECT ?1, coalesce(max(group_id) + 1, ?2), ?3 FROM user_groups WHERE site_id = ?1
		RETURNING group_id",
	)
	.bind(site_id.0)
	.bind(FIRST_CUSTOM_ID)
	.bind(name)
	.fetch_one(&mut *tx)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	tx.commit()
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	Ok(GroupId(id))
}

// vim: ts=4
