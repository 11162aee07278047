//! Categories and their group permission rows

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use agora_types::meta_adapter::{CategoryData, CategoryGroupData, SaveCategory};
use agora_types::prelude::*;

use crate::{collect_res, map_res};

const CATEGORY_COLUMNS: &str =
	"cat_id, name, slug, parent_id, read_restricted, position, email_in, created_at";

fn category_row(row: &SqliteRow) -> Result<CategoryData, sqlx::Error> {
	Ok(CategoryData {
		id: CategoryId(row.try_get("cat_id")?),
		name: row.try_get::<String, _>("name")?.into(),
		slug: row.try_get::<String, _>("slug")?.into(),
		parent_category_id: row.try_get::<Option<i64>, _>("parent_id")?.map(CategoryId),
		read_restricted: row.try_get("read_restricted")?,
		position: row.try_get("position")?,
		email_in: row.try_get::<Option<String>, _>("email_in")?.map(Into::into),
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

fn db_err(err: sqlx::Error) -> Error {
	warn!("DB: {:#?}", err);
	Error::DbError
}

pub(crate) async fn list(db: &SqlitePool, site_id: SiteId) -> ClResult<Vec<CategoryData>> {
	let rows = sqlx::query(&format!(
		"SELECT {} FROM categories WHERE site_id = ? ORDER BY position, cat_id",
		CATEGORY_COLUMNS
	))
	.bind(site_id.0)
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	collect_res(rows.iter().map(category_row))
}

pub(crate) async fn read(db: &SqlitePool, site_id: SiteId, id: CategoryId) -> ClResult<CategoryData> {
	let res = sqlx::query(&format!(
		"SELECT {} FROM categories WHERE site_id = ? AND cat_id = ?",
		CATEGORY_COLUMNS
	))
	.bind(site_id.0)
	.bind(id.0)
	.fetch_one(db)
	.await;

	map_res(res, |row| category_row(&row))
}

pub(crate) async fn list_groups(db: &SqlitePool, site_id: SiteId) -> ClResult<Vec<CategoryGroupData>> {
	let rows = sqlx::query(
		"SELECT cat_id, group_id, permission_type FROM category_groups
		WHERE site_id = ? ORDER BY cat_id, group_id",
	)
	.bind(site_id.0)
	.fetch_all(db)
	.await
	.map_err(db_err)?;

	collect_res(rows.iter().map(|row| {
		Ok(CategoryGroupData {
			category_id: CategoryId(row.try_get("cat_id")?),
			group_id: GroupId(row.try_get("group_id")?),
			permission_type: row.try_get("permission_type")?,
		})
	}))
}

/// Writes the category row and, when given, replaces its permission rows in
/// one transaction
pub(crate) async fn save(db: &SqlitePool, site_id: SiteId, data: &SaveCategory<'_>) -> ClResult<CategoryId> {
	let mut tx = db.begin().await.map_err(db_err)?;

	let id = if let Some(id) = data.id {
		let res = sqlx::query(
			"UPDATE categories SET name = ?, slug = ?, parent_id = ?, read_restricted = ?,
				position = ?, email_in = ?
			WHERE site_id = ? AND cat_id = ?",
		)
		.bind(data.name)
		.bind(data.slug)
		.bind(data.parent_category_id.map(|p| p.0))
		.bind(data.read_restricted)
		.bind(data.position)
		.bind(data.email_in)
		.bind(site_id.0)
		.bind(id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
		if res.rows_affected() == 0 {
			return Err(Error::NotFound);
		}
		id
	} else {
		let id: i64 = sqlx::query_scalar(
			"INSERT INTO categories (site_id, name, slug, parent_id, read_restricted, position, email_in)
			VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING cat_id",
		)
		.bind(site_id.0)
		.bind(data.name)
		.bind(data.slug)
		.bind(data.parent_category_id.map(|p| p.0))
		.bind(data.read_restricted)
		.bind(data.position)
		.bind(data.email_in)
		.fetch_one(&mut *tx)
		.await
		.map_err(db_err)?;
		CategoryId(id)
	};

	if let Some(permissions) = data.permissions {
		sqlx::query("DELETE FROM category_groups WHERE site_id = ? AND cat_id = ?")
			.bind(site_id.0)
			.bind(id.0)
			.execute(&mut *tx)
			.await
			.map_err(db_err)?;
		for (group_id, permission_type) in permissions {
			sqlx::query(
				"INSERT OR IGNORE INTO category_groups (site_id, cat_id, group_id, permission_type)
				VALUES (?, ?, ?, ?)",
			)
			.bind(site_id.0)
			.bind(id.0)
			.bind(group_id.0)
			.bind(*permission_type)
			.execute(&mut *tx)
			.await
			.map_err(db_err)?;
		}
	}

	tx.commit().await.map_err(db_err)?;
	debug!(site_id = %site_id, "Category {} saved", id);
	Ok(id)
}

pub(crate) async fn delete(db: &SqlitePool, site_id: SiteId, id: CategoryId) -> ClResult<()> {
	let mut tx = db.begin().await.map_err(db_err)?;

	sqlx::query("DELETE FROM category_groups WHERE site_id = ? AND cat_id = ?")
		.bind(site_id.0)
		.bind(id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
	let res = sqlx::query("DELETE FROM categories WHERE site_id = ? AND cat_id = ?")
		.bind(site_id.0)
		.bind(id.0)
		.execute(&mut *tx)
		.await
		.map_err(db_err)?;
	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}

	tx.commit().await.map_err(db_err)?;
	Ok(())
}

// vim: ts=4
