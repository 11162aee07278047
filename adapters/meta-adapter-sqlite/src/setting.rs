//! Setting overrides
//!
//! Values are stored in their persisted string form together with the
//! numeric type code they were written with.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use agora_types::meta_adapter::SettingRow;
use agora_types::prelude::*;

use crate::{collect_res, map_res};

fn setting_row(row: &SqliteRow) -> Result<SettingRow, sqlx::Error> {
	Ok(SettingRow {
		name: row.try_get::<String, _>("name")?.into(),
		data_type: row.try_get("data_type")?,
		value: row.try_get::<Option<String>, _>("value")?.map(Into::into),
	})
}

pub(crate) async fn list(db: &SqlitePool, site_id: SiteId) -> ClResult<Vec<SettingRow>> {
	let rows = sqlx::query("SELECT name, data_type, value FROM site_settings WHERE site_id = ? ORDER BY name")
		.bind(site_id.0)
		.fetch_all(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	collect_res(rows.iter().map(setting_row))
}

pub(crate) async fn read(db: &SqlitePool, site_id: SiteId, name: &str) -> ClResult<Option<SettingRow>> {
	let res = sqlx::query("SELECT name, data_type, value FROM site_settings WHERE site_id = ? AND name = ?")
		.bind(site_id.0)
		.bind(name)
		.fetch_one(db)
		.await;

	match map_res(res, |row| setting_row(&row)) {
		Ok(row) => Ok(Some(row)),
		Err(Error::NotFound) => Ok(None),
		Err(err) => Err(err),
	}
}

pub(crate) async fn save(
	db: &SqlitePool,
	site_id: SiteId,
	name: &str,
	data_type: i32,
	value: Option<&str>,
) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO site_settings (site_id, name, data_type, value) VALUES (?, ?, ?, ?)
		ON CONFLICT(site_id, name) DO UPDATE SET
			data_type = excluded.data_type, value = excluded.value, updated_at = unixepoch()",
	)
	.bind(site_id.0)
	.bind(name)
	.bind(data_type)
	.bind(value)
	.execute(db)
	.await
	.inspect_err(|err| warn!("DB: {:#?}", err))
	.map_err(|_| Error::DbError)?;

	Ok(())
}

pub(crate) async fn delete(db: &SqlitePool, site_id: SiteId, name: &str) -> ClResult<bool> {
	let res = sqlx::query("DELETE FROM site_settings WHERE site_id = ? AND name = ?")
		.bind(site_id.0)
		.bind(name)
		.execute(db)
		.await
		.inspect_err(|err| warn!("DB: {:#?}", err))
		.map_err(|_| Error::DbError)?;

	Ok(res.rows_affected() > 0)
}

// vim: ts=4
