//! SQLite implementation of the Agora metadata adapter.
//!
//! One database file holds every site; all tables are keyed by `site_id`.

mod category;
mod group;
mod schema;
mod setting;

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool, SqliteRow};
use std::path::Path;

use agora_types::meta_adapter::{
	CategoryData, CategoryGroupData, Group, MetaAdapter, SaveCategory, SettingRow,
};
use agora_types::prelude::*;

pub const DB_FILE: &str = "meta.db";

// Helper functions
//******************
fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

pub(crate) fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(row) => f(row).inspect_err(inspect).map_err(|_| Error::DbError),
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			inspect(&err);
			Err(Error::DbError)
		}
	}
}

pub(crate) fn collect_res<T>(iter: impl Iterator<Item = Result<T, sqlx::Error>>) -> ClResult<Vec<T>> {
	let mut items = Vec::new();
	for item in iter {
		items.push(item.inspect_err(inspect).map_err(|_| Error::DbError)?);
	}
	Ok(items)
}

#[derive(Debug)]
pub struct MetaAdapterSqlite {
	db: SqlitePool,
}

impl MetaAdapterSqlite {
	/// Opens (or creates) `meta.db` inside `dir`
	pub async fn new(dir: impl AsRef<Path>) -> ClResult<Self> {
		tokio::fs::create_dir_all(dir.as_ref()).await?;
		let path = dir.as_ref().join(DB_FILE);

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(&path)
			.create_if_missing(true)
			.foreign_keys(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DB connect failed: {:#?}", err))
			.map_err(|_| Error::DbError)?;

		schema::init_db(&db)
			.await
			.inspect_err(|err| error!("DB init failed: {:#?}", err))
			.map_err(|_| Error::DbError)?;

		info!("Meta database opened at {}", path.display());
		Ok(Self { db })
	}
}

#[async_trait]
impl MetaAdapter for MetaAdapterSqlite {
	// Settings
	//**********
	async fn list_settings(&self, site_id: SiteId) -> ClResult<Vec<SettingRow>> {
		setting::list(&self.db, site_id).await
	}

	async fn read_setting(&self, site_id: SiteId, name: &str) -> ClResult<Option<SettingRow>> {
		setting::read(&self.db, site_id, name).await
	}

	async fn save_setting(
		&self,
		site_id: SiteId,
		name: &str,
		data_type: i32,
		value: Option<&str>,
	) -> ClResult<()> {
		setting::save(&self.db, site_id, name, data_type, value).await
	}

	async fn delete_setting(&self, site_id: SiteId, name: &str) -> ClResult<bool> {
		setting::delete(&self.db, site_id, name).await
	}

	// Groups
	//********
	async fn list_groups(&self, site_id: SiteId) -> ClResult<Vec<Group>> {
		group::list(&self.db, site_id).await
	}

	async fn create_group(&self, site_id: SiteId, name: &str) -> ClResult<GroupId> {
		group::create(&self.db, site_id, name).await
	}

	// Categories
	//************
	async fn list_categories(&self, site_id: SiteId) -> ClResult<Vec<CategoryData>> {
		category::list(&self.db, site_id).await
	}

	async fn read_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<CategoryData> {
		category::read(&self.db, site_id, id).await
	}

	async fn list_category_groups(&self, site_id: SiteId) -> ClResult<Vec<CategoryGroupData>> {
		category::list_groups(&self.db, site_id).await
	}

	async fn save_category(
		&self,
		site_id: SiteId,
		data: &SaveCategory<'_>,
	) -> ClResult<CategoryId> {
		category::save(&self.db, site_id, data).await
	}

	async fn delete_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<()> {
		category::delete(&self.db, site_id, id).await
	}
}

// vim: ts=4
