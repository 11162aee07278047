//! Database schema initialization

use sqlx::SqlitePool;

/// Create all tables and indexes if they do not exist yet
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Settings
	//**********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS site_settings (
		site_id integer NOT NULL,
		name text NOT NULL,
		data_type integer NOT NULL,
		value text,
		updated_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(site_id, name)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Groups
	//********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS user_groups (
		site_id integer NOT NULL,
		group_id integer NOT NULL,
		name text NOT NULL COLLATE NOCASE,
		created_at datetime DEFAULT (unixepoch()),
		PRIMARY KEY(site_id, group_id)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_user_groups_name ON user_groups(site_id, name)")
		.execute(&mut *tx)
		.await?;

	// Categories
	//************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS categories (
		cat_id integer PRIMARY KEY AUTOINCREMENT,
		site_id integer NOT NULL,
		name text NOT NULL,
		slug text NOT NULL,
		parent_id integer,
		read_restricted boolean NOT NULL DEFAULT 0,
		position integer NOT NULL DEFAULT 0,
		email_in text,
		created_at integer NOT NULL DEFAULT (unixepoch())
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_categories_site ON categories(site_id, parent_id)")
		.execute(&mut *tx)
		.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS category_groups (
		site_id integer NOT NULL,
		cat_id integer NOT NULL REFERENCES categories(cat_id) ON DELETE CASCADE,
		group_id integer NOT NULL,
		permission_type integer NOT NULL,
		PRIMARY KEY(cat_id, group_id, permission_type)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_category_groups_site ON category_groups(site_id)")
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(())
}

// vim: ts=4
