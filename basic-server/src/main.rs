use std::{env, path, sync::Arc};

use agora::AppBuilder;
use agora_meta_adapter_sqlite::MetaAdapterSqlite;

pub struct Config {
	pub listen: String,
	pub db_dir: Option<path::PathBuf>,
	pub conf_path: path::PathBuf,
}

impl Config {
	fn from_env() -> Self {
		Config {
			listen: env::var("AGORA_LISTEN").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
			db_dir: env::var("AGORA_DB_DIR").ok().filter(|d| !d.is_empty()).map(path::PathBuf::from),
			conf_path: path::PathBuf::from(env::var("AGORA_CONF").unwrap_or_else(|_| "./agora.conf".to_string())),
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), agora::error::Error> {
	agora::app::init_tracing();
	let config = Config::from_env();

	let mut builder = AppBuilder::new();
	builder.listen(config.listen).conf_path(config.conf_path);

	if let Some(db_dir) = &config.db_dir {
		let meta_adapter = MetaAdapterSqlite::new(db_dir).await?;
		builder.meta_adapter(Arc::new(meta_adapter));
	} else {
		tracing::warn!("AGORA_DB_DIR is not set, running without persistence");
	}

	builder.run().await
}

// vim: ts=4
