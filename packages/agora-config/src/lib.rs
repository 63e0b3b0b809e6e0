mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Mongo, PartitionProviderConfig, Postgres, Providers, Service,
	Storage, Views,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation { message: "service.log_level must be non-empty.".to_string() });
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.postgres.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.mongo.url.trim().is_empty() {
		return Err(Error::Validation { message: "storage.mongo.url must be non-empty.".to_string() });
	}
	if cfg.storage.mongo.database.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.mongo.database must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.postgres.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.postgres.vector_dim."
				.to_string(),
		});
	}
	if cfg.views.participant_cluster_count == 0 {
		return Err(Error::Validation {
			message: "views.participant_cluster_count must be greater than zero.".to_string(),
		});
	}
	if cfg.views.similar_limit == 0 {
		return Err(Error::Validation {
			message: "views.similar_limit must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("partition", &cfg.providers.partition.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for collection in
		[&mut cfg.storage.mongo.threads_collection, &mut cfg.storage.mongo.documents_collection]
	{
		let trimmed = collection.trim();

		if trimmed.len() != collection.len() {
			*collection = trimmed.to_string();
		}
	}
}
