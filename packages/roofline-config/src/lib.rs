mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, DeliveryConfig, Notifications, Postgres, Search, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
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
	if cfg.search.default_page_size == 0 || cfg.search.default_page_size > 100 {
		return Err(Error::Validation {
			message: "search.default_page_size must be in the range 1-100.".to_string(),
		});
	}
	if cfg.notifications.lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "notifications.lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.notifications.compute_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "notifications.compute_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.notifications.batch_limit == 0 {
		return Err(Error::Validation {
			message: "notifications.batch_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.delivery.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "delivery.api_base must be non-empty.".to_string(),
		});
	}
	if cfg.delivery.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "delivery.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.delivery.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "delivery.timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}
