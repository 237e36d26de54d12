use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub notifications: Notifications,
	pub delivery: DeliveryConfig,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_page_size: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_page_size: 20 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Notifications {
	pub lease_seconds: i64,
	pub compute_timeout_ms: u64,
	pub batch_limit: u32,
}
impl Default for Notifications {
	fn default() -> Self {
		Self { lease_seconds: 30, compute_timeout_ms: 10_000, batch_limit: 500 }
	}
}

#[derive(Debug, Deserialize)]
pub struct DeliveryConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
