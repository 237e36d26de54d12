use std::sync::Arc;

use roofline_service::RooflineService;
use roofline_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<RooflineService>,
}
impl AppState {
	pub async fn new(config: roofline_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = RooflineService::new(config, &db);

		Ok(Self { service: Arc::new(service) })
	}

	pub fn with_service(service: RooflineService) -> Self {
		Self { service: Arc::new(service) }
	}
}
