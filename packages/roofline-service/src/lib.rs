pub mod notify;
pub mod saved;
pub mod search;

mod error;

pub use error::{Error, Result};
pub use notify::TickReport;
pub use saved::{CreateSavedSearchRequest, SavedSearchView, UpdateSavedSearchRequest};
pub use search::{SearchItem, SearchRequest, SearchResponse, SearchSection};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use roofline_config::{Config, DeliveryConfig};
use roofline_domain::record::{MarketRecord, RecordPredicate};
use roofline_providers::delivery;
use roofline_storage::{
	db::Db,
	models::{NewSavedSearch, SavedSearch, SavedSearchPatch},
	records::PgRecordStore,
	saved_searches::PgSavedSearchStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only access to market records. Search execution is a pure read:
/// concurrent calls never block each other and never mutate shared state.
pub trait RecordStore
where
	Self: Send + Sync,
{
	fn find_by_predicate<'a>(
		&'a self,
		predicate: &'a RecordPredicate,
	) -> BoxFuture<'a, Result<Vec<MarketRecord>>>;
}

/// Saved-search persistence. Every read and write that acts on behalf of a
/// user takes the owner id and answers `NotFound` on mismatch.
pub trait SavedSearchStore
where
	Self: Send + Sync,
{
	fn create<'a>(
		&'a self,
		new: NewSavedSearch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>>;

	fn get<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<SavedSearch>>;

	fn list_by_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<Vec<SavedSearch>>>;

	fn update<'a>(
		&'a self,
		search_id: Uuid,
		owner_id: Uuid,
		patch: SavedSearchPatch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>>;

	fn delete<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<()>>;

	fn claim_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease_seconds: i64,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<SavedSearch>>>;

	fn mark_fired<'a>(
		&'a self,
		search_id: Uuid,
		observed_last_fired_at: Option<OffsetDateTime>,
		fired_at: OffsetDateTime,
		summary: Option<&'a Value>,
	) -> BoxFuture<'a, Result<bool>>;
}

/// One rendered notification, handed to the delivery collaborator.
#[derive(Clone, Debug)]
pub struct Notification {
	pub recipient_id: Uuid,
	pub subject: String,
	pub body: String,
	pub metadata: Value,
}

pub trait NotificationDelivery
where
	Self: Send + Sync,
{
	fn deliver<'a>(
		&'a self,
		cfg: &'a DeliveryConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct Stores {
	pub records: Arc<dyn RecordStore>,
	pub saved_searches: Arc<dyn SavedSearchStore>,
}

pub struct RooflineService {
	pub cfg: Config,
	pub stores: Stores,
	pub delivery: Arc<dyn NotificationDelivery>,
}
impl RooflineService {
	pub fn new(cfg: Config, db: &Db) -> Self {
		let stores = Stores {
			records: Arc::new(PgRecordStore::new(db)),
			saved_searches: Arc::new(PgSavedSearchStore::new(db)),
		};

		Self { cfg, stores, delivery: Arc::new(HttpDelivery) }
	}

	pub fn with_collaborators(
		cfg: Config,
		stores: Stores,
		delivery: Arc<dyn NotificationDelivery>,
	) -> Self {
		Self { cfg, stores, delivery }
	}
}

struct HttpDelivery;

impl RecordStore for PgRecordStore {
	fn find_by_predicate<'a>(
		&'a self,
		predicate: &'a RecordPredicate,
	) -> BoxFuture<'a, Result<Vec<MarketRecord>>> {
		Box::pin(async move { Ok(self.find_by_predicate(predicate).await?) })
	}
}

impl SavedSearchStore for PgSavedSearchStore {
	fn create<'a>(
		&'a self,
		new: NewSavedSearch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move { Ok(self.create(new, now).await?) })
	}

	fn get<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move { Ok(self.get(search_id, owner_id).await?) })
	}

	fn list_by_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<Vec<SavedSearch>>> {
		Box::pin(async move { Ok(self.list_by_owner(owner_id).await?) })
	}

	fn update<'a>(
		&'a self,
		search_id: Uuid,
		owner_id: Uuid,
		patch: SavedSearchPatch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move { Ok(self.update(search_id, owner_id, patch, now).await?) })
	}

	fn delete<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.delete(search_id, owner_id).await?) })
	}

	fn claim_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease_seconds: i64,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<SavedSearch>>> {
		Box::pin(async move { Ok(self.claim_due(now, lease_seconds, limit).await?) })
	}

	fn mark_fired<'a>(
		&'a self,
		search_id: Uuid,
		observed_last_fired_at: Option<OffsetDateTime>,
		fired_at: OffsetDateTime,
		summary: Option<&'a Value>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(self.mark_fired(search_id, observed_last_fired_at, fired_at, summary).await?)
		})
	}
}

impl NotificationDelivery for HttpDelivery {
	fn deliver<'a>(
		&'a self,
		cfg: &'a DeliveryConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			delivery::deliver(
				cfg,
				notification.recipient_id,
				&notification.subject,
				&notification.body,
				&notification.metadata,
			)
			.await?;

			Ok(())
		})
	}
}
