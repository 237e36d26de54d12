//! In-memory stand-ins for the service's collaborator traits. The engine and
//! the scheduler run against these in tests, with the same claim/lease and
//! compare-and-set semantics as the Postgres repositories.

use std::{
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use roofline_config::DeliveryConfig;
use roofline_domain::{
	cadence,
	record::{MarketRecord, RecordKind, RecordPredicate},
};
use roofline_service::{
	BoxFuture, Error, Notification, NotificationDelivery, RecordStore, Result, SavedSearchStore,
};
use roofline_storage::models::{NewSavedSearch, SavedSearch, SavedSearchPatch};

const NOT_FOUND: &str = "Saved search not found.";

/// A record fixture with the kind's value column populated.
pub fn market_record(kind: RecordKind, id: u128, region: &str, value: f64) -> MarketRecord {
	let mut record = MarketRecord {
		record_id: Uuid::from_u128(id),
		region: region.to_string(),
		county: None,
		kind,
		period: OffsetDateTime::from_unix_timestamp(1_750_000_000 + id as i64)
			.expect("timestamp"),
		price: None,
		rent: None,
		price_change_pct: None,
		rent_change_pct: None,
		affordability: None,
	};

	match kind {
		RecordKind::Housing => record.price = Some(value),
		RecordKind::Rent => record.rent = Some(value),
		RecordKind::Trend => record.price_change_pct = Some(value),
	}

	record
}

#[derive(Default)]
pub struct InMemoryRecordStore {
	records: Vec<MarketRecord>,
	finds: AtomicUsize,
}
impl InMemoryRecordStore {
	pub fn new(records: Vec<MarketRecord>) -> Self {
		Self { records, finds: AtomicUsize::new(0) }
	}

	/// How many predicate fetches the engine issued.
	pub fn find_count(&self) -> usize {
		self.finds.load(Ordering::SeqCst)
	}
}
impl RecordStore for InMemoryRecordStore {
	fn find_by_predicate<'a>(
		&'a self,
		predicate: &'a RecordPredicate,
	) -> BoxFuture<'a, Result<Vec<MarketRecord>>> {
		self.finds.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			Ok(self.records.iter().filter(|record| predicate.admits(record)).cloned().collect())
		})
	}
}

#[derive(Default)]
pub struct InMemorySavedSearchStore {
	inner: Mutex<Vec<SavedSearch>>,
}
impl InMemorySavedSearchStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds a search directly, scheduler bookkeeping included.
	pub fn seed(&self, search: SavedSearch) {
		self.inner.lock().expect("lock").push(search);
	}

	pub fn snapshot(&self, search_id: Uuid) -> Option<SavedSearch> {
		self.inner
			.lock()
			.expect("lock")
			.iter()
			.find(|search| search.search_id == search_id)
			.cloned()
	}
}
impl SavedSearchStore for InMemorySavedSearchStore {
	fn create<'a>(
		&'a self,
		new: NewSavedSearch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move {
			let search = SavedSearch {
				search_id: Uuid::new_v4(),
				owner_id: new.owner_id,
				name: new.name,
				description: new.description,
				filter: new.filter,
				notifications_enabled: new.notifications_enabled,
				cadence: new.cadence,
				last_fired_at: None,
				last_summary: None,
				lease_until: None,
				created_at: now,
				updated_at: now,
			};

			self.inner.lock().expect("lock").push(search.clone());

			Ok(search)
		})
	}

	fn get<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move {
			self.inner
				.lock()
				.expect("lock")
				.iter()
				.find(|search| search.search_id == search_id && search.owner_id == owner_id)
				.cloned()
				.ok_or_else(|| Error::NotFound { message: NOT_FOUND.to_string() })
		})
	}

	fn list_by_owner<'a>(&'a self, owner_id: Uuid) -> BoxFuture<'a, Result<Vec<SavedSearch>>> {
		Box::pin(async move {
			let mut searches: Vec<SavedSearch> = self
				.inner
				.lock()
				.expect("lock")
				.iter()
				.filter(|search| search.owner_id == owner_id)
				.cloned()
				.collect();

			searches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

			Ok(searches)
		})
	}

	fn update<'a>(
		&'a self,
		search_id: Uuid,
		owner_id: Uuid,
		patch: SavedSearchPatch,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<SavedSearch>> {
		Box::pin(async move {
			let mut inner = self.inner.lock().expect("lock");
			let search = inner
				.iter_mut()
				.find(|search| search.search_id == search_id && search.owner_id == owner_id)
				.ok_or_else(|| Error::NotFound { message: NOT_FOUND.to_string() })?;

			if let Some(name) = patch.name {
				search.name = name;
			}
			if let Some(description) = patch.description {
				search.description = description;
			}
			if let Some(filter) = patch.filter {
				search.filter = filter;
			}
			if let Some(enabled) = patch.notifications_enabled {
				search.notifications_enabled = enabled;
			}
			if let Some(cadence) = patch.cadence {
				search.cadence = cadence;
			}

			search.updated_at = now;

			Ok(search.clone())
		})
	}

	fn delete<'a>(&'a self, search_id: Uuid, owner_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut inner = self.inner.lock().expect("lock");
			let before = inner.len();

			inner.retain(|search| {
				!(search.search_id == search_id && search.owner_id == owner_id)
			});

			if inner.len() == before {
				return Err(Error::NotFound { message: NOT_FOUND.to_string() });
			}

			Ok(())
		})
	}

	fn claim_due<'a>(
		&'a self,
		now: OffsetDateTime,
		lease_seconds: i64,
		limit: i64,
	) -> BoxFuture<'a, Result<Vec<SavedSearch>>> {
		Box::pin(async move {
			let mut inner = self.inner.lock().expect("lock");
			let lease_until = now + Duration::seconds(lease_seconds);
			let mut claimed = Vec::new();

			for search in inner.iter_mut() {
				if claimed.len() as i64 >= limit {
					break;
				}
				if search.lease_until.is_some_and(|lease| lease > now) {
					continue;
				}
				if !cadence::is_due(
					search.notifications_enabled,
					search.cadence,
					search.last_fired_at,
					now,
				) {
					continue;
				}

				search.lease_until = Some(lease_until);

				claimed.push(search.clone());
			}

			Ok(claimed)
		})
	}

	fn mark_fired<'a>(
		&'a self,
		search_id: Uuid,
		observed_last_fired_at: Option<OffsetDateTime>,
		fired_at: OffsetDateTime,
		summary: Option<&'a Value>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let mut inner = self.inner.lock().expect("lock");
			let Some(search) =
				inner.iter_mut().find(|search| search.search_id == search_id)
			else {
				return Ok(false);
			};

			if search.last_fired_at != observed_last_fired_at {
				return Ok(false);
			}

			search.last_fired_at = Some(fired_at);
			search.last_summary = summary.cloned();
			search.lease_until = None;
			search.updated_at = fired_at;

			Ok(true)
		})
	}
}

/// Records hand-offs and can be told to fail or stall, for the retry and
/// timeout paths.
#[derive(Default)]
pub struct RecordingDelivery {
	delivered: Mutex<Vec<Notification>>,
	attempts: AtomicUsize,
	fail_next: AtomicUsize,
	delay: Mutex<Option<StdDuration>>,
}
impl RecordingDelivery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_times(&self, times: usize) {
		self.fail_next.store(times, Ordering::SeqCst);
	}

	pub fn stall_for(&self, delay: StdDuration) {
		*self.delay.lock().expect("lock") = Some(delay);
	}

	pub fn delivered(&self) -> Vec<Notification> {
		self.delivered.lock().expect("lock").clone()
	}

	pub fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}
}
impl NotificationDelivery for RecordingDelivery {
	fn deliver<'a>(
		&'a self,
		_cfg: &'a DeliveryConfig,
		notification: &'a Notification,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.attempts.fetch_add(1, Ordering::SeqCst);

			let delay = *self.delay.lock().expect("lock");

			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			if self
				.fail_next
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
					remaining.checked_sub(1)
				})
				.is_ok()
			{
				return Err(Error::Delivery {
					message: "Delivery gateway rejected the message: injected failure."
						.to_string(),
				});
			}

			self.delivered.lock().expect("lock").push(notification.clone());

			Ok(())
		})
	}
}
