use serde_json::Value;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{NewSavedSearch, SavedSearch, SavedSearchPatch, SavedSearchRow},
};

/// Owner mismatch and plain absence produce the same error on every lookup
/// so a caller cannot probe for other users' search ids.
const NOT_FOUND: &str = "Saved search not found.";

const SELECT_COLUMNS: &str = "\
SELECT search_id, owner_id, name, description, filter, notifications_enabled, cadence, \
last_fired_at, last_summary, lease_until, created_at, updated_at \
FROM saved_searches";

pub struct PgSavedSearchStore {
	pool: PgPool,
}
impl PgSavedSearchStore {
	pub fn new(db: &Db) -> Self {
		Self { pool: db.pool.clone() }
	}

	pub async fn create(&self, new: NewSavedSearch, now: OffsetDateTime) -> Result<SavedSearch> {
		let search_id = Uuid::new_v4();
		let filter = serde_json::to_value(&new.filter).map_err(|err| {
			Error::InvalidArgument(format!("Filter failed to encode: {err}."))
		})?;

		sqlx::query(
			"\
INSERT INTO saved_searches (
	search_id,
	owner_id,
	name,
	description,
	filter,
	notifications_enabled,
	cadence,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
		)
		.bind(search_id)
		.bind(new.owner_id)
		.bind(new.name.as_str())
		.bind(new.description.as_deref())
		.bind(&filter)
		.bind(new.notifications_enabled)
		.bind(new.cadence.as_str())
		.bind(now)
		.bind(now)
		.execute(&self.pool)
		.await?;

		Ok(SavedSearch {
			search_id,
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
		})
	}

	pub async fn get(&self, search_id: Uuid, owner_id: Uuid) -> Result<SavedSearch> {
		let row: Option<SavedSearchRow> =
			sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE search_id = $1 AND owner_id = $2"))
				.bind(search_id)
				.bind(owner_id)
				.fetch_optional(&self.pool)
				.await?;

		row.ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))?.try_into()
	}

	pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<SavedSearch>> {
		let rows: Vec<SavedSearchRow> =
			sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE owner_id = $1 ORDER BY created_at DESC"))
				.bind(owner_id)
				.fetch_all(&self.pool)
				.await?;

		rows.into_iter().map(SavedSearch::try_from).collect()
	}

	/// Applies a user patch. Scheduler-owned columns are deliberately not
	/// part of the UPDATE statement.
	pub async fn update(
		&self,
		search_id: Uuid,
		owner_id: Uuid,
		patch: SavedSearchPatch,
		now: OffsetDateTime,
	) -> Result<SavedSearch> {
		let mut tx = self.pool.begin().await?;
		let row: Option<SavedSearchRow> = sqlx::query_as(&format!(
			"{SELECT_COLUMNS} WHERE search_id = $1 AND owner_id = $2 FOR UPDATE"
		))
		.bind(search_id)
		.bind(owner_id)
		.fetch_optional(&mut *tx)
		.await?;
		let mut search: SavedSearch =
			row.ok_or_else(|| Error::NotFound(NOT_FOUND.to_string()))?.try_into()?;

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

		let filter = serde_json::to_value(&search.filter).map_err(|err| {
			Error::InvalidArgument(format!("Filter failed to encode: {err}."))
		})?;

		sqlx::query(
			"\
UPDATE saved_searches
SET
	name = $1,
	description = $2,
	filter = $3,
	notifications_enabled = $4,
	cadence = $5,
	updated_at = $6
WHERE search_id = $7",
		)
		.bind(search.name.as_str())
		.bind(search.description.as_deref())
		.bind(&filter)
		.bind(search.notifications_enabled)
		.bind(search.cadence.as_str())
		.bind(search.updated_at)
		.bind(search.search_id)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(search)
	}

	pub async fn delete(&self, search_id: Uuid, owner_id: Uuid) -> Result<()> {
		let result = sqlx::query("DELETE FROM saved_searches WHERE search_id = $1 AND owner_id = $2")
			.bind(search_id)
			.bind(owner_id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(Error::NotFound(NOT_FOUND.to_string()));
		}

		Ok(())
	}

	/// Claims the due, unleased searches as of `now` and pushes their lease
	/// forward so an overlapping tick skips them. `FOR UPDATE SKIP LOCKED`
	/// keeps two concurrent claims from handing out the same row.
	pub async fn claim_due(
		&self,
		now: OffsetDateTime,
		lease_seconds: i64,
		limit: i64,
	) -> Result<Vec<SavedSearch>> {
		let mut tx = self.pool.begin().await?;
		let rows: Vec<SavedSearchRow> = sqlx::query_as(&format!(
			"\
{SELECT_COLUMNS}
WHERE notifications_enabled
	AND (lease_until IS NULL OR lease_until <= $1)
	AND (
		last_fired_at IS NULL
		OR (cadence = 'daily' AND last_fired_at <= $1 - INTERVAL '24 hours')
		OR (cadence = 'weekly' AND last_fired_at <= $1 - INTERVAL '7 days')
		OR (cadence = 'monthly' AND last_fired_at <= $1 - INTERVAL '30 days')
	)
ORDER BY last_fired_at ASC NULLS FIRST, search_id ASC
LIMIT $2
FOR UPDATE SKIP LOCKED"
		))
		.bind(now)
		.bind(limit)
		.fetch_all(&mut *tx)
		.await?;

		if rows.is_empty() {
			tx.commit().await?;

			return Ok(Vec::new());
		}

		let lease_until = now + Duration::seconds(lease_seconds);
		let ids: Vec<Uuid> = rows.iter().map(|row| row.search_id).collect();

		sqlx::query("UPDATE saved_searches SET lease_until = $1 WHERE search_id = ANY($2)")
			.bind(lease_until)
			.bind(&ids)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		rows.into_iter()
			.map(|row| {
				let mut search = SavedSearch::try_from(row)?;

				search.lease_until = Some(lease_until);

				Ok(search)
			})
			.collect()
	}

	/// Compare-and-set on `last_fired_at`. Returns false when the observed
	/// value no longer matches, meaning another tick fired this search first.
	pub async fn mark_fired(
		&self,
		search_id: Uuid,
		observed_last_fired_at: Option<OffsetDateTime>,
		fired_at: OffsetDateTime,
		summary: Option<&Value>,
	) -> Result<bool> {
		let result = sqlx::query(
			"\
UPDATE saved_searches
SET
	last_fired_at = $1,
	last_summary = $2,
	lease_until = NULL,
	updated_at = $1
WHERE search_id = $3 AND last_fired_at IS NOT DISTINCT FROM $4",
		)
		.bind(fired_at)
		.bind(summary)
		.bind(search_id)
		.bind(observed_last_fired_at)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() == 1)
	}
}
