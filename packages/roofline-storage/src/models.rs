use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use roofline_domain::{cadence::Cadence, filter::FilterDocument};

use crate::Error;

/// A persisted saved search. `last_fired_at`, `last_summary`, and
/// `lease_until` belong to the scheduler path and are never written by user
/// updates.
#[derive(Clone, Debug)]
pub struct SavedSearch {
	pub search_id: Uuid,
	pub owner_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub filter: FilterDocument,
	pub notifications_enabled: bool,
	pub cadence: Cadence,
	pub last_fired_at: Option<OffsetDateTime>,
	pub last_summary: Option<Value>,
	pub lease_until: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewSavedSearch {
	pub owner_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub filter: FilterDocument,
	pub notifications_enabled: bool,
	pub cadence: Cadence,
}

/// Partial user update. `description` distinguishes "leave unchanged"
/// (outer `None`) from "clear" (inner `None`).
#[derive(Clone, Debug, Default)]
pub struct SavedSearchPatch {
	pub name: Option<String>,
	pub description: Option<Option<String>>,
	pub filter: Option<FilterDocument>,
	pub notifications_enabled: Option<bool>,
	pub cadence: Option<Cadence>,
}
impl SavedSearchPatch {
	pub fn is_empty(&self) -> bool {
		self.name.is_none()
			&& self.description.is_none()
			&& self.filter.is_none()
			&& self.notifications_enabled.is_none()
			&& self.cadence.is_none()
	}
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SavedSearchRow {
	pub search_id: Uuid,
	pub owner_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub filter: Value,
	pub notifications_enabled: bool,
	pub cadence: String,
	pub last_fired_at: Option<OffsetDateTime>,
	pub last_summary: Option<Value>,
	pub lease_until: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<SavedSearchRow> for SavedSearch {
	type Error = Error;

	fn try_from(row: SavedSearchRow) -> Result<Self, Self::Error> {
		let cadence = Cadence::parse(&row.cadence).ok_or_else(|| {
			Error::InvalidArgument(format!("Unknown cadence '{}' in storage.", row.cadence))
		})?;
		let filter: FilterDocument = serde_json::from_value(row.filter).map_err(|err| {
			Error::InvalidArgument(format!("Stored filter failed to decode: {err}."))
		})?;

		Ok(Self {
			search_id: row.search_id,
			owner_id: row.owner_id,
			name: row.name,
			description: row.description,
			filter,
			notifications_enabled: row.notifications_enabled,
			cadence,
			last_fired_at: row.last_fired_at,
			last_summary: row.last_summary,
			lease_until: row.lease_until,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}
