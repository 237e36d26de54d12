use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use roofline_domain::{cadence::Cadence, filter::FilterDocument};
use roofline_storage::models::{NewSavedSearch, SavedSearch, SavedSearchPatch};

use crate::{Error, Result, RooflineService, SearchResponse};

const MAX_NAME_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 1_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSavedSearchRequest {
	pub name: String,
	pub description: Option<String>,
	pub filter: FilterDocument,
	#[serde(default)]
	pub notifications_enabled: bool,
	pub cadence: Cadence,
}

/// Partial edit. An absent `description` leaves it unchanged; an explicit
/// null clears it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSavedSearchRequest {
	pub name: Option<String>,
	#[serde(deserialize_with = "double_option")]
	pub description: Option<Option<String>>,
	pub filter: Option<FilterDocument>,
	pub notifications_enabled: Option<bool>,
	pub cadence: Option<Cadence>,
}

// Plain Option<Option<T>> folds an explicit null into "absent"; a present
// field must deserialize to Some regardless of its value.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer).map(Some)
}

/// The user-facing projection of a saved search. Scheduler bookkeeping
/// (lease, baseline summary) stays internal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedSearchView {
	pub search_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub filter: FilterDocument,
	pub notifications_enabled: bool,
	pub cadence: Cadence,
	#[serde(with = "time::serde::rfc3339::option")]
	pub last_fired_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl From<SavedSearch> for SavedSearchView {
	fn from(search: SavedSearch) -> Self {
		Self {
			search_id: search.search_id,
			name: search.name,
			description: search.description,
			filter: search.filter,
			notifications_enabled: search.notifications_enabled,
			cadence: search.cadence,
			last_fired_at: search.last_fired_at,
			created_at: search.created_at,
			updated_at: search.updated_at,
		}
	}
}

impl RooflineService {
	pub async fn create_saved_search(
		&self,
		owner_id: Uuid,
		req: CreateSavedSearchRequest,
	) -> Result<SavedSearchView> {
		let name = validate_name(&req.name)?;
		let description = validate_description(req.description)?;

		req.filter.validate()?;

		let now = OffsetDateTime::now_utc();
		let search = self
			.stores
			.saved_searches
			.create(
				NewSavedSearch {
					owner_id,
					name,
					description,
					filter: req.filter,
					notifications_enabled: req.notifications_enabled,
					cadence: req.cadence,
				},
				now,
			)
			.await?;

		Ok(search.into())
	}

	pub async fn get_saved_search(
		&self,
		search_id: Uuid,
		owner_id: Uuid,
	) -> Result<SavedSearchView> {
		let search = self.stores.saved_searches.get(search_id, owner_id).await?;

		Ok(search.into())
	}

	pub async fn list_saved_searches(&self, owner_id: Uuid) -> Result<Vec<SavedSearchView>> {
		let searches = self.stores.saved_searches.list_by_owner(owner_id).await?;

		Ok(searches.into_iter().map(SavedSearchView::from).collect())
	}

	pub async fn update_saved_search(
		&self,
		search_id: Uuid,
		owner_id: Uuid,
		req: UpdateSavedSearchRequest,
	) -> Result<SavedSearchView> {
		let name = match req.name {
			Some(raw) => Some(validate_name(&raw)?),
			None => None,
		};
		let description = match req.description {
			Some(raw) => Some(validate_description(raw)?),
			None => None,
		};

		if let Some(filter) = req.filter.as_ref() {
			filter.validate()?;
		}

		let patch = SavedSearchPatch {
			name,
			description,
			filter: req.filter,
			notifications_enabled: req.notifications_enabled,
			cadence: req.cadence,
		};

		if patch.is_empty() {
			return Err(Error::InvalidRequest { message: "No updates provided.".to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let search =
			self.stores.saved_searches.update(search_id, owner_id, patch, now).await?;

		Ok(search.into())
	}

	pub async fn delete_saved_search(&self, search_id: Uuid, owner_id: Uuid) -> Result<()> {
		self.stores.saved_searches.delete(search_id, owner_id).await
	}

	/// Re-runs a saved search's filter on behalf of its owner. The stored
	/// document is validated again on every execution, so a document written
	/// by an older release still goes through the same gate as a fresh one.
	pub async fn execute_saved_search(
		&self,
		search_id: Uuid,
		owner_id: Uuid,
	) -> Result<SearchResponse> {
		let search = self.stores.saved_searches.get(search_id, owner_id).await?;
		let filter = search.filter.validate()?;

		self.execute_filter(&filter).await
	}
}

fn validate_name(raw: &str) -> Result<String> {
	let name = raw.trim();

	if name.is_empty() {
		return Err(Error::InvalidRequest { message: "Name must be non-empty.".to_string() });
	}
	if name.chars().count() > MAX_NAME_CHARS {
		return Err(Error::InvalidRequest {
			message: format!("Name exceeds maximum length ({MAX_NAME_CHARS})."),
		});
	}

	Ok(name.to_string())
}

fn validate_description(raw: Option<String>) -> Result<Option<String>> {
	let Some(description) = raw else {
		return Ok(None);
	};
	let trimmed = description.trim();

	if trimmed.is_empty() {
		return Ok(None);
	}
	if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
		return Err(Error::InvalidRequest {
			message: format!("Description exceeds maximum length ({MAX_DESCRIPTION_CHARS})."),
		});
	}

	Ok(Some(trimmed.to_string()))
}
