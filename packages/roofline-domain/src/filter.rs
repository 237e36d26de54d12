use std::{
	collections::BTreeSet,
	fmt::{Display, Formatter},
};

use serde::{Deserialize, Serialize};

use crate::record::{Bounds, RecordKind, RecordPredicate};

pub const MIN_PAGE_SIZE: i64 = 1;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_REGIONS: usize = 64;
const MAX_REGION_CHARS: usize = 16;

/// A rejected filter document. `path` locates the offending field in the
/// request body, JSON-path style.
#[derive(Clone, Debug)]
pub struct FilterError {
	path: String,
	message: String,
}
impl FilterError {
	fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
		Self { path: path.into(), message: message.into() }
	}

	pub fn path(&self) -> &str {
		&self.path
	}
}
impl Display for FilterError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.path, self.message)
	}
}
impl std::error::Error for FilterError {}

/// The raw, user-authored predicate set. Every field is optional; fields are
/// combined conjunctively. Never executed directly: `validate` is the only
/// way to obtain something the engine accepts.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterDocument {
	pub regions: Vec<String>,
	pub price_range: Option<RangeDocument>,
	pub rent_range: Option<RangeDocument>,
	pub change_range: Option<RangeDocument>,
	pub affordability_threshold: Option<f64>,
	pub data_type: Option<RecordKind>,
	pub sort_key: Option<SortKey>,
	pub sort_direction: Option<SortDirection>,
	pub page_size: Option<i64>,
	pub page_offset: Option<i64>,
}
impl FilterDocument {
	pub fn validate(&self) -> Result<ValidatedFilter, FilterError> {
		let regions = validate_regions(&self.regions)?;
		let price_range = validate_range("$.filter.price_range", self.price_range.as_ref(), None)?;
		let rent_range = validate_range("$.filter.rent_range", self.rent_range.as_ref(), None)?;
		let change_range = validate_range(
			"$.filter.change_range",
			self.change_range.as_ref(),
			Some((-100.0, 100.0)),
		)?;
		let affordability_threshold = match self.affordability_threshold {
			None => None,
			Some(value) => {
				if !value.is_finite() || !(0.0..=100.0).contains(&value) {
					return Err(FilterError::new(
						"$.filter.affordability_threshold",
						"affordability threshold must be in the range 0-100.",
					));
				}

				Some(value)
			},
		};
		let page_size = self.page_size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE));

		if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
			return Err(FilterError::new(
				"$.filter.page_size",
				format!("page size must be in the range {MIN_PAGE_SIZE}-{MAX_PAGE_SIZE}."),
			));
		}

		let page_offset = self.page_offset.unwrap_or(0);

		if page_offset < 0 {
			return Err(FilterError::new(
				"$.filter.page_offset",
				"page offset must be zero or greater.",
			));
		}

		Ok(ValidatedFilter {
			regions,
			price_range,
			rent_range,
			change_range,
			affordability_threshold,
			data_type: self.data_type,
			sort_key: self.sort_key.unwrap_or_default(),
			sort_direction: self.sort_direction.unwrap_or_default(),
			page_size: page_size as u32,
			page_offset: page_offset as u64,
		})
	}
}

/// One inclusive numeric bound pair as authored by the user.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RangeDocument {
	pub min: Option<f64>,
	pub max: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	Price,
	Rent,
	PriceChange,
	RentChange,
	#[default]
	Date,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	Asc,
	#[default]
	Desc,
}

/// A filter document that passed validation. Fields are private so the only
/// way to construct one is `FilterDocument::validate`; downstream code never
/// sees an unchecked document.
#[derive(Clone, Debug)]
pub struct ValidatedFilter {
	regions: Vec<String>,
	price_range: Bounds,
	rent_range: Bounds,
	change_range: Bounds,
	affordability_threshold: Option<f64>,
	data_type: Option<RecordKind>,
	sort_key: SortKey,
	sort_direction: SortDirection,
	page_size: u32,
	page_offset: u64,
}
impl ValidatedFilter {
	/// The record kinds this filter executes against, in a fixed order.
	pub fn kinds(&self) -> Vec<RecordKind> {
		match self.data_type {
			Some(kind) => vec![kind],
			None => RecordKind::ALL.to_vec(),
		}
	}

	/// The store predicate for one kind. Each numeric range only constrains
	/// the kind that carries the field: the price range never excludes rent
	/// records and vice versa.
	pub fn predicate_for(&self, kind: RecordKind) -> RecordPredicate {
		let (summary_bounds, change_bounds, min_affordability) = match kind {
			RecordKind::Housing =>
				(self.price_range, self.change_range, self.affordability_threshold),
			RecordKind::Rent => (self.rent_range, self.change_range, None),
			RecordKind::Trend => (self.change_range, Bounds::default(), None),
		};

		RecordPredicate {
			kind,
			regions: self.regions.clone(),
			summary_bounds,
			change_bounds,
			min_affordability,
		}
	}

	pub fn regions(&self) -> &[String] {
		&self.regions
	}

	pub fn sort_key(&self) -> SortKey {
		self.sort_key
	}

	pub fn sort_direction(&self) -> SortDirection {
		self.sort_direction
	}

	pub fn page_size(&self) -> u32 {
		self.page_size
	}

	pub fn page_offset(&self) -> u64 {
		self.page_offset
	}
}

fn validate_regions(raw: &[String]) -> Result<Vec<String>, FilterError> {
	if raw.len() > MAX_REGIONS {
		return Err(FilterError::new(
			"$.filter.regions",
			format!("regions list exceeds maximum size ({}/{MAX_REGIONS}).", raw.len()),
		));
	}

	let mut normalized = BTreeSet::new();

	for (index, region) in raw.iter().enumerate() {
		let trimmed = region.trim();

		if trimmed.is_empty() {
			return Err(FilterError::new(
				format!("$.filter.regions[{index}]"),
				"region identifier must be non-empty.",
			));
		}
		if trimmed.len() > MAX_REGION_CHARS {
			return Err(FilterError::new(
				format!("$.filter.regions[{index}]"),
				format!("region identifier exceeds maximum length ({MAX_REGION_CHARS})."),
			));
		}

		normalized.insert(trimmed.to_ascii_uppercase());
	}

	Ok(normalized.into_iter().collect())
}

fn validate_range(
	path: &str,
	raw: Option<&RangeDocument>,
	limits: Option<(f64, f64)>,
) -> Result<Bounds, FilterError> {
	let Some(range) = raw else {
		return Ok(Bounds::default());
	};

	for (side, value) in [("min", range.min), ("max", range.max)] {
		let Some(value) = value else {
			continue;
		};

		if !value.is_finite() {
			return Err(FilterError::new(
				format!("{path}.{side}"),
				"bound must be a finite number.",
			));
		}

		if let Some((low, high)) = limits
			&& !(low..=high).contains(&value)
		{
			return Err(FilterError::new(
				format!("{path}.{side}"),
				format!("bound must be in the range {low}-{high}."),
			));
		}
	}

	if let (Some(min), Some(max)) = (range.min, range.max)
		&& min > max
	{
		return Err(FilterError::new(
			path,
			format!("min must not exceed max ({min} > {max})."),
		));
	}

	Ok(Bounds { min: range.min, max: range.max })
}
