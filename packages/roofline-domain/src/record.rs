use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::filter::{SortDirection, SortKey};

/// The record families a filter can target. `trends` is accepted as an input
/// alias because the upstream feed labels the family in the plural.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
	Housing,
	Rent,
	#[serde(alias = "trends")]
	Trend,
}
impl RecordKind {
	pub const ALL: [Self; 3] = [Self::Housing, Self::Rent, Self::Trend];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Housing => "housing",
			Self::Rent => "rent",
			Self::Trend => "trend",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"housing" => Some(Self::Housing),
			"rent" => Some(Self::Rent),
			"trend" | "trends" => Some(Self::Trend),
			_ => None,
		}
	}
}

/// One market observation. Which numeric columns are populated depends on the
/// record kind; absent columns stay `None` rather than zero.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MarketRecord {
	pub record_id: Uuid,
	pub region: String,
	pub county: Option<String>,
	pub kind: RecordKind,
	#[serde(with = "time::serde::rfc3339")]
	pub period: OffsetDateTime,
	pub price: Option<f64>,
	pub rent: Option<f64>,
	pub price_change_pct: Option<f64>,
	pub rent_change_pct: Option<f64>,
	pub affordability: Option<f64>,
}
impl MarketRecord {
	/// The field a kind is summarized and ranged on: sale price for housing,
	/// asking rent for rent, year-over-year price change for trend records.
	pub fn summary_value(&self) -> Option<f64> {
		match self.kind {
			RecordKind::Housing => self.price,
			RecordKind::Rent => self.rent,
			RecordKind::Trend => self.price_change_pct,
		}
	}

	/// Year-over-year change field for this kind.
	pub fn change_value(&self) -> Option<f64> {
		match self.kind {
			RecordKind::Housing | RecordKind::Trend => self.price_change_pct,
			RecordKind::Rent => self.rent_change_pct,
		}
	}

	fn sort_value(&self, key: SortKey) -> Option<f64> {
		match key {
			SortKey::Price => self.price,
			SortKey::Rent => self.rent,
			SortKey::PriceChange => self.price_change_pct,
			SortKey::RentChange => self.rent_change_pct,
			SortKey::Date => Some(self.period.unix_timestamp() as f64),
		}
	}
}

/// A closed numeric bound. Absent sides mean unbounded, not zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
	pub min: Option<f64>,
	pub max: Option<f64>,
}
impl Bounds {
	pub fn admits(&self, value: Option<f64>) -> bool {
		if self.min.is_none() && self.max.is_none() {
			return true;
		}

		let Some(value) = value else {
			return false;
		};

		if let Some(min) = self.min
			&& value < min
		{
			return false;
		}
		if let Some(max) = self.max
			&& value > max
		{
			return false;
		}

		true
	}
}

/// The conjunction of predicates the engine pushes to a record store for one
/// record kind. Region identifiers are already upper-cased and de-duplicated;
/// an empty list means no region restriction.
#[derive(Clone, Debug)]
pub struct RecordPredicate {
	pub kind: RecordKind,
	pub regions: Vec<String>,
	pub summary_bounds: Bounds,
	pub change_bounds: Bounds,
	pub min_affordability: Option<f64>,
}
impl RecordPredicate {
	pub fn admits(&self, record: &MarketRecord) -> bool {
		if record.kind != self.kind {
			return false;
		}
		if !self.regions.is_empty() && !self.region_matches(record) {
			return false;
		}
		if !self.summary_bounds.admits(record.summary_value()) {
			return false;
		}
		if !self.change_bounds.admits(record.change_value()) {
			return false;
		}
		if let Some(min) = self.min_affordability {
			match record.affordability {
				Some(value) if value >= min => {},
				_ => return false,
			}
		}

		true
	}

	fn region_matches(&self, record: &MarketRecord) -> bool {
		self.regions.iter().any(|id| {
			id == &record.region
				|| record.county.as_deref().is_some_and(|county| county == id.as_str())
		})
	}
}

/// Stable sort for a result section: the sort key first, records without the
/// key's field after those with it, then `record_id` ascending so repeated
/// executions over unchanged data paginate identically.
pub fn sort_records(records: &mut [MarketRecord], key: SortKey, direction: SortDirection) {
	records.sort_by(|a, b| {
		let ordering = match (a.sort_value(key), b.sort_value(key)) {
			(Some(lhs), Some(rhs)) => {
				let ordering = lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal);

				match direction {
					SortDirection::Asc => ordering,
					SortDirection::Desc => ordering.reverse(),
				}
			},
			(Some(_), None) => Ordering::Less,
			(None, Some(_)) => Ordering::Greater,
			(None, None) => Ordering::Equal,
		};

		ordering.then_with(|| a.record_id.cmp(&b.record_id))
	});
}
