use time::OffsetDateTime;
use uuid::Uuid;

use roofline_domain::{
	filter::{FilterDocument, ValidatedFilter},
	record::{self, MarketRecord, RecordKind},
	summary::{self, AggregateSummary},
};

use crate::{Result, RooflineService};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	pub filter: FilterDocument,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchItem {
	pub record_id: Uuid,
	pub region: String,
	pub county: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub period: OffsetDateTime,
	pub price: Option<f64>,
	pub rent: Option<f64>,
	pub price_change_pct: Option<f64>,
	pub rent_change_pct: Option<f64>,
	pub affordability: Option<f64>,
}
impl From<MarketRecord> for SearchItem {
	fn from(record: MarketRecord) -> Self {
		Self {
			record_id: record.record_id,
			region: record.region,
			county: record.county,
			period: record.period,
			price: record.price,
			rent: record.rent,
			price_change_pct: record.price_change_pct,
			rent_change_pct: record.rent_change_pct,
			affordability: record.affordability,
		}
	}
}

/// One record kind's slice of a result set. Kinds are never interleaved into
/// a single ordering; callers that asked for "all" get one section per kind.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchSection {
	pub kind: RecordKind,
	pub items: Vec<SearchItem>,
	pub aggregates: AggregateSummary,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
	pub sections: Vec<SearchSection>,
}

impl RooflineService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let mut doc = req.filter;

		// The configured default only fills an absent page size; explicit
		// values still go through validation untouched.
		if doc.page_size.is_none() {
			doc.page_size = Some(i64::from(self.cfg.search.default_page_size));
		}

		let filter = doc.validate()?;

		self.execute_filter(&filter).await
	}

	/// Runs a validated filter: one section per kind in scope, aggregates over
	/// the full matching set, sort before pagination.
	pub(crate) async fn execute_filter(
		&self,
		filter: &ValidatedFilter,
	) -> Result<SearchResponse> {
		let mut sections = Vec::new();

		for kind in filter.kinds() {
			let predicate = filter.predicate_for(kind);
			let mut records = self.stores.records.find_by_predicate(&predicate).await?;

			record::sort_records(&mut records, filter.sort_key(), filter.sort_direction());

			let aggregates = section_aggregates(&records);
			let items = records
				.into_iter()
				.skip(filter.page_offset() as usize)
				.take(filter.page_size() as usize)
				.map(SearchItem::from)
				.collect();

			sections.push(SearchSection { kind, items, aggregates });
		}

		Ok(SearchResponse { sections })
	}
}

/// `count` covers every matching record; min/max/avg cover the records that
/// carry the kind's summary field. The two only diverge on unbounded filters,
/// since a bounded filter already excludes records without the field.
fn section_aggregates(records: &[MarketRecord]) -> AggregateSummary {
	let mut aggregates = summary::summarize(records.iter().filter_map(MarketRecord::summary_value));

	aggregates.count = records.len() as u64;

	aggregates
}
