use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use roofline_domain::record::{Bounds, MarketRecord, RecordKind, RecordPredicate};

use crate::{Error, Result, db::Db};

const SELECT_COLUMNS: &str = "\
SELECT record_id, region, county, kind, period, price, rent, price_change_pct, rent_change_pct, affordability \
FROM market_records WHERE kind = ";

pub struct PgRecordStore {
	pool: PgPool,
}
impl PgRecordStore {
	pub fn new(db: &Db) -> Self {
		Self { pool: db.pool.clone() }
	}

	/// Fetches the full matching set for one kind. Ordering and pagination are
	/// the engine's job; the store only pushes the predicate down into SQL.
	pub async fn find_by_predicate(
		&self,
		predicate: &RecordPredicate,
	) -> Result<Vec<MarketRecord>> {
		let mut builder = QueryBuilder::new(SELECT_COLUMNS);

		builder.push_bind(predicate.kind.as_str());

		if !predicate.regions.is_empty() {
			builder.push(" AND (region = ANY(");
			builder.push_bind(&predicate.regions);
			builder.push(") OR county = ANY(");
			builder.push_bind(&predicate.regions);
			builder.push("))");
		}

		push_bounds(&mut builder, summary_column(predicate.kind), &predicate.summary_bounds);
		push_bounds(&mut builder, change_column(predicate.kind), &predicate.change_bounds);

		if let Some(min) = predicate.min_affordability {
			builder.push(" AND affordability >= ");
			builder.push_bind(min);
		}

		let rows: Vec<RecordRow> = builder.build_query_as().fetch_all(&self.pool).await?;

		rows.into_iter().map(MarketRecord::try_from).collect()
	}

	pub async fn insert(&self, record: &MarketRecord) -> Result<()> {
		sqlx::query(
			"\
INSERT INTO market_records (
	record_id,
	region,
	county,
	kind,
	period,
	price,
	rent,
	price_change_pct,
	rent_change_pct,
	affordability
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
		)
		.bind(record.record_id)
		.bind(record.region.as_str())
		.bind(record.county.as_deref())
		.bind(record.kind.as_str())
		.bind(record.period)
		.bind(record.price)
		.bind(record.rent)
		.bind(record.price_change_pct)
		.bind(record.rent_change_pct)
		.bind(record.affordability)
		.execute(&self.pool)
		.await?;

		Ok(())
	}
}

fn summary_column(kind: RecordKind) -> &'static str {
	match kind {
		RecordKind::Housing => "price",
		RecordKind::Rent => "rent",
		RecordKind::Trend => "price_change_pct",
	}
}

fn change_column(kind: RecordKind) -> &'static str {
	match kind {
		RecordKind::Housing | RecordKind::Trend => "price_change_pct",
		RecordKind::Rent => "rent_change_pct",
	}
}

fn push_bounds(builder: &mut QueryBuilder<'_, Postgres>, column: &str, bounds: &Bounds) {
	if let Some(min) = bounds.min {
		builder.push(format!(" AND {column} >= "));
		builder.push_bind(min);
	}
	if let Some(max) = bounds.max {
		builder.push(format!(" AND {column} <= "));
		builder.push_bind(max);
	}
}

#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
	record_id: Uuid,
	region: String,
	county: Option<String>,
	kind: String,
	period: OffsetDateTime,
	price: Option<f64>,
	rent: Option<f64>,
	price_change_pct: Option<f64>,
	rent_change_pct: Option<f64>,
	affordability: Option<f64>,
}
impl TryFrom<RecordRow> for MarketRecord {
	type Error = Error;

	fn try_from(row: RecordRow) -> Result<Self> {
		let kind = RecordKind::parse(&row.kind).ok_or_else(|| {
			Error::InvalidArgument(format!("Unknown record kind '{}' in storage.", row.kind))
		})?;

		Ok(Self {
			record_id: row.record_id,
			region: row.region,
			county: row.county,
			kind,
			period: row.period,
			price: row.price,
			rent: row.rent,
			price_change_pct: row.price_change_pct,
			rent_change_pct: row.rent_change_pct,
			affordability: row.affordability,
		})
	}
}
