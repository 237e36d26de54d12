use serde::{Deserialize, Serialize};

/// Count, min, max, and mean of a section's summary field across the whole
/// matching set, independent of pagination. An empty match produces the
/// all-zero sentinel rather than an error.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AggregateSummary {
	pub count: u64,
	pub min: f64,
	pub max: f64,
	pub avg: f64,
}

pub fn summarize(values: impl IntoIterator<Item = f64>) -> AggregateSummary {
	let mut count = 0_u64;
	let mut min = f64::INFINITY;
	let mut max = f64::NEG_INFINITY;
	let mut sum = 0.0;

	for value in values {
		count += 1;
		min = min.min(value);
		max = max.max(value);
		sum += value;
	}

	if count == 0 {
		return AggregateSummary::default();
	}

	AggregateSummary { count, min, max, avg: sum / count as f64 }
}

/// Change of one aggregate field between two scheduler runs. `percent` is
/// absent when the prior value is zero; that case renders as "n/a" instead
/// of dividing by zero or pretending the change was nil.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDelta {
	pub absolute: f64,
	pub percent: Option<f64>,
}

pub fn field_delta(prior: f64, current: f64) -> FieldDelta {
	let absolute = current - prior;
	let percent = if prior == 0.0 { None } else { Some(absolute / prior * 100.0) };

	FieldDelta { absolute, percent }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AggregateDelta {
	pub count: FieldDelta,
	pub min: FieldDelta,
	pub max: FieldDelta,
	pub avg: FieldDelta,
}

pub fn delta(prior: &AggregateSummary, current: &AggregateSummary) -> AggregateDelta {
	AggregateDelta {
		count: field_delta(prior.count as f64, current.count as f64),
		min: field_delta(prior.min, current.min),
		max: field_delta(prior.max, current.max),
		avg: field_delta(prior.avg, current.avg),
	}
}
