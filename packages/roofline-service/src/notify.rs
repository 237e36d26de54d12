use std::{collections::BTreeMap, time::Duration as StdDuration};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::time as tokio_time;

use roofline_domain::summary::{self, AggregateSummary, FieldDelta};
use roofline_storage::models::SavedSearch;

use crate::{Error, Notification, Result, RooflineService};

/// Outcome counts for one scheduler tick. `failed` searches keep their
/// `last_fired_at` and return to the due set once their lease expires.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickReport {
	pub due: usize,
	pub fired: usize,
	pub failed: usize,
	pub skipped: usize,
}

enum Outcome {
	Fired,
	LostRace,
	InvalidFilter,
}

impl RooflineService {
	/// One bounded pass over the currently-due saved searches. Invoked by an
	/// external trigger; there is no internal timer loop. Searches are
	/// processed independently: a delivery failure or timeout is logged and
	/// counted, never fatal to the tick.
	pub async fn run_tick(&self, now: OffsetDateTime) -> Result<TickReport> {
		let cfg = &self.cfg.notifications;
		let due = self
			.stores
			.saved_searches
			.claim_due(now, cfg.lease_seconds, i64::from(cfg.batch_limit))
			.await?;
		let mut report = TickReport { due: due.len(), ..Default::default() };

		for search in &due {
			let processed = tokio_time::timeout(
				StdDuration::from_millis(cfg.compute_timeout_ms),
				self.process_due_search(search, now),
			)
			.await;

			match processed {
				Ok(Ok(Outcome::Fired)) => report.fired += 1,
				Ok(Ok(Outcome::LostRace)) => {
					tracing::info!(
						search_id = %search.search_id,
						"Another tick fired this search first; skipping.",
					);

					report.skipped += 1;
				},
				Ok(Ok(Outcome::InvalidFilter)) => report.skipped += 1,
				Ok(Err(err)) => {
					tracing::warn!(
						error = %err,
						search_id = %search.search_id,
						"Saved search notification failed; it stays due for the next tick.",
					);

					report.failed += 1;
				},
				Err(_) => {
					let err = Error::ComputeTimeout { timeout_ms: cfg.compute_timeout_ms };

					tracing::warn!(
						error = %err,
						search_id = %search.search_id,
						"Saved search processing timed out; it stays due for the next tick.",
					);

					report.failed += 1;
				},
			}
		}

		tracing::info!(
			due = report.due,
			fired = report.fired,
			failed = report.failed,
			skipped = report.skipped,
			"Notification tick complete.",
		);

		Ok(report)
	}

	async fn process_due_search(
		&self,
		search: &SavedSearch,
		now: OffsetDateTime,
	) -> Result<Outcome> {
		let filter = match search.filter.validate() {
			Ok(filter) => filter,
			Err(err) => {
				tracing::warn!(
					error = %err,
					search_id = %search.search_id,
					"Stored filter no longer validates; skipping notification.",
				);

				return Ok(Outcome::InvalidFilter);
			},
		};
		let response = self.execute_filter(&filter).await?;
		let summaries: BTreeMap<String, AggregateSummary> = response
			.sections
			.iter()
			.map(|section| (section.kind.as_str().to_string(), section.aggregates))
			.collect();
		let baseline = decode_baseline(search);
		let (subject, body) = render_notification(search, &summaries, baseline.as_ref());
		let metadata = serde_json::json!({
			"search_id": search.search_id,
			"cadence": search.cadence.as_str(),
			"fired_at": now.format(&Rfc3339).unwrap_or_default(),
		});
		let notification =
			Notification { recipient_id: search.owner_id, subject, body, metadata };

		self.delivery.deliver(&self.cfg.delivery, &notification).await?;

		let summary_value = serde_json::to_value(&summaries).map_err(|err| Error::Storage {
			message: format!("Summary baseline failed to encode: {err}."),
		})?;
		let fired = self
			.stores
			.saved_searches
			.mark_fired(search.search_id, search.last_fired_at, now, Some(&summary_value))
			.await?;

		Ok(if fired { Outcome::Fired } else { Outcome::LostRace })
	}
}

fn decode_baseline(search: &SavedSearch) -> Option<BTreeMap<String, AggregateSummary>> {
	let raw = search.last_summary.as_ref()?;

	match serde_json::from_value(raw.clone()) {
		Ok(baseline) => Some(baseline),
		Err(err) => {
			tracing::warn!(
				error = %err,
				search_id = %search.search_id,
				"Stored baseline failed to decode; treating as absent.",
			);

			None
		},
	}
}

fn render_notification(
	search: &SavedSearch,
	summaries: &BTreeMap<String, AggregateSummary>,
	baseline: Option<&BTreeMap<String, AggregateSummary>>,
) -> (String, String) {
	let subject = format!("Roofline alert: {}", search.name);
	let mut body = format!("Your saved search \"{}\" has fresh results.\n", search.name);

	for (kind, current) in summaries {
		body.push_str(&format!(
			"\n{kind}: {} matches (min {:.2}, max {:.2}, avg {:.2})\n",
			current.count, current.min, current.max, current.avg,
		));

		if let Some(prior) = baseline.and_then(|map| map.get(kind)) {
			let delta = summary::delta(prior, current);

			body.push_str(&format!(
				"  since last alert: count {}, avg {}\n",
				format_delta(&delta.count),
				format_delta(&delta.avg),
			));
		}
	}

	if baseline.is_none() {
		body.push_str("\nNo prior baseline yet; the next alert will include change summaries.\n");
	}

	(subject, body)
}

fn format_delta(delta: &FieldDelta) -> String {
	match delta.percent {
		Some(percent) => format!("{:+.2} ({percent:+.1}%)", delta.absolute),
		None => format!("{:+.2} (n/a)", delta.absolute),
	}
}
