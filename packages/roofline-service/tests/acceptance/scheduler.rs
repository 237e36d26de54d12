use std::time::Duration as StdDuration;

use time::Duration;
use uuid::Uuid;

use roofline_domain::{
	filter::{FilterDocument, RangeDocument},
	record::RecordKind,
};

use super::{NOW, build_harness, california_rent_records, seeded_search, test_config};

fn rent_filter() -> FilterDocument {
	FilterDocument {
		regions: vec!["CA".to_string()],
		rent_range: Some(RangeDocument { min: Some(1_000.0), max: Some(3_000.0) }),
		data_type: Some(RecordKind::Rent),
		..Default::default()
	}
}

#[tokio::test]
async fn weekly_search_is_idle_at_six_days_and_due_at_seven() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let idle = seeded_search(owner, rent_filter(), Some(NOW - Duration::days(6)));
	let due = seeded_search(owner, rent_filter(), Some(NOW - Duration::days(7)));
	let due_id = due.search_id;

	harness.saved.seed(idle);
	harness.saved.seed(due);

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.due, 1);
	assert_eq!(report.fired, 1);
	assert_eq!(harness.delivery.delivered().len(), 1);

	let snapshot = harness.saved.snapshot(due_id).expect("search present");

	assert_eq!(snapshot.last_fired_at, Some(NOW));
}

#[tokio::test]
async fn first_fire_delivers_and_stores_the_baseline() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let search = seeded_search(owner, rent_filter(), None);
	let search_id = search.search_id;

	harness.saved.seed(search);

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.fired, 1);

	let delivered = harness.delivery.delivered();

	assert_eq!(delivered.len(), 1);
	assert_eq!(delivered[0].recipient_id, owner);
	assert_eq!(delivered[0].subject, "Roofline alert: CA rentals");
	assert!(delivered[0].body.contains("rent: 3 matches"));
	assert!(delivered[0].body.contains("No prior baseline"));

	let snapshot = harness.saved.snapshot(search_id).expect("search present");
	let baseline = snapshot.last_summary.expect("baseline stored");

	assert_eq!(baseline["rent"]["count"], 3);

	// Freshly fired means idle again: the next tick finds nothing.
	let second = harness.service.run_tick(NOW + Duration::minutes(5)).await.expect("Tick failed.");

	assert_eq!(second.due, 0);
}

#[tokio::test]
async fn second_fire_reports_changes_against_the_baseline() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let mut search = seeded_search(owner, rent_filter(), Some(NOW - Duration::days(8)));

	search.last_summary = Some(serde_json::json!({
		"rent": { "count": 2, "min": 1_200.0, "max": 2_800.0, "avg": 2_000.0 },
	}));

	harness.saved.seed(search);
	harness.service.run_tick(NOW).await.expect("Tick failed.");

	let delivered = harness.delivery.delivered();

	assert_eq!(delivered.len(), 1);
	assert!(delivered[0].body.contains("since last alert"));
	assert!(!delivered[0].body.contains("No prior baseline"));
}

#[tokio::test]
async fn failed_delivery_keeps_the_search_due_for_the_next_tick() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let search = seeded_search(owner, rent_filter(), None);
	let search_id = search.search_id;

	harness.saved.seed(search);
	harness.delivery.fail_times(1);

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.failed, 1);
	assert_eq!(report.fired, 0);
	assert_eq!(harness.delivery.delivered().len(), 0);

	let snapshot = harness.saved.snapshot(search_id).expect("search present");

	// At-least-once: the failed hand-off must not advance the fire marker.
	assert_eq!(snapshot.last_fired_at, None);

	// Once the claim lease lapses the search is picked up again and succeeds.
	let retry_at = NOW + Duration::seconds(60);
	let retry = harness.service.run_tick(retry_at).await.expect("Tick failed.");

	assert_eq!(retry.fired, 1);
	assert_eq!(harness.delivery.attempts(), 2);
	assert_eq!(harness.delivery.delivered().len(), 1);
	assert_eq!(
		harness.saved.snapshot(search_id).expect("search present").last_fired_at,
		Some(retry_at),
	);
}

#[tokio::test]
async fn overlapping_ticks_fire_an_overdue_search_exactly_once() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let search = seeded_search(owner, rent_filter(), None);
	let search_id = search.search_id;

	harness.saved.seed(search);

	let (first, second) =
		tokio::join!(harness.service.run_tick(NOW), harness.service.run_tick(NOW));
	let first = first.expect("First tick failed.");
	let second = second.expect("Second tick failed.");

	assert_eq!(first.fired + second.fired, 1);
	assert_eq!(harness.delivery.delivered().len(), 1);
	assert_eq!(
		harness.saved.snapshot(search_id).expect("search present").last_fired_at,
		Some(NOW),
	);
}

#[tokio::test]
async fn stale_mark_fired_loses_the_compare_and_set() {
	use roofline_service::SavedSearchStore;

	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let search = seeded_search(owner, rent_filter(), None);
	let search_id = search.search_id;

	harness.saved.seed(search);

	let won = harness
		.saved
		.mark_fired(search_id, None, NOW, None)
		.await
		.expect("Mark failed.");

	assert!(won);

	// A second writer still holding the pre-fire observation must lose.
	let lost = harness
		.saved
		.mark_fired(search_id, None, NOW + Duration::minutes(1), None)
		.await
		.expect("Mark failed.");

	assert!(!lost);
}

#[tokio::test]
async fn slow_processing_times_out_and_stays_due() {
	let mut cfg = test_config();

	cfg.notifications.compute_timeout_ms = 50;

	let harness = build_harness(cfg, california_rent_records());
	let owner = Uuid::from_u128(20);
	let search = seeded_search(owner, rent_filter(), None);
	let search_id = search.search_id;

	harness.saved.seed(search);
	harness.delivery.stall_for(StdDuration::from_millis(500));

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.failed, 1);
	assert_eq!(harness.delivery.delivered().len(), 0);
	assert_eq!(
		harness.saved.snapshot(search_id).expect("search present").last_fired_at,
		None,
	);
}

#[tokio::test]
async fn a_corrupt_stored_filter_is_skipped_without_blocking_others() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let corrupt = seeded_search(
		owner,
		FilterDocument {
			rent_range: Some(RangeDocument { min: Some(3_000.0), max: Some(1_000.0) }),
			..Default::default()
		},
		None,
	);
	let healthy = seeded_search(owner, rent_filter(), None);
	let corrupt_id = corrupt.search_id;

	harness.saved.seed(corrupt);
	harness.saved.seed(healthy);

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.due, 2);
	assert_eq!(report.skipped, 1);
	assert_eq!(report.fired, 1);
	assert_eq!(harness.delivery.delivered().len(), 1);
	assert_eq!(
		harness.saved.snapshot(corrupt_id).expect("search present").last_fired_at,
		None,
	);
}

#[tokio::test]
async fn disabled_searches_are_never_claimed() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(20);
	let mut search = seeded_search(owner, rent_filter(), None);

	search.notifications_enabled = false;

	harness.saved.seed(search);

	let report = harness.service.run_tick(NOW).await.expect("Tick failed.");

	assert_eq!(report.due, 0);
	assert_eq!(harness.delivery.attempts(), 0);
}
