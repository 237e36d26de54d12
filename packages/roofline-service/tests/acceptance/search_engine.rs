use std::collections::HashSet;

use uuid::Uuid;

use roofline_domain::{
	filter::{FilterDocument, RangeDocument, SortDirection, SortKey},
	record::RecordKind,
};
use roofline_service::{Error, SearchRequest};
use roofline_testkit::memory::market_record;

use super::{build_harness, california_rent_records, test_config};

fn rent_band_request(page_size: i64, page_offset: i64) -> SearchRequest {
	SearchRequest {
		filter: FilterDocument {
			regions: vec!["CA".to_string()],
			rent_range: Some(RangeDocument { min: Some(1_000.0), max: Some(3_000.0) }),
			data_type: Some(RecordKind::Rent),
			sort_key: Some(SortKey::Rent),
			sort_direction: Some(SortDirection::Asc),
			page_size: Some(page_size),
			page_offset: Some(page_offset),
			..Default::default()
		},
	}
}

#[tokio::test]
async fn rent_band_scenario_excludes_out_of_range_records_everywhere() {
	let harness = build_harness(test_config(), california_rent_records());
	let response = harness
		.service
		.search(rent_band_request(2, 0))
		.await
		.expect("Search failed.");

	assert_eq!(response.sections.len(), 1);

	let section = &response.sections[0];

	assert_eq!(section.kind, RecordKind::Rent);
	assert_eq!(
		section.items.iter().map(|item| item.rent).collect::<Vec<_>>(),
		vec![Some(1_200.0), Some(1_500.0)],
	);
	assert_eq!(section.aggregates.count, 3);
	assert_eq!(section.aggregates.min, 1_200.0);
	assert_eq!(section.aggregates.max, 2_800.0);
	assert!((section.aggregates.avg - 1_833.333_333).abs() < 0.001);
}

#[tokio::test]
async fn repeated_execution_over_unchanged_data_is_identical() {
	// Insertion order is scrambled on purpose; the engine's ordering must not
	// depend on it.
	let mut records = california_rent_records();

	records.reverse();

	let harness = build_harness(test_config(), records);
	let first = harness
		.service
		.search(rent_band_request(2, 0))
		.await
		.expect("First search failed.");
	let second = harness
		.service
		.search(rent_band_request(2, 0))
		.await
		.expect("Second search failed.");

	assert_eq!(
		serde_json::to_value(&first).expect("encode"),
		serde_json::to_value(&second).expect("encode"),
	);
}

#[tokio::test]
async fn inverted_range_is_rejected_before_any_store_access() {
	let harness = build_harness(test_config(), california_rent_records());
	let request = SearchRequest {
		filter: FilterDocument {
			price_range: Some(RangeDocument { min: Some(500_000.0), max: Some(100_000.0) }),
			..Default::default()
		},
	};
	let err = harness.service.search(request).await.expect_err("expected rejection");

	assert!(matches!(err, Error::InvalidFilter(_)));
	assert_eq!(harness.records.find_count(), 0);
}

#[tokio::test]
async fn consecutive_pages_are_disjoint_and_union_to_the_sorted_prefix() {
	let records = (0..50)
		.map(|index| {
			market_record(RecordKind::Rent, index as u128 + 1, "CA", 1_000.0 + index as f64)
		})
		.collect();
	let harness = build_harness(test_config(), records);
	let page = |offset| rent_band_request(20, offset);
	let first = harness.service.search(page(0)).await.expect("First page failed.");
	let second = harness.service.search(page(20)).await.expect("Second page failed.");
	let full = harness
		.service
		.search(rent_band_request(100, 0))
		.await
		.expect("Full fetch failed.");

	let ids = |response: &roofline_service::SearchResponse| -> Vec<Uuid> {
		response.sections[0].items.iter().map(|item| item.record_id).collect()
	};
	let first_ids = ids(&first);
	let second_ids = ids(&second);
	let first_set: HashSet<Uuid> = first_ids.iter().copied().collect();

	assert_eq!(first_ids.len(), 20);
	assert_eq!(second_ids.len(), 20);
	assert!(second_ids.iter().all(|id| !first_set.contains(id)));

	let mut union: Vec<Uuid> = first_ids;

	union.extend(second_ids);

	assert_eq!(union, ids(&full)[..40].to_vec());
}

#[tokio::test]
async fn unmatched_regions_yield_an_empty_result_not_an_error() {
	let harness = build_harness(test_config(), california_rent_records());
	let request = SearchRequest {
		filter: FilterDocument {
			regions: vec!["ZZ".to_string()],
			data_type: Some(RecordKind::Rent),
			..Default::default()
		},
	};
	let response = harness.service.search(request).await.expect("Search failed.");
	let section = &response.sections[0];

	assert!(section.items.is_empty());
	assert_eq!(section.aggregates.count, 0);
	assert_eq!(section.aggregates.min, 0.0);
	assert_eq!(section.aggregates.max, 0.0);
	assert_eq!(section.aggregates.avg, 0.0);
}

#[tokio::test]
async fn unset_data_type_returns_one_labeled_section_per_kind() {
	let records = vec![
		market_record(RecordKind::Housing, 1, "CA", 450_000.0),
		market_record(RecordKind::Rent, 2, "CA", 1_800.0),
		market_record(RecordKind::Trend, 3, "CA", 4.5),
	];
	let harness = build_harness(test_config(), records);
	let request = SearchRequest { filter: FilterDocument::default() };
	let response = harness.service.search(request).await.expect("Search failed.");
	let kinds: Vec<RecordKind> =
		response.sections.iter().map(|section| section.kind).collect();

	assert_eq!(kinds, RecordKind::ALL.to_vec());

	for section in &response.sections {
		assert_eq!(section.items.len(), 1, "kinds must not interleave");
		assert_eq!(section.aggregates.count, 1);
	}
}

#[tokio::test]
async fn rent_bounds_do_not_leak_into_other_kind_sections() {
	let records = vec![
		market_record(RecordKind::Housing, 1, "CA", 450_000.0),
		market_record(RecordKind::Rent, 2, "CA", 800.0),
	];
	let harness = build_harness(test_config(), records);
	let request = SearchRequest {
		filter: FilterDocument {
			rent_range: Some(RangeDocument { min: Some(1_000.0), max: None }),
			..Default::default()
		},
	};
	let response = harness.service.search(request).await.expect("Search failed.");
	let by_kind = |kind| {
		response
			.sections
			.iter()
			.find(|section| section.kind == kind)
			.expect("section present")
	};

	// The 800 rent record falls out; the housing record is untouched by the
	// rent bound.
	assert_eq!(by_kind(RecordKind::Rent).items.len(), 0);
	assert_eq!(by_kind(RecordKind::Housing).items.len(), 1);
}
