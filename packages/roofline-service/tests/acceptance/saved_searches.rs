use uuid::Uuid;

use roofline_domain::{
	cadence::Cadence,
	filter::{FilterDocument, RangeDocument},
	record::RecordKind,
};
use roofline_service::{CreateSavedSearchRequest, Error, UpdateSavedSearchRequest};

use super::{build_harness, california_rent_records, test_config};

fn create_request() -> CreateSavedSearchRequest {
	CreateSavedSearchRequest {
		name: "CA rent watch".to_string(),
		description: Some("Below 3k in California.".to_string()),
		filter: FilterDocument {
			regions: vec!["ca".to_string()],
			rent_range: Some(RangeDocument { min: Some(1_000.0), max: Some(3_000.0) }),
			data_type: Some(RecordKind::Rent),
			..Default::default()
		},
		notifications_enabled: true,
		cadence: Cadence::Weekly,
	}
}

#[tokio::test]
async fn create_get_list_roundtrip() {
	let harness = build_harness(test_config(), Vec::new());
	let owner = Uuid::from_u128(10);
	let created = harness
		.service
		.create_saved_search(owner, create_request())
		.await
		.expect("Create failed.");

	assert_eq!(created.name, "CA rent watch");
	assert_eq!(created.cadence, Cadence::Weekly);
	assert_eq!(created.last_fired_at, None);

	let fetched = harness
		.service
		.get_saved_search(created.search_id, owner)
		.await
		.expect("Get failed.");

	assert_eq!(fetched.search_id, created.search_id);

	let listed =
		harness.service.list_saved_searches(owner).await.expect("List failed.");

	assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn other_owners_see_not_found_never_forbidden() {
	let harness = build_harness(test_config(), Vec::new());
	let owner = Uuid::from_u128(10);
	let stranger = Uuid::from_u128(11);
	let created = harness
		.service
		.create_saved_search(owner, create_request())
		.await
		.expect("Create failed.");

	let get_err = harness
		.service
		.get_saved_search(created.search_id, stranger)
		.await
		.expect_err("expected not found");
	let missing_err = harness
		.service
		.get_saved_search(Uuid::from_u128(999), owner)
		.await
		.expect_err("expected not found");

	// Owner mismatch and absence are indistinguishable.
	assert_eq!(get_err.to_string(), missing_err.to_string());
	assert!(matches!(get_err, Error::NotFound { .. }));

	let update_err = harness
		.service
		.update_saved_search(
			created.search_id,
			stranger,
			UpdateSavedSearchRequest {
				name: Some("hijacked".to_string()),
				..Default::default()
			},
		)
		.await
		.expect_err("expected not found");

	assert!(matches!(update_err, Error::NotFound { .. }));
	assert!(matches!(
		harness
			.service
			.delete_saved_search(created.search_id, stranger)
			.await
			.expect_err("expected not found"),
		Error::NotFound { .. },
	));
}

#[tokio::test]
async fn create_rejects_invalid_filters_and_blank_names() {
	let harness = build_harness(test_config(), Vec::new());
	let owner = Uuid::from_u128(10);
	let mut inverted = create_request();

	inverted.filter.rent_range =
		Some(RangeDocument { min: Some(3_000.0), max: Some(1_000.0) });

	assert!(matches!(
		harness
			.service
			.create_saved_search(owner, inverted)
			.await
			.expect_err("expected rejection"),
		Error::InvalidFilter(_),
	));

	let mut blank = create_request();

	blank.name = "   ".to_string();

	assert!(matches!(
		harness
			.service
			.create_saved_search(owner, blank)
			.await
			.expect_err("expected rejection"),
		Error::InvalidRequest { .. },
	));
}

#[tokio::test]
async fn update_applies_patches_and_rejects_empty_ones() {
	let harness = build_harness(test_config(), Vec::new());
	let owner = Uuid::from_u128(10);
	let created = harness
		.service
		.create_saved_search(owner, create_request())
		.await
		.expect("Create failed.");
	let updated = harness
		.service
		.update_saved_search(
			created.search_id,
			owner,
			UpdateSavedSearchRequest {
				name: Some("Renamed".to_string()),
				description: Some(None),
				cadence: Some(Cadence::Monthly),
				..Default::default()
			},
		)
		.await
		.expect("Update failed.");

	assert_eq!(updated.name, "Renamed");
	assert_eq!(updated.description, None);
	assert_eq!(updated.cadence, Cadence::Monthly);
	// The filter was not part of the patch.
	assert_eq!(updated.filter.regions, vec!["ca".to_string()]);

	assert!(matches!(
		harness
			.service
			.update_saved_search(
				created.search_id,
				owner,
				UpdateSavedSearchRequest::default(),
			)
			.await
			.expect_err("expected rejection"),
		Error::InvalidRequest { .. },
	));
}

#[tokio::test]
async fn update_rejects_an_invalid_replacement_filter() {
	let harness = build_harness(test_config(), Vec::new());
	let owner = Uuid::from_u128(10);
	let created = harness
		.service
		.create_saved_search(owner, create_request())
		.await
		.expect("Create failed.");
	let err = harness
		.service
		.update_saved_search(
			created.search_id,
			owner,
			UpdateSavedSearchRequest {
				filter: Some(FilterDocument {
					page_size: Some(0),
					..Default::default()
				}),
				..Default::default()
			},
		)
		.await
		.expect_err("expected rejection");

	assert!(matches!(err, Error::InvalidFilter(_)));
}

#[tokio::test]
async fn execute_saved_search_runs_the_stored_filter() {
	let harness = build_harness(test_config(), california_rent_records());
	let owner = Uuid::from_u128(10);
	let created = harness
		.service
		.create_saved_search(owner, create_request())
		.await
		.expect("Create failed.");
	let response = harness
		.service
		.execute_saved_search(created.search_id, owner)
		.await
		.expect("Execute failed.");

	assert_eq!(response.sections.len(), 1);
	assert_eq!(response.sections[0].aggregates.count, 3);

	assert!(matches!(
		harness
			.service
			.execute_saved_search(created.search_id, Uuid::from_u128(11))
			.await
			.expect_err("expected not found"),
		Error::NotFound { .. },
	));
}
