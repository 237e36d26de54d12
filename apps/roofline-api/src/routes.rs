use axum::{
	Json, Router,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use roofline_service::{
	CreateSavedSearchRequest, Error as ServiceError, SavedSearchView, SearchRequest,
	SearchResponse, UpdateSavedSearchRequest,
};

use crate::state::AppState;

/// Caller identity, resolved upstream by the auth layer and forwarded as a
/// header. Token verification itself lives outside this service.
const USER_HEADER: &str = "x-roofline-user-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/saved-searches", post(create_saved_search).get(list_saved_searches))
		.route(
			"/v1/saved-searches/{id}",
			get(get_saved_search).patch(update_saved_search).delete(delete_saved_search),
		)
		.route("/v1/saved-searches/{id}/execute", post(execute_saved_search))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn create_saved_search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<CreateSavedSearchRequest>,
) -> Result<Json<SavedSearchView>, ApiError> {
	let owner_id = caller_id(&headers)?;
	let response = state.service.create_saved_search(owner_id, payload).await?;

	Ok(Json(response))
}

async fn list_saved_searches(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<SavedSearchView>>, ApiError> {
	let owner_id = caller_id(&headers)?;
	let response = state.service.list_saved_searches(owner_id).await?;

	Ok(Json(response))
}

async fn get_saved_search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(search_id): Path<Uuid>,
) -> Result<Json<SavedSearchView>, ApiError> {
	let owner_id = caller_id(&headers)?;
	let response = state.service.get_saved_search(search_id, owner_id).await?;

	Ok(Json(response))
}

async fn update_saved_search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(search_id): Path<Uuid>,
	Json(payload): Json<UpdateSavedSearchRequest>,
) -> Result<Json<SavedSearchView>, ApiError> {
	let owner_id = caller_id(&headers)?;
	let response = state.service.update_saved_search(search_id, owner_id, payload).await?;

	Ok(Json(response))
}

async fn delete_saved_search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(search_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	let owner_id = caller_id(&headers)?;

	state.service.delete_saved_search(search_id, owner_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn execute_saved_search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(search_id): Path<Uuid>,
) -> Result<Json<SearchResponse>, ApiError> {
	let owner_id = caller_id(&headers)?;
	let response = state.service.execute_saved_search(search_id, owner_id).await?;

	Ok(Json(response))
}

fn caller_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
	let raw = headers
		.get(USER_HEADER)
		.and_then(|value| value.to_str().ok())
		.ok_or_else(|| {
			ApiError::new(
				StatusCode::UNAUTHORIZED,
				"unauthenticated",
				format!("{USER_HEADER} header is required."),
				None,
			)
		})?;

	Uuid::parse_str(raw).map_err(|_| {
		ApiError::new(
			StatusCode::UNAUTHORIZED,
			"unauthenticated",
			format!("{USER_HEADER} header must be a UUID."),
			None,
		)
	})
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidFilter(inner) => Self::new(
				StatusCode::BAD_REQUEST,
				"invalid_filter",
				inner.to_string(),
				Some(vec![inner.path().to_string()]),
			),
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "not_found", message, None),
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage failure behind the API.");

				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"storage_error",
					"Storage is unavailable.",
					None,
				)
			},
			// Delivery and timeouts belong to the scheduler path; surfacing one
			// here means a wiring bug, not a caller error.
			err @ (ServiceError::Delivery { .. } | ServiceError::ComputeTimeout { .. }) => {
				tracing::error!(error = %err, "Scheduler-path error reached the API.");

				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
