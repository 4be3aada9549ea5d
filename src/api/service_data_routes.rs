//! `GET /api/service_data` handler and `service_id` validation

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use tracing::{debug, warn};

use crate::database::ServiceDetailsSource;
use crate::error::ApiError;
use crate::shaper::{shape, ServiceData};

/// Shared state for service data routes
#[derive(Clone)]
pub struct ServiceDataState {
    pub source: Arc<dyn ServiceDetailsSource>,
}

impl ServiceDataState {
    pub fn new(source: Arc<dyn ServiceDetailsSource>) -> Self {
        Self { source }
    }
}

/// A syntactically valid `service_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceId {
    Id(i64),
    /// All digits, but beyond the range of the integer key column
    OutOfRange,
}

/// First `service_id` value of the query string; later repeats are ignored.
pub fn first_service_id(pairs: &[(String, String)]) -> Option<&str> {
    pairs
        .iter()
        .find(|(key, _)| key == "service_id")
        .map(|(_, value)| value.as_str())
}

/// Validate the raw `service_id` query value.
///
/// Only non-empty ASCII digit strings are accepted. A value of zero counts as
/// missing.
pub fn parse_service_id(raw: Option<&str>) -> Result<ServiceId, ApiError> {
    let raw = raw.ok_or(ApiError::InvalidServiceId)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::InvalidServiceId);
    }

    match raw.parse::<i64>() {
        Ok(0) => Err(ApiError::MissingServiceId),
        Ok(id) => Ok(ServiceId::Id(id)),
        // Digits only, so the sole parse failure left is overflow.
        Err(_) => Ok(ServiceId::OutOfRange),
    }
}

pub async fn get_service_data(
    State(state): State<ServiceDataState>,
    query: Option<Query<Vec<(String, String)>>>,
) -> Result<Json<ServiceData>, ApiError> {
    let raw = query.as_ref().and_then(|Query(pairs)| first_service_id(pairs));

    let service_id = match parse_service_id(raw)? {
        ServiceId::Id(id) => id,
        ServiceId::OutOfRange => {
            debug!("service_id {:?} out of range, nothing can match", raw);
            return Err(ApiError::NotFound);
        }
    };

    let rows = match state.source.fetch(service_id).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(service_id, error = %e, "service_details fetch failed");
            return Err(ApiError::NotFound);
        }
    };

    if rows.is_empty() {
        debug!(service_id, "no service_details rows");
        return Err(ApiError::NotFound);
    }

    Ok(Json(shape(rows)))
}
