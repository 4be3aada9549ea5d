//! Database access
//!
//! The handler only sees [`ServiceDetailsSource`]; the Postgres implementation
//! lives in [`service_details`] and connects either per request or through a pool,
//! depending on [`ConnectionStrategy`](crate::config::ConnectionStrategy).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::ServiceDetailRow;

pub mod row_decode;
pub mod service_details;

pub use service_details::PgServiceDetails;

/// Why a fetch produced no row set.
///
/// Callers treat every variant the same way; the distinction only reaches logs.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("timed out connecting to database after {0:?}")]
    ConnectTimeout(Duration),

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("service_details query failed: {0}")]
    Query(#[source] sqlx::Error),
}

/// Source of `service_details` rows for one service
#[async_trait]
pub trait ServiceDetailsSource: Send + Sync {
    /// All rows for `service_id`, in fetch order. An empty vec is a valid result.
    async fn fetch(&self, service_id: i64) -> Result<Vec<ServiceDetailRow>, FetchError>;
}
