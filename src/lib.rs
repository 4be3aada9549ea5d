//! service-data-api - service detail lookups over HTTP
//!
//! `GET /api/service_data?service_id=N` reads every `service_details` row for the
//! service and answers with the rows grouped by category plus option/keyword
//! price maps.
//!
//! ## Layout
//! - [`config`]: environment configuration, built once at startup
//! - [`database`]: the [`ServiceDetailsSource`](database::ServiceDetailsSource) seam and its Postgres implementation
//! - [`shaper`]: row snapshot to response structures
//! - [`api`]: axum router and handlers

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod shaper;

pub use api::build_router;
pub use config::{AppConfig, ConnectionStrategy, DatabaseConfig, ServerConfig};
pub use database::{FetchError, PgServiceDetails, ServiceDetailsSource};
pub use error::ApiError;
pub use models::ServiceDetailRow;
pub use shaper::{shape, GroupedData, ServiceData};
