//! HTTP API

pub mod router;
pub mod service_data_routes;

pub use router::build_router;
pub use service_data_routes::{parse_service_id, ServiceDataState, ServiceId};
