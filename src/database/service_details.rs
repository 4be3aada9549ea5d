//! Postgres-backed `service_details` lookup

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Connection, Executor, PgConnection, Postgres};
use tracing::{debug, info, warn};

use super::row_decode::decode_row;
use super::{FetchError, ServiceDetailsSource};
use crate::config::{ConnectionStrategy, DatabaseConfig};
use crate::models::ServiceDetailRow;

const SERVICE_DETAILS_QUERY: &str = "SELECT * FROM service_details WHERE service_id = $1";

/// Fetches `service_details` rows from Postgres.
///
/// In [`ConnectionStrategy::PerRequest`] mode every fetch opens its own connection
/// under the configured connect timeout and closes it before returning. In
/// [`ConnectionStrategy::Pooled`] mode connections come from a lazily connected pool
/// whose acquire timeout is the same connect timeout.
#[derive(Debug, Clone)]
pub struct PgServiceDetails {
    config: DatabaseConfig,
    pool: Option<PgPool>,
}

impl PgServiceDetails {
    pub fn new(config: DatabaseConfig) -> Self {
        let pool = match config.strategy {
            ConnectionStrategy::PerRequest => None,
            ConnectionStrategy::Pooled { max_connections } => {
                info!(
                    "Using connection pool ({} connections) for {}",
                    max_connections,
                    config.display_target()
                );
                Some(
                    PgPoolOptions::new()
                        .max_connections(max_connections)
                        .acquire_timeout(config.connect_timeout)
                        .connect_lazy_with(config.connect_options()),
                )
            }
        };

        Self { config, pool }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    async fn fetch_per_request(&self, service_id: i64) -> Result<Vec<PgRow>, FetchError> {
        let options = self.config.connect_options();
        let connect = PgConnection::connect_with(&options);
        let mut conn = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(FetchError::Connect(e)),
            Err(_) => return Err(FetchError::ConnectTimeout(self.config.connect_timeout)),
        };

        let result = query_rows(&mut conn, service_id)
            .await
            .map_err(FetchError::Query);

        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection cleanly: {}", e);
        }

        result
    }

    async fn fetch_pooled(
        &self,
        pool: &PgPool,
        service_id: i64,
    ) -> Result<Vec<PgRow>, FetchError> {
        query_rows(pool, service_id).await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => FetchError::ConnectTimeout(self.config.connect_timeout),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                FetchError::Connect(e)
            }
            other => FetchError::Query(other),
        })
    }
}

async fn query_rows<'e, E>(executor: E, service_id: i64) -> Result<Vec<PgRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(SERVICE_DETAILS_QUERY)
        .bind(service_id)
        .fetch_all(executor)
        .await
}

#[async_trait]
impl ServiceDetailsSource for PgServiceDetails {
    async fn fetch(&self, service_id: i64) -> Result<Vec<ServiceDetailRow>, FetchError> {
        let rows = match &self.pool {
            Some(pool) => self.fetch_pooled(pool, service_id).await?,
            None => self.fetch_per_request(service_id).await?,
        };

        debug!(service_id, row_count = rows.len(), "fetched service_details");
        Ok(rows.iter().map(decode_row).collect())
    }
}
