use crate::db::models::{ExportResult, StationRow};
use crate::error::Result;
use crate::models::NormalizedStation;
use sqlx::PgPool;
use tracing::{debug, info, warn};

pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Insert stations, leaving rows whose ID already exists untouched.
    ///
    /// Processes in batches of 1000 inside one transaction. Stations without an
    /// ID and conflicting IDs are counted as skipped rather than reported as
    /// errors.
    pub async fn insert_stations(&self, stations: &[NormalizedStation]) -> Result<ExportResult> {
        let rows: Vec<StationRow> = stations.iter().filter_map(StationRow::from_station).collect();

        if rows.len() < stations.len() {
            warn!(
                "Skipping {} stations without an ID",
                stations.len() - rows.len()
            );
        }

        if rows.is_empty() {
            return Ok(ExportResult {
                inserted: 0,
                skipped: stations.len(),
            });
        }

        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;

        const BATCH_SIZE: usize = 1000;

        for (batch_idx, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            debug!(
                "Inserting batch {}/{} ({} stations)",
                batch_idx + 1,
                rows.len().div_ceil(BATCH_SIZE),
                chunk.len()
            );

            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO stations (
                    id, name, operator, address, city, postal_code,
                    latitude, longitude, number_of_points, total_power_kw,
                    last_update, power_per_point_kw
                ) ",
            );

            query_builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.id)
                    .push_bind(&row.name)
                    .push_bind(&row.operator)
                    .push_bind(&row.address)
                    .push_bind(&row.city)
                    .push_bind(&row.postal_code)
                    .push_bind(row.latitude)
                    .push_bind(row.longitude)
                    .push_bind(row.number_of_points)
                    .push_bind(row.total_power_kw)
                    .push_bind(&row.last_update)
                    .push_bind(row.power_per_point_kw);
            });

            query_builder.push(" ON CONFLICT (id) DO NOTHING");

            let result = query_builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;

        let result = ExportResult {
            inserted,
            skipped: stations.len() - inserted,
        };

        info!(
            "Export completed: {} stations inserted, {} skipped",
            result.inserted, result.skipped
        );

        Ok(result)
    }

    pub async fn count_stations(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn get_station(&self, id: i64) -> Result<Option<StationRow>> {
        let row = sqlx::query_as::<_, StationRow>("SELECT * FROM stations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}
