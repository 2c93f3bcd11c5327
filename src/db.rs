use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{MetricsError, Result};
use crate::models::ProspectRow;
use crate::store::{EventKind, EventStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts a fixed set of runs and prospects spread over the last week.
pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let runs = [
        (Uuid::parse_str("5b1f6a2e-8c1d-4a7e-9f0b-2d4c6e8a0b11")?, 6, &["github", "hn"][..]),
        (Uuid::parse_str("9e3a7c51-0f2b-4d86-b1a4-7c5e9d2f3a22")?, 4, &["x_twitter"][..]),
        (Uuid::parse_str("c47d2b90-6e1a-4f3c-8d25-1b9a0e7f4c33")?, 2, &["bootcamps", "gaming"][..]),
        (Uuid::parse_str("1f8e4d63-3b7c-4a19-a6d0-5e2c8b1f9d44")?, 1, &["hn"][..]),
    ];

    let prospects = [
        ("github", "rustacean_dev", Some("devtools"), 0.86, true),
        ("github", "kvstore_kate", Some("devtools"), 0.64, false),
        ("hn", "throwaway_cto", None, 0.41, false),
        ("x_twitter", "indie_builder", Some("founders"), 0.77, true),
        ("x_twitter", "late_night_ship", Some(""), 0.18, false),
        ("bootcamps", "career_switcher", Some("learners"), 0.33, false),
        ("gaming", "speedrun_sam", Some("streamers"), 1.0, true),
        ("hn", "show_hn_poster", Some("founders"), 0.2, false),
    ];

    let now = Utc::now();
    let mut inserted = 0usize;

    for (run_id, days_ago, sources) in runs {
        let started_at = (now - Duration::days(days_ago)).timestamp() as f64;

        sqlx::query(
            r#"
            INSERT INTO prospector.runs (id, status, started_at, finished_at)
            VALUES ($1, 'completed', $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(run_id)
        .bind(started_at)
        .bind(started_at + 90.0)
        .execute(pool)
        .await?;

        for &(source, username, category, score, with_outreach) in prospects
            .iter()
            .filter(|p| sources.contains(&p.0))
        {
            let outreach = with_outreach.then(|| format!("Hi {username}, saw your work on {source}."));
            let result = sqlx::query(
                r#"
                INSERT INTO prospector.prospects
                (run_id, source, username, category, final_score, outreach_message, fetched_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (run_id, source, username) DO NOTHING
                "#,
            )
            .bind(run_id)
            .bind(source)
            .bind(username)
            .bind(category)
            .bind(score)
            .bind(outreach)
            .bind(started_at + 30.0)
            .execute(pool)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }
    }

    Ok(inserted)
}

#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self))]
    async fn event_times(&self, kind: EventKind, from: f64, to: f64) -> Result<Vec<f64>> {
        let query = match kind {
            EventKind::Prospect => {
                "SELECT fetched_at AS ts FROM prospector.prospects \
                 WHERE fetched_at >= $1 AND fetched_at <= $2 ORDER BY fetched_at"
            }
            EventKind::Run => {
                "SELECT started_at AS ts FROM prospector.runs \
                 WHERE started_at >= $1 AND started_at <= $2 ORDER BY started_at"
            }
        };

        let rows = sqlx::query(query)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), "fetched event timestamps");
        rows.iter()
            .map(|row| row.try_get::<f64, _>("ts").map_err(MetricsError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn prospect_rows(&self) -> Result<Vec<ProspectRow>> {
        let records = sqlx::query(
            "SELECT source, category, final_score, \
             (outreach_message IS NOT NULL AND outreach_message <> '') AS has_outreach \
             FROM prospector.prospects",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut prospects = Vec::with_capacity(records.len());
        for row in records {
            prospects.push(ProspectRow {
                source: row.try_get("source")?,
                category: row.try_get("category")?,
                final_score: row.try_get("final_score")?,
                has_outreach: row.try_get("has_outreach")?,
            });
        }

        Ok(prospects)
    }

    async fn run_count(&self) -> Result<i64> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM prospector.runs")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;
        Ok(total)
    }
}
