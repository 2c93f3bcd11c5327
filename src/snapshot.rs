use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::aggregate;
use crate::error::Result;
use crate::kinematics::compute_pva;
use crate::models::MetricsSnapshot;
use crate::store::{EventKind, EventStore};

/// Any failing query fails the whole snapshot.
#[instrument(skip(store))]
pub async fn build_snapshot(
    store: &dyn EventStore,
    window_days: i64,
    now: DateTime<Utc>,
) -> Result<MetricsSnapshot> {
    let summary = aggregate::summary(store).await?;
    let daily_prospects =
        aggregate::daily_counts(store, EventKind::Prospect, window_days, now).await?;
    let daily_runs = aggregate::daily_counts(store, EventKind::Run, window_days, now).await?;

    let snapshot = MetricsSnapshot {
        summary,
        prospect_metrics: compute_pva(&daily_prospects)?,
        run_metrics: compute_pva(&daily_runs)?,
    };

    info!(
        prospects = snapshot.summary.total_prospects,
        runs = snapshot.summary.total_runs,
        prospect_velocity = snapshot.prospect_metrics.velocity,
        run_velocity = snapshot.run_metrics.velocity,
        "built metrics snapshot"
    );
    Ok(snapshot)
}
