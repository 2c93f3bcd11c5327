use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::models::{DailyCount, PvaPoint, PvaSummary};

pub const VELOCITY_WINDOW: usize = 7;

pub fn compute_pva(daily: &[DailyCount]) -> Result<PvaSummary> {
    validate(daily)?;

    let mut points = Vec::with_capacity(daily.len());
    let mut cumulative = 0i64;

    for (i, day) in daily.iter().enumerate() {
        cumulative += day.count;
        let velocity = window_mean(daily, i);
        // A single-day series reports velocity v and acceleration 0.
        let acceleration = if i == 0 {
            0.0
        } else {
            velocity - window_mean(daily, i - 1)
        };

        points.push(PvaPoint {
            date: day.date,
            value: day.count,
            cumulative,
            velocity: round2(velocity),
            acceleration: round2(acceleration),
        });
    }

    let Some(last) = points.last() else {
        return Ok(PvaSummary::empty());
    };
    debug!(days = points.len(), position = cumulative, "computed pva series");

    Ok(PvaSummary {
        position: last.cumulative,
        velocity: last.velocity,
        acceleration: last.acceleration,
        daily: points,
    })
}

// Window shrinks near the series start; missing days are not zeros.
fn window_mean(daily: &[DailyCount], end: usize) -> f64 {
    let start = (end + 1).saturating_sub(VELOCITY_WINDOW);
    let window = &daily[start..=end];
    let total: i64 = window.iter().map(|d| d.count).sum();
    total as f64 / window.len() as f64
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid emitting -0.0 for tiny negative deltas.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn validate(daily: &[DailyCount]) -> Result<()> {
    if let Some(bad) = daily.iter().find(|d| d.count < 0) {
        return Err(MetricsError::InvariantViolation(format!(
            "negative count {} on {}",
            bad.count, bad.date
        )));
    }

    if let Some(pair) = daily.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(MetricsError::InvariantViolation(format!(
            "dates out of order: {} followed by {}",
            pair[0].date, pair[1].date
        )));
    }

    Ok(())
}
