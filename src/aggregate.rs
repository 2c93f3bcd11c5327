use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::error::{MetricsError, Result};
use crate::models::{
    CategoryBreakdown, DailyCount, ProspectRow, ScoreBucket, SourceBreakdown, StatsSummary,
};
use crate::store::{EventKind, EventStore};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

const SCORE_BUCKETS: [&str; 5] = ["0.0-0.2", "0.2-0.4", "0.4-0.6", "0.6-0.8", "0.8-1.0"];

#[instrument(skip(store))]
pub async fn daily_counts(
    store: &dyn EventStore,
    kind: EventKind,
    window_days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<DailyCount>> {
    if window_days < 1 {
        return Err(MetricsError::InvalidWindow(window_days));
    }

    let start = Duration::try_days(window_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or(MetricsError::InvalidWindow(window_days))?;
    let from = epoch_seconds(start);
    let to = epoch_seconds(now);
    let times = store.event_times(kind, from, to).await?;

    let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for ts in times {
        match event_date(ts) {
            Some(date) => *per_day.entry(date).or_insert(0) += 1,
            None => warn!(timestamp = ts, "skipping event with unusable timestamp"),
        }
    }

    debug!(days = per_day.len(), "grouped events by day");
    Ok(per_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect())
}

#[instrument(skip(store))]
pub async fn summary(store: &dyn EventStore) -> Result<StatsSummary> {
    let rows = store.prospect_rows().await?;
    let total_runs = store.run_count().await?;

    Ok(StatsSummary {
        total_prospects: rows.len() as i64,
        total_outreach: rows.iter().filter(|row| row.has_outreach).count() as i64,
        total_runs,
        by_source: summarize_by_source(&rows),
        by_category: summarize_by_category(&rows),
        score_distribution: score_distribution(&rows),
    })
}

#[derive(Debug, Default)]
struct ScoreAccumulator {
    count: i64,
    scored: i64,
    total: f64,
}

impl ScoreAccumulator {
    fn add(&mut self, score: Option<f64>) {
        self.count += 1;
        if let Some(score) = score {
            self.scored += 1;
            self.total += score;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.scored == 0 {
            None
        } else {
            Some(self.total / self.scored as f64)
        }
    }
}

fn group_scores<'a, F>(rows: &'a [ProspectRow], key: F) -> Vec<(String, ScoreAccumulator)>
where
    F: Fn(&'a ProspectRow) -> Option<&'a str>,
{
    let mut map: HashMap<&str, ScoreAccumulator> = HashMap::new();

    for row in rows {
        if let Some(label) = key(row) {
            map.entry(label).or_default().add(row.final_score);
        }
    }

    let mut groups: Vec<(String, ScoreAccumulator)> = map
        .into_iter()
        .map(|(label, acc)| (label.to_string(), acc))
        .collect();

    groups.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
    groups
}

pub fn summarize_by_source(rows: &[ProspectRow]) -> Vec<SourceBreakdown> {
    group_scores(rows, |row| Some(row.source.as_str()))
        .into_iter()
        .map(|(source, acc)| SourceBreakdown {
            source,
            count: acc.count,
            avg_score: acc.mean(),
        })
        .collect()
}

pub fn summarize_by_category(rows: &[ProspectRow]) -> Vec<CategoryBreakdown> {
    group_scores(rows, |row| {
        row.category.as_deref().filter(|category| !category.is_empty())
    })
    .into_iter()
    .map(|(category, acc)| CategoryBreakdown {
        category,
        count: acc.count,
        avg_score: acc.mean(),
    })
    .collect()
}

pub fn score_distribution(rows: &[ProspectRow]) -> Vec<ScoreBucket> {
    let mut counts = [0i64; SCORE_BUCKETS.len()];

    for score in rows.iter().filter_map(|row| row.final_score) {
        if score.is_nan() {
            continue;
        }
        counts[bucket_index(score)] += 1;
    }

    SCORE_BUCKETS
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(bucket, count)| ScoreBucket { bucket, count })
        .collect()
}

/// Lower bounds are inclusive; the top bucket also takes 1.0 and above.
fn bucket_index(score: f64) -> usize {
    match score {
        s if s < 0.2 => 0,
        s if s < 0.4 => 1,
        s if s < 0.6 => 2,
        s if s < 0.8 => 3,
        _ => 4,
    }
}

fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

fn event_date(ts: f64) -> Option<NaiveDate> {
    if !ts.is_finite() {
        return None;
    }
    DateTime::from_timestamp(ts.floor() as i64, 0).map(|at| at.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;

    fn row(source: &str, category: Option<&str>, score: Option<f64>) -> ProspectRow {
        ProspectRow {
            source: source.to_string(),
            category: category.map(str::to_string),
            final_score: score,
            has_outreach: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 20, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64, hour: u32) -> f64 {
        let date = now().date_naive() - Duration::days(days);
        let at = date.and_hms_opt(hour, 0, 0).unwrap().and_utc();
        epoch_seconds(at)
    }

    #[test]
    fn bucket_edges_are_half_open() {
        let rows: Vec<ProspectRow> = [0.0, 0.19, 0.2, 0.79, 0.8, 1.0]
            .into_iter()
            .map(|s| row("hn", None, Some(s)))
            .collect();

        let buckets = score_distribution(&rows);
        assert_eq!(
            buckets,
            vec![
                ScoreBucket { bucket: "0.0-0.2", count: 2 },
                ScoreBucket { bucket: "0.2-0.4", count: 1 },
                ScoreBucket { bucket: "0.6-0.8", count: 1 },
                ScoreBucket { bucket: "0.8-1.0", count: 2 },
            ]
        );
    }

    #[test]
    fn null_scores_are_not_bucketed() {
        let rows = vec![row("hn", None, None), row("hn", None, Some(0.5))];
        let buckets = score_distribution(&rows);
        assert_eq!(buckets, vec![ScoreBucket { bucket: "0.4-0.6", count: 1 }]);
    }

    #[test]
    fn category_breakdown_skips_missing_categories() {
        let rows = vec![
            row("github", Some("devtools"), Some(0.6)),
            row("github", None, Some(0.2)),
            row("hn", Some(""), Some(0.4)),
            row("hn", Some("devtools"), Some(0.8)),
        ];

        let categories = summarize_by_category(&rows);
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].category, "devtools");
        assert_eq!(categories[0].count, 2);
        assert!((categories[0].avg_score.unwrap() - 0.7).abs() < 1e-9);

        let sources = summarize_by_source(&rows);
        let total: i64 = sources.iter().map(|s| s.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn mean_ignores_null_scores() {
        let rows = vec![
            row("hn", None, Some(0.4)),
            row("hn", None, None),
            row("x", None, None),
        ];
        let sources = summarize_by_source(&rows);
        assert_eq!(sources[0].source, "hn");
        assert_eq!(sources[0].count, 2);
        assert!((sources[0].avg_score.unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(sources[1].avg_score, None);
    }

    #[test]
    fn groups_sort_by_count_then_label() {
        let rows = vec![
            row("x", None, Some(0.1)),
            row("bootcamps", None, Some(0.1)),
            row("github", None, Some(0.1)),
            row("github", None, Some(0.1)),
        ];
        let labels: Vec<String> = summarize_by_source(&rows)
            .into_iter()
            .map(|s| s.source)
            .collect();
        assert_eq!(labels, vec!["github", "bootcamps", "x"]);
    }

    #[tokio::test]
    async fn daily_counts_group_by_date_and_skip_gaps() {
        let store = MemoryStore {
            runs: vec![days_ago(5, 1), days_ago(5, 23), days_ago(2, 9), days_ago(40, 9)],
            ..Default::default()
        };

        let counts = daily_counts(&store, EventKind::Run, 30, now()).await.unwrap();
        let today = now().date_naive();
        assert_eq!(
            counts,
            vec![
                DailyCount { date: today - Duration::days(5), count: 2 },
                DailyCount { date: today - Duration::days(2), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn empty_window_is_not_an_error() {
        let store = MemoryStore::default();
        let counts = daily_counts(&store, EventKind::Prospect, 30, now())
            .await
            .unwrap();
        assert!(counts.is_empty());
    }

    #[tokio::test]
    async fn rejects_zero_day_window() {
        let store = MemoryStore::default();
        let err = daily_counts(&store, EventKind::Run, 0, now()).await.unwrap_err();
        assert!(matches!(err, MetricsError::InvalidWindow(0)));
    }

    #[tokio::test]
    async fn rejects_window_past_calendar_range() {
        let store = MemoryStore::default();
        for days in [100_000_000, i64::MAX] {
            let err = daily_counts(&store, EventKind::Run, days, now())
                .await
                .unwrap_err();
            assert!(matches!(err, MetricsError::InvalidWindow(d) if d == days));
        }
    }

    #[tokio::test]
    async fn window_includes_both_ends() {
        let oldest = epoch_seconds(now() - Duration::days(30));
        let newest = epoch_seconds(now());
        let store = MemoryStore {
            runs: vec![oldest - 1.0, oldest, newest, newest + 1.0],
            ..Default::default()
        };

        let counts = daily_counts(&store, EventKind::Run, 30, now()).await.unwrap();
        let today = now().date_naive();
        assert_eq!(
            counts,
            vec![
                DailyCount { date: today - Duration::days(30), count: 1 },
                DailyCount { date: today, count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn offline_store_surfaces_failure() {
        let store = MemoryStore {
            offline: true,
            ..Default::default()
        };
        let err = summary(&store).await.unwrap_err();
        assert!(matches!(err, MetricsError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn summary_counts_outreach_and_runs() {
        let mut with_outreach = row("hn", Some("founders"), Some(0.9));
        with_outreach.has_outreach = true;
        let store = MemoryStore {
            prospects: vec![
                (days_ago(1, 8), with_outreach),
                (days_ago(90, 8), row("github", None, Some(0.3))),
            ],
            runs: vec![days_ago(1, 7), days_ago(90, 7), days_ago(91, 7)],
            offline: false,
        };

        let stats = summary(&store).await.unwrap();
        assert_eq!(stats.total_prospects, 2);
        assert_eq!(stats.total_outreach, 1);
        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.by_category.len(), 1);
        assert_eq!(stats.score_distribution.len(), 2);
    }
}
