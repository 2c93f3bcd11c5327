use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvaPoint {
    pub date: NaiveDate,
    pub value: i64,
    pub cumulative: i64,
    pub velocity: f64,
    pub acceleration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvaSummary {
    pub position: i64,
    pub velocity: f64,
    pub acceleration: f64,
    pub daily: Vec<PvaPoint>,
}

impl PvaSummary {
    pub fn empty() -> Self {
        Self {
            position: 0,
            velocity: 0.0,
            acceleration: 0.0,
            daily: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProspectRow {
    pub source: String,
    pub category: Option<String>,
    pub final_score: Option<f64>,
    pub has_outreach: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBreakdown {
    pub source: String,
    pub count: i64,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub count: i64,
    pub avg_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBucket {
    pub bucket: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_prospects: i64,
    pub total_outreach: i64,
    pub total_runs: i64,
    pub by_source: Vec<SourceBreakdown>,
    pub by_category: Vec<CategoryBreakdown>,
    pub score_distribution: Vec<ScoreBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub summary: StatsSummary,
    pub prospect_metrics: PvaSummary,
    pub run_metrics: PvaSummary,
}
