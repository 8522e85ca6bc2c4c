use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::history::HistoryEntry;
use crate::pipeline::RunReport;

pub const DEFAULT_SCRAPE_QUERY: &str = "Summarize this page";

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Deserialize)]
pub struct FollowUpRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub status: String,
    pub query: String,
    pub url: String,
    pub title: String,
    pub scraped_text: String,
    pub cleaned_text: String,
    pub summary: String,
    /// File name of the scraped text, downloadable from `/api/artifacts/{name}`.
    pub artifact: String,
    pub summary_artifact: String,
    pub timestamp: DateTime<Utc>,
}

impl From<RunReport> for RunResponse {
    fn from(report: RunReport) -> Self {
        let file_name = |p: &std::path::Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        RunResponse {
            status: "completed".to_string(),
            artifact: file_name(&report.artifact_path),
            summary_artifact: file_name(&report.summary_path),
            query: report.query,
            url: report.url,
            title: report.title,
            scraped_text: report.scraped_text,
            cleaned_text: report.cleaned_text,
            summary: report.summary,
            timestamp: report.timestamp,
        }
    }
}

#[derive(Serialize)]
pub struct DeclinedResponse {
    pub status: String,
    pub query: String,
}

#[derive(Serialize)]
pub struct FollowUpResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub entries: Vec<HistoryEntry>,
}
