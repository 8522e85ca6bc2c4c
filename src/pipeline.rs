use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::artifacts;
use crate::browser::BrowserLauncher;
use crate::error::{AppError, Result};
use crate::extract::{ExtractionAgent, ExtractorSettings};
use crate::history::{HistoryEntry, HistoryStore};
use crate::llm::LanguageModel;
use crate::refine::ContentRefiner;
use crate::selector::{Selection, ToolDecision, UrlSelector};
use crate::session::ConversationSession;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Selecting,
    Extracting,
    Cleaning,
    Summarizing,
    Logged,
    Failed,
}

/// Everything a completed run produced.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RunReport {
    pub query: String,
    pub url: String,
    pub title: String,
    pub scraped_text: String,
    pub cleaned_text: String,
    pub summary: String,
    pub artifact_path: PathBuf,
    pub summary_path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The model chose not to fetch anything.
    Declined,
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub extractor: ExtractorSettings,
    pub summaries_dir: PathBuf,
    pub history_path: PathBuf,
}

pub struct Pipeline {
    selector: UrlSelector,
    extractor: ExtractionAgent,
    refiner: ContentRefiner,
    history: HistoryStore,
    session: ConversationSession,
    summaries_dir: PathBuf,
    state: PipelineState,
}

impl Pipeline {
    pub async fn new(
        model: Arc<dyn LanguageModel>,
        launcher: Arc<dyn BrowserLauncher>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let history = HistoryStore::open(settings.history_path).await?;
        Ok(Pipeline {
            selector: UrlSelector::new(model.clone()),
            extractor: ExtractionAgent::new(launcher, settings.extractor),
            refiner: ContentRefiner::new(model.clone()),
            history,
            session: ConversationSession::new(model),
            summaries_dir: settings.summaries_dir,
            state: PipelineState::Idle,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Answers `query` by letting the model pick a page.
    pub async fn run(&mut self, query: &str) -> Result<RunOutcome> {
        let query = self.begin(query)?;
        self.transition(PipelineState::Selecting);

        let decision = match self.selector.select(&query).await {
            Ok(decision) => decision,
            Err(e) => return Err(self.fail(e)),
        };
        let selection = match decision {
            ToolDecision::Selected(selection) => selection,
            ToolDecision::Declined => {
                warn!(query = %query, "no page selected, nothing to do");
                self.transition(PipelineState::Idle);
                return Ok(RunOutcome::Declined);
            }
        };

        let url = selection.url.clone();
        self.process(query, url, Some(selection)).await.map(RunOutcome::Completed)
    }

    /// Answers `query` from a page the caller chose, skipping selection.
    pub async fn run_url(&mut self, query: &str, url: &str) -> Result<RunReport> {
        let query = self.begin(query)?;
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::BadRequest("url is empty".to_string()));
        }
        self.process(query, url.to_string(), None).await
    }

    pub async fn follow_up(&self, question: &str) -> Result<String> {
        self.session.follow_up(question).await
    }

    fn begin(&mut self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest("query is empty".to_string()));
        }
        // `&mut self` already rules out a concurrent run; anything but Idle here is a
        // leftover from a failed or abandoned one.
        self.transition(PipelineState::Idle);
        Ok(query.to_string())
    }

    async fn process(&mut self, query: String, url: String, selection: Option<Selection>) -> Result<RunReport> {
        let started = Instant::now();
        match self.process_stages(&query, &url, selection.as_ref()).await {
            Ok(report) => {
                info!(query = %query, url = %url, elapsed = ?started.elapsed(), "run complete");
                self.transition(PipelineState::Idle);
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn process_stages(&mut self, query: &str, url: &str, selection: Option<&Selection>) -> Result<RunReport> {
        self.transition(PipelineState::Extracting);
        let scrape = self.extractor.extract(url).await?;

        self.transition(PipelineState::Cleaning);
        let cleaned_text = self.refiner.clean(&scrape.raw_text).await?;
        if cleaned_text.trim().is_empty() {
            warn!(url, "cleaning returned no content, summarising it anyway");
        }

        self.transition(PipelineState::Summarizing);
        let summary = self.refiner.summarize(query, &cleaned_text, selection).await?;

        let summary_path = artifacts::write_summary(&self.summaries_dir, query, &summary, Local::now()).await?;
        let entry = HistoryEntry {
            query: query.to_string(),
            url: url.to_string(),
            artifact_path: scrape.artifact_path.clone(),
            summary: summary.clone(),
            timestamp: Utc::now(),
        };
        self.history.append(entry.clone()).await?;
        self.transition(PipelineState::Logged);

        self.session.update(query, summary.as_str(), scrape.raw_text.as_str());

        Ok(RunReport {
            query: query.to_string(),
            url: url.to_string(),
            title: scrape.title,
            scraped_text: scrape.raw_text,
            cleaned_text,
            summary,
            artifact_path: scrape.artifact_path,
            summary_path,
            timestamp: entry.timestamp,
        })
    }

    fn fail(&mut self, err: AppError) -> AppError {
        error!(stage = ?self.state, error = %err, "run failed");
        self.transition(PipelineState::Failed);
        err
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "pipeline state");
        }
        self.state = next;
    }
}
