pub mod api;
pub mod artifacts;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod refine;
pub mod selector;
pub mod session;

use std::sync::Arc;
use tokio::sync::Mutex;

use browser::{BrowserLauncher, HttpLauncher, PlaywrightLauncher};
use config::{BrowserBackend, Config};
use error::Result;
use extract::{ExtractorSettings, Pacing};
use llm::{LanguageModel, OpenAiClient};
use pipeline::{Pipeline, PipelineSettings};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Mutex<Pipeline>>,
}

impl AppState {
    /// Wires the production model client and browser backend from `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(config.llm.clone()));
        let launcher: Arc<dyn BrowserLauncher> = match config.browser.backend {
            BrowserBackend::Playwright => Arc::new(PlaywrightLauncher::new(config.browser.node_bin.clone())),
            BrowserBackend::Http => Arc::new(HttpLauncher::new()),
        };
        Self::with_components(config, model, launcher, Pacing::default()).await
    }

    pub async fn with_components(
        config: Config,
        model: Arc<dyn LanguageModel>,
        launcher: Arc<dyn BrowserLauncher>,
        pacing: Pacing,
    ) -> Result<Self> {
        let settings = PipelineSettings {
            extractor: ExtractorSettings {
                profile_dir: config.browser.profile_dir.clone(),
                headless: config.browser.headless,
                nav_timeout: config.browser.nav_timeout,
                scrapes_dir: config.scrapes_dir(),
                pacing,
            },
            summaries_dir: config.summaries_dir(),
            history_path: config.history_path(),
        };
        let pipeline = Pipeline::new(model, launcher, settings).await?;
        Ok(AppState {
            config: Arc::new(config),
            pipeline: Arc::new(Mutex::new(pipeline)),
        })
    }
}
