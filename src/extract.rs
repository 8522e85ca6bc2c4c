use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::artifacts;
use crate::browser::{BrowserLauncher, BrowserSession, Fingerprint, LaunchProfile};
use crate::error::{AppError, Result};

pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_SLUG_CHARS: usize = 50;
pub const SLUG_PLACEHOLDER: &str = "scrape";

/// Randomised timing used to look less like automated traffic.
#[derive(Clone, Debug, PartialEq)]
pub struct Pacing {
    pub action_delay_ms: RangeInclusive<u64>,
    pub settle_ms: RangeInclusive<u64>,
    pub scroll_px: i32,
    pub after_scroll_ms: RangeInclusive<u64>,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            action_delay_ms: 200..=400,
            settle_ms: 2500..=4500,
            scroll_px: 400,
            after_scroll_ms: 500..=1500,
        }
    }
}

/// One draw from a [`Pacing`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingPlan {
    pub action_delay: Duration,
    pub settle: Duration,
    pub after_scroll: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Pacing {
            action_delay_ms: 0..=0,
            settle_ms: 0..=0,
            scroll_px: 400,
            after_scroll_ms: 0..=0,
        }
    }

    pub fn sample(&self) -> PacingPlan {
        let mut rng = rand::thread_rng();
        let mut draw = |range: &RangeInclusive<u64>| {
            if range.is_empty() {
                Duration::ZERO
            } else {
                Duration::from_millis(rng.gen_range(range.clone()))
            }
        };
        PacingPlan {
            action_delay: draw(&self.action_delay_ms),
            settle: draw(&self.settle_ms),
            after_scroll: draw(&self.after_scroll_ms),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExtractorSettings {
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub nav_timeout: Duration,
    pub scrapes_dir: PathBuf,
    pub pacing: Pacing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScrapeResult {
    pub url: String,
    /// Visible page text, at most [`MAX_TEXT_CHARS`] characters.
    pub raw_text: String,
    pub title: String,
    pub captured_at: DateTime<Local>,
    pub artifact_path: PathBuf,
}

pub struct ExtractionAgent {
    launcher: Arc<dyn BrowserLauncher>,
    settings: ExtractorSettings,
}

struct PageCapture {
    text: String,
    title: String,
}

impl ExtractionAgent {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: ExtractorSettings) -> Self {
        ExtractionAgent { launcher, settings }
    }

    /// Fetches the visible text of `url` and saves it as a scrape artifact.
    ///
    /// The browser session is closed before this returns, whether or not the page was read.
    pub async fn extract(&self, url: &str) -> Result<ScrapeResult> {
        let started = Instant::now();
        let plan = self.settings.pacing.sample();
        let profile = LaunchProfile {
            profile_dir: self.settings.profile_dir.clone(),
            headless: self.settings.headless,
            fingerprint: Fingerprint::random(),
            slow_mo: plan.action_delay,
        };
        debug!(url, user_agent = %profile.fingerprint.user_agent, ?plan, "launching browser");

        let mut session = self.launcher.launch(&profile).await?;
        let captured = self.capture(session.as_mut(), url, plan).await;
        if let Err(e) = session.close().await {
            warn!(url, error = %e, "browser did not close cleanly");
        }
        let page = captured?;

        let captured_at = Local::now();
        let raw_text = truncate_chars(&page.text, MAX_TEXT_CHARS);
        let slug = slugify(&page.title);
        let artifact_path = artifacts::write_unique(
            &self.settings.scrapes_dir,
            &slug,
            "txt",
            captured_at,
            &artifacts::scrape_file_contents(url, &raw_text),
        )
        .await?;

        info!(
            url,
            chars = raw_text.chars().count(),
            artifact = %artifact_path.display(),
            elapsed = ?started.elapsed(),
            "page extracted"
        );
        Ok(ScrapeResult {
            url: url.to_string(),
            raw_text,
            title: page.title,
            captured_at,
            artifact_path,
        })
    }

    async fn capture(&self, session: &mut dyn BrowserSession, url: &str, plan: PacingPlan) -> Result<PageCapture> {
        let timeout = self.settings.nav_timeout;
        match tokio::time::timeout(timeout, session.navigate(url, timeout)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::ExtractionError(format!(
                    "navigation to {} timed out after {}ms",
                    url,
                    timeout.as_millis()
                )));
            }
        }

        tokio::time::sleep(plan.settle).await;
        session.scroll(self.settings.pacing.scroll_px).await?;
        tokio::time::sleep(plan.after_scroll).await;

        let text = session.read_visible_text().await?;
        let title = session.title().await?;
        Ok(PageCapture { text, title })
    }
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Reduces a page title to `[A-Za-z0-9 _-]`, at most [`MAX_SLUG_CHARS`] long, never empty.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let slug: String = kept.trim_end().chars().take(MAX_SLUG_CHARS).collect();
    if slug.trim().is_empty() {
        SLUG_PLACEHOLDER.to_string()
    } else {
        slug
    }
}
