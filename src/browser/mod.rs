pub mod http;
pub mod playwright;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::error::Result;

pub use self::http::HttpLauncher;
pub use self::playwright::PlaywrightLauncher;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Safari/605.1.15",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How the browser presents itself to the site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport: Viewport,
    pub locale: String,
    pub timezone: String,
}

impl Fingerprint {
    pub fn random() -> Self {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        Fingerprint {
            user_agent: user_agent.to_string(),
            viewport: Viewport { width: 1280, height: 800 },
            locale: "en-US".to_string(),
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LaunchProfile {
    /// Persistent user-data directory, reused across launches.
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub fingerprint: Fingerprint,
    /// Delay applied to each browser action.
    pub slow_mo: Duration,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, profile: &LaunchProfile) -> Result<Box<dyn BrowserSession>>;
}

/// One live browsing session. `close` consumes the session, so it runs at most once.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    async fn scroll(&mut self, dy: i32) -> Result<()>;
    async fn read_visible_text(&mut self) -> Result<String>;
    async fn title(&mut self) -> Result<String>;
    async fn close(self: Box<Self>) -> Result<()>;
}
