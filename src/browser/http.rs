use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Selector};
use tracing::debug;

use super::{BrowserLauncher, BrowserSession, Fingerprint, LaunchProfile};
use crate::error::{AppError, Result};

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build HTTP client")
});

// Create static selectors to avoid recompiling them each time
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol",
    "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

#[derive(Clone, Default)]
pub struct HttpLauncher;

impl HttpLauncher {
    pub fn new() -> Self {
        HttpLauncher
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self, profile: &LaunchProfile) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(HttpSession {
            fingerprint: profile.fingerprint.clone(),
            slow_mo: profile.slow_mo,
            html: None,
        }))
    }
}

struct HttpSession {
    fingerprint: Fingerprint,
    slow_mo: Duration,
    html: Option<String>,
}

impl HttpSession {
    fn page(&self) -> Result<&str> {
        self.html
            .as_deref()
            .ok_or_else(|| AppError::ExtractionError("no page has been loaded".to_string()))
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::sleep(self.slow_mo).await;
        let response = CLIENT
            .get(url)
            .header(USER_AGENT, &self.fingerprint.user_agent)
            .header(ACCEPT_LANGUAGE, &self.fingerprint.locale)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| navigation_error(e, timeout))?;
        debug!(url, status = %response.status(), "fetched page");
        let html = response.text().await.map_err(|e| navigation_error(e, timeout))?;
        self.html = Some(html);
        Ok(())
    }

    async fn scroll(&mut self, _dy: i32) -> Result<()> {
        Ok(())
    }

    async fn read_visible_text(&mut self) -> Result<String> {
        Ok(visible_text(self.page()?))
    }

    async fn title(&mut self) -> Result<String> {
        Ok(extract_title(self.page()?))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn navigation_error(err: reqwest::Error, timeout: Duration) -> AppError {
    if err.is_timeout() {
        AppError::ExtractionError(format!("navigation timed out after {}ms", timeout.as_millis()))
    } else {
        AppError::ExtractionError(format!("navigation failed: {}", err))
    }
}

/// Text a reader would see in `<body>`: scripts and styles dropped, whitespace compacted.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY_SELECTOR).next() else {
        return String::new();
    };

    let mut raw = String::with_capacity(html.len() / 2);
    for node in body.descendants() {
        if let Some(element) = node.value().as_element() {
            if BLOCK_TAGS.contains(&element.name()) {
                raw.push('\n');
            }
            continue;
        }
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_TAGS.contains(&e.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }

    format_text(&raw)
}

pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Trims every line, collapses inner whitespace runs and drops blank lines.
pub fn format_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&line);
    }

    result
}
