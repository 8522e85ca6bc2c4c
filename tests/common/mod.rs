#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use smart_scraper_agent::browser::{BrowserLauncher, BrowserSession, LaunchProfile};
use smart_scraper_agent::config::Config;
use smart_scraper_agent::error::{AppError, Result};
use smart_scraper_agent::extract::{ExtractorSettings, Pacing};
use smart_scraper_agent::llm::{ChatMessage, ChatRequest, FunctionCall, LanguageModel, Role, ToolCall};
use smart_scraper_agent::pipeline::{Pipeline, PipelineSettings};

/// A model that replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ChatMessage>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ChatMessage>>) -> Arc<Self> {
        Arc::new(ScriptedModel {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatMessage> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LlmError("no scripted reply left".to_string())))
    }
}

pub fn tool_call_reply(arguments: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: None,
        tool_calls: vec![ToolCall {
            id: "call_abc".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "scrape_page".to_string(),
                arguments: arguments.to_string(),
            },
        }],
        tool_call_id: None,
        name: None,
    }
}

pub fn url_reply(url: &str) -> ChatMessage {
    tool_call_reply(&serde_json::json!({ "url": url }).to_string())
}

#[derive(Clone, Debug)]
pub enum NavBehavior {
    Load { text: String, title: String },
    Fail(String),
    Hang,
}

/// Browser double that counts launches and closes.
pub struct FakeLauncher {
    behavior: NavBehavior,
    pub launches: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub visited: Arc<Mutex<Vec<String>>>,
    pub profiles: Mutex<Vec<LaunchProfile>>,
}

impl FakeLauncher {
    pub fn new(behavior: NavBehavior) -> Arc<Self> {
        Arc::new(FakeLauncher {
            behavior,
            launches: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            visited: Arc::new(Mutex::new(Vec::new())),
            profiles: Mutex::new(Vec::new()),
        })
    }

    pub fn page(text: &str, title: &str) -> Arc<Self> {
        Self::new(NavBehavior::Load {
            text: text.to_string(),
            title: title.to_string(),
        })
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, profile: &LaunchProfile) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.profiles.lock().unwrap().push(profile.clone());
        Ok(Box::new(FakeSession {
            behavior: self.behavior.clone(),
            closes: self.closes.clone(),
            visited: self.visited.clone(),
            loaded: false,
        }))
    }
}

struct FakeSession {
    behavior: NavBehavior,
    closes: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    loaded: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        match &self.behavior {
            NavBehavior::Load { .. } => {
                self.loaded = true;
                Ok(())
            }
            NavBehavior::Fail(msg) => Err(AppError::ExtractionError(msg.clone())),
            NavBehavior::Hang => std::future::pending().await,
        }
    }

    async fn scroll(&mut self, _dy: i32) -> Result<()> {
        Ok(())
    }

    async fn read_visible_text(&mut self) -> Result<String> {
        match &self.behavior {
            NavBehavior::Load { text, .. } if self.loaded => Ok(text.clone()),
            _ => Err(AppError::ExtractionError("nothing loaded".to_string())),
        }
    }

    async fn title(&mut self) -> Result<String> {
        match &self.behavior {
            NavBehavior::Load { title, .. } if self.loaded => Ok(title.clone()),
            _ => Err(AppError::ExtractionError("nothing loaded".to_string())),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_config(data_dir: &Path) -> Config {
    let data_dir = data_dir.to_string_lossy().into_owned();
    Config::from_lookup(|key| match key {
        "LLM_API_KEY" => Some("test-key".to_string()),
        "DATA_DIR" => Some(data_dir.clone()),
        _ => None,
    })
    .unwrap()
}

pub fn settings(data_dir: &Path, nav_timeout: Duration) -> PipelineSettings {
    PipelineSettings {
        extractor: ExtractorSettings {
            profile_dir: data_dir.join(".browser-profile"),
            headless: true,
            nav_timeout,
            scrapes_dir: data_dir.join("scrapes"),
            pacing: Pacing::none(),
        },
        summaries_dir: data_dir.join("summaries"),
        history_path: data_dir.join("history.json"),
    }
}

pub async fn pipeline(data_dir: &Path, model: Arc<ScriptedModel>, launcher: Arc<FakeLauncher>) -> Pipeline {
    Pipeline::new(model, launcher, settings(data_dir, Duration::from_secs(15)))
        .await
        .unwrap()
}

pub fn files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
