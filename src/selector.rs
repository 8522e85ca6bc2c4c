use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::error::Result;
use crate::llm::{ChatMessage, ChatRequest, LanguageModel, ToolCall, ToolChoice, ToolSpec};

pub const SCRAPE_TOOL: &str = "scrape_page";
/// Used when the model calls the tool but its `url` argument is unusable.
pub const FALLBACK_URL: &str = "https://example.com";

const SELECTOR_PROMPT: &str = "You're a research assistant that chooses websites to scrape. \
Call the scrape_page tool with the single full URL most likely to answer the user's question. \
Do not answer the question yourself.";

/// The tool-call exchange that picked a URL, kept so the summary can replay it.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub url: String,
    pub query: String,
    /// The assistant turn exactly as the model produced it.
    pub assistant: ChatMessage,
    pub call: ToolCall,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolDecision {
    Selected(Selection),
    Declined,
}

impl ToolDecision {
    pub fn url(&self) -> Option<&str> {
        match self {
            ToolDecision::Selected(selection) => Some(&selection.url),
            ToolDecision::Declined => None,
        }
    }
}

pub fn scrape_tool() -> ToolSpec {
    ToolSpec::function(
        SCRAPE_TOOL,
        "Scrapes visible text from a webpage",
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "Full URL to fetch" }
            },
            "required": ["url"]
        }),
    )
}

pub struct UrlSelector {
    model: Arc<dyn LanguageModel>,
}

impl UrlSelector {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        UrlSelector { model }
    }

    /// Asks the model to pick one page for `query`.
    ///
    /// A reply without a tool call is `Declined`, not an error. Provider failures propagate.
    pub async fn select(&self, query: &str) -> Result<ToolDecision> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(SELECTOR_PROMPT),
            ChatMessage::user(query),
        ])
        .with_tools(vec![scrape_tool()], ToolChoice::Auto);

        let reply = self.model.complete(request).await?;
        let decision = decide(query, reply);
        match &decision {
            ToolDecision::Selected(selection) => info!(url = %selection.url, "model selected a page"),
            ToolDecision::Declined => warn!("model did not call the scrape tool"),
        }
        Ok(decision)
    }
}

fn decide(query: &str, reply: ChatMessage) -> ToolDecision {
    let Some(call) = reply.tool_calls.first().cloned() else {
        return ToolDecision::Declined;
    };
    let url = url_argument(&call.function.arguments).unwrap_or_else(|| {
        warn!(arguments = %call.function.arguments, "tool call had no usable url, using fallback");
        FALLBACK_URL.to_string()
    });
    ToolDecision::Selected(Selection {
        url,
        query: query.to_string(),
        assistant: reply,
        call,
    })
}

fn url_argument(arguments: &str) -> Option<String> {
    let args: serde_json::Value = serde_json::from_str(arguments).ok()?;
    args.get("url")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
