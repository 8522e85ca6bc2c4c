use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::llm::{ChatMessage, ChatRequest, LanguageModel};
use crate::selector::Selection;

const CLEAN_PROMPT: &str = "You clean up text scraped from a web page. Remove navigation menus, \
cookie banners, footers, sign-up prompts and other boilerplate. Return only the main content, \
unchanged in wording, as plain text.";

const ANALYST_PROMPT: &str = "You are a helpful assistant who analyzes website content.";

/// Two single-shot model transforms: strip boilerplate, then summarise.
pub struct ContentRefiner {
    model: Arc<dyn LanguageModel>,
}

impl ContentRefiner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        ContentRefiner { model }
    }

    /// Whatever the model returns is passed on as-is, including an empty string.
    pub async fn clean(&self, raw_text: &str) -> Result<String> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(CLEAN_PROMPT),
            ChatMessage::user(raw_text),
        ]);
        let cleaned = self.transform(request).await?;
        debug!(before = raw_text.len(), after = cleaned.len(), "content cleaned");
        Ok(cleaned)
    }

    /// Summarises `cleaned_text` for `query`.
    ///
    /// With a `selection`, the request replays the tool-call exchange that produced the page
    /// (question, assistant tool call, tool result). Without one it falls back to an
    /// instruction plus the content.
    pub async fn summarize(&self, query: &str, cleaned_text: &str, selection: Option<&Selection>) -> Result<String> {
        let messages = match selection {
            Some(selection) => vec![
                ChatMessage::system(ANALYST_PROMPT),
                ChatMessage::user(query),
                selection.assistant.clone(),
                ChatMessage::tool_result(&selection.call, cleaned_text),
            ],
            None => vec![
                ChatMessage::system(format!(
                    "{} Summarize the page below in Markdown, answering this question: {}",
                    ANALYST_PROMPT, query
                )),
                ChatMessage::user(cleaned_text),
            ],
        };
        self.transform(ChatRequest::new(messages)).await
    }

    async fn transform(&self, request: ChatRequest) -> Result<String> {
        let reply = self
            .model
            .complete(request)
            .await
            .map_err(|e| e.into_refinement())?;
        Ok(reply.content.unwrap_or_default())
    }
}
