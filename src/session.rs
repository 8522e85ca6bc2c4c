use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Result};
use crate::llm::{ChatMessage, ChatRequest, LanguageModel};

/// The most recent completed interaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionTurn {
    pub query: String,
    pub summary: String,
    pub raw_text: String,
}

/// Single-turn conversational memory used to answer follow-up questions.
pub struct ConversationSession {
    model: Arc<dyn LanguageModel>,
    turn: Option<SessionTurn>,
}

impl ConversationSession {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        ConversationSession { model, turn: None }
    }

    /// Replaces the retained turn wholesale.
    pub fn update(&mut self, query: impl Into<String>, summary: impl Into<String>, raw_text: impl Into<String>) {
        self.turn = Some(SessionTurn {
            query: query.into(),
            summary: summary.into(),
            raw_text: raw_text.into(),
        });
    }

    pub fn turn(&self) -> Option<&SessionTurn> {
        self.turn.as_ref()
    }

    /// Asks `question` against the stored query and summary.
    ///
    /// The request is exactly `[user query, assistant summary, user question]`; earlier
    /// follow-up answers are not replayed.
    pub async fn follow_up(&self, question: &str) -> Result<String> {
        let turn = self
            .turn
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("there is no completed query to follow up on".to_string()))?;
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::BadRequest("follow-up question is empty".to_string()));
        }

        let request = ChatRequest::new(follow_up_messages(turn, question));
        let reply = self.model.complete(request).await?;
        info!(query = %turn.query, "follow-up answered");
        Ok(reply.content.unwrap_or_default())
    }
}

fn follow_up_messages(turn: &SessionTurn, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::user(turn.query.as_str()),
        ChatMessage::assistant(turn.summary.as_str()),
        ChatMessage::user(question),
    ]
}
