//! Chat pipeline
//!
//! Wire types for the `/chat` contract and the stages a request passes
//! through: role validation, history trimming, smalltalk detection,
//! retrieval, prompt composition and generation.


pub mod history;
pub mod prompt;
pub mod retrieval;
pub mod service;
pub mod smalltalk;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub use service::{ChatService, ChatSettings};

/// One conversation turn as received on the wire. The role is kept as a
/// string so that unknown roles can be reported instead of rejected by the
/// deserializer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[inline]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User.as_str(), content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(Error::InvalidRole(other.to_string())),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Single-turn shorthand sent by the web widget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChatRequest {
    /// The conversation to answer, falling back to the single-turn shorthand
    #[inline]
    pub fn into_messages(self) -> Vec<Message> {
        match self.message {
            Some(text) if self.messages.is_empty() => vec![Message::user(text)],
            _ => self.messages,
        }
    }
}

/// Output format requested by the caller. Reserved: both modes currently
/// produce the same plain reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Json,
    Markdown,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Markdown => f.write_str("markdown"),
        }
    }
}

/// Which path produced the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Smalltalk,
    Llm,
}

/// Structured rendering of a reply. Never populated yet; the field is part
/// of the response shape so clients can rely on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredReply {
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub steps: Option<Vec<String>>,
    pub caveats: Option<Vec<String>>,
    pub comparison_table: Option<Vec<Vec<String>>>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMeta {
    pub model: String,
    pub mode: Mode,
    pub provider: String,
    pub source: Source,
    /// Wall-clock time spent handling the request, in milliseconds
    pub t_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub reply: String,
    pub raw_json: Option<StructuredReply>,
    pub meta: ChatMeta,
}
