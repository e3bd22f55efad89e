//! Outbound prompt composition and the completion endpoint contract.
//!
//! Ingested files are inlined as `[File: <name>]` blocks ahead of the
//! user's question. Prior messages become a conversation context in one of
//! three [`ContextFormat`]s and are folded into the single `message` field
//! the completion endpoint accepts. Responses are mapped back into
//! assistant [`ChatMessage`]s, with transport failures turned into an
//! apologetic reply flagged as an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::{Config, PromptConfig};
use crate::ingest::Ingestor;
use crate::models::{ChatMessage, CompletionRequest, CompletionResponse, IngestedFile, Role};
use crate::progress::NoProgress;
use crate::sources;

pub const NO_RESPONSE_FALLBACK: &str = "Sorry, I could not generate a response.";
pub const DEFAULT_TITLE: &str = "New Chat";
/// Messages shown in full at the end of a summary context.
const SUMMARY_RECENT_MESSAGES: usize = 3;
const TITLE_WORDS: usize = 4;
const TOP_TOPICS: usize = 3;

const TOPIC_STOPWORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "a", "an", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "must", "shall", "this", "that", "these", "those",
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them",
];

static TOPIC_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{4,}\b").unwrap());
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// How prior messages are rendered into the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFormat {
    /// `Q: …` / `A: …` lines.
    Simple,
    /// `Previous conversation:` followed by `Role (HH:MM:SS): …` lines.
    #[default]
    Detailed,
    /// A one-line topic summary of older messages plus the last three in detail.
    Summary,
}

/// Join file blocks and the question into the outbound prompt.
pub fn compose_prompt(files: &[IngestedFile], question: &str) -> String {
    let mut parts: Vec<String> = files
        .iter()
        .map(|f| format!("[File: {}]\n{}", f.name, f.extracted_text))
        .collect();
    let question = question.trim();
    if !question.is_empty() {
        parts.push(question.to_string());
    }
    parts.join("\n\n")
}

/// Context built from every message except the last, limited to the most
/// recent `max_context_messages`. Empty when memory is off or there is no
/// history.
pub fn build_conversation_context(messages: &[ChatMessage], config: &PromptConfig) -> String {
    if !config.enable_memory || messages.len() <= 1 {
        return String::new();
    }
    let history = &messages[..messages.len() - 1];
    let limited = &history[history.len().saturating_sub(config.max_context_messages)..];
    if limited.is_empty() {
        return String::new();
    }

    match config.context_format {
        ContextFormat::Simple => simple_context(limited),
        ContextFormat::Detailed => detailed_context(limited),
        ContextFormat::Summary => summary_context(limited),
    }
}

fn simple_context(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let tag = match m.role {
                Role::User => "Q",
                Role::Assistant => "A",
            };
            format!("{}: {}", tag, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn detailed_context(messages: &[ChatMessage]) -> String {
    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            match m.timestamp {
                Some(ts) => format!("{} ({}): {}", role, ts.format("%H:%M:%S"), m.content),
                None => format!("{}: {}", role, m.content),
            }
        })
        .collect();
    format!("Previous conversation:\n{}", lines.join("\n"))
}

fn summary_context(messages: &[ChatMessage]) -> String {
    if messages.len() <= SUMMARY_RECENT_MESSAGES {
        return detailed_context(messages);
    }
    let split = messages.len() - SUMMARY_RECENT_MESSAGES;
    let (older, recent) = messages.split_at(split);
    format!(
        "[Earlier in conversation: {} exchanges about {}]\n\n{}",
        older.len(),
        extract_topics(older),
        detailed_context(recent)
    )
}

/// The three most frequent words of four or more letters, ignoring
/// stopwords. Ties keep first-seen order.
pub fn extract_topics(messages: &[ChatMessage]) -> String {
    let text = messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in TOPIC_WORD_RE.find_iter(&text).map(|m| m.as_str()) {
        if TOPIC_STOPWORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    if order.is_empty() {
        return "various topics".to_string();
    }
    order
        .into_iter()
        .take(TOP_TOPICS)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the request body for the conversation's latest user message.
pub fn build_request(messages: &[ChatMessage], config: &PromptConfig) -> Result<CompletionRequest> {
    let current = match messages.iter().rev().find(|m| m.role == Role::User) {
        Some(m) if !m.content.trim().is_empty() => m,
        _ => bail!("No message content to send"),
    };

    let context = build_conversation_context(messages, config);
    let message = if context.trim().is_empty() {
        current.content.clone()
    } else {
        format!("Context: {}\n\nCurrent message: {}", context, current.content)
    };
    Ok(CompletionRequest { message })
}

/// Map a completion response to an assistant message.
pub fn reply_from_response(response: &CompletionResponse) -> Result<ChatMessage> {
    if !response.success {
        bail!("API returned unsuccessful response");
    }
    let data = response.data.as_ref();
    let content = data
        .and_then(|d| d.response.as_deref())
        .filter(|r| !r.is_empty())
        .unwrap_or(NO_RESPONSE_FALLBACK);

    let mut reply = ChatMessage::new(Role::Assistant, content);
    reply.provider = data.and_then(|d| d.provider.clone());
    reply.model = data.and_then(|d| d.model.clone());
    Ok(reply)
}

/// Assistant message shown when sending failed.
pub fn error_reply(error: &anyhow::Error) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: format!(
            "I'm sorry, but I encountered an error while processing your request: {}",
            error
        ),
        timestamp: Some(Utc::now()),
        provider: None,
        model: None,
        error: true,
    }
}

/// Request asking the endpoint to title the conversation, if it has a user message.
pub fn title_request(messages: &[ChatMessage]) -> Option<CompletionRequest> {
    let first = messages.iter().find(|m| m.role == Role::User)?;
    Some(CompletionRequest {
        message: format!(
            "Generate a concise, descriptive title (maximum 6 words) for this conversation based on this message: \"{}\". Return only the title, nothing else.",
            first.content
        ),
    })
}

/// Title from the endpoint's answer, else the local [`simple_title`].
pub fn title_from_response(messages: &[ChatMessage], response: &CompletionResponse) -> String {
    let Some(first) = messages.iter().find(|m| m.role == Role::User) else {
        return DEFAULT_TITLE.to_string();
    };
    let generated = response
        .data
        .as_ref()
        .and_then(|d| d.response.as_deref())
        .map(str::trim)
        .filter(|t| response.success && !t.is_empty());
    match generated {
        Some(title) => title.to_string(),
        None => simple_title(&first.content),
    }
}

/// First four words of `content` with punctuation removed.
pub fn simple_title(content: &str) -> String {
    let cleaned = NON_WORD_RE.replace_all(content, "");
    let title = cleaned
        .trim()
        .split(' ')
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    if title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

/// `chx prompt`: ingest `paths`, compose the question and print the
/// outbound request.
pub async fn run_prompt(
    config: &Config,
    paths: &[PathBuf],
    question: &str,
    history: Option<&Path>,
    json: bool,
) -> Result<()> {
    let inputs = sources::collect_inputs(paths, &config.ingest)?;
    let report = Ingestor::new(config.ingest.clone())
        .ingest_batch(inputs, &NoProgress)
        .await;
    for skip in &report.skipped {
        eprintln!("skipped {}: {}", skip.name, skip.reasons.join("; "));
    }

    let mut messages: Vec<ChatMessage> = match history {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read history file: {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| "Failed to parse history file")?
        }
        None => Vec::new(),
    };
    messages.push(ChatMessage::new(
        Role::User,
        compose_prompt(&report.files, question),
    ));

    let request = build_request(&messages, &config.prompt)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&request)?);
    } else {
        println!("{}", request.message);
    }
    Ok(())
}
