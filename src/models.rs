//! Core data models used throughout Chat Harness.
//!
//! These types represent the uploads, ingested file records, batch reports
//! and chat messages that flow between the ingestion pipeline, the prompt
//! composer and the renderer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::FileFormat;

/// Where an upload's bytes live.
#[derive(Debug, Clone)]
pub enum FileSource {
    Memory(Vec<u8>),
    Path(PathBuf),
}

/// A file offered for upload, before validation.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub size: u64,
    /// May be empty when the host could not determine a MIME type.
    pub mime_type: String,
    pub source: FileSource,
}

impl FileInput {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: FileSource::Memory(bytes),
        }
    }

    /// Consume the input and return its raw bytes.
    pub async fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.source {
            FileSource::Memory(bytes) => Ok(bytes),
            FileSource::Path(path) => tokio::fs::read(path).await,
        }
    }
}

/// A file accepted by validation and run through extraction and chunking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub format: FileFormat,
    pub extracted_text: String,
    pub chunks: Vec<String>,
    /// SHA-256 of the raw bytes, hex encoded.
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A file left out of a batch, with the reasons shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub name: String,
    pub reasons: Vec<String>,
}

/// Outcome of one upload batch. `files` keeps upload order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<IngestedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Inputs dropped because the batch exceeded its file cap.
    pub truncated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat message as persisted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
            provider: None,
            model: None,
            error: false,
        }
    }
}

/// Request body expected by the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub message: String,
}

/// Response body returned by the completion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<CompletionData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub response: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub response_time: Option<serde_json::Value>,
}
