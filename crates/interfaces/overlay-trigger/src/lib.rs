//! Posts a payload to an n8n (or any HTTP) webhook.
//!
//! Without files, `GET` sends the data as query parameters and every other
//! method sends it as a JSON object. Any `--file` switches the body to
//! `multipart/form-data` with the data as text fields.

use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use overlay_config::TRIGGER_BODY_PREVIEW;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_FILE_FIELD: &str = "file";
const CLIPBOARD_FIELD: &str = "clipboard";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Send a payload to a webhook")]
pub struct TriggerArgs {
    #[arg(long)]
    pub url: String,
    #[arg(long, default_value = "POST")]
    pub method: String,
    /// Request header as KEY=VALUE (repeatable)
    #[arg(long = "header")]
    pub headers: Vec<String>,
    /// Payload field as KEY=VALUE (repeatable)
    #[arg(long = "data")]
    pub data: Vec<String>,
    /// File to upload as [FIELD=]PATH (repeatable)
    #[arg(long = "file")]
    pub files: Vec<String>,
    /// Add the clipboard text as a `clipboard` field
    #[arg(long)]
    pub clipboard: bool,
    #[arg(short, long)]
    pub verbose: bool,
}

/// `KEY=VALUE` pairs in first-seen key order. A later repeat of a key wins;
/// an item without `=` maps to an empty value.
pub fn parse_kv<S: AsRef<str>>(items: &[S]) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    for item in items {
        let (key, value) = item.as_ref().split_once('=').unwrap_or((item.as_ref(), ""));
        out.insert(key.to_string(), value.to_string());
    }
    out
}

/// `[FIELD=]PATH` items; the field defaults to `file`.
pub fn parse_files<S: AsRef<str>>(items: &[S]) -> IndexMap<String, PathBuf> {
    let mut out = IndexMap::new();
    for item in items {
        let (field, path) = item
            .as_ref()
            .split_once('=')
            .unwrap_or((DEFAULT_FILE_FIELD, item.as_ref()));
        out.insert(field.to_string(), PathBuf::from(path));
    }
    out
}

#[derive(Debug, Clone)]
pub struct TriggerRequest {
    pub url: String,
    pub method: Method,
    pub headers: IndexMap<String, String>,
    pub data: IndexMap<String, String>,
    pub files: IndexMap<String, PathBuf>,
}

impl TriggerRequest {
    pub fn from_args(args: &TriggerArgs) -> Result<Self> {
        let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;
        Ok(Self {
            url: args.url.clone(),
            method,
            headers: parse_kv(&args.headers),
            data: parse_kv(&args.data),
            files: parse_files(&args.files),
        })
    }

    /// Adds the clipboard text unless a `clipboard` field was given explicitly.
    pub fn add_clipboard(&mut self, text: String) {
        self.data.entry(CLIPBOARD_FIELD.to_string()).or_insert(text);
    }

    pub async fn send(&self, client: &reqwest::Client) -> Result<TriggerResponse> {
        let mut request = client.request(self.method.clone(), &self.url);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        if !self.files.is_empty() {
            let mut form = Form::new();
            for (key, value) in &self.data {
                form = form.text(key.clone(), value.clone());
            }
            for (field, path) in &self.files {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")?;
                form = form.part(field.clone(), part);
            }
            request = request.multipart(form);
        } else if self.method == Method::GET {
            if !self.data.is_empty() {
                request = request.query(&self.data);
            }
        } else {
            request = request.json(&self.data);
        }

        debug!("{} {}", self.method, self.url);
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok(TriggerResponse { status, body })
    }
}

#[derive(Debug)]
pub struct TriggerResponse {
    pub status: reqwest::StatusCode,
    pub body: String,
}

impl TriggerResponse {
    /// The first characters of the body, as printed after the status line.
    pub fn preview(&self) -> &str {
        match self.body.char_indices().nth(TRIGGER_BODY_PREVIEW) {
            Some((end, _)) => &self.body[..end],
            None => &self.body,
        }
    }
}

/// Text currently on the system clipboard, if any can be read.
pub fn read_clipboard() -> Option<String> {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            debug!("Clipboard unavailable: {e}");
            return None;
        }
    };
    match clipboard.get_text() {
        Ok(text) => Some(text),
        Err(e) => {
            debug!("No clipboard text: {e}");
            None
        }
    }
}
