//! # Generator Service Client
//!
//! Talks to the remote generator over HTTP:
//!
//! - `POST /preview-data` returns a small sample table. Previews never fail
//!   from the caller's point of view; any error is folded into the returned
//!   `PreviewResult`.
//! - `POST /generate-ini` returns the `rules.ini` file the service built.
//! - `POST /parse-ini` uploads an existing `rules.ini` and returns it as a
//!   rule file.
//!
//! Nothing is retried. Each call gets one attempt bounded by the client
//! timeout.

use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::error::{PseudoGenError, Result};
use crate::ini;
use crate::model::RuleFile;
use crate::wire::{ParseIniResponse, PreviewResult, WireRuleFile};

/// Service URL used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Largest number of rows a preview asks for.
pub const DEFAULT_PREVIEW_ROWS: u64 = 25;

/// Maximum time to wait for the generator before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PREVIEW_PATH: &str = "preview-data";
const GENERATE_PATH: &str = "generate-ini";
const PARSE_PATH: &str = "parse-ini";

/// Build the body of a preview request: the full wire form with the record
/// count capped at `row_cap`.
pub fn preview_request(rule_file: &RuleFile, row_cap: u64) -> WireRuleFile {
    let mut body = WireRuleFile::from(rule_file);
    body.num_records = body.num_records.min(row_cap);
    body
}

#[derive(Debug, Clone)]
pub struct GeneratorClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GeneratorClient {
    /// Create a client for the service at `base_url`.
    ///
    /// A path on the base URL is kept, so `http://host/api` sends previews to
    /// `http://host/api/preview-data`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut url = Url::parse(base_url).map_err(|e| PseudoGenError::Config {
            message: format!("invalid server URL '{}': {}", base_url, e),
        })?;
        if url.cannot_be_a_base() {
            return Err(PseudoGenError::Config {
                message: format!("server URL '{}' cannot be used as a base URL", base_url),
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PseudoGenError::Http {
                endpoint: url.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| PseudoGenError::Config {
            message: format!("cannot build URL for {}: {}", path, e),
        })
    }

    /// Request a preview, folding every failure into the result.
    pub async fn preview(&self, rule_file: &RuleFile, row_cap: u64) -> PreviewResult {
        match self.try_preview(rule_file, row_cap).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Preview failed: {}", e);
                PreviewResult::failed(e.to_string())
            }
        }
    }

    /// Request a preview and surface failures as errors.
    pub async fn try_preview(&self, rule_file: &RuleFile, row_cap: u64) -> Result<PreviewResult> {
        if rule_file.columns.is_empty() {
            return Ok(PreviewResult::no_columns());
        }

        let url = self.endpoint(PREVIEW_PATH)?;
        let body = preview_request(rule_file, row_cap);
        tracing::debug!(
            "POST {} ({} columns, {} rows)",
            url,
            body.columns.len(),
            body.num_records
        );

        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let text = read_success_body(&url, response).await?;

        serde_json::from_str(&text).map_err(|e| PseudoGenError::Service {
            endpoint: url.to_string(),
            status: 200,
            detail: format!("unexpected preview response: {}", e),
        })
    }

    /// Ask the service to build the `rules.ini` file for `rule_file`.
    pub async fn generate(&self, rule_file: &RuleFile) -> Result<Vec<u8>> {
        let url = self.endpoint(GENERATE_PATH)?;
        let body = WireRuleFile::from(rule_file);
        tracing::debug!("POST {} ({} columns)", url, body.columns.len());

        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;
        if !status.is_success() {
            return Err(PseudoGenError::Service {
                endpoint: url.to_string(),
                status: status.as_u16(),
                detail: error_detail(&String::from_utf8_lossy(&bytes)),
            });
        }
        Ok(bytes.to_vec())
    }

    /// Upload a `rules.ini` file and convert the service's reading of it.
    ///
    /// A path without the `.ini` extension is rejected before the file is
    /// read or any request is made.
    pub async fn parse_ini(&self, path: &Path) -> Result<RuleFile> {
        ini::ensure_ini_extension(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PseudoGenError::Output {
                message: format!("failed to read {}", path.display()),
                source: e,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ini::RULES_FILE_NAME.to_string());
        self.parse_ini_bytes(&file_name, bytes).await
    }

    /// Upload in-memory `rules.ini` content under `file_name`.
    pub async fn parse_ini_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<RuleFile> {
        ini::ensure_ini_extension(Path::new(file_name))?;
        let url = self.endpoint(PARSE_PATH)?;
        tracing::debug!("POST {} ({}, {} bytes)", url, file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let text = read_success_body(&url, response).await?;

        let parsed: ParseIniResponse =
            serde_json::from_str(&text).map_err(|e| PseudoGenError::Service {
                endpoint: url.to_string(),
                status: 200,
                detail: format!("unexpected parse-ini response: {}", e),
            })?;

        match parsed.data {
            Some(data) if parsed.success => RuleFile::try_from(data),
            _ => Err(PseudoGenError::Service {
                endpoint: url.to_string(),
                status: 200,
                detail: parsed
                    .detail
                    .or(parsed.message)
                    .unwrap_or_else(|| "service could not read the file".to_string()),
            }),
        }
    }
}

fn transport_error(url: &Url, e: reqwest::Error) -> PseudoGenError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("could not connect to the generator service ({})", e)
    } else {
        e.to_string()
    };
    PseudoGenError::Http {
        endpoint: url.to_string(),
        message,
    }
}

async fn read_success_body(url: &Url, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(url, e))?;
    if !status.is_success() {
        return Err(PseudoGenError::Service {
            endpoint: url.to_string(),
            status: status.as_u16(),
            detail: error_detail(&text),
        });
    }
    Ok(text)
}

/// Prefer the service's `{"detail": ...}` message over the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match &v["detail"] {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| truncate(body.trim(), 300))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}
