//! Client for the marketplace's excel export/import endpoints.
//!
//! Exports are asynchronous: a request is registered, the export status is
//! polled until the file is processed, then the file is downloaded. Prices go
//! back by uploading the edited file as an import request.

use crate::config::MarketplaceConfig;
use crate::{debug_eprintln, debug_println};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const SELLER_CODE_HEADER: &str = "snappshop-seller-code";
/// Returned by the export request endpoint when an export is already pending.
pub const EXPORT_ALREADY_REQUESTED: i64 = 111006;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("No marketplace token configured (set SNAPP_TOKEN)")]
    MissingToken,
    #[error("No seller code configured (set SNAPP_SELLER_CODE or marketplace.seller_code)")]
    MissingSellerCode,
    #[error("Marketplace rejected the request{}: {message}", code_suffix(.code))]
    Rejected { code: Option<i64>, message: String },
    #[error("Export failed: {0}")]
    ExportFailed(String),
    #[error("Export not ready after {polls} status checks")]
    ExportTimedOut { polls: u32 },
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(" (code {})", c)).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRequestOutcome {
    Created,
    AlreadyRequested,
}

/// Lifecycle of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Requested,
    Processing,
    Processed { file_url: String },
    Failed { message: String },
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Processed { .. } | ExportState::Failed { .. })
    }
}

/// Anything that can report the current export status.
pub trait ExportStatusSource {
    fn export_status(&self) -> Result<ExportState>;
}

/// Export state machine. Each `poll` asks the source once and moves to the
/// reported state; terminal states are never left.
#[derive(Debug, Clone)]
pub struct ExportJob {
    state: ExportState,
    polls: u32,
}

impl Default for ExportJob {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportJob {
    pub fn new() -> Self {
        Self {
            state: ExportState::Requested,
            polls: 0,
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn poll<S: ExportStatusSource + ?Sized>(&mut self, source: &S) -> &ExportState {
        if self.state.is_terminal() {
            return &self.state;
        }

        self.polls += 1;
        self.state = match source.export_status() {
            // The endpoint never reports the request itself; treat it as
            // still processing.
            Ok(ExportState::Requested) => ExportState::Processing,
            Ok(next) => next,
            Err(e) => ExportState::Failed {
                message: format!("{:#}", e),
            },
        };
        &self.state
    }
}

/// Polls until the export is processed and returns the file URL.
pub fn wait_for_export<S: ExportStatusSource + ?Sized>(
    source: &S,
    interval: Duration,
    max_polls: u32,
) -> Result<String> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for marketplace export...");

    let mut job = ExportJob::new();
    let result = loop {
        let state = job.poll(source).clone();
        debug_println!("Export status after {} checks: {:?}", job.polls(), state);

        match state {
            ExportState::Processed { file_url } => break Ok(file_url),
            ExportState::Failed { message } => break Err(MarketplaceError::ExportFailed(message)),
            ExportState::Requested | ExportState::Processing => {
                if job.polls() >= max_polls {
                    break Err(MarketplaceError::ExportTimedOut { polls: job.polls() });
                }
                spinner.set_message(format!(
                    "Export processing, checking again in {}s (check {}/{})",
                    interval.as_secs(),
                    job.polls(),
                    max_polls
                ));
                spinner.tick();
                thread::sleep(interval);
            }
        }
    };

    spinner.finish_and_clear();
    Ok(result?)
}

pub fn parse_export_request(body: &Value) -> Result<ExportRequestOutcome, MarketplaceError> {
    if body.get("status").and_then(Value::as_bool) == Some(true) {
        return Ok(ExportRequestOutcome::Created);
    }
    let code = body.get("code").and_then(Value::as_i64);
    if code == Some(EXPORT_ALREADY_REQUESTED) {
        return Ok(ExportRequestOutcome::AlreadyRequested);
    }
    Err(MarketplaceError::Rejected {
        code,
        message: response_message(body),
    })
}

pub fn parse_export_status(body: &Value) -> ExportState {
    if body.get("status").and_then(Value::as_bool) != Some(true) {
        return ExportState::Failed {
            message: response_message(body),
        };
    }

    let data = body.get("data");
    let status = data.and_then(|d| d.get("status")).and_then(Value::as_str);
    let file = data.and_then(|d| d.get("file")).and_then(Value::as_str);

    match (status, file) {
        (Some("processing") | Some("pending"), _) => ExportState::Processing,
        (Some("processed"), Some(file)) if !file.is_empty() => ExportState::Processed {
            file_url: file.to_string(),
        },
        (Some("processed"), _) => ExportState::Failed {
            message: "export processed but no file was returned".to_string(),
        },
        (other, _) => ExportState::Failed {
            message: format!("unexpected export status {:?}", other.unwrap_or("<missing>")),
        },
    }
}

fn response_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

pub struct SnappshopClient {
    client: Client,
    excel_url: String,
}

impl SnappshopClient {
    pub fn new(config: &MarketplaceConfig) -> Result<Self> {
        let token = config.token.as_deref().ok_or(MarketplaceError::MissingToken)?;
        if config.seller_code.trim().is_empty() {
            return Err(MarketplaceError::MissingSellerCode.into());
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(token).context("Marketplace token is not a valid header value")?,
        );
        headers.insert(
            SELLER_CODE_HEADER,
            HeaderValue::from_str(&config.seller_code).context("Seller code is not a valid header value")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            excel_url: config.excel_url(),
        })
    }

    pub fn request_export(&self) -> Result<ExportRequestOutcome> {
        let url = format!("{}/export/request", self.excel_url);
        debug_println!("Requesting export: {}", url);

        let body: Value = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .context("Failed to send export request")?
            .json()
            .context("Failed to parse export request response")?;

        Ok(parse_export_request(&body)?)
    }

    pub fn download_export(&self, file_url: &str, dest: &Path) -> Result<PathBuf> {
        debug_println!("Downloading export {} -> {}", file_url, dest.display());

        let response = self
            .client
            .get(file_url)
            .send()
            .context("Failed to download export file")?
            .error_for_status()
            .context("Export download was refused")?;
        let bytes = response.bytes().context("Failed to read export file")?;

        fs::write(dest, &bytes)
            .context(format!("Failed to write export file: {}", dest.display()))?;
        Ok(dest.to_path_buf())
    }

    pub fn upload_import(&self, path: &Path) -> Result<()> {
        let url = format!("{}/import/request", self.excel_url);
        debug_println!("Uploading {} to {}", path.display(), url);

        let form = multipart::Form::new()
            .file("file", path)
            .context(format!("Failed to attach file: {}", path.display()))?;

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .context("Failed to upload import file")?;

        let status = response.status();
        let body: Value = response.json().unwrap_or(Value::Null);
        if !status.is_success() {
            debug_eprintln!("Import rejected with HTTP {}: {}", status, body);
            return Err(MarketplaceError::Rejected {
                code: body.get("code").and_then(Value::as_i64),
                message: response_message(&body),
            }
            .into());
        }
        Ok(())
    }
}

impl ExportStatusSource for SnappshopClient {
    fn export_status(&self) -> Result<ExportState> {
        let url = format!("{}/export", self.excel_url);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .context("Failed to check export status")?
            .json()
            .context("Failed to parse export status response")?;
        Ok(parse_export_status(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Scripted {
        states: RefCell<VecDeque<Result<ExportState>>>,
    }

    impl Scripted {
        fn new(states: Vec<Result<ExportState>>) -> Self {
            Self {
                states: RefCell::new(states.into_iter().collect()),
            }
        }
    }

    impl ExportStatusSource for Scripted {
        fn export_status(&self) -> Result<ExportState> {
            match self.states.borrow_mut().pop_front() {
                Some(state) => state,
                None => bail!("no more scripted states"),
            }
        }
    }

    fn processed(url: &str) -> ExportState {
        ExportState::Processed {
            file_url: url.to_string(),
        }
    }

    #[test]
    fn job_moves_from_requested_to_processed() {
        let source = Scripted::new(vec![
            Ok(ExportState::Processing),
            Ok(processed("https://cdn.example/file.xlsx")),
        ]);
        let mut job = ExportJob::new();
        assert_eq!(job.state(), &ExportState::Requested);
        assert_eq!(job.poll(&source), &ExportState::Processing);
        assert_eq!(job.poll(&source), &processed("https://cdn.example/file.xlsx"));
        // Terminal: no further calls to the source.
        assert_eq!(job.poll(&source), &processed("https://cdn.example/file.xlsx"));
        assert_eq!(job.polls(), 2);
    }

    #[test]
    fn transport_error_fails_the_job() {
        let source = Scripted::new(vec![Err(anyhow::anyhow!("timeout"))]);
        let mut job = ExportJob::new();
        assert!(matches!(job.poll(&source), ExportState::Failed { message } if message == "timeout"));
        assert!(job.state().is_terminal());
    }

    #[test]
    fn wait_returns_file_url() {
        let source = Scripted::new(vec![
            Ok(ExportState::Processing),
            Ok(ExportState::Requested),
            Ok(processed("https://cdn.example/a.xlsx")),
        ]);
        let url = wait_for_export(&source, Duration::ZERO, 10).unwrap();
        assert_eq!(url, "https://cdn.example/a.xlsx");
    }

    #[test]
    fn wait_gives_up_after_max_polls() {
        let source = Scripted::new(vec![
            Ok(ExportState::Processing),
            Ok(ExportState::Processing),
            Ok(ExportState::Processing),
        ]);
        let err = wait_for_export(&source, Duration::ZERO, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MarketplaceError>(),
            Some(MarketplaceError::ExportTimedOut { polls: 2 })
        ));
    }

    #[test]
    fn wait_surfaces_export_failure() {
        let source = Scripted::new(vec![Ok(ExportState::Failed {
            message: "quota".to_string(),
        })]);
        let err = wait_for_export(&source, Duration::ZERO, 5).unwrap_err();
        assert_eq!(err.to_string(), "Export failed: quota");
    }

    #[test]
    fn parses_export_request_responses() {
        assert_eq!(
            parse_export_request(&json!({ "status": true })).unwrap(),
            ExportRequestOutcome::Created
        );
        assert_eq!(
            parse_export_request(&json!({ "status": false, "code": 111006 })).unwrap(),
            ExportRequestOutcome::AlreadyRequested
        );
        let err = parse_export_request(&json!({ "status": false, "code": 401, "message": "unauthorized" }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Marketplace rejected the request (code 401): unauthorized"
        );
    }

    #[test]
    fn parses_export_status_responses() {
        assert_eq!(
            parse_export_status(&json!({ "status": true, "data": { "status": "processing" } })),
            ExportState::Processing
        );
        assert_eq!(
            parse_export_status(&json!({
                "status": true,
                "data": { "status": "processed", "file": "https://cdn.example/x.xlsx" }
            })),
            processed("https://cdn.example/x.xlsx")
        );
        assert!(matches!(
            parse_export_status(&json!({ "status": true, "data": { "status": "processed" } })),
            ExportState::Failed { .. }
        ));
        assert_eq!(
            parse_export_status(&json!({ "status": false, "message": "expired token" })),
            ExportState::Failed {
                message: "expired token".to_string()
            }
        );
    }

    #[test]
    fn client_requires_token_and_seller_code() {
        let config = MarketplaceConfig {
            seller_code: "qPYMMA".to_string(),
            ..MarketplaceConfig::default()
        };
        assert!(SnappshopClient::new(&config).is_err());

        let config = MarketplaceConfig {
            token: Some("secret".to_string()),
            ..MarketplaceConfig::default()
        };
        let err = SnappshopClient::new(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<MarketplaceError>(),
            Some(MarketplaceError::MissingSellerCode)
        ));
    }
}
