//! Status lookup through the PostgREST interface.

use pdfchat_core::{DocumentId, StatusReport};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SupabaseConfig;
use crate::error::{Result, SupabaseError};

/// Status columns of a document row.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatusRow {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl StatusRow {
    /// `error_message` wins over the legacy `error` column; blank values count as absent.
    pub(crate) fn into_report(self) -> StatusReport {
        let error_detail = non_blank(self.error_message).or_else(|| non_blank(self.error));
        StatusReport {
            state: self.status,
            error_detail,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) async fn fetch_status(
    http: &reqwest::Client,
    config: &SupabaseConfig,
    id: &DocumentId,
) -> Result<StatusReport> {
    let response = http
        .get(config.status_url(id))
        .header("apikey", config.anon_key())
        .bearer_auth(config.anon_key())
        .header(ACCEPT, "application/json")
        .send()
        .await?;
    let body = successful_body(response).await?;
    let rows: Vec<StatusRow> = serde_json::from_str(&body)?;
    rows.into_iter()
        .next()
        .map(StatusRow::into_report)
        .ok_or_else(|| SupabaseError::NotFound(id.to_string()))
}

/// Reads the body of a successful response, or turns a failed one into
/// [`SupabaseError::Status`].
pub(crate) async fn successful_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(SupabaseError::Status {
            status: status.as_u16(),
            message: error_detail(&body),
        })
    }
}

/// Extracts a readable message from an error body.
///
/// Understands `{"detail": ..}` bodies of the backend API and `{"message": ..}`
/// bodies of PostgREST; anything else is returned trimmed.
pub(crate) fn error_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(key))
    });
    match field {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => body.trim().to_owned(),
    }
}
