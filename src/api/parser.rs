use crate::api::{ApiError, RerunReceipt};
use crate::app::{safe_file_name, BulletinSummary};
use crate::log::LogDocument;
use chrono::NaiveDate;

pub fn parse_bulletins(json: &str) -> Result<Vec<BulletinSummary>, ApiError> {
    let bulletins: Vec<BulletinSummary> = serde_json::from_str(json)?;
    Ok(bulletins)
}

#[derive(serde::Deserialize)]
struct RerunResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parses a 2xx rerun body; `success: false` becomes [`ApiError::Business`].
pub fn parse_rerun(json: &str) -> Result<RerunReceipt, ApiError> {
    let resp: RerunResponse = serde_json::from_str(json)?;
    if resp.success {
        Ok(RerunReceipt {
            message: resp
                .message
                .unwrap_or_else(|| "Re-run command sent".to_string()),
        })
    } else {
        Err(rejection(resp))
    }
}

/// A non-2xx rerun body shaped `{success: false, message, error}` is a
/// rejection by the backend, not a transport failure.
pub fn rerun_rejection(json: &str) -> Option<ApiError> {
    serde_json::from_str::<RerunResponse>(json)
        .ok()
        .filter(|resp| !resp.success)
        .map(rejection)
}

fn rejection(resp: RerunResponse) -> ApiError {
    let message = match (resp.message, resp.error) {
        (Some(m), Some(e)) if !e.trim().is_empty() => format!("{m} ({})", e.trim()),
        (Some(m), _) => m,
        (None, Some(e)) => e,
        (None, None) => "Re-run was rejected".to_string(),
    };
    ApiError::Business { message }
}

#[derive(serde::Deserialize)]
struct FullLogResponse {
    #[serde(default)]
    bulletin_id: Option<String>,
    name: String,
    full_log: String,
}

pub fn parse_full_log(requested_id: &str, json: &str) -> Result<LogDocument, ApiError> {
    let resp: FullLogResponse = serde_json::from_str(json)?;
    let id = resp
        .bulletin_id
        .unwrap_or_else(|| requested_id.to_string());
    Ok(LogDocument::new(id, resp.name, resp.full_log))
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Builds the error for a non-2xx response, preferring the body's `message`.
pub fn error_from_body(status: u16, reason: Option<&str>, body: &str) -> ApiError {
    let from_body = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty());
    let message = from_body
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"));
    ApiError::Api { status, message }
}

/// Extracts the file name from a `Content-Disposition` value.
/// `filename*` (RFC 5987) wins over `filename`.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                // charset'language'percent-encoded
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                extended = percent_decode(unquote(encoded));
            }
            "filename" => plain = Some(unquote(value).to_string()),
            _ => {}
        }
    }
    extended
        .or(plain)
        .filter(|name| !name.trim().is_empty())
        .map(|name| safe_file_name(&name))
}

/// Name to save a product under: the server's choice, else `product_{id}_{date}`.
pub fn product_file_name(disposition: Option<&str>, bulletin_id: &str, date: NaiveDate) -> String {
    disposition
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| {
            format!(
                "product_{}_{}",
                safe_file_name(bulletin_id),
                date.format("%Y-%m-%d")
            )
        })
}

fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);
    params
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
