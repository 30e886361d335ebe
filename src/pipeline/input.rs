//! Input resolution: turn a user-supplied path or URL into raw HTML.
//!
//! This is the only stage that touches the outside world. The core stages
//! after it receive a `&str` and never fail on I/O.

use crate::error::Trial2MdError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to raw HTML, fetching URLs and reading paths.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<String, Trial2MdError> {
    if is_url(input) {
        fetch_html(input, timeout_secs).await
    } else if input.trim().is_empty() {
        Err(Trial2MdError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        read_local_html(input)
    }
}

/// Read an HTML file from disk.
///
/// Invalid UTF-8 is replaced rather than rejected; saved pages are not
/// always clean.
pub fn read_local_html(path: impl AsRef<Path>) -> Result<String, Trial2MdError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| io_error(path.to_path_buf(), e))?;
    let html = String::from_utf8_lossy(&bytes).into_owned();
    ensure_markup(&html, &path.display().to_string())?;
    debug!("Read {} bytes of HTML from {}", bytes.len(), path.display());
    Ok(html)
}

/// Fetch a page over HTTP(S).
pub async fn fetch_html(url: &str, timeout_secs: u64) -> Result<String, Trial2MdError> {
    info!("Fetching HTML from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("trial2md/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Trial2MdError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_error = |e: reqwest::Error| {
        if e.is_timeout() {
            Trial2MdError::FetchTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Trial2MdError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_error)?;

    if !response.status().is_success() {
        return Err(Trial2MdError::FetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let html = response.text().await.map_err(map_send_error)?;
    ensure_markup(&html, url)?;

    info!("Fetched {} bytes from {}", html.len(), url);
    Ok(html)
}

/// Suggested output file stem for an input: file stem, trial id or last
/// URL path segment.
pub fn output_stem(input: &str) -> String {
    if is_url(input) {
        if let Some(id) = crate::pipeline::parse::find_trial_id(input) {
            return id;
        }
        if let Ok(parsed) = reqwest::Url::parse(input) {
            if let Some(last) = parsed
                .path_segments()
                .and_then(|mut s| s.next_back())
                .filter(|s| !s.is_empty())
            {
                return stem_of(last);
            }
        }
        return "trial".to_string();
    }
    Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "trial".to_string())
}

fn stem_of(segment: &str) -> String {
    Path::new(segment)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| segment.to_string())
}

fn ensure_markup(html: &str, input: &str) -> Result<(), Trial2MdError> {
    if html.contains('<') {
        Ok(())
    } else {
        Err(Trial2MdError::NotHtml {
            input: input.to_string(),
        })
    }
}

fn io_error(path: PathBuf, e: std::io::Error) -> Trial2MdError {
    match e.kind() {
        std::io::ErrorKind::NotFound => Trial2MdError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => Trial2MdError::PermissionDenied { path },
        _ => Trial2MdError::ReadFailed { path, source: e },
    }
}
