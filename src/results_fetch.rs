use anyhow::{Context, Result, anyhow};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};

use crate::extract::{self, ExtractReport};
use crate::http_client::http_client;
use crate::record::SeasonWindow;
use crate::registry::PlayerRegistry;

pub const DEFAULT_RESULTS_URL: &str = "https://m-league.jp/games/";

/// One GET of the results listing. Fails on transport errors, non-2xx and
/// bodies that are not HTML.
pub fn fetch_results_page(url: &str) -> Result<String> {
    let client = http_client()?;
    let resp = client
        .get(url)
        .header(ACCEPT, "text/html,application/xhtml+xml")
        .header(ACCEPT_LANGUAGE, "ja,en;q=0.8")
        .send()
        .context("request failed")?;
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }
    if !looks_like_html(content_type.as_deref(), &body) {
        return Err(anyhow!("response from {url} is not html"));
    }
    Ok(body)
}

fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        if ct.contains("html") {
            return true;
        }
        if ct.contains("json") || ct.starts_with("image/") {
            return false;
        }
    }
    body.trim_start().starts_with('<')
}

#[derive(Debug, Clone, Default)]
pub struct LiveFetch {
    pub report: ExtractReport,
    /// Set when no document could be fetched; the report is then empty.
    pub error: Option<String>,
}

/// Fetch and extract, never failing: any fetch error yields an empty report
/// plus the error text for the caller's "no data" state.
pub fn fetch_and_extract(
    url: &str,
    registry: &PlayerRegistry,
    window: &SeasonWindow,
) -> LiveFetch {
    match fetch_results_page(url) {
        Ok(body) => LiveFetch {
            report: extract::extract_html(&body, registry, window),
            error: None,
        },
        Err(err) => LiveFetch {
            report: ExtractReport::default(),
            error: Some(format!("{err:#}")),
        },
    }
}
