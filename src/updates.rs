/*
 *  updates.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	Self-update check: fetch the published source once, read its version
 *	declaration, surface a one-time notice on mismatch. Failures are
 *	logged and swallowed; nothing here is load-bearing.
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use log::{error, info};
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

use crate::host::HostPanels;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update check HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no recognizable version in fetched resource")]
    NoVersion,
}

/// HTTP client for the version fetch: short timeouts, fixed headers,
/// never retried.
pub struct UpdateClient {
    client: Client,
}

impl UpdateClient {
    pub fn new() -> Result<Self, UpdateError> {
        const USER_AGENT: &str =
            concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
        headers.insert("Accept", header::HeaderValue::from_static("text/plain"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(1500))
            .timeout(Duration::from_millis(4000))
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch the published text resource and extract its version string.
    pub async fn fetch_published_version(&self, url: &str) -> Result<String, UpdateError> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;
        let text = response.text().await?;
        parse_version_text(&text).ok_or(UpdateError::NoVersion)
    }
}

/// Extract a version from fetched text: first a declaration line of the
/// form `version = "x.y.z"` (any identifier containing "version" counts,
/// quoted with either quote kind), otherwise a first line starting with a
/// digit.
pub fn parse_version_text(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    if lines.len() > 2 {
        for line in &lines {
            let Some(eq) = line.find('=') else { continue };
            let (lhs, rhs) = line.split_at(eq);
            if !lhs.to_ascii_lowercase().contains("version") {
                continue;
            }
            let rhs = rhs[1..].trim().trim_end_matches([';', ',']);
            for quote in ['"', '\''] {
                if let Some(inner) = rhs.strip_prefix(quote) {
                    if let Some(end) = inner.find(quote) {
                        let version = &inner[..end];
                        if !version.is_empty() {
                            return Some(version.to_string());
                        }
                    }
                }
            }
        }
    }

    let first = lines.first()?.trim();
    if first.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        Some(first.to_string())
    } else {
        None
    }
}

/// One-shot startup check. Network trouble lands in the log and nowhere
/// else; a newer published version surfaces one notice on the host.
pub async fn check_for_update<H: HostPanels>(url: &str, host: &mut H) {
    let client = match UpdateClient::new() {
        Ok(c) => c,
        Err(e) => {
            error!("update check unavailable: {}", e);
            return;
        }
    };

    match client.fetch_published_version(url).await {
        Ok(published) => {
            let built = env!("CARGO_PKG_VERSION");
            if published != built {
                info!("there is a new version of this widget available");
                host.notice(&format!(
                    "Update available: {} --> {}",
                    built, published
                ));
            }
        }
        Err(e) => {
            error!("error fetching version resource: {}", e);
        }
    }
}
