use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Runtime;
use url::Url;

use trawler_logging::{trawl_debug, trawl_trace};

use crate::{decode_snapshot, extract_rows, DriverError, PageDriver};

#[derive(Debug, Clone)]
pub struct HttpDriverSettings {
    pub url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    /// Query parameter bumped by `request_next_page`. The parameter must
    /// widen the server's visible window (a page-count or row-limit style
    /// knob); `None` leaves the affordance a no-op.
    pub page_param: Option<String>,
}

impl HttpDriverSettings {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
            page_param: None,
        }
    }
}

/// A [`PageDriver`] over a server-rendered table.
///
/// Every snapshot is a fresh GET of the source URL, so the driver suits
/// sources whose row set grows server-side between polls. It owns its own
/// single-threaded runtime; the harvest loop stays synchronous.
pub struct HttpTableDriver {
    settings: HttpDriverSettings,
    client: reqwest::Client,
    runtime: Runtime,
    page: u64,
}

impl HttpTableDriver {
    pub fn new(settings: HttpDriverSettings) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DriverError::Setup(err.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| DriverError::Setup(err.to_string()))?;
        Ok(Self {
            settings,
            client,
            runtime,
            page: 1,
        })
    }

    fn snapshot_url(&self) -> Url {
        let mut url = self.settings.url.clone();
        if let Some(param) = &self.settings.page_param {
            url.query_pairs_mut()
                .append_pair(param, &self.page.to_string());
        }
        url
    }

    fn fetch_snapshot(&self) -> Result<String, DriverError> {
        let url = self.snapshot_url();
        let max_bytes = self.settings.max_bytes;
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(map_request_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(DriverError::Read(format!("http status {status} from {url}")));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            if let Some(ct) = content_type.as_deref() {
                if !self.is_content_type_allowed(ct) {
                    return Err(DriverError::Read(format!("unsupported content type {ct}")));
                }
            }
            if let Some(len) = response.content_length() {
                if len > max_bytes {
                    return Err(DriverError::Read(format!(
                        "snapshot too large ({len} of max {max_bytes} bytes)"
                    )));
                }
            }

            let mut bytes = Vec::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(map_request_error)?;
                if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                    return Err(DriverError::Read(format!(
                        "snapshot exceeded the {max_bytes} byte cap"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            Ok(decode_snapshot(&bytes, content_type.as_deref()))
        })
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

impl PageDriver for HttpTableDriver {
    fn advance(&mut self) -> Result<(), DriverError> {
        // Nothing to scroll; the next snapshot call re-fetches.
        trawl_trace!("advance: next snapshot re-fetches {}", self.settings.url);
        Ok(())
    }

    fn visible_rows(&mut self) -> Result<Vec<Vec<String>>, DriverError> {
        let html = self.fetch_snapshot()?;
        let rows = extract_rows(&html);
        trawl_debug!(
            "snapshot: {} parseable rows from {}",
            rows.len(),
            self.settings.url
        );
        Ok(rows)
    }

    fn request_next_page(&mut self) -> Result<(), DriverError> {
        if self.settings.page_param.is_none() {
            return Ok(());
        }
        self.page += 1;
        trawl_debug!("widening the view window to {}", self.page);
        Ok(())
    }
}

fn map_request_error(err: reqwest::Error) -> DriverError {
    // Connection trouble may be a blip; let the stall budget decide when to
    // give up rather than declaring the source gone.
    DriverError::Read(err.to_string())
}
