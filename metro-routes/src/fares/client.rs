//! Fare form HTTP client.
//!
//! The upstream fare page is a server-rendered form with no API. Every
//! route request must replay the hidden form state captured from the
//! landing page, plus the two station selections. Field names and URLs
//! live here and nowhere else.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::domain::Station;

use super::error::{BootstrapError, FetchError};
use super::form::{FormState, LandingPage, parse_landing_page};

/// Default URL of the fare form.
pub const DEFAULT_FARES_URL: &str = "http://www.delhimetrorail.com/metro-fares.aspx";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.132 Safari/537.36";

/// Hidden fields the form validates on every post.
const DEFAULT_HIDDEN_FIELDS: &[&str] = &[
    "__VIEWSTATE",
    "__VIEWSTATEGENERATOR",
    "__VIEWSTATEENCRYPTED",
    "__EVENTVALIDATION",
    "ctl00$headerMenu$rptProUpdate$ctl00$hdnID",
    "ctl00$headerMenu$rptProUpdate$ctl01$hdnID",
    "ctl00$headerMenu$rptProUpdate$ctl02$hdnID",
    "ctl00$headerMenu$rptProUpdate$ctl03$hdnID",
    "ctl00$headerMenu$rptProUpdate$ctl04$hdnID",
    "ctl00$headerMenu$rptProUpdate$ctl05$hdnID",
    "ctl00$MainContent$btnShowFare",
];

/// Source of raw route pages for a station pair.
///
/// This is the only seam the cache depends on, so it can be driven by a
/// mock in tests.
pub trait RouteSource: Send + Sync {
    /// Fetch the raw response body for `from -> to`.
    fn fetch_route(
        &self,
        from: &Station,
        to: &Station,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Form state to persist so a reloaded engine can resume without
    /// bootstrapping.
    fn form_state(&self) -> &FormState;
}

/// Configuration for the fare form client.
#[derive(Debug, Clone)]
pub struct FareFormConfig {
    /// URL of the fare form (GET for bootstrap, POST for routes)
    pub url: String,
    /// User-Agent sent with every request
    pub user_agent: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// `id` of the `<select>` holding the station list
    pub station_select_id: String,
    /// Hidden fields to capture and replay
    pub hidden_fields: Vec<String>,
    /// Form field carrying the origin station id
    pub from_field: String,
    /// Form field carrying the destination station id
    pub to_field: String,
}

impl FareFormConfig {
    /// Set a custom URL (for testing).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for FareFormConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FARES_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
            station_select_id: "ctl00_MainContent_ddlFrom".to_string(),
            hidden_fields: DEFAULT_HIDDEN_FIELDS.iter().map(|s| s.to_string()).collect(),
            from_field: "ctl00$MainContent$ddlFrom".to_string(),
            to_field: "ctl00$MainContent$ddlTo".to_string(),
        }
    }
}

/// Fare form client holding one logical session.
///
/// Uses a semaphore to cap concurrent posts; the upstream is a single
/// rate-sensitive resource.
#[derive(Debug, Clone)]
pub struct FareFormClient {
    http: reqwest::Client,
    config: Arc<FareFormConfig>,
    form: FormState,
    semaphore: Arc<Semaphore>,
}

impl FareFormClient {
    /// Bootstrap a session: fetch the landing page and capture the station
    /// list and form state.
    pub async fn connect(
        config: FareFormConfig,
    ) -> Result<(Self, Vec<Station>), BootstrapError> {
        let http = build_http(&config)?;

        let response = http.get(&config.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let LandingPage { stations, form } = parse_landing_page(&body, &config)?;

        info!(
            stations = stations.len(),
            form_fields = form.len(),
            "Bootstrapped fare form session"
        );

        Ok((Self::with_http(http, config, form), stations))
    }

    /// Rebuild a client from previously captured form state, without
    /// fetching the landing page.
    pub fn resume(config: FareFormConfig, form: FormState) -> Result<Self, BootstrapError> {
        if form.is_empty() {
            return Err(BootstrapError::NoFormState);
        }
        let http = build_http(&config)?;
        Ok(Self::with_http(http, config, form))
    }

    fn with_http(http: reqwest::Client, config: FareFormConfig, form: FormState) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            http,
            config: Arc::new(config),
            form,
            semaphore,
        }
    }

    /// Post the form for one station pair and return the raw body.
    ///
    /// Any non-success status is a `FetchError`; the caller decides
    /// whether to retry.
    pub async fn post_route(&self, from: &Station, to: &Station) -> Result<String, FetchError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Closed)?;

        debug!(from = %from, to = %to, "Posting fare form");

        let form =
            self.form
                .with_selection(&self.config.from_field, from, &self.config.to_field, to);

        let response = self.http.post(&self.config.url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }

    pub fn config(&self) -> &FareFormConfig {
        &self.config
    }
}

impl RouteSource for FareFormClient {
    fn fetch_route(
        &self,
        from: &Station,
        to: &Station,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.post_route(from, to)
    }

    fn form_state(&self) -> &FormState {
        &self.form
    }
}

fn build_http(config: &FareFormConfig) -> Result<reqwest::Client, BootstrapError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(&config.user_agent)
        .map_err(|_| BootstrapError::InvalidHeader("User-Agent"))?;
    headers.insert(USER_AGENT, agent);

    let http = reqwest::Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    Ok(http)
}
