//! Mock fare source for testing without the upstream site.
//!
//! Serves canned route pages per station pair and counts every call, so
//! tests can assert how many upstream round trips actually happened.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::{RouteKey, Station};

use super::client::RouteSource;
use super::error::FetchError;
use super::form::FormState;

/// Mock route source serving pages from memory.
#[derive(Debug, Default)]
pub struct MockFareSource {
    pages: HashMap<RouteKey, String>,
    fallback: Option<String>,
    failing: HashSet<RouteKey>,
    delay: Option<Duration>,
    form: FormState,
    calls: AtomicUsize,
}

impl MockFareSource {
    pub fn new() -> Self {
        Self {
            form: FormState::new(vec![("__VIEWSTATE".into(), "mock".into())]),
            ..Self::default()
        }
    }

    /// Serve `html` for `from -> to`.
    pub fn with_page(mut self, from: &Station, to: &Station, html: impl Into<String>) -> Self {
        self.pages.insert(RouteKey::new(from, to), html.into());
        self
    }

    /// Serve `html` for any pair without its own page.
    pub fn with_fallback(mut self, html: impl Into<String>) -> Self {
        self.fallback = Some(html.into());
        self
    }

    /// Fail every request for `from -> to` with a 503.
    pub fn failing(mut self, from: &Station, to: &Station) -> Self {
        self.failing.insert(RouteKey::new(from, to));
        self
    }

    /// Sleep before answering, to hold requests in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `fetch_route` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve(&self, key: RouteKey) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(&key) {
            return Err(FetchError::Api {
                status: 503,
                message: format!("mock failure for {key}"),
            });
        }

        self.pages
            .get(&key)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| FetchError::Api {
                status: 404,
                message: format!("no mock page for {key}"),
            })
    }
}

impl RouteSource for MockFareSource {
    fn fetch_route(
        &self,
        from: &Station,
        to: &Station,
    ) -> impl Future<Output = Result<String, FetchError>> + Send {
        self.serve(RouteKey::new(from, to))
    }

    fn form_state(&self) -> &FormState {
        &self.form
    }
}

/// Render a landing page with the given `(name, id)` options, a
/// placeholder option, and every default hidden field.
pub fn landing_page_html(stations: &[(&str, i32)]) -> String {
    let options: String = stations
        .iter()
        .map(|(name, id)| format!("<option value=\"{id}\">{name}\n</option>"))
        .collect();

    format!(
        r#"<html><body><form>
<input type="hidden" name="__VIEWSTATE" value="vs-token">
<input type="hidden" name="__VIEWSTATEGENERATOR" value="gen">
<input type="hidden" name="__VIEWSTATEENCRYPTED" value="">
<input type="hidden" name="__EVENTVALIDATION" value="ev-token">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl00$hdnID" value="0">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl01$hdnID" value="1">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl02$hdnID" value="2">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl03$hdnID" value="3">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl04$hdnID" value="4">
<input type="hidden" name="ctl00$headerMenu$rptProUpdate$ctl05$hdnID" value="5">
<select id="ctl00_MainContent_ddlFrom" name="ctl00$MainContent$ddlFrom">
<option value="">Select Station</option>
{options}</select>
<input type="submit" name="ctl00$MainContent$btnShowFare" value="Show Fare">
</form></body></html>"#
    )
}

/// Render a route result page.
///
/// `fares` is `(normal, concessional)` text, or `None` to omit the fare
/// block. `extra` is the text of each metadata item in order, and
/// `station_list` the inner HTML of the top-level station `<ul>`.
pub fn route_page_html(fares: Option<(&str, &str)>, extra: &[&str], station_list: &str) -> String {
    let fare_block = match fares {
        Some((normal, concessional)) => format!(
            "<div class=\"fare_new_nor_right\">{normal}</div>\
             <div class=\"fare_new_right_right\">{concessional}</div>"
        ),
        None => String::new(),
    };

    let extra_items: String = extra.iter().map(|item| format!("<li>{item}</li>")).collect();

    format!(
        r#"<html><body>
<div class="fare_block">{fare_block}</div>
<div class="fr_sect1"><ul>{extra_items}</ul></div>
<div class="fr_stations"><ul>{station_list}</ul></div>
</body></html>"#
    )
}

/// Render a simple single-line route page through the given station names.
pub fn simple_route_html(names: &[&str]) -> String {
    let items: String = names.iter().map(|n| format!("<li>{n}</li>")).collect();
    route_page_html(
        Some(("30", "20")),
        &[
            "Timing - 12 Min",
            &format!("Stations - {}", names.len()),
            "Interchange - 0",
        ],
        &items,
    )
}
