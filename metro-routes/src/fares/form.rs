//! Landing page extraction: the station list and the form state that must
//! be echoed back on every route request.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Station;
use crate::extract::css;

use super::client::FareFormConfig;
use super::error::BootstrapError;

static SELECT: LazyLock<Selector> = LazyLock::new(|| css("select"));
static OPTION: LazyLock<Selector> = LazyLock::new(|| css("option"));
static NAMED_INPUT: LazyLock<Selector> = LazyLock::new(|| css("input[name]"));

/// Hidden form fields captured at bootstrap, in landing-page order.
///
/// Replayed verbatim on every route request. The upstream form state does
/// not rotate per request, so one capture lasts the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    fields: Vec<(String, String)>,
}

impl FormState {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Captured fields followed by the two station selections.
    pub fn with_selection(
        &self,
        from_field: &str,
        from: &Station,
        to_field: &str,
        to: &Station,
    ) -> Vec<(String, String)> {
        let mut form = self.fields.clone();
        form.push((from_field.to_string(), from.external_id().to_string()));
        form.push((to_field.to_string(), to.external_id().to_string()));
        form
    }
}

/// Everything bootstrap needs from the landing page.
#[derive(Debug, Clone)]
pub struct LandingPage {
    pub stations: Vec<Station>,
    pub form: FormState,
}

/// Parse the landing page into its station list and form state.
pub fn parse_landing_page(
    html: &str,
    config: &FareFormConfig,
) -> Result<LandingPage, BootstrapError> {
    let document = Html::parse_document(html);

    let select = document
        .select(&SELECT)
        .find(|el| el.value().id() == Some(config.station_select_id.as_str()))
        .ok_or_else(|| BootstrapError::MissingStationList(config.station_select_id.clone()))?;

    let stations = parse_station_options(select);
    if stations.is_empty() {
        return Err(BootstrapError::NoStations);
    }

    let form = parse_form_state(&document, &config.hidden_fields);
    if form.is_empty() {
        return Err(BootstrapError::NoFormState);
    }

    Ok(LandingPage { stations, form })
}

fn parse_station_options(select: ElementRef<'_>) -> Vec<Station> {
    select
        .select(&OPTION)
        .filter_map(|option| {
            let text: String = option.text().collect();
            let value = option.value().attr("value").unwrap_or("").trim();

            // Placeholders like "Select Station" carry no numeric value
            let Ok(id) = value.parse::<i32>() else {
                debug!(text = %text.trim(), value, "Skipping non-station option");
                return None;
            };

            match Station::new(&text, id) {
                Ok(station) => Some(station),
                Err(e) => {
                    debug!(text = %text.trim(), id, error = %e, "Skipping invalid station option");
                    None
                }
            }
        })
        .collect()
}

fn parse_form_state(document: &Html, wanted: &[String]) -> FormState {
    let mut fields = Vec::with_capacity(wanted.len());

    for name in wanted {
        let input = document
            .select(&NAMED_INPUT)
            .find(|el| el.value().attr("name") == Some(name.as_str()));

        match input {
            Some(el) => {
                let value = el.value().attr("value").unwrap_or("");
                fields.push((name.clone(), value.to_string()));
            }
            None => warn!(field = %name, "Form-state field missing from landing page"),
        }
    }

    FormState::new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fares::mock::landing_page_html;

    fn config() -> FareFormConfig {
        FareFormConfig::default()
    }

    #[test]
    fn parses_stations_and_form_state() {
        let html = landing_page_html(&[("Yamuna Bank", 7), ("ITO", 12), ("Rajiv Chowk", 3)]);
        let page = parse_landing_page(&html, &config()).unwrap();

        let names: Vec<&str> = page.stations.iter().map(Station::name).collect();
        assert_eq!(names, vec!["YAMUNA BANK", "ITO", "RAJIV CHOWK"]);
        assert_eq!(page.stations[1].external_id(), 12);

        assert_eq!(page.form.len(), config().hidden_fields.len());
        assert_eq!(page.form.fields()[0].0, "__VIEWSTATE");
        assert_eq!(page.form.fields()[0].1, "vs-token");
    }

    #[test]
    fn skips_placeholder_options() {
        let html = landing_page_html(&[("ITO", 12)]);
        let page = parse_landing_page(&html, &config()).unwrap();
        // The fixture always includes a "Select Station" placeholder
        assert_eq!(page.stations.len(), 1);
    }

    #[test]
    fn missing_select_is_an_error() {
        let html = "<html><body><input name=\"__VIEWSTATE\" value=\"x\"></body></html>";
        let err = parse_landing_page(html, &config()).unwrap_err();
        assert!(matches!(err, BootstrapError::MissingStationList(_)));
    }

    #[test]
    fn empty_select_is_an_error() {
        let html = landing_page_html(&[]);
        let err = parse_landing_page(&html, &config()).unwrap_err();
        assert!(matches!(err, BootstrapError::NoStations));
    }

    #[test]
    fn no_form_state_is_an_error() {
        let html = r#"<html><body>
            <select id="ctl00_MainContent_ddlFrom"><option value="1">ITO</option></select>
        </body></html>"#;
        let err = parse_landing_page(html, &config()).unwrap_err();
        assert!(matches!(err, BootstrapError::NoFormState));
    }

    #[test]
    fn partial_form_state_is_kept() {
        let html = r#"<html><body>
            <select id="ctl00_MainContent_ddlFrom"><option value="1">ITO</option></select>
            <input type="hidden" name="__VIEWSTATE" value="abc">
        </body></html>"#;
        let page = parse_landing_page(html, &config()).unwrap();
        assert_eq!(page.form.fields(), &[("__VIEWSTATE".to_string(), "abc".to_string())]);
    }

    #[test]
    fn selection_appends_station_ids() {
        let form = FormState::new(vec![("__VIEWSTATE".into(), "abc".into())]);
        let from = Station::new("ITO", 12).unwrap();
        let to = Station::new("YAMUNA BANK", 7).unwrap();

        let fields = form.with_selection("from", &from, "to", &to);
        assert_eq!(
            fields,
            vec![
                ("__VIEWSTATE".to_string(), "abc".to_string()),
                ("from".to_string(), "12".to_string()),
                ("to".to_string(), "7".to_string()),
            ]
        );
    }
}
