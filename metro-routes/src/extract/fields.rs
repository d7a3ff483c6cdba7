//! Fare and journey metadata extraction.

use std::fmt;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ExtractionIssue, css};

static NORMAL_FARE: LazyLock<Selector> = LazyLock::new(|| css("div.fare_new_nor_right"));
static CONCESSIONAL_FARE: LazyLock<Selector> = LazyLock::new(|| css("div.fare_new_right_right"));
static EXTRA_LIST: LazyLock<Selector> = LazyLock::new(|| css("div.fr_sect1 ul"));

/// A metadata item, in the order the page lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Time,
    StationCount,
    InterchangeCount,
}

impl MetadataField {
    pub const ORDER: [MetadataField; 3] = [
        MetadataField::Time,
        MetadataField::StationCount,
        MetadataField::InterchangeCount,
    ];
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetadataField::Time => "time",
            MetadataField::StationCount => "station count",
            MetadataField::InterchangeCount => "interchange count",
        })
    }
}

/// Normal and concessional fares.
///
/// Both are zero if either is missing or unparsable.
pub fn extract_fares(document: &Html, issues: &mut Vec<ExtractionIssue>) -> (u32, u32) {
    let normal = document.select(&NORMAL_FARE).next();
    let concessional = document.select(&CONCESSIONAL_FARE).next();

    let (Some(normal), Some(concessional)) = (normal, concessional) else {
        issues.push(ExtractionIssue::FareMissing);
        return (0, 0);
    };

    let normal_text = element_text(normal);
    let concessional_text = element_text(concessional);

    match (parse_amount(&normal_text), parse_amount(&concessional_text)) {
        (Some(n), Some(c)) => (n, c),
        _ => {
            issues.push(ExtractionIssue::FareUnparsable {
                normal: normal_text,
                concessional: concessional_text,
            });
            (0, 0)
        }
    }
}

/// Time, station count and interchange count, in that order.
///
/// Each field is independent: a missing or unparsable item zeroes only
/// that field.
pub fn extract_metadata(document: &Html, issues: &mut Vec<ExtractionIssue>) -> [u32; 3] {
    let items: Vec<ElementRef<'_>> = document
        .select(&EXTRA_LIST)
        .next()
        .map(|ul| {
            ul.children()
                .filter_map(ElementRef::wrap)
                .filter(|el| el.value().name() == "li")
                .collect()
        })
        .unwrap_or_default();

    let mut values = [0; 3];
    for (i, field) in MetadataField::ORDER.into_iter().enumerate() {
        let Some(item) = items.get(i) else {
            issues.push(ExtractionIssue::MetadataMissing(field));
            continue;
        };

        let text = element_text(*item);
        match parse_labeled_value(&text) {
            Some(v) => values[i] = v,
            None => issues.push(ExtractionIssue::MetadataUnparsable { field, text }),
        }
    }

    values
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Parse an amount, tolerating a currency prefix like "Rs." or "₹".
fn parse_amount(text: &str) -> Option<u32> {
    text.trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .trim()
        .parse()
        .ok()
}

/// Parse "Label - 53 Min" into 53.
fn parse_labeled_value(text: &str) -> Option<u32> {
    let (_, value) = text.split_once('-')?;
    value.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fares::mock::route_page_html;

    #[test]
    fn parses_fares() {
        let doc = Html::parse_document(&route_page_html(Some((" 30 ", "20")), &[], ""));
        let mut issues = Vec::new();
        assert_eq!(extract_fares(&doc, &mut issues), (30, 20));
        assert!(issues.is_empty());
    }

    #[test]
    fn tolerates_currency_prefix() {
        assert_eq!(parse_amount("₹ 40"), Some(40));
        assert_eq!(parse_amount("Rs.50"), Some(50));
        assert_eq!(parse_amount("free"), None);
    }

    #[test]
    fn missing_fare_block_zeroes_both() {
        let doc = Html::parse_document(&route_page_html(None, &[], ""));
        let mut issues = Vec::new();
        assert_eq!(extract_fares(&doc, &mut issues), (0, 0));
        assert_eq!(issues, vec![ExtractionIssue::FareMissing]);
    }

    #[test]
    fn one_bad_fare_zeroes_both() {
        let doc = Html::parse_document(&route_page_html(Some(("30", "n/a")), &[], ""));
        let mut issues = Vec::new();
        assert_eq!(extract_fares(&doc, &mut issues), (0, 0));
        assert!(matches!(issues[0], ExtractionIssue::FareUnparsable { .. }));
    }

    #[test]
    fn parses_metadata() {
        let html = route_page_html(
            None,
            &["Timing - 53 Min", "Stations - 26", "Interchange - 3"],
            "",
        );
        let mut issues = Vec::new();
        let values = extract_metadata(&Html::parse_document(&html), &mut issues);
        assert_eq!(values, [53, 26, 3]);
        assert!(issues.is_empty());
    }

    #[test]
    fn bad_metadata_item_zeroes_only_that_field() {
        let html = route_page_html(None, &["Timing - 53 Min", "Stations - many"], "");
        let mut issues = Vec::new();
        let values = extract_metadata(&Html::parse_document(&html), &mut issues);

        assert_eq!(values, [53, 0, 0]);
        assert_eq!(
            issues,
            vec![
                ExtractionIssue::MetadataUnparsable {
                    field: MetadataField::StationCount,
                    text: "Stations - many".into(),
                },
                ExtractionIssue::MetadataMissing(MetadataField::InterchangeCount),
            ]
        );
    }

    #[test]
    fn labeled_value_parsing() {
        assert_eq!(parse_labeled_value("Timing - 53 Min"), Some(53));
        assert_eq!(parse_labeled_value("Interchange - 3"), Some(3));
        assert_eq!(parse_labeled_value("Interchange"), None);
        assert_eq!(parse_labeled_value("Stations - "), None);
    }
}
