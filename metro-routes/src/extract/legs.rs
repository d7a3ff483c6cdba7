//! Station path extraction.
//!
//! The path is rendered as a possibly nested list: one sub-list per line
//! travelled, with the station where you change lines marked in bold or
//! with "Change Here". The HTML is first read into a `LegNode` tree, then
//! the tree is resolved against the catalog.

use scraper::ElementRef;

use crate::domain::Waypoint;
use crate::stations::StationCatalog;

use super::ExtractionIssue;

/// Text marking the station where you change lines.
const CHANGE_MARKER: &str = "Change Here";

/// One item of the rendered station list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegNode {
    /// A station as printed, and whether it is marked as an interchange.
    Leaf { name: String, interchange: bool },
    /// A nested list, resolved in place.
    SubList(Vec<LegNode>),
}

impl LegNode {
    pub fn leaf(name: &str) -> Self {
        LegNode::Leaf {
            name: name.to_string(),
            interchange: false,
        }
    }

    pub fn interchange(name: &str) -> Self {
        LegNode::Leaf {
            name: name.to_string(),
            interchange: true,
        }
    }
}

/// Read a `<ul>`/`<ol>` element into a list of nodes.
pub fn parse_list(list: ElementRef<'_>) -> Vec<LegNode> {
    let mut nodes = Vec::new();

    for child in list.children() {
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        match el.value().name() {
            "li" => parse_item(el, &mut nodes),
            "ul" | "ol" => nodes.push(LegNode::SubList(parse_list(el))),
            _ => {}
        }
    }

    nodes
}

fn parse_item(item: ElementRef<'_>, nodes: &mut Vec<LegNode>) {
    let mut text = String::new();
    let mut interchange = false;
    let mut nested = Vec::new();

    collect_item(item, &mut text, &mut interchange, &mut nested);

    if text.contains(CHANGE_MARKER) {
        interchange = true;
        text = text.replace(CHANGE_MARKER, " ");
    }

    let name = text.trim();
    if !name.is_empty() {
        nodes.push(LegNode::Leaf {
            name: name.to_string(),
            interchange,
        });
    }
    nodes.extend(nested);
}

/// Gather an item's own text. Bold children are the interchange marker and
/// are dropped; nested lists become sub-lists after the item.
fn collect_item(
    el: ElementRef<'_>,
    text: &mut String,
    interchange: &mut bool,
    nested: &mut Vec<LegNode>,
) {
    for child in el.children() {
        if let Some(t) = child.value().as_text() {
            text.push_str(t);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        match child_el.value().name() {
            "b" | "strong" => *interchange = true,
            "ul" | "ol" => nested.push(LegNode::SubList(parse_list(child_el))),
            _ => collect_item(child_el, text, interchange, nested),
        }
    }
}

/// Resolve a node tree into a path, appending to `path`.
///
/// Unknown names are skipped and recorded in `issues`. A station printed
/// again right after its own interchange marker is not repeated, and an
/// interchange marker is never emitted twice in a row or first.
pub fn resolve_legs(
    nodes: &[LegNode],
    catalog: &StationCatalog,
    path: &mut Vec<Waypoint>,
    issues: &mut Vec<ExtractionIssue>,
) {
    for node in nodes {
        match node {
            LegNode::SubList(items) => resolve_legs(items, catalog, path, issues),
            LegNode::Leaf { name, interchange } => {
                match catalog.resolve_leg(name) {
                    Some(station) => {
                        let repeated = last_station(path) == Some(station);
                        if !repeated {
                            path.push(Waypoint::Station(station.clone()));
                        }
                    }
                    None => issues.push(ExtractionIssue::UnknownLegStation(name.clone())),
                }

                if *interchange && matches!(path.last(), Some(Waypoint::Station(_))) {
                    path.push(Waypoint::Interchange);
                }
            }
        }
    }
}

fn last_station(path: &[Waypoint]) -> Option<&crate::domain::Station> {
    path.iter().rev().find_map(Waypoint::station)
}
