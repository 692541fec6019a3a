//! Person page extraction
//!
//! This module turns a fetched person page into:
//! - A normalized [`PersonRecord`] (name parts, dates, places, gender)
//! - The typed edges the page asserts (parents, spouse, children)
//!
//! Expected page shape:
//!
//! ```html
//! <ul class="parents"><li><a href="?i=2" class="male">...</a></li></ul>
//! <div class="person male">
//!   <div class="info">
//!     <h2>Display name</h2>
//!     <h4><a href="?i=3">Spouse</a></h4>
//!     <ul><li><strong>תאריך לידה: </strong>...</li></ul>
//!   </div>
//! </div>
//! <ul class="kids"><li><a href="?i=4" class="female">...</a></li></ul>
//! ```

use crate::calendar::hebrew_to_civil;
use crate::names::parse_name;
use crate::storage::{PersonRecord, RelationType};
use crate::url::{person_id_from_query, person_id_from_url};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

const BIRTH_DATE_LABEL: &str = "תאריך לידה";
const DEATH_DATE_LABEL: &str = "תאריך פטירה";
const BIRTH_PLACE_LABEL: &str = "מקום לידה";
const DEATH_PLACE_LABEL: &str = "מקום פטירה";

/// An edge found on a person page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEdge {
    /// Identifier of the related person
    pub related_id: String,
    /// Relationship as seen from the page's person
    pub kind: RelationType,
    /// Absolute URL of the related person's page
    pub url: String,
}

/// Extracts the person record from a page
///
/// Returns `None` when the page has no `.person` block. The record's `id` is
/// empty when the URL carries no identifier.
///
/// # Example
///
/// ```
/// use lineage_crawler::crawler::extract_record;
/// use url::Url;
///
/// let html = r#"<div class="person female"><div class="info"><h2>שרה</h2></div></div>"#;
/// let url = Url::parse("https://example.org/?i=7").unwrap();
/// let record = extract_record(html, &url, "i").unwrap();
/// assert_eq!(record.id, "7");
/// assert_eq!(record.gender.as_deref(), Some("F"));
/// ```
pub fn extract_record(html: &str, source_url: &Url, id_param: &str) -> Option<PersonRecord> {
    let document = Html::parse_document(html);
    record_from_document(&document, source_url, id_param)
}

/// Extracts the edges a page asserts for `person_id`
///
/// Links without an identifier and links back to the person are skipped.
pub fn extract_edges(html: &str, person_id: &str, base_url: &Url, id_param: &str) -> Vec<ExtractedEdge> {
    let document = Html::parse_document(html);
    edges_from_document(&document, person_id, base_url, id_param)
}

/// Parses a page once and extracts both the record and its edges
pub fn parse_person_page(
    html: &str,
    source_url: &Url,
    id_param: &str,
) -> Option<(PersonRecord, Vec<ExtractedEdge>)> {
    let document = Html::parse_document(html);
    let record = record_from_document(&document, source_url, id_param)?;
    let edges = edges_from_document(&document, &record.id, source_url, id_param);
    Some((record, edges))
}

fn record_from_document(document: &Html, source_url: &Url, id_param: &str) -> Option<PersonRecord> {
    let person_selector = Selector::parse(".person").ok()?;
    let person = document.select(&person_selector).next()?;

    let mut record = PersonRecord {
        id: person_id_from_url(source_url, id_param).unwrap_or_default(),
        url: source_url.to_string(),
        ..Default::default()
    };

    record.gender = person.value().classes().find_map(|class| match class {
        "male" => Some("M".to_string()),
        "female" => Some("F".to_string()),
        _ => None,
    });

    if let Ok(name_selector) = Selector::parse(".info h2") {
        if let Some(name) = person.select(&name_selector).next().map(element_text) {
            if !name.is_empty() {
                let parsed = parse_name(&name);
                record.prefix = parsed.prefix;
                record.first_name = Some(parsed.first_name).filter(|first| !first.is_empty());
                record.last_name = parsed.last_name;
                record.suffix = parsed.suffix;
                record.name = Some(name);
            }
        }
    }

    if let (Ok(item_selector), Ok(label_selector)) =
        (Selector::parse(".info li"), Selector::parse("strong"))
    {
        for item in person.select(&item_selector) {
            let Some(label_element) = item.select(&label_selector).next() else {
                continue;
            };
            let label = element_text(label_element);
            let label = label.trim_end_matches(':').trim();

            let full = element_text(item);
            let value = full
                .strip_prefix(element_text(label_element).as_str())
                .unwrap_or(&full)
                .trim()
                .to_string();
            if value.is_empty() {
                continue;
            }

            match label {
                BIRTH_DATE_LABEL => {
                    record.birth_date_civil = hebrew_to_civil(&value);
                    record.birth_date = Some(value);
                }
                DEATH_DATE_LABEL => {
                    record.death_date_civil = hebrew_to_civil(&value);
                    record.death_date = Some(value);
                }
                BIRTH_PLACE_LABEL => record.birth_place = Some(value),
                DEATH_PLACE_LABEL => record.death_place = Some(value),
                _ => {}
            }
        }
    }

    Some(record)
}

fn edges_from_document(
    document: &Html,
    person_id: &str,
    base_url: &Url,
    id_param: &str,
) -> Vec<ExtractedEdge> {
    let mut edges = Vec::new();
    let mut seen = HashSet::new();

    // On query-addressed pages a link without the parameter is not a person
    let query_addressed = person_id_from_query(base_url, id_param).is_some();
    let related_id_of = |url: &Url| {
        if query_addressed {
            person_id_from_query(url, id_param)
        } else {
            person_id_from_url(url, id_param)
        }
    };

    let mut push = |element: ElementRef, kind: RelationType| {
        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            return;
        };
        let Some(related_id) = related_id_of(&url) else {
            return;
        };
        if related_id == person_id || !seen.insert((related_id.clone(), kind)) {
            return;
        }
        edges.push(ExtractedEdge {
            related_id,
            kind,
            url: url.to_string(),
        });
    };

    if let Ok(parents) = Selector::parse("ul.parents a[href]") {
        for link in document.select(&parents) {
            let kind = link.value().classes().find_map(|class| match class {
                "male" => Some(RelationType::Father),
                "female" => Some(RelationType::Mother),
                _ => None,
            });
            if let Some(kind) = kind {
                push(link, kind);
            }
        }
    }

    if let Ok(spouses) = Selector::parse(".person .info h4 a[href]") {
        for link in document.select(&spouses) {
            push(link, RelationType::Spouse);
        }
    }

    if let Ok(kids) = Selector::parse("ul.kids a[href]") {
        for link in document.select(&kids) {
            push(link, RelationType::Child);
        }
    }

    edges
}

/// Text content with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // Skip special schemes
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
