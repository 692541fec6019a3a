//! GEDCOM 5.5.1 export
//!
//! Writes every stored person as an `INDI` record and every family rebuilt by
//! [`build_families`] as a `FAM` record, cross-referenced by the synthetic
//! `I`/`F` identifiers.

use crate::family::{build_families, FamilyGraph};
use crate::storage::{PersonRecord, Storage};
use crate::LineageError;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Counts of records written by an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub individuals: usize,
    pub families: usize,
}

/// Exports the whole store to a GEDCOM file
///
/// # Arguments
///
/// * `storage` - The storage backend to read persons and edges from
/// * `output_path` - Path where the `.ged` file should be written
///
/// # Returns
///
/// * `Ok(ExportSummary)` - Number of individuals and families written
/// * `Err(LineageError)` - Failed to query storage or write the file
pub fn export_gedcom(storage: &dyn Storage, output_path: &Path) -> Result<ExportSummary, LineageError> {
    let records = storage.list_all_persons()?;
    let edges = storage.list_all_relationships()?;
    let graph = build_families(&records, &edges);

    let gedcom = format_gedcom(&records, &graph);

    let mut file = File::create(output_path)?;
    file.write_all(gedcom.as_bytes())?;

    let summary = ExportSummary {
        individuals: records.len(),
        families: graph.families.len(),
    };

    info!(
        "Exported {} individuals and {} families to {}",
        summary.individuals,
        summary.families,
        output_path.display()
    );

    Ok(summary)
}

/// Formats records and their families as GEDCOM text
pub fn format_gedcom(records: &[PersonRecord], graph: &FamilyGraph) -> String {
    let mut ged = String::new();

    // Header
    ged.push_str("0 HEAD\n");
    ged.push_str("1 GEDC\n");
    ged.push_str("2 VERS 5.5.1\n");
    ged.push_str("2 FORM LINEAGE-LINKED\n");
    ged.push_str("1 CHAR UTF-8\n");

    for record in records {
        let Some(xref) = graph.individual_id(&record.id) else {
            continue;
        };
        write_individual(&mut ged, xref, record, graph);
    }

    for family in &graph.families {
        ged.push_str(&format!("0 @{}@ FAM\n", family.id));

        if let Some(husband) = family.father.as_deref().and_then(|id| graph.individual_id(id)) {
            ged.push_str(&format!("1 HUSB @{}@\n", husband));
        }
        if let Some(wife) = family.mother.as_deref().and_then(|id| graph.individual_id(id)) {
            ged.push_str(&format!("1 WIFE @{}@\n", wife));
        }
        for child in &family.children {
            if let Some(child) = graph.individual_id(child) {
                ged.push_str(&format!("1 CHIL @{}@\n", child));
            }
        }
    }

    ged.push_str("0 TRLR\n");
    ged
}

fn write_individual(ged: &mut String, xref: &str, record: &PersonRecord, graph: &FamilyGraph) {
    ged.push_str(&format!("0 @{}@ INDI\n", xref));

    if let Some(name) = gedcom_name(record) {
        ged.push_str(&format!("1 NAME {}\n", name));
    }
    if let Some(prefix) = non_empty(&record.prefix) {
        ged.push_str(&format!("2 NPFX {}\n", prefix));
    }
    if let Some(suffix) = non_empty(&record.suffix) {
        ged.push_str(&format!("2 NSFX {}\n", suffix));
    }

    if let Some(sex) = record.gender.as_deref().and_then(gedcom_sex) {
        ged.push_str(&format!("1 SEX {}\n", sex));
    }

    write_event(
        ged,
        "BIRT",
        non_empty(&record.birth_date_civil),
        non_empty(&record.birth_date),
        non_empty(&record.birth_place),
    );
    write_event(
        ged,
        "DEAT",
        non_empty(&record.death_date_civil),
        non_empty(&record.death_date),
        non_empty(&record.death_place),
    );

    if let Some(family) = graph.family_of_child(&record.id) {
        ged.push_str(&format!("1 FAMC @{}@\n", family));
    }
    for family in graph.families_of_parent(&record.id) {
        ged.push_str(&format!("1 FAMS @{}@\n", family));
    }
}

/// Writes a birth or death event; skipped when there is no date or place
fn write_event(
    ged: &mut String,
    tag: &str,
    civil_date: Option<&str>,
    native_date: Option<&str>,
    place: Option<&str>,
) {
    if civil_date.is_none() && native_date.is_none() && place.is_none() {
        return;
    }

    ged.push_str(&format!("1 {}\n", tag));
    if let Some(date) = civil_date {
        ged.push_str(&format!("2 DATE {}\n", date));
    }
    if let Some(date) = native_date {
        ged.push_str(&format!("2 NOTE {}\n", date));
    }
    if let Some(place) = place {
        ged.push_str(&format!("2 PLAC {}\n", place));
    }
}

/// `first /last/` when the surname is known, otherwise the display name
fn gedcom_name(record: &PersonRecord) -> Option<String> {
    match non_empty(&record.last_name) {
        Some(last) => {
            let first = non_empty(&record.first_name).unwrap_or("");
            Some(format!("{} /{}/", first, last).trim_start().to_string())
        }
        None => non_empty(&record.name).map(str::to_string),
    }
}

fn gedcom_sex(gender: &str) -> Option<&'static str> {
    match gender.trim() {
        "M" | "m" | "male" | "זכר" => Some("M"),
        "F" | "f" | "female" | "נקבה" => Some("F"),
        _ => None,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
