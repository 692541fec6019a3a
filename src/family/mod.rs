//! Family-graph reconstruction
//!
//! The store only holds flat, unilateral edges (`p1 --father--> p2`). This
//! module rebuilds discrete family units from them: every child is attached
//! to exactly one family keyed by its `(father, mother)` pair, and every
//! parent gets the list of families it heads. The result is recomputed on
//! each export and never persisted.

use crate::storage::{PersonRecord, RelationType, Relationship};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// A derived family unit: a parent pair and the children they share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Family {
    /// Synthetic identifier (`F1`, `F2`, ...)
    pub id: String,
    pub father: Option<String>,
    pub mother: Option<String>,
    /// Child identifiers in the order their parent edges were discovered
    pub children: Vec<String>,
}

/// Families plus the membership maps an exporter needs
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    /// Families in first-seen order
    pub families: Vec<Family>,
    /// Child identifier -> family identifier
    pub child_family: HashMap<String, String>,
    /// Parent identifier -> family identifiers, without duplicates
    pub parent_families: HashMap<String, Vec<String>>,
    /// Person identifier -> synthetic individual identifier (`I1`, `I2`, ...)
    pub individual_ids: HashMap<String, String>,
}

impl FamilyGraph {
    /// Gets the family a person was born into
    pub fn family_of_child(&self, person_id: &str) -> Option<&str> {
        self.child_family.get(person_id).map(String::as_str)
    }

    /// Gets the families a person heads as father or mother
    pub fn families_of_parent(&self, person_id: &str) -> &[String] {
        self.parent_families
            .get(person_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Gets the synthetic individual identifier of a stored person
    pub fn individual_id(&self, person_id: &str) -> Option<&str> {
        self.individual_ids.get(person_id).map(String::as_str)
    }

    /// Looks a family up by its synthetic identifier
    pub fn family(&self, family_id: &str) -> Option<&Family> {
        self.families.iter().find(|family| family.id == family_id)
    }
}

#[derive(Default)]
struct ParentPair {
    father: Option<String>,
    mother: Option<String>,
}

/// Builds family units from stored records and edges
///
/// For each child the last observed `father` and `mother` edge wins. Children
/// with an identical pair share one family; a pair with one side missing is
/// its own family. `spouse` and `child` edges are not consulted, so a
/// childless couple yields no family.
pub fn build_families(records: &[PersonRecord], edges: &[Relationship]) -> FamilyGraph {
    let individual_ids = records
        .iter()
        .enumerate()
        .map(|(i, record)| (record.id.clone(), format!("I{}", i + 1)))
        .collect();

    // Per-child parents, children in first-seen order
    let mut child_order: Vec<&str> = Vec::new();
    let mut parents: HashMap<&str, ParentPair> = HashMap::new();

    for edge in edges.iter().filter(|edge| edge.kind.is_parent()) {
        let pair = match parents.entry(edge.person_id.as_str()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                child_order.push(edge.person_id.as_str());
                entry.insert(ParentPair::default())
            }
        };

        match edge.kind {
            RelationType::Father => pair.father = Some(edge.related_id.clone()),
            RelationType::Mother => pair.mother = Some(edge.related_id.clone()),
            _ => {}
        }
    }

    let mut graph = FamilyGraph {
        individual_ids,
        ..Default::default()
    };
    let mut family_index: HashMap<(Option<String>, Option<String>), usize> = HashMap::new();

    for child in child_order {
        let Some(pair) = parents.remove(child) else {
            continue;
        };
        let key = (pair.father, pair.mother);

        let index = match family_index.get(&key) {
            Some(index) => *index,
            None => {
                let index = graph.families.len();
                graph.families.push(Family {
                    id: format!("F{}", index + 1),
                    father: key.0.clone(),
                    mother: key.1.clone(),
                    children: Vec::new(),
                });
                family_index.insert(key.clone(), index);
                index
            }
        };

        let family = &mut graph.families[index];
        family.children.push(child.to_string());
        graph
            .child_family
            .insert(child.to_string(), family.id.clone());

        for parent in [&family.father, &family.mother].into_iter().flatten() {
            let memberships = graph.parent_families.entry(parent.clone()).or_default();
            if !memberships.contains(&family.id) {
                memberships.push(family.id.clone());
            }
        }
    }

    graph
}
