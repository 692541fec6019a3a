//! URL handling module
//!
//! A person's identity on the source site is an opaque identifier carried by
//! one query parameter of its page URL (`?i=111815`). This module extracts
//! that identifier and builds sibling URLs that point at a different person.

mod identity;

pub use identity::{parse_seed, person_id_from_query, person_id_from_url, with_person_id};
