// 🔎 Field Extractor - locate columns by header substrings
//
// Source exports rename and reorder their columns between releases, so columns are
// found by what their header says rather than where they sit:
// - headers are compared after BOM removal, whitespace collapse and lower-casing
// - strict mode needs every needle, loose mode any one of them
// - the first header in column order wins
//
// Detection runs once per file, on the header row.

use crate::error::{ImportError, Result};
use crate::normalize::normalize_phrase;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Header must contain every needle
    Strict,
    /// Header must contain at least one needle
    Loose,
}

pub fn normalize_header(header: &str) -> String {
    normalize_phrase(header)
}

fn header_matches(normalized: &str, needles: &[&str], mode: MatchMode) -> bool {
    let mut hits = needles.iter().map(|n| normalized.contains(&normalize_phrase(n)));
    match mode {
        MatchMode::Strict => hits.all(|hit| hit),
        MatchMode::Loose => hits.any(|hit| hit),
    }
}

/// First header (in column order) matching the needles; returns the original header text
pub fn find_column(headers: &[String], needles: &[&str], mode: MatchMode) -> Option<String> {
    if needles.is_empty() {
        return None;
    }
    headers
        .iter()
        .find(|h| header_matches(&normalize_header(h), needles, mode))
        .cloned()
}

// ============================================================================
// EXCLUSIVE ASSIGNMENT
// ============================================================================

/// One concept to resolve against a header row
#[derive(Debug, Clone, Copy)]
pub struct ColumnConcept {
    pub name: &'static str,
    pub needles: &'static [&'static str],
}

/// Resolve several concepts at once, each header going to at most one concept
///
/// Headers are visited in column order; a header is given to the first concept
/// (in `concepts` order) that is still unassigned and matches it loosely.
pub fn assign_columns(headers: &[String], concepts: &[ColumnConcept]) -> HashMap<&'static str, String> {
    let mut assigned: HashMap<&'static str, String> = HashMap::new();

    for header in headers {
        let normalized = normalize_header(header);
        let concept = concepts.iter().find(|c| {
            !assigned.contains_key(c.name) && header_matches(&normalized, c.needles, MatchMode::Loose)
        });
        if let Some(concept) = concept {
            assigned.insert(concept.name, header.clone());
        }
    }

    assigned
}

// ============================================================================
// HOUSING-FUND COLUMNS
// ============================================================================

/// Columns of the national housing-fund export
#[derive(Debug, Clone, PartialEq)]
pub struct HousingFundColumns {
    pub guid: String,
    pub address: Option<String>,
    pub oktmo: Option<String>,
    pub method: Option<String>,
    pub ogrn: Option<String>,
    pub kpp: Option<String>,
    pub org_name: Option<String>,
}

impl HousingFundColumns {
    /// Only the house identifier column is mandatory
    pub fn detect(headers: &[String], file: &Path) -> Result<Self> {
        let guid = find_column(
            headers,
            &["глобальный уникальный идентификатор дома по фиас"],
            MatchMode::Strict,
        )
        .ok_or_else(|| ImportError::MissingColumn {
            file: file.to_path_buf(),
            column: "Глобальный уникальный идентификатор дома по ФИАС".to_string(),
        })?;

        // "ОГРН организации, осуществляющей управление домом": both parts are required,
        // otherwise "Способ управления" would be taken for it
        let managing = |what: &str| find_column(headers, &[what, "управлен"], MatchMode::Strict);

        Ok(HousingFundColumns {
            guid,
            address: find_column(headers, &["адрес ожф"], MatchMode::Strict)
                .or_else(|| find_column(headers, &["адрес"], MatchMode::Strict)),
            oktmo: find_column(headers, &["код октмо"], MatchMode::Strict),
            method: find_column(headers, &["способ управления"], MatchMode::Strict),
            ogrn: managing("огрн организации"),
            kpp: managing("кпп организации"),
            org_name: managing("наименование организации"),
        })
    }
}

// ============================================================================
// REGISTRY COLUMNS
// ============================================================================

pub const REGISTRY_CONCEPTS: [ColumnConcept; 6] = [
    ColumnConcept { name: "ogrn", needles: &["огрн"] },
    ColumnConcept { name: "name", needles: &["наименование", "название", "организац"] },
    ColumnConcept { name: "phone", needles: &["телефон", "тел.", "phone"] },
    ColumnConcept { name: "email", needles: &["email", "e-mail", "почт"] },
    ColumnConcept { name: "director", needles: &["руководител", "директор", "фио"] },
    ColumnConcept { name: "address", needles: &["адрес", "address"] },
];

/// Columns of the management-company registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryColumns {
    pub ogrn: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub director: Option<String>,
    pub address: Option<String>,
}

impl RegistryColumns {
    pub fn detect(headers: &[String], file: &Path) -> Result<Self> {
        let mut assigned = assign_columns(headers, &REGISTRY_CONCEPTS);
        let ogrn = assigned.remove("ogrn").ok_or_else(|| ImportError::MissingColumn {
            file: file.to_path_buf(),
            column: "ОГРН".to_string(),
        })?;

        Ok(RegistryColumns {
            ogrn,
            name: assigned.remove("name"),
            phone: assigned.remove("phone"),
            email: assigned.remove("email"),
            director: assigned.remove("director"),
            address: assigned.remove("address"),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
