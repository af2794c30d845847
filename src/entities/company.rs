// 🏛️ Management Company Entity - who runs a building
//
// Identity is the registration number (OGRN) scoped to a region: the same number
// shows up once per region in the housing-fund exports.
//
// Contacts arrive later from the registry source and only ever fill or refresh
// fields; an empty incoming value never erases a stored one.

use crate::normalize::{clean_email, clean_phone, clean_text};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ORGANIZATION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrgType {
    /// Management company (управляющая организация)
    #[serde(rename = "UK")]
    ManagementCompany,

    /// Homeowners association (ТСЖ)
    #[serde(rename = "TSJ")]
    HomeownersAssociation,

    /// Housing cooperative (ЖСК)
    #[serde(rename = "JSK")]
    HousingCooperative,
}

impl OrgType {
    pub fn code(&self) -> &'static str {
        match self {
            OrgType::ManagementCompany => "UK",
            OrgType::HomeownersAssociation => "TSJ",
            OrgType::HousingCooperative => "JSK",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "UK" => Some(OrgType::ManagementCompany),
            "TSJ" => Some(OrgType::HomeownersAssociation),
            "JSK" => Some(OrgType::HousingCooperative),
            _ => None,
        }
    }
}

// ============================================================================
// MANAGEMENT COMPANY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementCompany {
    /// Registration number, 13 or 15 digits
    pub ogrn: String,
    pub region_id: i64,
    pub name: Option<String>,
    pub org_type: OrgType,
}

impl ManagementCompany {
    pub fn new(ogrn: impl Into<String>, region_id: i64, org_type: OrgType) -> Self {
        ManagementCompany {
            ogrn: ogrn.into(),
            region_id,
            name: None,
            org_type,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

// ============================================================================
// CONTACT UPDATE (registry enrichment)
// ============================================================================

/// Contact fields for every company carrying `ogrn`, already cleaned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub ogrn: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub director_name: Option<String>,
    pub legal_address: Option<String>,
}

impl ContactUpdate {
    /// Build an update from raw registry values, cleaning each one
    pub fn from_raw(
        ogrn: String,
        name: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        director_name: Option<&str>,
        legal_address: Option<&str>,
    ) -> Self {
        ContactUpdate {
            ogrn,
            name: name.and_then(clean_text),
            phone: phone.and_then(clean_phone),
            email: email.and_then(clean_email),
            director_name: director_name.and_then(clean_text),
            legal_address: legal_address.and_then(clean_text),
        }
    }

    /// True when the update carries nothing that could change a stored row
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.director_name.is_none()
            && self.legal_address.is_none()
    }
}

// ============================================================================
// BUILDING ↔ COMPANY LINK
// ============================================================================

/// One management period; (building, company, start date) is unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingLink {
    pub building_id: i64,
    pub company_id: i64,
    pub start_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_type_codes() {
        assert_eq!(OrgType::ManagementCompany.code(), "UK");
        assert_eq!(OrgType::from_code("TSJ"), Some(OrgType::HomeownersAssociation));
        assert_eq!(OrgType::from_code("REGOP"), None);
    }

    #[test]
    fn test_contact_update_cleans_values() {
        let update = ContactUpdate::from_raw(
            "1021602841391".to_string(),
            Some("  ООО \"УК Уют\" "),
            Some("тел.: +7 (843) 222-33-44"),
            Some(" Info@UK-Uyut.RU "),
            Some(""),
            None,
        );

        assert_eq!(update.name.as_deref(), Some("ООО \"УК Уют\""));
        assert_eq!(update.phone.as_deref(), Some("+7(843)222-33-44"));
        assert_eq!(update.email.as_deref(), Some("info@uk-uyut.ru"));
        assert!(update.director_name.is_none());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_contact_update_empty() {
        let update = ContactUpdate::from_raw(
            "1021602841391".to_string(),
            None,
            Some("нет"),
            Some("no-email"),
            Some("   "),
            None,
        );
        assert!(update.is_empty());
    }
}
