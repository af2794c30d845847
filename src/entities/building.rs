// 🏢 Building Entity - one apartment building inside one region
//
// Identity:
// - mkd_code: regional identifier, unique within a region (conflict key with region_id)
// - houseguid: global address identifier, optional, unique when present
//
// Lifecycle: created by the region's report 1.1 import, updated in place by later runs,
// deleted only by the explicit region cleanup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT OWNER TYPE
// ============================================================================

/// Who holds the capital-repair fund account of a building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountOwnerType {
    /// Special account owned by a management company
    #[serde(rename = "UK")]
    ManagementCompany,

    /// Special account owned by a homeowners association
    #[serde(rename = "TSJ")]
    HomeownersAssociation,

    /// Special account owned by a housing cooperative
    #[serde(rename = "JSK")]
    HousingCooperative,

    /// Regional operator (common pot or its own special account)
    #[serde(rename = "REGOP")]
    RegionalOperator,
}

impl AccountOwnerType {
    /// Short code stored in `buildings.spec_account_owner_type`
    pub fn code(&self) -> &'static str {
        match self {
            AccountOwnerType::ManagementCompany => "UK",
            AccountOwnerType::HomeownersAssociation => "TSJ",
            AccountOwnerType::HousingCooperative => "JSK",
            AccountOwnerType::RegionalOperator => "REGOP",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "UK" => Some(AccountOwnerType::ManagementCompany),
            "TSJ" => Some(AccountOwnerType::HomeownersAssociation),
            "JSK" => Some(AccountOwnerType::HousingCooperative),
            "REGOP" => Some(AccountOwnerType::RegionalOperator),
            _ => None,
        }
    }
}

// ============================================================================
// MUNICIPALITY
// ============================================================================

/// Municipality reference, keyed by (region, administrative code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    pub region_id: i64,

    /// Administrative (OKTMO) code, digits only
    pub oktmo_code: Option<String>,

    pub name: String,
}

// ============================================================================
// BUILDING ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub region_id: i64,
    pub municipality_id: Option<i64>,

    /// Regional identifier (e.g. "16-001")
    pub mkd_code: String,

    /// Global address identifier, lower-case hyphenated GUID
    pub houseguid: Option<String>,

    /// Address exactly as the regional report spells it
    pub address: String,

    pub commission_year: Option<i32>,
    pub total_sq: Option<f64>,
    pub number_floors_max: Option<i32>,

    /// Raw "money collecting way" phrase
    pub money_collecting_way: Option<String>,
    pub spec_account_owner_type: Option<AccountOwnerType>,

    // Fund figures
    pub money_ppl_collected: Option<f64>,
    pub money_ppl_collected_debts: Option<f64>,
    pub overhaul_funds_spent_all: Option<f64>,
    pub overhaul_funds_balance: Option<f64>,

    pub last_update: Option<NaiveDate>,
}

impl Building {
    /// Create a building with only its identity filled in
    pub fn new(region_id: i64, mkd_code: impl Into<String>, address: impl Into<String>) -> Self {
        Building {
            region_id,
            municipality_id: None,
            mkd_code: mkd_code.into(),
            houseguid: None,
            address: address.into(),
            commission_year: None,
            total_sq: None,
            number_floors_max: None,
            money_collecting_way: None,
            spec_account_owner_type: None,
            money_ppl_collected: None,
            money_ppl_collected_debts: None,
            overhaul_funds_spent_all: None,
            overhaul_funds_balance: None,
            last_update: None,
        }
    }

    /// Builder pattern: add global address identifier
    pub fn with_houseguid(mut self, houseguid: impl Into<String>) -> Self {
        self.houseguid = Some(houseguid.into());
        self
    }

    /// Builder pattern: add municipality reference
    pub fn with_municipality(mut self, municipality_id: i64) -> Self {
        self.municipality_id = Some(municipality_id);
        self
    }

    /// Builder pattern: add fund balance
    pub fn with_balance(mut self, balance: f64) -> Self {
        self.overhaul_funds_balance = Some(balance);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_owner_codes_round_trip() {
        for owner in [
            AccountOwnerType::ManagementCompany,
            AccountOwnerType::HomeownersAssociation,
            AccountOwnerType::HousingCooperative,
            AccountOwnerType::RegionalOperator,
        ] {
            assert_eq!(AccountOwnerType::from_code(owner.code()), Some(owner));
        }
        assert_eq!(AccountOwnerType::from_code("OTHER"), None);
    }

    #[test]
    fn test_building_builder() {
        let building = Building::new(1, "16-001", "г. Казань, ул. Ленина, д. 5")
            .with_houseguid("0c5b2444-70a0-4932-980c-b4dc0d3f02b5")
            .with_balance(1250.5);

        assert_eq!(building.mkd_code, "16-001");
        assert_eq!(building.overhaul_funds_balance, Some(1250.5));
        assert!(building.municipality_id.is_none());
    }
}
