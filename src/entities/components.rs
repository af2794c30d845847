// 🛗 Building Components - lifts, construction elements, services (reports 1.2 / 1.3)

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Service life assumed for a lift when the report leaves decommissioning empty
pub const LIFT_SERVICE_LIFE_DAYS: i64 = 365 * 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lift {
    pub building_id: i64,
    pub element_code: String,
    pub lift_type: Option<String>,
    pub stops_count: Option<i32>,
    pub commissioning_date: Option<NaiveDate>,
    pub decommissioning_date: Option<NaiveDate>,
    pub last_update: Option<NaiveDate>,
}

impl Lift {
    /// Fill an empty decommissioning date from the commissioning date
    pub fn with_derived_decommissioning(mut self) -> Self {
        if self.decommissioning_date.is_none() {
            self.decommissioning_date = self
                .commissioning_date
                .and_then(|d| d.checked_add_signed(Duration::days(LIFT_SERVICE_LIFE_DAYS)));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionElement {
    pub building_id: i64,
    pub element_code: String,
    pub element_type: Option<String>,
    pub system_type: Option<String>,
    pub roof_type: Option<String>,
    pub roofing_area: Option<f64>,
    pub basement_area: Option<f64>,
    pub facade_type: Option<String>,
    pub facade_area: Option<f64>,
    pub foundation_type: Option<String>,
    pub wall_material: Option<String>,
    pub last_update: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub building_id: i64,
    pub service_code: String,
    pub element_code: Option<String>,
    pub service_type: Option<String>,
    pub work_code: Option<String>,
    /// Year the work was done
    pub service_year: Option<i32>,
    /// Year the work is planned for
    pub planned_year: Option<i32>,
    pub contract_cost: Option<f64>,
    pub contractor_name: Option<String>,
    pub contractor_inn: Option<String>,
    pub last_update: Option<NaiveDate>,
}
