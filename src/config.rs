// ⚙️ Configuration - application settings + immutable reference data
//
// Settings resolve with priority: CLI flag → environment → TOML file → defaults.
// Reference data (regions, mappings, address rule tables) is static: built once,
// then passed by reference into every component.

use crate::entities::{AccountOwnerType, OrgType};
use crate::error::{ImportError, Result};
use crate::normalize::normalize_phrase;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_DB_PATH: &str = "CAPREPAIR_DB";
pub const ENV_DATA_DIR: &str = "CAPREPAIR_DATA_DIR";
pub const ENV_CHUNK_SIZE: &str = "CAPREPAIR_CHUNK_SIZE";

// ============================================================================
// APPLICATION SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Root data directory; the paths below are relative to it unless absolute
    pub data_dir: PathBuf,

    /// Per-region report folders (`<regions_dir>/<region folder>/*kr1_1*.csv`)
    pub regions_dir: PathBuf,

    /// Housing-fund-objects exports (`*.csv`, region name in the file name)
    pub housing_fund_dir: PathBuf,

    /// Contacts registry export
    pub registry_file: PathBuf,

    /// Rows per chunk when streaming housing-fund files
    pub chunk_size: usize,

    /// Rows per write batch for report imports
    pub batch_size: usize,

    /// Replaces the built-in reference data wholesale when present
    pub reference: Option<ReferenceData>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from("capital_repair.db"),
            data_dir: PathBuf::from("data"),
            regions_dir: PathBuf::from("regions"),
            housing_fund_dir: PathBuf::from("ojf_data"),
            registry_file: PathBuf::from("registry.csv"),
            chunk_size: 500_000,
            batch_size: 1_000,
            reference: None,
        }
    }
}

impl AppConfig {
    /// Load settings: defaults, then the TOML file (if given), then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImportError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            ImportError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(db) = std::env::var(ENV_DB_PATH) {
            debug!(db = %db, "Database path from environment");
            self.db_path = PathBuf::from(db);
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            debug!(dir = %dir, "Data directory from environment");
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(size) = std::env::var(ENV_CHUNK_SIZE)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
        {
            self.chunk_size = size;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ImportError::Config("chunk_size must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ImportError::Config("batch_size must be positive".to_string()));
        }
        if let Some(reference) = &self.reference {
            if reference.regions.is_empty() {
                return Err(ImportError::Config(
                    "reference data must list at least one region".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Reference data in effect (override or built-in)
    pub fn reference_data(&self) -> ReferenceData {
        self.reference.clone().unwrap_or_default()
    }

    pub fn regions_path(&self) -> PathBuf {
        self.resolve(&self.regions_dir)
    }

    pub fn housing_fund_path(&self) -> PathBuf {
        self.resolve(&self.housing_fund_dir)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.registry_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInfo {
    /// Two-digit region code ("16")
    pub code: String,
    pub name: String,
    /// Folder under `regions_dir` holding the region's reports
    pub folder: String,
    /// Fragment identifying the region in housing-fund file names ("Татарстан Респ")
    pub housing_fund_marker: String,
}

/// Phrase from `money_collecting_way` → account owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOwnerRule {
    pub phrase: String,
    pub owner: AccountOwnerType,
}

/// Management-method keywords → organization type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodRule {
    pub org_type: OrgType,
    /// Short keywords (≤ 3 chars) must equal the whole phrase, longer ones match as substrings
    pub keywords: Vec<String>,
}

/// One street-type concept with all its spellings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetType {
    pub canonical: String,
    pub variants: Vec<String>,
}

/// Token tables used by the address pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRules {
    pub block_prefix: String,
    pub structure_prefix: String,
    /// Administrative-unit markers of a region segment
    pub region_markers: Vec<String>,
    pub city_markers: Vec<String>,
    pub house_markers: Vec<String>,
    /// Building (корпус) markers, compacted to `block_prefix`
    pub block_markers: Vec<String>,
    /// Structure (строение) markers, compacted to `structure_prefix`
    pub structure_markers: Vec<String>,
    pub litera_markers: Vec<String>,
    /// Apartment / premises markers; the number after them is cut
    pub unit_markers: Vec<String>,
    pub street_types: Vec<StreetType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub federal_district: String,
    /// Substring that marks any regional-operator phrase not listed in `account_owners`
    pub regional_operator_hint: String,
    /// Management method phrase meaning "no method chosen yet"
    pub method_not_selected: String,
    pub regions: Vec<RegionInfo>,
    pub account_owners: Vec<AccountOwnerRule>,
    pub management_methods: Vec<MethodRule>,
    pub address: AddressRules,
}

impl ReferenceData {
    pub fn region(&self, code: &str) -> Option<&RegionInfo> {
        self.regions.iter().find(|r| r.code == code)
    }

    /// Region whose housing-fund marker appears in a file name
    pub fn region_for_file_name(&self, file_name: &str) -> Option<&RegionInfo> {
        self.regions
            .iter()
            .find(|r| file_name.contains(&r.housing_fund_marker))
    }

    /// Account owner from a `money_collecting_way` phrase
    pub fn account_owner(&self, phrase: &str) -> Option<AccountOwnerType> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return None;
        }
        if let Some(rule) = self.account_owners.iter().find(|r| r.phrase == phrase) {
            return Some(rule.owner);
        }
        if phrase.to_lowercase().contains(&self.regional_operator_hint) {
            return Some(AccountOwnerType::RegionalOperator);
        }
        None
    }

    /// True when a management method is present and actually chosen
    pub fn is_method_selected(&self, method: &str) -> bool {
        let method = normalize_phrase(method);
        !method.is_empty() && !method.contains(&self.method_not_selected)
    }

    /// Organization type implied by a management method, None for anything unlinkable
    pub fn org_type_for_method(&self, method: &str) -> Option<OrgType> {
        if !self.is_method_selected(method) {
            return None;
        }
        let method = normalize_phrase(method);
        self.management_methods
            .iter()
            .find(|rule| {
                rule.keywords.iter().any(|kw| {
                    if kw.chars().count() <= 3 {
                        method == *kw
                    } else {
                        method.contains(kw.as_str())
                    }
                })
            })
            .map(|rule| rule.org_type)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AddressRules {
    fn default() -> Self {
        let street = |canonical: &str, variants: &[&str]| StreetType {
            canonical: canonical.to_string(),
            variants: strings(variants),
        };

        AddressRules {
            street_types: vec![
                street("улица", &["ул", "улица"]),
                street("проспект", &["пр-т", "пр-кт", "пркт", "просп", "пр", "проспект"]),
                street("бульвар", &["б-р", "бр", "бул", "бульв", "бульвар"]),
                street("переулок", &["пер", "пер-к", "переулок"]),
                street("шоссе", &["ш", "шос", "шоссе"]),
                street("набережная", &["наб", "набер", "набережная"]),
                street("площадь", &["пл", "пл-дь", "площадь"]),
                street("тупик", &["туп", "тупик"]),
                street("проезд", &["пр-д", "прд", "проезд"]),
                street("аллея", &["ал", "аллея"]),
            ],
            region_markers: strings(&[
                "обл",
                "область",
                "респ",
                "республика",
                "край",
                "ао",
                "аобл",
                "автономный",
                "автономная",
            ]),
            city_markers: strings(&["г", "гор", "город"]),
            house_markers: strings(&["д", "дом"]),
            block_markers: strings(&["к", "корп", "корпус"]),
            block_prefix: "к".to_string(),
            structure_markers: strings(&["с", "стр", "строение"]),
            structure_prefix: "с".to_string(),
            litera_markers: strings(&["лит", "литер", "литера"]),
            unit_markers: strings(&["кв", "квартира", "пом", "помещение", "комн", "комната", "офис"]),
        }
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        let region = |code: &str, name: &str, folder: &str, marker: &str| RegionInfo {
            code: code.to_string(),
            name: name.to_string(),
            folder: folder.to_string(),
            housing_fund_marker: marker.to_string(),
        };
        let owner = |phrase: &str, owner: AccountOwnerType| AccountOwnerRule {
            phrase: phrase.to_string(),
            owner,
        };

        ReferenceData {
            federal_district: "Приволжский ФО".to_string(),
            regions: vec![
                region("02", "Республика Башкортостан", "02_bashkortostan", "Башкортостан Респ"),
                region("12", "Республика Марий Эл", "12_mariy-el", "Марий Эл Респ"),
                region("13", "Республика Мордовия", "13_mordoviya", "Мордовия Респ"),
                region("16", "Республика Татарстан", "16_tatarstan", "Татарстан Респ"),
                region("18", "Удмуртская Республика", "18_udmurtiya", "Удмуртская Респ"),
                region("21", "Чувашская Республика", "21_chuvashiya", "Чувашская Республика"),
                region("43", "Кировская область", "43_kirov", "Кировская обл"),
                region("52", "Нижегородская область", "52_nizhniy-novgorod", "Нижегородская обл"),
                region("56", "Оренбургская область", "56_orenburg", "Оренбургская обл"),
                region("58", "Пензенская область", "58_penza", "Пензенская обл"),
                region("59", "Пермский край", "59_perm", "Пермский край"),
                region("63", "Самарская область", "63_samara", "Самарская обл"),
                region("64", "Саратовская область", "64_saratov", "Саратовская обл"),
                region("73", "Ульяновская область", "73_ulyanovsk", "Ульяновская обл"),
            ],
            account_owners: vec![
                owner(
                    "Специальный счет, владельцем которого является управляющая компания",
                    AccountOwnerType::ManagementCompany,
                ),
                owner(
                    "Специальный счет, владельцем которого является товарищество собственников жилья",
                    AccountOwnerType::HomeownersAssociation,
                ),
                owner(
                    "Специальный счет, владельцем которого является жилищно-строительный кооператив",
                    AccountOwnerType::HousingCooperative,
                ),
                owner(
                    "Специальный счет, владельцем которого является региональный оператор",
                    AccountOwnerType::RegionalOperator,
                ),
                owner("Счет регионального оператора", AccountOwnerType::RegionalOperator),
            ],
            regional_operator_hint: "регионального оператора".to_string(),
            management_methods: vec![
                MethodRule {
                    org_type: OrgType::ManagementCompany,
                    keywords: strings(&["уо", "управляющ"]),
                },
                MethodRule {
                    org_type: OrgType::HomeownersAssociation,
                    keywords: strings(&["тсж", "товарищест"]),
                },
                MethodRule {
                    org_type: OrgType::HousingCooperative,
                    keywords: strings(&["жск", "кооператив"]),
                },
            ],
            method_not_selected: "не выбран".to_string(),
            address: AddressRules::default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
