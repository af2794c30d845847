// Capital Repair Import - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod address;        // Address normalization pipeline
pub mod collapse;       // Duplicate collapser (housing-fund rows → one per house)
pub mod config;         // Settings + reference data
pub mod db;             // SQLite schema, upserts, query layer
pub mod entities;       // Canonical rows
pub mod error;
pub mod fields;         // Header → column resolution
pub mod import;         // Stage orchestration
pub mod matcher;        // Cross-source match cascade
pub mod normalize;      // Single-value cleaners
pub mod reader;         // CSV sniffing + chunked rows

// Re-export commonly used types
pub use address::AddressNormalizer;
pub use collapse::{collapse_files, write_collapsed, CollapseStats, HouseCollapser, HousingFundRecord};
pub use config::{AppConfig, ReferenceData, RegionInfo};
pub use db::{
    open_database, setup_database, seed_regions, table_counts,
    Page, PageRequest, TableCounts,
};
pub use entities::{
    AccountOwnerType, Building, BuildingLink, ConstructionElement, ContactUpdate,
    Lift, ManagementCompany, Municipality, OrgType, Service,
};
pub use error::{ImportError, Result};
pub use fields::{find_column, HousingFundColumns, MatchMode, RegistryColumns};
pub use import::{
    import_regions, import_registry, link_regions, run_full,
    FullRunSummary, ImportContext, ReportKind,
};
pub use matcher::{CrossSourceMatcher, MatchOutcome, MatchStats, MatchedBy, TargetIndex};
pub use reader::{CsvRowReader, Row, RowSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
