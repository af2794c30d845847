// 🚚 Import Pipeline - stage orchestration
//
// Three independent stages, each one safe to re-run:
// 1. regional reports (1.1 buildings, 1.2 components, 1.3 services) per region
// 2. housing-fund linking: collapse → match → company upsert → link, per region
// 3. registry enrichment of company contacts
//
// A failing file or region is reported and the run moves on to the next one.

pub mod housing_fund;
pub mod regional;
pub mod registry;

use crate::address::AddressNormalizer;
use crate::config::{AppConfig, ReferenceData, RegionInfo};
use crate::db;
use crate::error::{ImportError, Result};
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info, warn};

pub use housing_fund::{link_region, link_regions, LinkStageSummary, LinkSummary};
pub use regional::{import_region, import_regions, RegionImportSummary, ReportKind, ReportStageSummary, ReportSummary};
pub use registry::{import_registry, RegistrySummary};

/// Rows reported individually per file before only counting
pub(crate) const MAX_ROW_WARNINGS: u64 = 20;

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything a stage needs besides the connection; built once per run
pub struct ImportContext {
    pub config: AppConfig,
    pub reference: ReferenceData,
    pub normalizer: AddressNormalizer,
    /// Start date stamped on management links created by this run
    pub run_date: NaiveDate,
}

impl ImportContext {
    pub fn new(config: AppConfig) -> Self {
        let reference = config.reference_data();
        let normalizer = AddressNormalizer::new(&reference.address);
        ImportContext {
            config,
            reference,
            normalizer,
            run_date: Local::now().date_naive(),
        }
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    /// `None` or "all" selects every region; otherwise one region by code
    pub fn select_regions(&self, selection: Option<&str>) -> Result<Vec<&RegionInfo>> {
        match selection.map(str::trim) {
            None | Some("all") | Some("") => Ok(self.reference.regions.iter().collect()),
            Some(code) => self
                .reference
                .region(code)
                .map(|region| vec![region])
                .ok_or_else(|| ImportError::UnknownRegion(code.to_string())),
        }
    }
}

// ============================================================================
// SUMMARIES
// ============================================================================

/// A file or region whose transaction was rolled back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub scope: String,
    pub message: String,
}

impl StageFailure {
    pub(crate) fn record(scope: impl Into<String>, err: &ImportError) -> Self {
        let scope = scope.into();
        error!(scope = %scope, error = %err, "stage failed, continuing with the next one");
        StageFailure {
            scope,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FullRunSummary {
    pub reports: ReportStageSummary,
    pub linking: LinkStageSummary,
    pub registry: Option<RegistrySummary>,
    pub failures: Vec<StageFailure>,
}

impl FullRunSummary {
    /// Failures across every stage
    pub fn failure_count(&self) -> usize {
        self.reports.failures.len() + self.linking.failures.len() + self.failures.len()
    }
}

/// Regions, reports for every region, linking, then registry enrichment
pub fn run_full(conn: &mut Connection, ctx: &ImportContext) -> Result<FullRunSummary> {
    db::seed_regions(conn, &ctx.reference)?;
    info!(regions = ctx.reference.regions.len(), run_date = %ctx.run_date, "full import started");

    let mut summary = FullRunSummary {
        reports: import_regions(conn, ctx, None, None, false)?,
        linking: link_regions(conn, ctx, None)?,
        ..Default::default()
    };

    match import_registry(conn, ctx, &ctx.config.registry_path()) {
        Ok(registry) => summary.registry = Some(registry),
        Err(err) if err.is_skippable() => warn!(error = %err, "registry stage skipped"),
        Err(err) => summary.failures.push(StageFailure::record("registry", &err)),
    }

    info!(failures = summary.failure_count(), "full import finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_regions() {
        let ctx = ImportContext::new(AppConfig::default());
        assert_eq!(ctx.select_regions(None).unwrap().len(), 14);
        assert_eq!(ctx.select_regions(Some("all")).unwrap().len(), 14);

        let one = ctx.select_regions(Some("16")).unwrap();
        assert_eq!(one[0].folder, "16_tatarstan");

        assert!(matches!(
            ctx.select_regions(Some("99")),
            Err(ImportError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_run_date_override() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let ctx = ImportContext::new(AppConfig::default()).with_run_date(date);
        assert_eq!(ctx.run_date, date);
    }
}
