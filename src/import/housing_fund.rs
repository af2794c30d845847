// 🏢 Housing-Fund Linking - collapse, match, persist company links
//
// Per region:
// 1. every housing-fund export naming the region is collapsed to one row per house
// 2. stored buildings of the region are indexed for the match cascade
// 3. each house with a valid registration number and a linkable management method
//    upserts its company; matched houses also get a link stamped with the run date
//
// One transaction per region. Unmatched houses are counted, never errors.

use super::{ImportContext, StageFailure};
use crate::collapse::{collapse_files, CollapseStats};
use crate::config::RegionInfo;
use crate::db;
use crate::entities::{BuildingLink, ManagementCompany};
use crate::error::{ImportError, Result};
use crate::matcher::{CrossSourceMatcher, IndexStats, MatchOutcome, MatchStats};
use crate::normalize::clean_registration_number;
use rusqlite::Connection;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkSummary {
    pub region: String,
    pub files: usize,
    pub collapse: CollapseStats,
    pub index: IndexStats,
    pub matches: MatchStats,
    pub companies_upserted: u64,
    pub links_created: u64,
    /// Links already present for the same building, company and date
    pub links_existing: u64,
    /// Houses without a 13/15-digit registration number
    pub skipped_no_ogrn: u64,
    /// Houses whose management method does not map to an organization type
    pub skipped_no_org_type: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkStageSummary {
    pub regions: Vec<LinkSummary>,
    pub failures: Vec<StageFailure>,
    pub totals: MatchStats,
}

impl LinkStageSummary {
    pub fn links_created(&self) -> u64 {
        self.regions.iter().map(|r| r.links_created).sum()
    }
}

/// Housing-fund exports (`*.csv`, sorted by name) whose file name carries the region marker
pub fn region_files(dir: &Path, region: &RegionInfo) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImportError::MissingSource(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| {
                    name.to_lowercase().ends_with(".csv") && name.contains(&region.housing_fund_marker)
                })
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Link the selected regions; a failing region is rolled back, recorded and skipped
///
/// A missing housing-fund directory skips the whole stage with a warning.
pub fn link_regions(conn: &mut Connection, ctx: &ImportContext, selection: Option<&str>) -> Result<LinkStageSummary> {
    let regions = ctx.select_regions(selection)?;
    db::seed_regions(conn, &ctx.reference)?;

    let mut summary = LinkStageSummary::default();
    let dir = ctx.config.housing_fund_path();
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "housing-fund directory not found, linking skipped");
        return Ok(summary);
    }

    for region in regions {
        match link_region(conn, ctx, region) {
            Ok(result) => {
                summary.totals.merge(&result.matches);
                summary.regions.push(result);
            }
            Err(err) => summary
                .failures
                .push(StageFailure::record(format!("linking {}", region.code), &err)),
        }
    }

    info!(
        regions = summary.regions.len(),
        links = summary.links_created(),
        matched = summary.totals.matched(),
        unmatched = summary.totals.unmatched,
        failures = summary.failures.len(),
        "linking finished"
    );
    Ok(summary)
}

/// Collapse, match and link one region inside a single transaction
pub fn link_region(conn: &mut Connection, ctx: &ImportContext, region: &RegionInfo) -> Result<LinkSummary> {
    let files = region_files(&ctx.config.housing_fund_path(), region)?;
    let mut summary = LinkSummary {
        region: region.code.clone(),
        files: files.len(),
        ..Default::default()
    };
    if files.is_empty() {
        warn!(region = %region.code, marker = %region.housing_fund_marker, "no housing-fund files for region");
        return Ok(summary);
    }

    let (houses, collapse) = collapse_files(&files, &ctx.reference, ctx.config.chunk_size)?;
    summary.collapse = collapse;
    info!(
        region = %region.code,
        rows = collapse.rows_seen,
        houses = collapse.distinct_keys,
        ogrn_share = %format!("{:.1}%", collapse.ogrn_share() * 100.0),
        "housing fund collapsed"
    );

    let region_id = db::require_region_id(conn, &region.code)?;
    let tx = conn.transaction()?;
    let targets = db::load_match_targets(&tx, region_id)?;
    let mut matcher = CrossSourceMatcher::new(targets, &ctx.normalizer);
    summary.index = matcher.index_stats();
    if summary.index.ambiguous_composite + summary.index.ambiguous_address > 0 {
        debug!(region = %region.code, index = ?summary.index, "ambiguous match keys, first building kept");
    }

    for house in &houses {
        let Some(ogrn) = house.ogrn.as_deref().and_then(clean_registration_number) else {
            summary.skipped_no_ogrn += 1;
            continue;
        };
        let Some(org_type) = house
            .method
            .as_deref()
            .and_then(|method| ctx.reference.org_type_for_method(method))
        else {
            summary.skipped_no_org_type += 1;
            continue;
        };

        let company = ManagementCompany::new(ogrn, region_id, org_type).with_name(house.org_name.clone());
        let company_id = db::upsert_company(&tx, &company)?;
        summary.companies_upserted += 1;

        if let MatchOutcome::Matched { target, .. } = matcher.resolve(house) {
            let link = BuildingLink {
                building_id: target,
                company_id,
                start_date: ctx.run_date,
            };
            if db::insert_link(&tx, &link)? {
                summary.links_created += 1;
            } else {
                summary.links_existing += 1;
            }
        }
    }

    tx.commit()?;
    summary.matches = matcher.stats();
    summary.matches.log(&region.code);
    info!(
        region = %region.code,
        companies = summary.companies_upserted,
        links_created = summary.links_created,
        links_existing = summary.links_existing,
        "region linked"
    );
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::entities::Building;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const GUID: &str = "0c5b2444-70a0-4932-980c-b4dc0d3f02b5";

    fn setup(dir: &TempDir) -> (ImportContext, Connection) {
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = ImportContext::new(config).with_run_date(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        db::seed_regions(&conn, &ctx.reference).unwrap();
        (ctx, conn)
    }

    fn write_export(dir: &TempDir, name: &str, content: &str) {
        let folder = dir.path().join("ojf_data");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join(name), content).unwrap();
    }

    const HEADER: &str = "Глобальный уникальный идентификатор дома по ФИАС;Адрес ОЖФ;Код ОКТМО;Способ управления;ОГРН организации, осуществляющей управление домом;Наименование организации, осуществляющей управление домом\n";

    #[test]
    fn test_region_files_filter_by_marker() {
        let dir = TempDir::new().unwrap();
        write_export(&dir, "ОЖФ Татарстан Респ_2.csv", HEADER);
        write_export(&dir, "ОЖФ Татарстан Респ_1.csv", HEADER);
        write_export(&dir, "ОЖФ Пермский край_1.csv", HEADER);
        let (ctx, _) = setup(&dir);
        let region = ctx.reference.region("16").unwrap();

        let files = region_files(&ctx.config.housing_fund_path(), region).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].to_string_lossy().ends_with("Респ_1.csv"));
    }

    #[test]
    fn test_link_region_by_identifier_and_address() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "{HEADER}{GUID};г. Казань, ул. Ленина, д. 5, кв. 1;92701000;Управление управляющей организацией;;\n\
             {GUID};г. Казань, ул. Ленина, д. 5, кв. 12;92701000;Управление управляющей организацией;1021602841391;ООО УК Уют\n\
             11111111-2222-3333-4444-555555555555;Казань, Баумана улица, 7;92701000;ТСЖ;1151690000017;ТСЖ Баумана 7\n\
             22222222-2222-3333-4444-555555555555;Казань, Кремлевская, 1;92701000;Не выбран;1021602841391;ООО УК Уют\n"
        );
        write_export(&dir, "ОЖФ Татарстан Респ_1.csv", &content);
        let (ctx, mut conn) = setup(&dir);
        let region_id = db::require_region_id(&conn, "16").unwrap();
        db::upsert_building(&conn, &Building::new(region_id, "16-001", "г. Казань, ул. Ленина, д. 5").with_houseguid(GUID)).unwrap();
        db::upsert_building(&conn, &Building::new(region_id, "16-002", "Республика Татарстан, г. Казань, ул. Баумана, д. 7")).unwrap();

        let region = ctx.reference.region("16").unwrap().clone();
        let summary = link_region(&mut conn, &ctx, &region).unwrap();

        assert_eq!(summary.collapse.distinct_keys, 3);
        assert_eq!(summary.companies_upserted, 2);
        assert_eq!(summary.skipped_no_org_type, 1);
        assert_eq!(summary.matches.by_identifier, 1);
        assert_eq!(summary.matches.by_address, 1);
        assert_eq!(summary.links_created, 2);

        // Second run over the same input adds nothing
        let again = link_region(&mut conn, &ctx, &region).unwrap();
        assert_eq!(again.links_created, 0);
        assert_eq!(again.links_existing, 2);
        assert_eq!(db::table_counts(&conn).unwrap().buildings_management, 2);
    }

    #[test]
    fn test_missing_directory_skips_stage() {
        let dir = TempDir::new().unwrap();
        let (ctx, mut conn) = setup(&dir);
        let summary = link_regions(&mut conn, &ctx, Some("16")).unwrap();
        assert!(summary.regions.is_empty());
        assert!(summary.failures.is_empty());
    }
}
