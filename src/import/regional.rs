// 📊 Regional Reports - 1.1 buildings, 1.2 components, 1.3 services
//
// Each region folder holds up to three report files, recognised by name
// (`*kr1_1*.csv`, `*kr1-2*.csv`, ...). Every file is written in one transaction:
// a file either lands completely or not at all.

use super::{ImportContext, StageFailure, MAX_ROW_WARNINGS};
use crate::config::RegionInfo;
use crate::db;
use crate::entities::{Building, ConstructionElement, Lift, Municipality, Service};
use crate::error::{ImportError, Result};
use crate::normalize::{clean_guid, clean_text, parse_date, parse_decimal, parse_int};
use crate::reader::{CsvRowReader, Row, RowSource};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Element types containing this fragment are lifts
const LIFT_MARKER: &str = "лифт";

// ============================================================================
// REPORT KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    /// 1.1: buildings with fund balances
    #[serde(rename = "1.1")]
    Buildings,

    /// 1.2: lifts and other construction elements
    #[serde(rename = "1.2")]
    Components,

    /// 1.3: performed and planned services
    #[serde(rename = "1.3")]
    Services,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Buildings, ReportKind::Components, ReportKind::Services];

    pub fn code(&self) -> &'static str {
        match self {
            ReportKind::Buildings => "1.1",
            ReportKind::Components => "1.2",
            ReportKind::Services => "1.3",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1.1" | "1_1" | "kr1_1" => Some(ReportKind::Buildings),
            "1.2" | "1_2" | "kr1_2" => Some(ReportKind::Components),
            "1.3" | "1_3" | "kr1_3" => Some(ReportKind::Services),
            _ => None,
        }
    }

    /// File-name fragments identifying the report
    pub fn file_markers(&self) -> [&'static str; 2] {
        match self {
            ReportKind::Buildings => ["kr1_1", "kr1-1"],
            ReportKind::Components => ["kr1_2", "kr1-2"],
            ReportKind::Services => ["kr1_3", "kr1-3"],
        }
    }
}

/// First `*.csv` in `dir` (by name) whose file name carries the report marker
pub fn find_report_file(dir: &Path, kind: ReportKind) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImportError::MissingSource(dir.to_path_buf()));
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            name.ends_with(".csv") && kind.file_markers().iter().any(|m| name.contains(m))
        })
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

// ============================================================================
// SUMMARIES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub kind: ReportKind,
    pub file: PathBuf,
    pub rows_read: u64,
    pub rows_written: u64,
    /// Rows dropped for a missing key, an unknown building or a bad cell
    pub rows_skipped: u64,
}

impl ReportSummary {
    fn new(kind: ReportKind, file: &Path) -> Self {
        ReportSummary {
            kind,
            file: file.to_path_buf(),
            rows_read: 0,
            rows_written: 0,
            rows_skipped: 0,
        }
    }

    fn skip(&mut self, row_line: u64, reason: &str) {
        self.rows_skipped += 1;
        if self.rows_skipped <= MAX_ROW_WARNINGS {
            warn!(file = %self.file.display(), line = row_line, reason, "row skipped");
        } else {
            debug!(file = %self.file.display(), line = row_line, reason, "row skipped");
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionImportSummary {
    pub region: String,
    /// Rows removed by `--clean` before importing
    pub cleaned: usize,
    pub reports: Vec<ReportSummary>,
    /// Report files rolled back; a failed 1.1 stops the region
    pub failures: Vec<StageFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportStageSummary {
    pub regions: Vec<RegionImportSummary>,
    pub failures: Vec<StageFailure>,
}

impl ReportStageSummary {
    pub fn rows_written(&self) -> u64 {
        self.regions
            .iter()
            .flat_map(|r| r.reports.iter())
            .map(|r| r.rows_written)
            .sum()
    }
}

// ============================================================================
// ROW SHAPES
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BuildingRow {
    mkd_code: Option<String>,
    houseguid: Option<String>,
    address: Option<String>,
    mun_obr_oktmo: Option<String>,
    mun_obr: Option<String>,
    commission_year: Option<String>,
    total_sq: Option<String>,
    number_floors_max: Option<String>,
    money_collecting_way: Option<String>,
    money_ppl_collected: Option<String>,
    money_ppl_collected_debts: Option<String>,
    overhaul_funds_spent_all: Option<String>,
    overhaul_funds_balance: Option<String>,
    last_update: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComponentRow {
    mkd_code: Option<String>,
    construction_element_code: Option<String>,
    construction_element_type: Option<String>,
    system_type: Option<String>,
    roof_type: Option<String>,
    roofing_area: Option<String>,
    basement_area: Option<String>,
    facade_type: Option<String>,
    facade_area: Option<String>,
    foundation_type: Option<String>,
    wall_material: Option<String>,
    lift_type: Option<String>,
    stops_count: Option<String>,
    commissioning_date: Option<String>,
    decommissioning_date: Option<String>,
    last_update: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceRow {
    mkd_code: Option<String>,
    construction_element_code: Option<String>,
    service_code: Option<String>,
    service_type: Option<String>,
    work_code: Option<String>,
    service_date: Option<String>,
    service_date_by_plan: Option<String>,
    plan_service_cost_contract: Option<String>,
    contractor_name: Option<String>,
    contractor_inn: Option<String>,
    last_update: Option<String>,
}

fn text(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(clean_text)
}

fn decimal(value: &Option<String>) -> Option<f64> {
    value.as_deref().and_then(parse_decimal)
}

fn int(value: &Option<String>) -> Option<i32> {
    value.as_deref().and_then(parse_int)
}

fn date(value: &Option<String>) -> Option<chrono::NaiveDate> {
    value.as_deref().and_then(parse_date)
}

// ============================================================================
// REGION IMPORT
// ============================================================================

/// Import the selected regions; a failing region is recorded and skipped
///
/// Fails only when `selection` names an unknown region.
pub fn import_regions(
    conn: &mut Connection,
    ctx: &ImportContext,
    selection: Option<&str>,
    only: Option<ReportKind>,
    clean: bool,
) -> Result<ReportStageSummary> {
    let regions = ctx.select_regions(selection)?;
    db::seed_regions(conn, &ctx.reference)?;

    let mut summary = ReportStageSummary::default();
    for region in regions {
        match import_region(conn, ctx, region, only, clean) {
            Ok(result) => {
                summary.failures.extend(result.failures.iter().cloned());
                summary.regions.push(result);
            }
            Err(err) if err.is_skippable() => {
                warn!(region = %region.code, error = %err, "region has no report folder, skipped")
            }
            Err(err) => summary
                .failures
                .push(StageFailure::record(format!("region {}", region.code), &err)),
        }
    }

    info!(
        regions = summary.regions.len(),
        rows = summary.rows_written(),
        failures = summary.failures.len(),
        "report import finished"
    );
    Ok(summary)
}

/// Import one region's reports (all three, or only `only`)
///
/// Each file commits on its own. A failing file is rolled back and recorded; the
/// remaining reports still run unless the buildings report (1.1) itself failed.
pub fn import_region(
    conn: &mut Connection,
    ctx: &ImportContext,
    region: &RegionInfo,
    only: Option<ReportKind>,
    clean: bool,
) -> Result<RegionImportSummary> {
    let dir = ctx.config.regions_path().join(&region.folder);
    if !dir.is_dir() {
        return Err(ImportError::MissingSource(dir));
    }
    let region_id = db::require_region_id(conn, &region.code)?;

    let mut summary = RegionImportSummary {
        region: region.code.clone(),
        ..Default::default()
    };

    if clean {
        let tx = conn.transaction()?;
        summary.cleaned = match only {
            None | Some(ReportKind::Buildings) => db::delete_region_data(&tx, region_id)?,
            Some(ReportKind::Components) => db::delete_region_components(&tx, region_id)?,
            Some(ReportKind::Services) => db::delete_region_services(&tx, region_id)?,
        };
        tx.commit()?;
        info!(region = %region.code, rows = summary.cleaned, "region data cleaned");
    }

    let kinds: Vec<ReportKind> = match only {
        Some(kind) => vec![kind],
        None => ReportKind::ALL.to_vec(),
    };

    for kind in kinds {
        let Some(file) = find_report_file(&dir, kind)? else {
            warn!(region = %region.code, report = kind.code(), "report file not found");
            continue;
        };
        let result = match kind {
            ReportKind::Buildings => import_buildings_file(conn, ctx, region_id, &file),
            ReportKind::Components => import_components_file(conn, ctx, region_id, &file),
            ReportKind::Services => import_services_file(conn, ctx, region_id, &file),
        };
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                let scope = format!("region {} report {}", region.code, kind.code());
                summary.failures.push(StageFailure::record(scope, &err));
                if kind == ReportKind::Buildings {
                    break;
                }
                continue;
            }
        };
        info!(
            region = %region.code,
            report = kind.code(),
            written = report.rows_written,
            skipped = report.rows_skipped,
            "report imported"
        );
        summary.reports.push(report);
    }

    Ok(summary)
}

/// Stream a report in batches inside one transaction
fn import_report<F>(
    conn: &mut Connection,
    ctx: &ImportContext,
    kind: ReportKind,
    file: &Path,
    mut write_row: F,
) -> Result<ReportSummary>
where
    F: FnMut(&Transaction, &Row, &mut ReportSummary) -> Result<()>,
{
    let mut reader = CsvRowReader::open(file)?;
    let mut summary = ReportSummary::new(kind, file);
    let tx = conn.transaction()?;

    loop {
        let batch = reader.next_chunk(ctx.config.batch_size)?;
        if batch.is_empty() {
            break;
        }
        for row in &batch {
            summary.rows_read += 1;
            match write_row(&tx, row, &mut summary) {
                Ok(()) => {}
                Err(ImportError::Row { line, message }) => summary.skip(line, &message),
                Err(err) => return Err(err),
            }
        }
        debug!(file = %file.display(), rows = summary.rows_read, "batch written");
    }

    tx.commit()?;
    summary.rows_skipped += reader.rows_skipped();
    Ok(summary)
}

/// Report 1.1: municipalities and buildings
pub fn import_buildings_file(
    conn: &mut Connection,
    ctx: &ImportContext,
    region_id: i64,
    file: &Path,
) -> Result<ReportSummary> {
    let mut municipalities: HashMap<(Option<String>, String), Option<i64>> = HashMap::new();

    import_report(conn, ctx, ReportKind::Buildings, file, |tx, row, summary| {
        let raw: BuildingRow = row.deserialize()?;
        let (Some(mkd_code), Some(address)) = (text(&raw.mkd_code), text(&raw.address)) else {
            summary.skip(row.line, "missing mkd_code or address");
            return Ok(());
        };

        let municipality = Municipality {
            region_id,
            oktmo_code: text(&raw.mun_obr_oktmo),
            name: text(&raw.mun_obr).unwrap_or_default(),
        };
        let cache_key = (municipality.oktmo_code.clone(), municipality.name.clone());
        let municipality_id = match municipalities.get(&cache_key) {
            Some(id) => *id,
            None => {
                let id = db::get_or_create_municipality(tx, &municipality)?;
                municipalities.insert(cache_key, id);
                id
            }
        };

        let mut building = Building::new(region_id, mkd_code, address);
        building.municipality_id = municipality_id;
        building.houseguid = raw.houseguid.as_deref().and_then(clean_guid);
        building.commission_year = int(&raw.commission_year);
        building.total_sq = decimal(&raw.total_sq);
        building.number_floors_max = int(&raw.number_floors_max);
        building.spec_account_owner_type = raw
            .money_collecting_way
            .as_deref()
            .and_then(|way| ctx.reference.account_owner(way));
        building.money_collecting_way = text(&raw.money_collecting_way);
        building.money_ppl_collected = decimal(&raw.money_ppl_collected);
        building.money_ppl_collected_debts = decimal(&raw.money_ppl_collected_debts);
        building.overhaul_funds_spent_all = decimal(&raw.overhaul_funds_spent_all);
        building.overhaul_funds_balance = decimal(&raw.overhaul_funds_balance);
        building.last_update = date(&raw.last_update);

        db::upsert_building(tx, &building)?;
        summary.rows_written += 1;
        Ok(())
    })
}

/// Report 1.2: lifts and construction elements of known buildings
pub fn import_components_file(
    conn: &mut Connection,
    ctx: &ImportContext,
    region_id: i64,
    file: &Path,
) -> Result<ReportSummary> {
    let buildings = db::building_ids_by_code(conn, region_id)?;

    import_report(conn, ctx, ReportKind::Components, file, |tx, row, summary| {
        let raw: ComponentRow = row.deserialize()?;
        let Some(building_id) = text(&raw.mkd_code).and_then(|code| buildings.get(&code).copied()) else {
            summary.skip(row.line, "unknown building");
            return Ok(());
        };
        let Some(element_code) = text(&raw.construction_element_code) else {
            summary.skip(row.line, "missing construction_element_code");
            return Ok(());
        };

        let element_type = text(&raw.construction_element_type);
        let is_lift = element_type
            .as_deref()
            .map(|t| t.to_lowercase().contains(LIFT_MARKER))
            .unwrap_or(false);

        if is_lift {
            let lift = Lift {
                building_id,
                element_code,
                lift_type: text(&raw.lift_type),
                stops_count: int(&raw.stops_count),
                commissioning_date: date(&raw.commissioning_date),
                decommissioning_date: date(&raw.decommissioning_date),
                last_update: date(&raw.last_update),
            }
            .with_derived_decommissioning();
            db::upsert_lift(tx, &lift)?;
        } else {
            let element = ConstructionElement {
                building_id,
                element_code,
                element_type,
                system_type: text(&raw.system_type),
                roof_type: text(&raw.roof_type),
                roofing_area: decimal(&raw.roofing_area),
                basement_area: decimal(&raw.basement_area),
                facade_type: text(&raw.facade_type),
                facade_area: decimal(&raw.facade_area),
                foundation_type: text(&raw.foundation_type),
                wall_material: text(&raw.wall_material),
                last_update: date(&raw.last_update),
            };
            db::upsert_construction_element(tx, &element)?;
        }
        summary.rows_written += 1;
        Ok(())
    })
}

/// Report 1.3: services of known buildings
pub fn import_services_file(
    conn: &mut Connection,
    ctx: &ImportContext,
    region_id: i64,
    file: &Path,
) -> Result<ReportSummary> {
    let buildings = db::building_ids_by_code(conn, region_id)?;

    import_report(conn, ctx, ReportKind::Services, file, |tx, row, summary| {
        let raw: ServiceRow = row.deserialize()?;
        let Some(building_id) = text(&raw.mkd_code).and_then(|code| buildings.get(&code).copied()) else {
            summary.skip(row.line, "unknown building");
            return Ok(());
        };
        let Some(service_code) = text(&raw.service_code) else {
            summary.skip(row.line, "missing service_code");
            return Ok(());
        };

        let service = Service {
            building_id,
            service_code,
            element_code: text(&raw.construction_element_code),
            service_type: text(&raw.service_type),
            work_code: text(&raw.work_code),
            service_year: int(&raw.service_date),
            planned_year: int(&raw.service_date_by_plan),
            contract_cost: decimal(&raw.plan_service_cost_contract),
            contractor_name: text(&raw.contractor_name),
            contractor_inn: text(&raw.contractor_inn),
            last_update: date(&raw.last_update),
        };
        db::upsert_service(tx, &service)?;
        summary.rows_written += 1;
        Ok(())
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::fs;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> ImportContext {
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        ImportContext::new(config)
    }

    fn write_report(dir: &TempDir, name: &str, content: &str) {
        let folder = dir.path().join("regions").join("16_tatarstan");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join(name), content).unwrap();
    }

    fn memory_db(ctx: &ImportContext) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        db::seed_regions(&conn, &ctx.reference).unwrap();
        conn
    }

    const BUILDINGS: &str = "mkd_code;houseguid;address;mun_obr_oktmo;mun_obr;commission_year;total_sq;money_collecting_way;overhaul_funds_balance;last_update\n\
        16-001;0C5B2444-70A0-4932-980C-B4DC0D3F02B5;г. Казань, ул. Ленина, д. 5;92701000001;Казань;1975;3 250,5;Счет регионального оператора;1 250,50;01.02.2026\n\
        16-002;;г. Казань, ул. Баумана, д. 7;92701000001;Казань;1960;;;;\n\
        ;;без кода;;;;;;;\n";

    #[test]
    fn test_report_kind_codes() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ReportKind::from_code("2.1"), None);
    }

    #[test]
    fn test_find_report_file() {
        let dir = TempDir::new().unwrap();
        write_report(&dir, "16_KR1_1_2026.csv", "mkd_code\n");
        write_report(&dir, "16_kr1-3_2026.csv", "mkd_code\n");
        write_report(&dir, "notes_kr1_2.txt", "");
        let folder = dir.path().join("regions").join("16_tatarstan");

        assert!(find_report_file(&folder, ReportKind::Buildings).unwrap().is_some());
        assert!(find_report_file(&folder, ReportKind::Components).unwrap().is_none());
        assert!(find_report_file(&folder, ReportKind::Services).unwrap().is_some());
        assert!(matches!(
            find_report_file(&dir.path().join("missing"), ReportKind::Buildings),
            Err(ImportError::MissingSource(_))
        ));
    }

    #[test]
    fn test_import_buildings_report() {
        let dir = TempDir::new().unwrap();
        write_report(&dir, "16_kr1_1.csv", BUILDINGS);
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);
        let region = ctx.reference.region("16").unwrap().clone();

        let summary = import_region(&mut conn, &ctx, &region, Some(ReportKind::Buildings), false).unwrap();
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].rows_written, 2);
        assert_eq!(summary.reports[0].rows_skipped, 1);

        let (guid, total_sq, owner, balance): (Option<String>, Option<f64>, Option<String>, Option<f64>) = conn
            .query_row(
                "SELECT houseguid, total_sq, spec_account_owner_type, overhaul_funds_balance
                 FROM buildings WHERE mkd_code = '16-001'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();
        assert_eq!(guid.as_deref(), Some("0c5b2444-70a0-4932-980c-b4dc0d3f02b5"));
        assert_eq!(total_sq, Some(3250.5));
        assert_eq!(owner.as_deref(), Some("REGOP"));
        assert_eq!(balance, Some(1250.5));

        let municipalities: i64 = conn
            .query_row("SELECT COUNT(*) FROM municipalities", [], |row| row.get(0))
            .unwrap();
        assert_eq!(municipalities, 1);
    }

    #[test]
    fn test_components_split_lifts_and_skip_unknown_buildings() {
        let dir = TempDir::new().unwrap();
        write_report(&dir, "16_kr1_1.csv", BUILDINGS);
        write_report(
            &dir,
            "16_kr1_2.csv",
            "mkd_code;construction_element_code;construction_element_type;lift_type;stops_count;commissioning_date;roof_type\n\
             16-001;L-1;Лифт пассажирский;пассажирский;9;2000-01-01;\n\
             16-001;R-1;Крыша;;;;скатная\n\
             99-999;X-1;Крыша;;;;плоская\n",
        );
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);
        let region = ctx.reference.region("16").unwrap().clone();

        import_region(&mut conn, &ctx, &region, None, false).unwrap();

        let counts = db::table_counts(&conn).unwrap();
        assert_eq!(counts.lifts, 1);
        assert_eq!(counts.construction_elements, 1);

        let decommissioning: Option<String> = conn
            .query_row("SELECT decommissioning_date FROM lifts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(decommissioning.as_deref(), Some("2024-12-25"));
    }

    #[test]
    fn test_services_years_and_clean_scope() {
        let dir = TempDir::new().unwrap();
        write_report(&dir, "16_kr1_1.csv", BUILDINGS);
        write_report(
            &dir,
            "16_kr1_3.csv",
            "mkd_code;service_code;service_type;service_date;service_date_by_plan;plan_service_cost_contract\n\
             16-001;S-1;Ремонт крыши;2021;2020;1 500 000,00\n",
        );
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);
        let region = ctx.reference.region("16").unwrap().clone();

        import_region(&mut conn, &ctx, &region, None, false).unwrap();
        let (year, planned, cost): (Option<i32>, Option<i32>, Option<f64>) = conn
            .query_row(
                "SELECT service_year, planned_year, contract_cost FROM services",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((year, planned, cost), (Some(2021), Some(2020), Some(1_500_000.0)));

        // Cleaning only services keeps buildings
        let summary = import_region(&mut conn, &ctx, &region, Some(ReportKind::Services), true).unwrap();
        assert_eq!(summary.cleaned, 1);
        let counts = db::table_counts(&conn).unwrap();
        assert_eq!(counts.buildings, 2);
        assert_eq!(counts.services, 1);
    }

    /// A directory named like a report opens but cannot be read
    fn unreadable_report(dir: &TempDir, name: &str) {
        fs::create_dir_all(dir.path().join("regions").join("16_tatarstan").join(name)).unwrap();
    }

    #[test]
    fn test_failed_components_report_keeps_services() {
        let dir = TempDir::new().unwrap();
        write_report(&dir, "16_kr1_1.csv", BUILDINGS);
        unreadable_report(&dir, "16_kr1_2.csv");
        write_report(
            &dir,
            "16_kr1_3.csv",
            "mkd_code;service_code;service_type;service_date
16-001;S-1;Ремонт крыши;2021
",
        );
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);

        let summary = import_regions(&mut conn, &ctx, Some("16"), None, false).unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].scope.contains("1.2"));

        let region = &summary.regions[0];
        let kinds: Vec<ReportKind> = region.reports.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReportKind::Buildings, ReportKind::Services]);
        assert_eq!(db::table_counts(&conn).unwrap().services, 1);
    }

    #[test]
    fn test_failed_buildings_report_stops_region() {
        let dir = TempDir::new().unwrap();
        unreadable_report(&dir, "16_kr1_1.csv");
        write_report(
            &dir,
            "16_kr1_3.csv",
            "mkd_code;service_code;service_type;service_date
16-001;S-1;Ремонт крыши;2021
",
        );
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);
        let region = ctx.reference.region("16").unwrap().clone();

        let summary = import_region(&mut conn, &ctx, &region, None, false).unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.reports.is_empty());
        assert_eq!(db::table_counts(&conn).unwrap().services, 0);
    }

    #[test]
    fn test_missing_region_folder_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let mut conn = memory_db(&ctx);

        let summary = import_regions(&mut conn, &ctx, Some("16"), None, false).unwrap();
        assert!(summary.regions.is_empty());
        assert!(summary.failures.is_empty());
    }
}
