// 🗄️ Merge Writer - canonical SQLite store
//
// Every write is an upsert on a natural key, so re-running an import converges:
// - buildings on (region_id, mkd_code)
// - management companies on (ogrn, region_id)
// - links on (building_id, company_id, contract_start_date), duplicates ignored
// - lifts / construction elements on (building_id, element_code), services on (building_id, service_code)
//
// Updates never null a stored value: COALESCE(incoming, stored) everywhere, and
// COALESCE(NULLIF(incoming, ''), stored) for text that may arrive blank.
// Deletion only happens through the explicit region-scoped cleanup.

use crate::config::ReferenceData;
use crate::entities::{
    Building, BuildingLink, ConstructionElement, ContactUpdate, Lift, ManagementCompany, Municipality, Service,
};
use crate::error::{ImportError, Result};
use crate::matcher::MatchTarget;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Open (or create) the database file with the schema in place
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Reference tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS regions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            region_code TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            federal_district TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS municipalities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            region_id INTEGER NOT NULL REFERENCES regions(id),
            oktmo_code TEXT,
            name TEXT NOT NULL,
            UNIQUE(region_id, oktmo_code)
        )",
        [],
    )?;

    // ==========================================================================
    // Buildings (report 1.1)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS buildings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            region_id INTEGER NOT NULL REFERENCES regions(id),
            municipality_id INTEGER REFERENCES municipalities(id),
            mkd_code TEXT NOT NULL,
            houseguid TEXT,
            address TEXT NOT NULL,
            commission_year INTEGER,
            total_sq REAL,
            number_floors_max INTEGER,
            money_collecting_way TEXT,
            spec_account_owner_type TEXT,
            money_ppl_collected REAL,
            money_ppl_collected_debts REAL,
            overhaul_funds_spent_all REAL,
            overhaul_funds_balance REAL,
            last_update TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(region_id, mkd_code)
        )",
        [],
    )?;

    // ==========================================================================
    // Management companies + management periods
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS management_companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ogrn TEXT NOT NULL,
            region_id INTEGER NOT NULL REFERENCES regions(id),
            name TEXT,
            org_type TEXT NOT NULL,
            phone TEXT,
            email TEXT,
            director_name TEXT,
            legal_address TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(ogrn, region_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS buildings_management (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id INTEGER NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
            company_id INTEGER NOT NULL REFERENCES management_companies(id) ON DELETE CASCADE,
            contract_start_date TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(building_id, company_id, contract_start_date)
        )",
        [],
    )?;

    // ==========================================================================
    // Building components (reports 1.2 / 1.3)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS lifts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id INTEGER NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
            element_code TEXT NOT NULL,
            lift_type TEXT,
            stops_count INTEGER,
            commissioning_date TEXT,
            decommissioning_date TEXT,
            last_update TEXT,
            UNIQUE(building_id, element_code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS construction_elements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id INTEGER NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
            element_code TEXT NOT NULL,
            element_type TEXT,
            system_type TEXT,
            roof_type TEXT,
            roofing_area REAL,
            basement_area REAL,
            facade_type TEXT,
            facade_area REAL,
            foundation_type TEXT,
            wall_material TEXT,
            last_update TEXT,
            UNIQUE(building_id, element_code)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            building_id INTEGER NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
            service_code TEXT NOT NULL,
            element_code TEXT,
            service_type TEXT,
            work_code TEXT,
            service_year INTEGER,
            planned_year INTEGER,
            contract_cost REAL,
            contractor_name TEXT,
            contractor_inn TEXT,
            last_update TEXT,
            UNIQUE(building_id, service_code)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_buildings_houseguid ON buildings(houseguid)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_buildings_region ON buildings(region_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_companies_ogrn ON management_companies(ogrn)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_links_company ON buildings_management(company_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// REGIONS / MUNICIPALITIES
// ============================================================================

/// Insert or refresh every region of the reference data
pub fn seed_regions(conn: &Connection, reference: &ReferenceData) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO regions (region_code, name, federal_district) VALUES (?1, ?2, ?3)
         ON CONFLICT(region_code) DO UPDATE SET
            name = excluded.name,
            federal_district = excluded.federal_district",
    )?;
    for region in &reference.regions {
        stmt.execute(params![region.code, region.name, reference.federal_district])?;
    }
    Ok(reference.regions.len())
}

pub fn region_id(conn: &Connection, region_code: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM regions WHERE region_code = ?1",
            params![region_code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Region id, or `UnknownRegion` when the code was never seeded
pub fn require_region_id(conn: &Connection, region_code: &str) -> Result<i64> {
    region_id(conn, region_code)?.ok_or_else(|| ImportError::UnknownRegion(region_code.to_string()))
}

/// Municipality id by (region, code), creating the row on first sight
///
/// Without a code the name is the key. None when neither is known.
pub fn get_or_create_municipality(conn: &Connection, municipality: &Municipality) -> Result<Option<i64>> {
    let name = municipality.name.trim();
    if municipality.oktmo_code.is_none() && name.is_empty() {
        return Ok(None);
    }

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM municipalities
             WHERE region_id = ?1 AND oktmo_code IS ?2 AND (?2 IS NOT NULL OR name = ?3)",
            params![municipality.region_id, municipality.oktmo_code, name],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(existing);
    }

    conn.execute(
        "INSERT INTO municipalities (region_id, oktmo_code, name) VALUES (?1, ?2, ?3)",
        params![municipality.region_id, municipality.oktmo_code, name],
    )?;
    Ok(Some(conn.last_insert_rowid()))
}

// ============================================================================
// BUILDINGS
// ============================================================================

/// Insert or update by (region, mkd_code); returns the building id
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<i64> {
    conn.execute(
        "INSERT INTO buildings (
            region_id, municipality_id, mkd_code, houseguid, address,
            commission_year, total_sq, number_floors_max,
            money_collecting_way, spec_account_owner_type,
            money_ppl_collected, money_ppl_collected_debts,
            overhaul_funds_spent_all, overhaul_funds_balance, last_update
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(region_id, mkd_code) DO UPDATE SET
            municipality_id = COALESCE(excluded.municipality_id, municipality_id),
            houseguid = COALESCE(excluded.houseguid, houseguid),
            address = COALESCE(NULLIF(excluded.address, ''), address),
            commission_year = COALESCE(excluded.commission_year, commission_year),
            total_sq = COALESCE(excluded.total_sq, total_sq),
            number_floors_max = COALESCE(excluded.number_floors_max, number_floors_max),
            money_collecting_way = COALESCE(excluded.money_collecting_way, money_collecting_way),
            spec_account_owner_type = COALESCE(excluded.spec_account_owner_type, spec_account_owner_type),
            money_ppl_collected = COALESCE(excluded.money_ppl_collected, money_ppl_collected),
            money_ppl_collected_debts = COALESCE(excluded.money_ppl_collected_debts, money_ppl_collected_debts),
            overhaul_funds_spent_all = COALESCE(excluded.overhaul_funds_spent_all, overhaul_funds_spent_all),
            overhaul_funds_balance = COALESCE(excluded.overhaul_funds_balance, overhaul_funds_balance),
            last_update = COALESCE(excluded.last_update, last_update),
            updated_at = CURRENT_TIMESTAMP",
        params![
            building.region_id,
            building.municipality_id,
            building.mkd_code,
            building.houseguid,
            building.address,
            building.commission_year,
            building.total_sq,
            building.number_floors_max,
            building.money_collecting_way,
            building.spec_account_owner_type.map(|t| t.code()),
            building.money_ppl_collected,
            building.money_ppl_collected_debts,
            building.overhaul_funds_spent_all,
            building.overhaul_funds_balance,
            building.last_update,
        ],
    )?;

    let id = conn.query_row(
        "SELECT id FROM buildings WHERE region_id = ?1 AND mkd_code = ?2",
        params![building.region_id, building.mkd_code],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// mkd_code → building id for one region (component reports reference buildings by code)
pub fn building_ids_by_code(conn: &Connection, region_id: i64) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT mkd_code, id FROM buildings WHERE region_id = ?1")?;
    let ids = stmt
        .query_map(params![region_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<HashMap<String, i64>, _>>()?;
    Ok(ids)
}

/// Buildings of a region as matcher targets, ascending id
pub fn load_match_targets(conn: &Connection, region_id: i64) -> Result<Vec<MatchTarget>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.houseguid, m.oktmo_code, b.address
         FROM buildings b
         LEFT JOIN municipalities m ON m.id = b.municipality_id
         WHERE b.region_id = ?1
         ORDER BY b.id",
    )?;
    let targets = stmt
        .query_map(params![region_id], |row| {
            Ok(MatchTarget {
                building_id: row.get(0)?,
                houseguid: row.get(1)?,
                oktmo: row.get(2)?,
                address: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(targets)
}

/// Region-scoped cleanup before a re-import; dependants go with their building
pub fn delete_region_data(conn: &Connection, region_id: i64) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM buildings WHERE region_id = ?1", params![region_id])?;
    Ok(deleted)
}

/// Report 1.2 cleanup: lifts and construction elements of a region
pub fn delete_region_components(conn: &Connection, region_id: i64) -> Result<usize> {
    let mut deleted = 0;
    for table in ["lifts", "construction_elements"] {
        deleted += conn.execute(
            &format!(
                "DELETE FROM {} WHERE building_id IN (SELECT id FROM buildings WHERE region_id = ?1)",
                table
            ),
            params![region_id],
        )?;
    }
    Ok(deleted)
}

/// Report 1.3 cleanup: services of a region
pub fn delete_region_services(conn: &Connection, region_id: i64) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM services WHERE building_id IN (SELECT id FROM buildings WHERE region_id = ?1)",
        params![region_id],
    )?;
    Ok(deleted)
}

// ============================================================================
// COMPANIES / LINKS
// ============================================================================

/// Insert or update by (ogrn, region); returns the company id
pub fn upsert_company(conn: &Connection, company: &ManagementCompany) -> Result<i64> {
    conn.execute(
        "INSERT INTO management_companies (ogrn, region_id, name, org_type)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(ogrn, region_id) DO UPDATE SET
            name = COALESCE(NULLIF(excluded.name, ''), name),
            org_type = excluded.org_type,
            updated_at = CURRENT_TIMESTAMP",
        params![company.ogrn, company.region_id, company.name, company.org_type.code()],
    )?;

    let id = conn.query_row(
        "SELECT id FROM management_companies WHERE ogrn = ?1 AND region_id = ?2",
        params![company.ogrn, company.region_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// True when a new link was written, false when it already existed
pub fn insert_link(conn: &Connection, link: &BuildingLink) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO buildings_management (building_id, company_id, contract_start_date)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(building_id, company_id, contract_start_date) DO NOTHING",
        params![link.building_id, link.company_id, link.start_date],
    )?;
    Ok(inserted > 0)
}

/// Apply registry contacts to every company (any region) with this ogrn
///
/// Empty incoming values never erase stored ones; the name is only filled when missing.
pub fn enrich_company_contacts(conn: &Connection, update: &ContactUpdate) -> Result<usize> {
    if update.is_empty() {
        return Ok(0);
    }
    let updated = conn.execute(
        "UPDATE management_companies SET
            name = COALESCE(NULLIF(name, ''), NULLIF(?2, '')),
            phone = COALESCE(NULLIF(?3, ''), phone),
            email = COALESCE(NULLIF(?4, ''), email),
            director_name = COALESCE(NULLIF(?5, ''), director_name),
            legal_address = COALESCE(NULLIF(?6, ''), legal_address),
            updated_at = CURRENT_TIMESTAMP
         WHERE ogrn = ?1",
        params![
            update.ogrn,
            update.name,
            update.phone,
            update.email,
            update.director_name,
            update.legal_address,
        ],
    )?;
    Ok(updated)
}

// ============================================================================
// COMPONENTS
// ============================================================================

pub fn upsert_lift(conn: &Connection, lift: &Lift) -> Result<()> {
    conn.execute(
        "INSERT INTO lifts (
            building_id, element_code, lift_type, stops_count,
            commissioning_date, decommissioning_date, last_update
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(building_id, element_code) DO UPDATE SET
            lift_type = COALESCE(excluded.lift_type, lift_type),
            stops_count = COALESCE(excluded.stops_count, stops_count),
            commissioning_date = COALESCE(excluded.commissioning_date, commissioning_date),
            decommissioning_date = COALESCE(excluded.decommissioning_date, decommissioning_date),
            last_update = COALESCE(excluded.last_update, last_update)",
        params![
            lift.building_id,
            lift.element_code,
            lift.lift_type,
            lift.stops_count,
            lift.commissioning_date,
            lift.decommissioning_date,
            lift.last_update,
        ],
    )?;
    Ok(())
}

pub fn upsert_construction_element(conn: &Connection, element: &ConstructionElement) -> Result<()> {
    conn.execute(
        "INSERT INTO construction_elements (
            building_id, element_code, element_type, system_type, roof_type,
            roofing_area, basement_area, facade_type, facade_area,
            foundation_type, wall_material, last_update
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(building_id, element_code) DO UPDATE SET
            element_type = COALESCE(excluded.element_type, element_type),
            system_type = COALESCE(excluded.system_type, system_type),
            roof_type = COALESCE(excluded.roof_type, roof_type),
            roofing_area = COALESCE(excluded.roofing_area, roofing_area),
            basement_area = COALESCE(excluded.basement_area, basement_area),
            facade_type = COALESCE(excluded.facade_type, facade_type),
            facade_area = COALESCE(excluded.facade_area, facade_area),
            foundation_type = COALESCE(excluded.foundation_type, foundation_type),
            wall_material = COALESCE(excluded.wall_material, wall_material),
            last_update = COALESCE(excluded.last_update, last_update)",
        params![
            element.building_id,
            element.element_code,
            element.element_type,
            element.system_type,
            element.roof_type,
            element.roofing_area,
            element.basement_area,
            element.facade_type,
            element.facade_area,
            element.foundation_type,
            element.wall_material,
            element.last_update,
        ],
    )?;
    Ok(())
}

pub fn upsert_service(conn: &Connection, service: &Service) -> Result<()> {
    conn.execute(
        "INSERT INTO services (
            building_id, service_code, element_code, service_type, work_code,
            service_year, planned_year, contract_cost,
            contractor_name, contractor_inn, last_update
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(building_id, service_code) DO UPDATE SET
            element_code = COALESCE(excluded.element_code, element_code),
            service_type = COALESCE(excluded.service_type, service_type),
            work_code = COALESCE(excluded.work_code, work_code),
            service_year = COALESCE(excluded.service_year, service_year),
            planned_year = COALESCE(excluded.planned_year, planned_year),
            contract_cost = COALESCE(excluded.contract_cost, contract_cost),
            contractor_name = COALESCE(excluded.contractor_name, contractor_name),
            contractor_inn = COALESCE(excluded.contractor_inn, contractor_inn),
            last_update = COALESCE(excluded.last_update, last_update)",
        params![
            service.building_id,
            service.service_code,
            service.element_code,
            service.service_type,
            service.work_code,
            service.service_year,
            service.planned_year,
            service.contract_cost,
            service.contractor_name,
            service.contractor_inn,
            service.last_update,
        ],
    )?;
    Ok(())
}

// ============================================================================
// QUERY LAYER (stats CLI + HTTP API)
// ============================================================================

/// Row counts of every canonical table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub regions: i64,
    pub municipalities: i64,
    pub buildings: i64,
    pub management_companies: i64,
    pub buildings_management: i64,
    pub lifts: i64,
    pub construction_elements: i64,
    pub services: i64,
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |table: &str| -> Result<i64> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(n)
    };
    Ok(TableCounts {
        regions: count("regions")?,
        municipalities: count("municipalities")?,
        buildings: count("buildings")?,
        management_companies: count("management_companies")?,
        buildings_management: count("buildings_management")?,
        lifts: count("lifts")?,
        construction_elements: count("construction_elements")?,
        services: count("services")?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region_code: String,
    pub name: String,
    pub buildings: i64,
    pub linked_buildings: i64,
    pub companies: i64,
}

pub fn region_summaries(conn: &Connection) -> Result<Vec<RegionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT r.region_code, r.name,
                (SELECT COUNT(*) FROM buildings b WHERE b.region_id = r.id),
                (SELECT COUNT(DISTINCT bm.building_id)
                   FROM buildings_management bm
                   JOIN buildings b ON b.id = bm.building_id
                  WHERE b.region_id = r.id),
                (SELECT COUNT(*) FROM management_companies mc WHERE mc.region_id = r.id)
         FROM regions r
         ORDER BY r.region_code",
    )?;
    let summaries = stmt
        .query_map([], |row| {
            Ok(RegionSummary {
                region_code: row.get(0)?,
                name: row.get(1)?,
                buildings: row.get(2)?,
                linked_buildings: row.get(3)?,
                companies: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(summaries)
}

/// 1-based page with a clamped page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

pub const MAX_PER_PAGE: u32 = 200;
pub const DEFAULT_PER_PAGE: u32 = 50;

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub pages: i64,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let per_page = request.per_page as i64;
        Page {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            pages: (total + per_page - 1) / per_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingListItem {
    pub id: i64,
    pub region_code: String,
    pub mkd_code: String,
    pub address: String,
    pub houseguid: Option<String>,
    pub commission_year: Option<i32>,
    pub total_sq: Option<f64>,
    pub overhaul_funds_balance: Option<f64>,
    pub last_update: Option<NaiveDate>,
    /// Company of the most recent management period
    pub company_name: Option<String>,
}

const BUILDING_COLUMNS: &str = "b.id, r.region_code, b.mkd_code, b.address, b.houseguid,
    b.commission_year, b.total_sq, b.overhaul_funds_balance, b.last_update,
    (SELECT mc.name FROM buildings_management bm
       JOIN management_companies mc ON mc.id = bm.company_id
      WHERE bm.building_id = b.id
      ORDER BY bm.contract_start_date DESC, bm.id DESC LIMIT 1)";

fn building_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<BuildingListItem> {
    Ok(BuildingListItem {
        id: row.get(0)?,
        region_code: row.get(1)?,
        mkd_code: row.get(2)?,
        address: row.get(3)?,
        houseguid: row.get(4)?,
        commission_year: row.get(5)?,
        total_sq: row.get(6)?,
        overhaul_funds_balance: row.get(7)?,
        last_update: row.get(8)?,
        company_name: row.get(9)?,
    })
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

/// Buildings filtered by region code and an address / mkd_code substring
pub fn list_buildings(
    conn: &Connection,
    region: Option<&str>,
    search: Option<&str>,
    request: PageRequest,
) -> Result<Page<BuildingListItem>> {
    let pattern = like_pattern(search);
    let filter = "FROM buildings b JOIN regions r ON r.id = b.region_id
         WHERE (?1 IS NULL OR r.region_code = ?1)
           AND (?2 IS NULL OR b.address LIKE ?2 OR b.mkd_code LIKE ?2)";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {}", filter),
        params![region, pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} {} ORDER BY b.id LIMIT ?3 OFFSET ?4",
        BUILDING_COLUMNS, filter
    ))?;
    let items = stmt
        .query_map(
            params![region, pattern, request.per_page, request.offset()],
            building_item,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, request))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyListItem {
    pub id: i64,
    pub ogrn: String,
    pub region_code: String,
    pub name: Option<String>,
    pub org_type: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub director_name: Option<String>,
    pub legal_address: Option<String>,
    pub buildings: i64,
}

const COMPANY_COLUMNS: &str = "mc.id, mc.ogrn, r.region_code, mc.name, mc.org_type,
    mc.phone, mc.email, mc.director_name, mc.legal_address,
    (SELECT COUNT(DISTINCT bm.building_id) FROM buildings_management bm WHERE bm.company_id = mc.id)";

fn company_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompanyListItem> {
    Ok(CompanyListItem {
        id: row.get(0)?,
        ogrn: row.get(1)?,
        region_code: row.get(2)?,
        name: row.get(3)?,
        org_type: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        director_name: row.get(7)?,
        legal_address: row.get(8)?,
        buildings: row.get(9)?,
    })
}

/// Companies filtered by a name / ogrn substring
pub fn list_companies(conn: &Connection, search: Option<&str>, request: PageRequest) -> Result<Page<CompanyListItem>> {
    let pattern = like_pattern(search);
    let filter = "FROM management_companies mc JOIN regions r ON r.id = mc.region_id
         WHERE (?1 IS NULL OR mc.name LIKE ?1 OR mc.ogrn LIKE ?1)";

    let total: i64 = conn.query_row(&format!("SELECT COUNT(*) {}", filter), params![pattern], |row| {
        row.get(0)
    })?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} {} ORDER BY mc.id LIMIT ?2 OFFSET ?3",
        COMPANY_COLUMNS, filter
    ))?;
    let items = stmt
        .query_map(params![pattern, request.per_page, request.offset()], company_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, request))
}

/// Buildings listed with one company
pub const COMPANY_BUILDINGS_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetail {
    pub company: CompanyListItem,
    pub buildings: Vec<BuildingListItem>,
}

pub fn get_company(conn: &Connection, id: i64) -> Result<Option<CompanyDetail>> {
    let company = conn
        .query_row(
            &format!(
                "SELECT {} FROM management_companies mc JOIN regions r ON r.id = mc.region_id WHERE mc.id = ?1",
                COMPANY_COLUMNS
            ),
            params![id],
            company_item,
        )
        .optional()?;

    let Some(company) = company else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM buildings b JOIN regions r ON r.id = b.region_id
         WHERE b.id IN (SELECT building_id FROM buildings_management WHERE company_id = ?1)
         ORDER BY b.id LIMIT ?2",
        BUILDING_COLUMNS
    ))?;
    let buildings = stmt
        .query_map(params![id, COMPANY_BUILDINGS_LIMIT], building_item)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(CompanyDetail { company, buildings }))
}

// ============================================================================
// TESTS
// ============================================================================
