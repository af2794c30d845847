// 📇 Registry Enrichment - contacts for known management companies
//
// Registry rows are keyed by registration number only; every stored company with
// that number (in any region) receives the contacts. Stored values are never
// replaced by blanks, and a stored name is never replaced at all.

use super::{ImportContext, MAX_ROW_WARNINGS};
use crate::db;
use crate::entities::ContactUpdate;
use crate::error::Result;
use crate::fields::RegistryColumns;
use crate::normalize::clean_registration_number;
use crate::reader::{CsvRowReader, RowSource};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub rows_read: u64,
    /// Rows without a 13/15-digit registration number
    pub rows_invalid_ogrn: u64,
    /// Rows carrying no usable contact value
    pub rows_empty: u64,
    /// Rows whose registration number matched at least one company
    pub rows_applied: u64,
    /// Rows whose registration number is not stored
    pub rows_unknown: u64,
    /// Company rows touched (one registry row may update several regions)
    pub companies_updated: u64,
    pub with_phone: u64,
    pub with_email: u64,
    pub with_director: u64,
}

/// Enrich stored companies from a registry CSV in one transaction
pub fn import_registry(conn: &mut Connection, ctx: &ImportContext, path: &Path) -> Result<RegistrySummary> {
    let mut reader = CsvRowReader::open(path)?;
    let columns = RegistryColumns::detect(reader.headers(), path)?;
    debug!(file = %path.display(), ?columns, "registry columns detected");

    let mut summary = RegistrySummary::default();
    let tx = conn.transaction()?;

    loop {
        let batch = reader.next_chunk(ctx.config.batch_size)?;
        if batch.is_empty() {
            break;
        }
        for row in &batch {
            summary.rows_read += 1;
            let Some(ogrn) = row.get(&columns.ogrn).and_then(clean_registration_number) else {
                summary.rows_invalid_ogrn += 1;
                if summary.rows_invalid_ogrn <= MAX_ROW_WARNINGS {
                    debug!(line = row.line, "registry row without a valid registration number");
                }
                continue;
            };

            let update = ContactUpdate::from_raw(
                ogrn,
                row.field(columns.name.as_deref()),
                row.field(columns.phone.as_deref()),
                row.field(columns.email.as_deref()),
                row.field(columns.director.as_deref()),
                row.field(columns.address.as_deref()),
            );
            if update.is_empty() {
                summary.rows_empty += 1;
                continue;
            }

            let updated = db::enrich_company_contacts(&tx, &update)?;
            if updated == 0 {
                summary.rows_unknown += 1;
                continue;
            }
            summary.rows_applied += 1;
            summary.companies_updated += updated as u64;
            summary.with_phone += u64::from(update.phone.is_some());
            summary.with_email += u64::from(update.email.is_some());
            summary.with_director += u64::from(update.director_name.is_some());
        }
    }

    tx.commit()?;
    if reader.rows_skipped() > 0 {
        warn!(file = %path.display(), skipped = reader.rows_skipped(), "malformed registry rows skipped");
    }
    info!(
        rows = summary.rows_read,
        applied = summary.rows_applied,
        unknown = summary.rows_unknown,
        companies = summary.companies_updated,
        phones = summary.with_phone,
        emails = summary.with_email,
        directors = summary.with_director,
        "registry enrichment finished"
    );
    Ok(summary)
}
