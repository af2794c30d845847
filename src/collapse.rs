// 🧮 Duplicate Collapser - one housing-fund row per house
//
// The housing-fund export has one row per premises, so a house appears many times
// with varying completeness. Rows are reduced to the best one per house GUID:
//
//   +100  registration number (OGRN) present
//   + 30  management method present
//   + 20  ...and it is an actual choice (not "не выбран")
//   + 10  managing organization name present
//   +  5  address present
//
// Ties go to the longer address, then to the row seen first.
// The score depends on one row only, so the reduce works over any chunking.

use crate::config::ReferenceData;
use crate::error::Result;
use crate::fields::HousingFundColumns;
use crate::normalize::{clean_digits, clean_guid, clean_text};
use crate::reader::{CsvRowReader, Row, RowSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SCORE_OGRN: u32 = 100;
pub const SCORE_METHOD_PRESENT: u32 = 30;
pub const SCORE_METHOD_SELECTED: u32 = 20;
pub const SCORE_ORG_NAME: u32 = 10;
pub const SCORE_ADDRESS: u32 = 5;

// ============================================================================
// RECORD
// ============================================================================

/// One housing-fund row, cleaned; column names match the collapsed CSV layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingFundRecord {
    #[serde(rename = "guid_house_fias")]
    pub guid: String,
    pub address: Option<String>,
    pub oktmo: Option<String>,
    #[serde(rename = "mgmt_method")]
    pub method: Option<String>,
    /// Digits only; length is checked later, at linking time
    #[serde(rename = "ogrn_uo")]
    pub ogrn: Option<String>,
    #[serde(rename = "kpp_uo")]
    pub kpp: Option<String>,
    #[serde(rename = "uo_name")]
    pub org_name: Option<String>,
}

impl HousingFundRecord {
    /// None when the row has no usable house GUID
    pub fn from_row(row: &Row, columns: &HousingFundColumns) -> Option<Self> {
        let guid = row.get(&columns.guid).and_then(clean_guid)?;
        Some(HousingFundRecord {
            guid,
            address: row.field(columns.address.as_deref()).and_then(clean_text),
            oktmo: row.field(columns.oktmo.as_deref()).and_then(clean_digits),
            method: row.field(columns.method.as_deref()).and_then(clean_text),
            ogrn: row.field(columns.ogrn.as_deref()).and_then(clean_digits),
            kpp: row.field(columns.kpp.as_deref()).and_then(clean_digits),
            org_name: row.field(columns.org_name.as_deref()).and_then(clean_text),
        })
    }

    fn address_len(&self) -> usize {
        self.address.as_deref().map_or(0, |a| a.chars().count())
    }
}

/// Completeness score of a single row
pub fn quality_score(record: &HousingFundRecord, reference: &ReferenceData) -> u32 {
    let mut score = 0;
    if record.ogrn.is_some() {
        score += SCORE_OGRN;
    }
    if let Some(method) = &record.method {
        score += SCORE_METHOD_PRESENT;
        if reference.is_method_selected(method) {
            score += SCORE_METHOD_SELECTED;
        }
    }
    if record.org_name.is_some() {
        score += SCORE_ORG_NAME;
    }
    if record.address.is_some() {
        score += SCORE_ADDRESS;
    }
    score
}

// ============================================================================
// COLLAPSER
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollapseStats {
    pub rows_seen: u64,
    /// Rows without a usable house GUID
    pub keyless_rows: u64,
    pub distinct_keys: u64,
    pub keys_with_ogrn: u64,
}

impl CollapseStats {
    pub fn ogrn_share(&self) -> f64 {
        if self.distinct_keys == 0 {
            0.0
        } else {
            self.keys_with_ogrn as f64 / self.distinct_keys as f64
        }
    }
}

struct Candidate {
    score: u32,
    address_len: usize,
    record: HousingFundRecord,
}

pub struct HouseCollapser<'a> {
    reference: &'a ReferenceData,
    /// GUID → position in `best`, which keeps first-arrival order
    positions: HashMap<String, usize>,
    best: Vec<Candidate>,
    rows_seen: u64,
    keyless_rows: u64,
}

impl<'a> HouseCollapser<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        HouseCollapser {
            reference,
            positions: HashMap::new(),
            best: Vec::new(),
            rows_seen: 0,
            keyless_rows: 0,
        }
    }

    /// Fold one record into the running best-per-house table
    pub fn offer(&mut self, record: HousingFundRecord) {
        self.rows_seen += 1;
        let candidate = Candidate {
            score: quality_score(&record, self.reference),
            address_len: record.address_len(),
            record,
        };

        match self.positions.get(&candidate.record.guid) {
            Some(&i) => {
                let current = &self.best[i];
                if (candidate.score, candidate.address_len) > (current.score, current.address_len) {
                    self.best[i] = candidate;
                }
            }
            None => {
                self.positions.insert(candidate.record.guid.clone(), self.best.len());
                self.best.push(candidate);
            }
        }
    }

    /// Feed a chunk of raw rows; rows without a GUID are only counted
    pub fn feed(&mut self, rows: &[Row], columns: &HousingFundColumns) {
        for row in rows {
            match HousingFundRecord::from_row(row, columns) {
                Some(record) => self.offer(record),
                None => {
                    self.rows_seen += 1;
                    self.keyless_rows += 1;
                    debug!(line = row.line, "housing-fund row without house GUID skipped");
                }
            }
        }
    }

    /// Drain a whole source chunk by chunk
    pub fn feed_source(&mut self, source: &mut dyn RowSource, chunk_size: usize) -> Result<()> {
        let columns = HousingFundColumns::detect(source.headers(), Path::new(source.source_name()))?;
        let mut chunk_no = 0u64;
        loop {
            let rows = source.next_chunk(chunk_size.max(1))?;
            if rows.is_empty() {
                break;
            }
            chunk_no += 1;
            self.feed(&rows, &columns);
            info!(
                file = source.source_name(),
                chunk = chunk_no,
                rows = rows.len(),
                houses = self.best.len(),
                "housing-fund chunk collapsed"
            );
        }
        Ok(())
    }

    pub fn stats(&self) -> CollapseStats {
        CollapseStats {
            rows_seen: self.rows_seen,
            keyless_rows: self.keyless_rows,
            distinct_keys: self.best.len() as u64,
            keys_with_ogrn: self.best.iter().filter(|c| c.record.ogrn.is_some()).count() as u64,
        }
    }

    /// Best row per house, in first-arrival order of houses
    pub fn finish(self) -> (Vec<HousingFundRecord>, CollapseStats) {
        let stats = self.stats();
        let records = self.best.into_iter().map(|c| c.record).collect();
        (records, stats)
    }
}

/// Collapse several export files into one table
pub fn collapse_files(
    files: &[PathBuf],
    reference: &ReferenceData,
    chunk_size: usize,
) -> Result<(Vec<HousingFundRecord>, CollapseStats)> {
    let mut collapser = HouseCollapser::new(reference);
    for file in files {
        info!(file = %file.display(), "reading housing-fund export");
        let mut reader = CsvRowReader::open(file)?;
        collapser.feed_source(&mut reader, chunk_size)?;
    }
    Ok(collapser.finish())
}

/// Write the collapsed table as UTF-8 (with BOM) CSV; returns the row count
pub fn write_collapsed(path: &Path, records: &[HousingFundRecord]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(&[0xEF, 0xBB, 0xBF])?;

    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(records.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GUID: &str = "0c5b2444-70a0-4932-980c-b4dc0d3f02b5";
    const OTHER_GUID: &str = "11111111-2222-3333-4444-555555555555";

    fn record(guid: &str, ogrn: Option<&str>, method: Option<&str>, address: Option<&str>) -> HousingFundRecord {
        HousingFundRecord {
            guid: guid.to_string(),
            address: address.map(str::to_string),
            oktmo: None,
            method: method.map(str::to_string),
            ogrn: ogrn.map(str::to_string),
            kpp: None,
            org_name: None,
        }
    }

    fn collapse(reference: &ReferenceData, records: Vec<HousingFundRecord>) -> Vec<HousingFundRecord> {
        let mut collapser = HouseCollapser::new(reference);
        for r in records {
            collapser.offer(r);
        }
        collapser.finish().0
    }

    #[test]
    fn test_quality_score() {
        let reference = ReferenceData::default();
        let full = HousingFundRecord {
            org_name: Some("ООО УК".to_string()),
            ..record(GUID, Some("1021602841391"), Some("Управляющая организация"), Some("г Казань"))
        };
        assert_eq!(quality_score(&full, &reference), 165);

        let not_selected = record(GUID, None, Some("Способ управления не выбран"), None);
        assert_eq!(quality_score(&not_selected, &reference), 30);

        assert_eq!(quality_score(&record(GUID, None, None, Some("г Казань")), &reference), 5);
        assert_eq!(quality_score(&record(GUID, None, None, None), &reference), 0);
    }

    #[test]
    fn test_best_row_wins_regardless_of_order() {
        let reference = ReferenceData::default();
        let low = record(GUID, None, Some("не выбран"), Some("Казань"));
        let mid = record(GUID, None, Some("Управляющая организация"), Some("Казань"));
        let high = record(GUID, Some("1021602841391"), Some("Управляющая организация"), Some("Казань"));

        let orders = [
            vec![low.clone(), mid.clone(), high.clone()],
            vec![high.clone(), low.clone(), mid.clone()],
            vec![mid.clone(), high.clone(), low.clone()],
        ];
        for order in orders {
            let collapsed = collapse(&reference, order);
            assert_eq!(collapsed, vec![high.clone()]);
        }
    }

    #[test]
    fn test_tie_prefers_longer_address() {
        let reference = ReferenceData::default();
        let short = record(GUID, None, None, Some("Казань, Ленина 5"));
        let long = record(GUID, None, None, Some("г Казань, ул Ленина, д 5"));

        assert_eq!(collapse(&reference, vec![short.clone(), long.clone()]), vec![long.clone()]);
        assert_eq!(collapse(&reference, vec![long.clone(), short]), vec![long]);
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        // Same score, same address length: the outcome depends on arrival order
        let reference = ReferenceData::default();
        let first = record(GUID, Some("1021602841391"), None, Some("Казань 1"));
        let second = record(GUID, Some("1165000000001"), None, Some("Казань 2"));

        assert_eq!(collapse(&reference, vec![first.clone(), second.clone()]), vec![first.clone()]);
        assert_eq!(collapse(&reference, vec![second.clone(), first]), vec![second]);
    }

    #[test]
    fn test_first_arrival_order_of_houses() {
        let reference = ReferenceData::default();
        let collapsed = collapse(
            &reference,
            vec![
                record(OTHER_GUID, None, None, None),
                record(GUID, None, None, None),
                record(OTHER_GUID, Some("1021602841391"), None, None),
            ],
        );
        let guids: Vec<&str> = collapsed.iter().map(|r| r.guid.as_str()).collect();
        assert_eq!(guids, vec![OTHER_GUID, GUID]);
        assert_eq!(collapsed[0].ogrn.as_deref(), Some("1021602841391"));
    }

    fn export_text() -> String {
        let mut text = String::from(
            "Глобальный уникальный идентификатор дома по ФИАС;Адрес ОЖФ;Код ОКТМО;Способ управления;\
             ОГРН организации, осуществляющей управление домом;Наименование организации, осуществляющей управление домом\n",
        );
        text.push_str(&format!("{};Казань;92701000;Не выбран;;\n", GUID.to_uppercase()));
        text.push_str(";Без дома;;;;\n");
        text.push_str(&format!("{};г Казань, ул Ленина, д 5;92 701 000;Управляющая организация;1021602841391;ООО УК\n", GUID));
        text.push_str(&format!("{};Казань;;;;\n", OTHER_GUID));
        text.push_str(&format!("{}; ;;;;\n", GUID));
        text
    }

    #[test]
    fn test_chunked_feed_matches_single_feed() {
        let reference = ReferenceData::default();

        let run = |chunk_size: usize| {
            let mut source =
                CsvRowReader::from_reader("ojf.csv", b';', Cursor::new(export_text().into_bytes())).unwrap();
            let mut collapser = HouseCollapser::new(&reference);
            collapser.feed_source(&mut source, chunk_size).unwrap();
            collapser.finish()
        };

        let (single, single_stats) = run(1000);
        let (chunked, chunked_stats) = run(2);
        assert_eq!(single, chunked);
        assert_eq!(single_stats, chunked_stats);

        assert_eq!(single.len(), 2);
        assert_eq!(single[0].guid, GUID);
        assert_eq!(single[0].ogrn.as_deref(), Some("1021602841391"));
        assert_eq!(single[0].oktmo.as_deref(), Some("92701000"));
        assert_eq!(single[0].org_name.as_deref(), Some("ООО УК"));

        assert_eq!(
            single_stats,
            CollapseStats {
                rows_seen: 5,
                keyless_rows: 1,
                distinct_keys: 2,
                keys_with_ogrn: 1,
            }
        );
        assert!((single_stats.ogrn_share() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_write_collapsed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("houses.csv");
        let records = vec![record(GUID, Some("1021602841391"), Some("УО"), Some("Казань"))];

        assert_eq!(write_collapsed(&out, &records).unwrap(), 1);

        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("guid_house_fias,address,oktmo,mgmt_method,ogrn_uo,kpp_uo,uo_name")
        );
        assert_eq!(
            lines.next(),
            Some("0c5b2444-70a0-4932-980c-b4dc0d3f02b5,Казань,,УО,1021602841391,,")
        );
    }
}
