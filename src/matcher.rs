// 🔗 Cross-Source Matcher - resolve a housing-fund house to a stored building
// Cascade: global identifier → administrative code + address → address alone

use crate::address::AddressNormalizer;
use crate::collapse::HousingFundRecord;
use crate::normalize::{admin_code_prefix, clean_guid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{info, warn};

// ============================================================================
// MATCH OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchedBy {
    /// Same global house identifier (FIAS GUID)
    Identifier,

    /// Same municipality code (8 digits) and same normalized address
    CompositeKey,

    /// Same normalized address only
    AddressOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Matched { target: i64, by: MatchedBy },
    Unmatched,
}

impl MatchOutcome {
    pub fn target(&self) -> Option<i64> {
        match self {
            MatchOutcome::Matched { target, .. } => Some(*target),
            MatchOutcome::Unmatched => None,
        }
    }
}

/// Per-strategy counters for one matching run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub by_identifier: u64,
    pub by_composite: u64,
    pub by_address: u64,
    pub unmatched: u64,
}

impl MatchStats {
    pub fn record(&mut self, outcome: &MatchOutcome) {
        match outcome {
            MatchOutcome::Matched { by: MatchedBy::Identifier, .. } => self.by_identifier += 1,
            MatchOutcome::Matched { by: MatchedBy::CompositeKey, .. } => self.by_composite += 1,
            MatchOutcome::Matched { by: MatchedBy::AddressOnly, .. } => self.by_address += 1,
            MatchOutcome::Unmatched => self.unmatched += 1,
        }
    }

    pub fn matched(&self) -> u64 {
        self.by_identifier + self.by_composite + self.by_address
    }

    pub fn total(&self) -> u64 {
        self.matched() + self.unmatched
    }

    pub fn merge(&mut self, other: &MatchStats) {
        self.by_identifier += other.by_identifier;
        self.by_composite += other.by_composite;
        self.by_address += other.by_address;
        self.unmatched += other.unmatched;
    }

    pub fn log(&self, region: &str) {
        info!(
            region,
            by_identifier = self.by_identifier,
            by_composite = self.by_composite,
            by_address = self.by_address,
            unmatched = self.unmatched,
            "match summary"
        );
        // Fallback matches are taken on trust; make their share visible
        let fallback = self.by_composite + self.by_address;
        if fallback > 0 {
            warn!(region, fallback, "houses linked without identifier match");
        }
    }
}

// ============================================================================
// KEYS
// ============================================================================

/// Building as seen by the matcher (raw values from the store)
#[derive(Debug, Clone, PartialEq)]
pub struct MatchTarget {
    pub building_id: i64,
    pub houseguid: Option<String>,
    pub oktmo: Option<String>,
    pub address: Option<String>,
}

/// Normalized lookup keys of one side of a match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchKey {
    pub guid: Option<String>,
    pub admin_code: Option<String>,
    pub address: Option<String>,
}

impl MatchKey {
    pub fn new(
        guid: Option<&str>,
        oktmo: Option<&str>,
        address: Option<&str>,
        normalizer: &AddressNormalizer,
    ) -> Self {
        MatchKey {
            guid: guid.and_then(clean_guid),
            admin_code: oktmo.and_then(admin_code_prefix),
            address: address.and_then(|a| normalizer.normalize_opt(a)),
        }
    }

    pub fn for_target(target: &MatchTarget, normalizer: &AddressNormalizer) -> Self {
        Self::new(
            target.houseguid.as_deref(),
            target.oktmo.as_deref(),
            target.address.as_deref(),
            normalizer,
        )
    }

    pub fn for_record(record: &HousingFundRecord, normalizer: &AddressNormalizer) -> Self {
        Self::new(
            Some(record.guid.as_str()),
            record.oktmo.as_deref(),
            record.address.as_deref(),
            normalizer,
        )
    }

    /// Only when both parts are present
    pub fn composite(&self) -> Option<String> {
        match (&self.admin_code, &self.address) {
            (Some(code), Some(address)) => Some(format!("{}|{}", code, address)),
            _ => None,
        }
    }
}

// ============================================================================
// TARGET INDEX
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub targets: u64,
    pub guid_keys: u64,
    pub composite_keys: u64,
    pub address_keys: u64,
    /// Keys claimed by more than one target; the first target keeps them
    pub ambiguous_guid: u64,
    pub ambiguous_composite: u64,
    pub ambiguous_address: u64,
}

/// Three lookup tables over the stored buildings of one region
#[derive(Debug, Default)]
pub struct TargetIndex {
    by_guid: HashMap<String, i64>,
    by_composite: HashMap<String, i64>,
    by_address: HashMap<String, i64>,
    stats: IndexStats,
}

impl TargetIndex {
    /// Insert order decides collisions, so feed targets by ascending building id
    pub fn build(targets: impl IntoIterator<Item = MatchTarget>, normalizer: &AddressNormalizer) -> Self {
        let mut index = TargetIndex::default();
        for target in targets {
            index.insert(&target, normalizer);
        }
        index
    }

    pub fn insert(&mut self, target: &MatchTarget, normalizer: &AddressNormalizer) {
        let key = MatchKey::for_target(target, normalizer);
        self.stats.targets += 1;

        if let Some(guid) = key.guid.clone() {
            if !claim(&mut self.by_guid, guid, target.building_id) {
                self.stats.ambiguous_guid += 1;
            }
        }
        if let Some(composite) = key.composite() {
            if !claim(&mut self.by_composite, composite, target.building_id) {
                self.stats.ambiguous_composite += 1;
            }
        }
        if let Some(address) = key.address {
            if !claim(&mut self.by_address, address, target.building_id) {
                self.stats.ambiguous_address += 1;
            }
        }

        self.stats.guid_keys = self.by_guid.len() as u64;
        self.stats.composite_keys = self.by_composite.len() as u64;
        self.stats.address_keys = self.by_address.len() as u64;
    }

    /// Identifier → composite → address
    pub fn resolve(&self, key: &MatchKey) -> MatchOutcome {
        if let Some(&target) = key.guid.as_ref().and_then(|g| self.by_guid.get(g)) {
            return MatchOutcome::Matched { target, by: MatchedBy::Identifier };
        }
        if let Some(&target) = key.composite().and_then(|c| self.by_composite.get(&c)) {
            return MatchOutcome::Matched { target, by: MatchedBy::CompositeKey };
        }
        if let Some(&target) = key.address.as_ref().and_then(|a| self.by_address.get(a)) {
            return MatchOutcome::Matched { target, by: MatchedBy::AddressOnly };
        }
        MatchOutcome::Unmatched
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.stats.targets == 0
    }
}

/// First claimant keeps the key; false when it was already taken by another target
fn claim(table: &mut HashMap<String, i64>, key: String, building_id: i64) -> bool {
    match table.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(building_id);
            true
        }
        Entry::Occupied(slot) => *slot.get() == building_id,
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// Index + normalizer + running statistics for one region
pub struct CrossSourceMatcher<'a> {
    index: TargetIndex,
    normalizer: &'a AddressNormalizer,
    stats: MatchStats,
}

impl<'a> CrossSourceMatcher<'a> {
    pub fn new(targets: impl IntoIterator<Item = MatchTarget>, normalizer: &'a AddressNormalizer) -> Self {
        let index = TargetIndex::build(targets, normalizer);
        CrossSourceMatcher {
            index,
            normalizer,
            stats: MatchStats::default(),
        }
    }

    pub fn resolve(&mut self, record: &HousingFundRecord) -> MatchOutcome {
        let key = MatchKey::for_record(record, self.normalizer);
        let outcome = self.index.resolve(&key);
        self.stats.record(&outcome);
        outcome
    }

    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GUID_A: &str = "0c5b2444-70a0-4932-980c-b4dc0d3f02b5";
    const GUID_B: &str = "11111111-2222-3333-4444-555555555555";

    fn target(id: i64, guid: Option<&str>, oktmo: Option<&str>, address: &str) -> MatchTarget {
        MatchTarget {
            building_id: id,
            houseguid: guid.map(str::to_string),
            oktmo: oktmo.map(str::to_string),
            address: Some(address.to_string()),
        }
    }

    fn house(guid: &str, oktmo: Option<&str>, address: &str) -> HousingFundRecord {
        HousingFundRecord {
            guid: guid.to_string(),
            address: Some(address.to_string()),
            oktmo: oktmo.map(str::to_string),
            method: None,
            ogrn: None,
            kpp: None,
            org_name: None,
        }
    }

    #[test]
    fn test_identifier_beats_composite_elsewhere() {
        let normalizer = AddressNormalizer::default();
        let targets = vec![
            // Same address and code as the house, but a different GUID
            target(1, None, Some("92701000001"), "г Казань, ул Ленина, д 5"),
            target(2, Some(GUID_A), Some("92701000"), "г Казань, ул Мира, д 1"),
        ];
        let mut matcher = CrossSourceMatcher::new(targets, &normalizer);

        let outcome = matcher.resolve(&house(GUID_A, Some("92701000"), "Казань г, Ленина ул, дом 5"));
        assert_eq!(outcome, MatchOutcome::Matched { target: 2, by: MatchedBy::Identifier });
    }

    #[test]
    fn test_cascade_fallbacks() {
        let normalizer = AddressNormalizer::default();
        let targets = vec![
            target(1, None, Some("92701000"), "г Казань, ул Ленина, д 5"),
            target(2, None, None, "г Пермь, ул Мира, д 1"),
        ];
        let mut matcher = CrossSourceMatcher::new(targets, &normalizer);

        // Code compared on 8 digits
        assert_eq!(
            matcher.resolve(&house(GUID_B, Some("92701000123"), "Казань г, Ленина улица 5")),
            MatchOutcome::Matched { target: 1, by: MatchedBy::CompositeKey }
        );
        // No code on the house side: address only
        assert_eq!(
            matcher.resolve(&house(GUID_B, None, "Пермь, Мира ул, 1")),
            MatchOutcome::Matched { target: 2, by: MatchedBy::AddressOnly }
        );
        assert_eq!(
            matcher.resolve(&house(GUID_B, Some("57701000"), "г Пермь, ул Ленина, д 7")),
            MatchOutcome::Unmatched
        );

        let stats = matcher.stats();
        assert_eq!(stats.by_composite, 1);
        assert_eq!(stats.by_address, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_address_only_keeps_type_word_streets_apart() {
        let normalizer = AddressNormalizer::default();
        let mut matcher = CrossSourceMatcher::new(
            vec![target(1, None, None, "г. Казань, ул. Набережная, д. 3")],
            &normalizer,
        );

        assert_eq!(
            matcher.resolve(&house(GUID_B, None, "г. Казань, ул. Аллея, д. 3")),
            MatchOutcome::Unmatched
        );
        assert_eq!(
            matcher.resolve(&house(GUID_B, None, "г. Казань, д. 3")),
            MatchOutcome::Unmatched
        );
        assert_eq!(
            matcher.resolve(&house(GUID_B, None, "Казань г, Набережная ул, 3")),
            MatchOutcome::Matched { target: 1, by: MatchedBy::AddressOnly }
        );
    }

    #[test]
    fn test_guid_case_and_list_ignored() {
        let normalizer = AddressNormalizer::default();
        let index = TargetIndex::build(vec![target(7, Some(&GUID_A.to_uppercase()), None, "x")], &normalizer);
        let key = MatchKey::new(Some(&format!("{};{}", GUID_A, GUID_B)), None, None, &normalizer);
        assert_eq!(index.resolve(&key).target(), Some(7));
    }

    #[test]
    fn test_collision_first_target_wins() {
        let normalizer = AddressNormalizer::default();
        let index = TargetIndex::build(
            vec![
                target(3, None, Some("92701000"), "г Казань, ул Ленина, д 5"),
                target(4, None, Some("92701000"), "Казань, Ленина 5"),
            ],
            &normalizer,
        );

        let key = MatchKey::new(None, Some("92701000"), Some("ул. Ленина, д. 5, г. Казань"), &normalizer);
        let stats = index.stats();
        assert_eq!(stats.targets, 2);
        assert_eq!(stats.ambiguous_composite, 1);
        assert_eq!(stats.ambiguous_address, 1);
        assert_eq!(stats.address_keys, 1);

        let key_same = MatchKey::new(None, Some("92701000"), Some("г Казань, ул Ленина, д 5"), &normalizer);
        assert_eq!(index.resolve(&key_same).target(), Some(3));
        // Different segment order normalizes differently: no match
        assert_eq!(index.resolve(&key), MatchOutcome::Unmatched);
    }

    #[test]
    fn test_composite_needs_both_parts() {
        let normalizer = AddressNormalizer::default();
        let key = MatchKey::new(None, Some("92701000"), None, &normalizer);
        assert!(key.composite().is_none());
        let key = MatchKey::new(None, None, Some("г Казань"), &normalizer);
        assert!(key.composite().is_none());
    }

    #[test]
    fn test_stats_merge() {
        let mut total = MatchStats::default();
        let mut region = MatchStats::default();
        region.record(&MatchOutcome::Matched { target: 1, by: MatchedBy::Identifier });
        region.record(&MatchOutcome::Unmatched);
        total.merge(&region);
        total.merge(&region);
        assert_eq!(total.by_identifier, 2);
        assert_eq!(total.matched(), 2);
        assert_eq!(total.total(), 4);
    }
}
