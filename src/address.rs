// 🏠 Address Normalizer - ordered rewrite pipeline for free-text addresses
//
// The same pipeline runs on both sides of every address match, so two spellings of
// one building converge as long as they differ only in:
// - postal code / region prefix / city marker presence
// - street-type spelling ("ул.", "улица") and position ("ул Ленина", "Ленина ул")
// - house / building / structure marker spelling ("д. 5 корп. 2" → "5 к2")
// - litera spacing ("12 а", "12-а", "12 лит. А" → "12а")
//
// Each step is a pure `&str -> String` function over the canonical
// "token token, token token" form, testable on its own.
// This is a heuristic: collisions and misses only lower the match rate.

use crate::config::AddressRules;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// A comma-separated address split into whitespace tokens
type Segments = Vec<Vec<String>>;

/// One rewrite rule of the pipeline
pub type Step = fn(&AddressNormalizer, &str) -> String;

/// The pipeline, in application order
pub const STEPS: [(&str, Step); 9] = [
    ("fold_case", AddressNormalizer::fold_case),
    ("strip_postal_code", AddressNormalizer::strip_postal_code),
    ("strip_region", AddressNormalizer::strip_region),
    ("canonicalize_street_types", AddressNormalizer::canonicalize_street_types),
    ("drop_street_types", AddressNormalizer::drop_street_types),
    ("drop_city_marker", AddressNormalizer::drop_city_marker),
    ("compact_building_markers", AddressNormalizer::compact_building_markers),
    ("merge_litera", AddressNormalizer::merge_litera),
    ("collapse_separators", AddressNormalizer::collapse_separators),
];

/// A region segment is short: "респ татарстан", "марий эл респ"
const MAX_REGION_TOKENS: usize = 4;

/// Upper bound on full pipeline passes; every pass either changes nothing or
/// removes/merges tokens, so this is never reached on real input
const MAX_PASSES: usize = 8;

// ============================================================================
// NORMALIZER
// ============================================================================

pub struct AddressNormalizer {
    /// Any street-type spelling → canonical spelling
    street_types: HashMap<String, String>,
    /// Canonical street type → position in the rules table (lower is more generic)
    street_type_rank: HashMap<String, usize>,
    region_markers: HashSet<String>,
    city_markers: HashSet<String>,
    house_markers: Vec<String>,
    block_markers: Vec<String>,
    block_prefix: String,
    structure_markers: Vec<String>,
    structure_prefix: String,
    litera_markers: HashSet<String>,
    unit_markers: Vec<String>,

    postal_code: Regex,
    house_number: Regex,
    glued_litera: Regex,
    whitespace: Regex,
    comma_run: Regex,
}

impl AddressNormalizer {
    pub fn new(rules: &AddressRules) -> Self {
        let mut street_types = HashMap::new();
        let mut street_type_rank = HashMap::new();
        for (rank, street) in rules.street_types.iter().enumerate() {
            street_type_rank.entry(street.canonical.clone()).or_insert(rank);
            street_types.insert(street.canonical.clone(), street.canonical.clone());
            for variant in &street.variants {
                street_types.insert(variant.to_lowercase(), street.canonical.clone());
            }
        }

        let set = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect::<HashSet<_>>();
        // Longest first so "корпус" is tried before "к" when ungluing
        let by_length = |items: &[String]| {
            let mut v: Vec<String> = items.iter().map(|s| s.to_lowercase()).collect();
            v.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
            v
        };

        AddressNormalizer {
            street_types,
            street_type_rank,
            region_markers: set(&rules.region_markers),
            city_markers: set(&rules.city_markers),
            house_markers: by_length(&rules.house_markers),
            block_markers: by_length(&rules.block_markers),
            block_prefix: rules.block_prefix.to_lowercase(),
            structure_markers: by_length(&rules.structure_markers),
            structure_prefix: rules.structure_prefix.to_lowercase(),
            litera_markers: set(&rules.litera_markers),
            unit_markers: by_length(&rules.unit_markers),
            postal_code: Regex::new(r"^\d{6}$").expect("static regex"),
            house_number: Regex::new(r"^\d[\d/]*$").expect("static regex"),
            glued_litera: Regex::new(r"^(\d[\d/]*)-([a-zа-я])$").expect("static regex"),
            whitespace: Regex::new(r"\s+").expect("static regex"),
            comma_run: Regex::new(r"\s*,[\s,]*").expect("static regex"),
        }
    }

    /// Canonical form of an address; empty when nothing matchable remains
    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.run_pipeline(raw);
        for _ in 0..MAX_PASSES {
            let next = self.run_pipeline(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// `normalize`, with an empty result mapped to None
    pub fn normalize_opt(&self, raw: &str) -> Option<String> {
        let normalized = self.normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    fn run_pipeline(&self, raw: &str) -> String {
        STEPS
            .iter()
            .fold(raw.to_string(), |acc, (_, step)| step(self, &acc))
    }

    // ========================================================================
    // STEPS
    // ========================================================================

    /// 1. Lower-case, fold ё, turn dots/quotes/№ into spaces and `;` into commas
    pub fn fold_case(&self, s: &str) -> String {
        let folded: String = s
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'ё' => 'е',
                ';' => ',',
                '.' | '"' | '\'' | '«' | '»' | '№' | '(' | ')' => ' ',
                c if c.is_whitespace() => ' ',
                c => c,
            })
            .collect();

        let segments: Segments = split_segments(&folded)
            .into_iter()
            .map(|seg| seg.into_iter().filter(|t| !t.chars().all(|c| c == '-')).collect())
            .collect();
        join_segments(&segments)
    }

    /// 2. Leading 6-digit postal code(s)
    pub fn strip_postal_code(&self, s: &str) -> String {
        let mut segments = split_segments(s);
        while let Some(first) = segments.first_mut() {
            if !first.first().map_or(false, |t| self.postal_code.is_match(t)) {
                break;
            }
            first.remove(0);
            if first.is_empty() {
                segments.remove(0);
            }
        }
        join_segments(&segments)
    }

    /// 3. Leading region segment(s): a short segment carrying an administrative marker
    pub fn strip_region(&self, s: &str) -> String {
        let mut segments = split_segments(s);

        while segments.len() > 1 {
            let first = &segments[0];
            if first.len() <= MAX_REGION_TOKENS && first.iter().any(|t| self.region_markers.contains(t)) {
                segments.remove(0);
            } else {
                break;
            }
        }

        // No comma after the region: drop just the "marker name" / "name marker" pair
        if let Some(first) = segments.first_mut() {
            if first.len() > 2
                && (self.region_markers.contains(&first[0]) || self.region_markers.contains(&first[1]))
            {
                first.drain(..2);
            }
        }

        join_segments(&segments)
    }

    /// 4. Every street-type spelling → one canonical spelling, whole tokens only
    pub fn canonicalize_street_types(&self, s: &str) -> String {
        map_segments(s, |seg| {
            seg.into_iter()
                .map(|t| self.street_types.get(&t).cloned().unwrap_or(t))
                .collect()
        })
    }

    /// 5. At most one street type opening and one closing a segment (or sitting right
    ///    before the house number). The last name token of a segment always stays, so
    ///    "ул набережная" keeps "набережная"; of two competing types the one earlier in
    ///    the rules table goes.
    pub fn drop_street_types(&self, s: &str) -> String {
        map_segments(s, |mut seg| {
            let names = seg.iter().filter(|t| self.is_name_token(t)).count();
            if names < 2 {
                return seg;
            }

            let last = seg.len() - 1;
            let leading = self.street_type_rank(&seg[0]).map(|_| 0);
            let trailing = (1..seg.len()).rev().find(|&i| {
                self.street_type_rank(&seg[i]).is_some() && (i == last || self.starts_house_number(&seg, i + 1))
            });

            match (leading, trailing) {
                (Some(lead), Some(trail)) if names == 2 => {
                    // Only the two types are left: one of them is the street name
                    if self.street_type_rank(&seg[trail]) < self.street_type_rank(&seg[lead]) {
                        seg.remove(trail);
                    } else {
                        seg.remove(lead);
                    }
                }
                (Some(lead), Some(trail)) => {
                    seg.remove(trail);
                    seg.remove(lead);
                }
                (Some(i), None) | (None, Some(i)) => {
                    seg.remove(i);
                }
                (None, None) => {}
            }
            seg
        })
    }

    /// 6. City marker at a segment edge ("г казань", "казань г")
    pub fn drop_city_marker(&self, s: &str) -> String {
        map_segments(s, |mut seg| {
            loop {
                let n = seg.len();
                if n > 0 && self.city_markers.contains(&seg[0]) {
                    seg.remove(0);
                } else if n > 1
                    && self.city_markers.contains(&seg[n - 1])
                    && !starts_with_digit(&seg[n - 2])
                {
                    // A marker after a number is a litera ("5 г"), keep it
                    seg.pop();
                } else {
                    break;
                }
            }
            seg
        })
    }

    /// 7. House markers dropped, корпус/строение compacted, apartment tails cut,
    ///    house-only segments attached to the street before them
    pub fn compact_building_markers(&self, s: &str) -> String {
        let mut out: Segments = Vec::new();
        for seg in split_segments(s) {
            let compacted = self.compact_tokens(seg);
            if compacted.is_empty() {
                continue;
            }
            match out.last_mut() {
                Some(previous) if self.is_house_part(&compacted) => previous.extend(compacted),
                _ => out.push(compacted),
            }
        }
        join_segments(&out)
    }

    /// 8. Number followed by a single letter becomes one token ("12 а" → "12а")
    pub fn merge_litera(&self, s: &str) -> String {
        map_segments(s, |seg| {
            let mut out: Vec<String> = Vec::with_capacity(seg.len());
            for token in seg {
                if let Some(caps) = self.glued_litera.captures(&token) {
                    out.push(format!("{}{}", &caps[1], &caps[2]));
                    continue;
                }
                match out.last_mut() {
                    Some(previous) if is_single_letter(&token) && self.house_number.is_match(previous) => {
                        previous.push_str(&token);
                    }
                    _ => out.push(token),
                }
            }
            out
        })
    }

    /// 9. Collapse whitespace and comma runs, trim edge commas/spaces
    pub fn collapse_separators(&self, s: &str) -> String {
        let collapsed = self.whitespace.replace_all(s, " ");
        let commas = self.comma_run.replace_all(&collapsed, ", ");
        commas
            .trim_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string()
    }

    // ========================================================================
    // TOKEN HELPERS
    // ========================================================================

    fn street_type_rank(&self, token: &str) -> Option<usize> {
        self.street_type_rank.get(token).copied()
    }

    /// A word that can carry a street or place name: no digits, not a
    /// building-level marker, not a lone litera
    fn is_name_token(&self, token: &str) -> bool {
        let is_marker = |markers: &[String]| markers.iter().any(|m| m.as_str() == token);
        !token.chars().any(|c| c.is_ascii_digit())
            && !is_single_letter(token)
            && !is_marker(self.house_markers.as_slice())
            && !is_marker(self.block_markers.as_slice())
            && !is_marker(self.structure_markers.as_slice())
            && !is_marker(self.unit_markers.as_slice())
            && !self.litera_markers.contains(token)
    }

    /// Does a house number start at `index` (bare "5" or "д 5" / "д5")?
    fn starts_house_number(&self, seg: &[String], index: usize) -> bool {
        let Some(token) = seg.get(index) else {
            return false;
        };
        if starts_with_digit(token) {
            return true;
        }
        if self.house_markers.contains(token) {
            return seg.get(index + 1).map_or(false, |t| starts_with_digit(t));
        }
        strip_marker(&self.house_markers, token).is_some()
    }

    fn compact_tokens(&self, seg: Vec<String>) -> Vec<String> {
        let mut out = Vec::with_capacity(seg.len());
        let mut i = 0;
        while i < seg.len() {
            let token = &seg[i];
            let number = seg.get(i + 1).filter(|n| starts_with_digit(n));

            if self.unit_markers.contains(token) && number.is_some() {
                // apartment / premises number: not part of the building identity
                i += 2;
                continue;
            }
            if self.house_markers.contains(token) && number.is_some() {
                i += 1;
                continue;
            }
            if let Some(n) = number {
                if self.block_markers.contains(token) {
                    out.push(format!("{}{}", self.block_prefix, n));
                    i += 2;
                    continue;
                }
                if self.structure_markers.contains(token) {
                    out.push(format!("{}{}", self.structure_prefix, n));
                    i += 2;
                    continue;
                }
            }
            if self.litera_markers.contains(token)
                && seg.get(i + 1).map_or(false, |t| is_single_letter(t))
            {
                i += 1;
                continue;
            }

            if strip_marker(&self.unit_markers, token).is_none() {
                out.push(self.unglue_marker(token));
            }
            i += 1;
        }
        out
    }

    /// "д5" → "5", "корп2" → "к2", "стр1" → "с1"
    fn unglue_marker(&self, token: &str) -> String {
        if let Some(rest) = strip_marker(&self.house_markers, token) {
            return rest.to_string();
        }
        if let Some(rest) = strip_marker(&self.block_markers, token) {
            return format!("{}{}", self.block_prefix, rest);
        }
        if let Some(rest) = strip_marker(&self.structure_markers, token) {
            return format!("{}{}", self.structure_prefix, rest);
        }
        token.to_string()
    }

    /// A segment holding only house-level parts: "5", "5 к2", "к2", "а"
    fn is_house_part(&self, seg: &[String]) -> bool {
        let Some(first) = seg.first() else {
            return false;
        };
        starts_with_digit(first)
            || is_compact(&self.block_prefix, first)
            || is_compact(&self.structure_prefix, first)
            || (seg.len() == 1 && is_single_letter(first))
    }
}

impl Default for AddressNormalizer {
    fn default() -> Self {
        Self::new(&AddressRules::default())
    }
}

// ============================================================================
// SEGMENT HELPERS
// ============================================================================

fn split_segments(s: &str) -> Segments {
    s.split(',')
        .map(|seg| seg.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .filter(|seg| !seg.is_empty())
        .collect()
}

fn join_segments(segments: &Segments) -> String {
    segments
        .iter()
        .filter(|seg| !seg.is_empty())
        .map(|seg| seg.join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_segments(s: &str, f: impl Fn(Vec<String>) -> Vec<String>) -> String {
    let segments: Segments = split_segments(s).into_iter().map(f).collect();
    join_segments(&segments)
}

fn starts_with_digit(token: &str) -> bool {
    token.chars().next().map_or(false, |c| c.is_ascii_digit())
}

fn is_single_letter(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

/// Marker glued to a number: returns the number part
fn strip_marker<'a>(markers: &[String], token: &'a str) -> Option<&'a str> {
    markers
        .iter()
        .filter_map(|m| token.strip_prefix(m.as_str()))
        .find(|rest| starts_with_digit(rest))
}

fn is_compact(prefix: &str, token: &str) -> bool {
    token
        .strip_prefix(prefix)
        .map_or(false, starts_with_digit)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> AddressNormalizer {
        AddressNormalizer::default()
    }

    #[test]
    fn test_pipeline_order() {
        let names: Vec<&str> = STEPS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.first(), Some(&"fold_case"));
        assert_eq!(names.last(), Some(&"collapse_separators"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_fold_case() {
        let n = normalizer();
        assert_eq!(n.fold_case("Ул.Ленина;  Д.5"), "ул ленина, д 5");
        assert_eq!(n.fold_case("ул. Солнечная, \"Ёлочка\""), "ул солнечная, елочка");
        assert_eq!(n.fold_case("Чувашская Республика - Чувашия"), "чувашская республика чувашия");
    }

    #[test]
    fn test_strip_postal_code() {
        let n = normalizer();
        assert_eq!(n.strip_postal_code("420111, казань"), "казань");
        assert_eq!(n.strip_postal_code("420111 казань"), "казань");
        assert_eq!(n.strip_postal_code("420111, 420112, казань"), "казань");
        // Only a leading 6-digit token counts
        assert_eq!(n.strip_postal_code("казань, 420111"), "казань, 420111");
        assert_eq!(n.strip_postal_code("12345, казань"), "12345, казань");
    }

    #[test]
    fn test_strip_region() {
        let n = normalizer();
        assert_eq!(n.strip_region("респ татарстан, г казань"), "г казань");
        assert_eq!(n.strip_region("татарстан респ, г казань"), "г казань");
        assert_eq!(n.strip_region("самарская обл, г тольятти"), "г тольятти");
        assert_eq!(n.strip_region("марий эл респ, г йошкар-ола"), "г йошкар-ола");
        assert_eq!(n.strip_region("пермский край, г пермь"), "г пермь");
        assert_eq!(n.strip_region("респ татарстан г казань ул ленина"), "г казань ул ленина");
        // No marker: untouched
        assert_eq!(n.strip_region("г казань, ул ленина"), "г казань, ул ленина");
        // The last remaining segment is never dropped
        assert_eq!(n.strip_region("татарстан респ"), "татарстан респ");
    }

    #[test]
    fn test_canonicalize_street_type_variants() {
        let n = normalizer();
        let cases = [
            ("ул ленина", "улица ленина"),
            ("пр-т победы", "проспект победы"),
            ("пр-кт победы", "проспект победы"),
            ("просп победы", "проспект победы"),
            ("б-р ибрагимова", "бульвар ибрагимова"),
            ("бульв ибрагимова", "бульвар ибрагимова"),
            ("пер кривой", "переулок кривой"),
            ("ш южное", "шоссе южное"),
            ("наб волжская", "набережная волжская"),
            ("пл свободы", "площадь свободы"),
            ("туп садовый", "тупик садовый"),
            ("пр-д заводской", "проезд заводской"),
            ("ал липовая", "аллея липовая"),
        ];
        for (input, expected) in cases {
            assert_eq!(n.canonicalize_street_types(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_canonicalize_whole_tokens_only() {
        let n = normalizer();
        // "ул" inside a word, "пр" as a prefix, "ш" inside a name: untouched
        assert_eq!(n.canonicalize_street_types("улитина, пруд"), "улитина, пруд");
        assert_eq!(n.canonicalize_street_types("шоссейная"), "шоссейная");
        assert_eq!(n.canonicalize_street_types("плеханова"), "плеханова");
    }

    #[test]
    fn test_drop_street_types() {
        let n = normalizer();
        assert_eq!(n.drop_street_types("улица ленина, д 5"), "ленина, д 5");
        assert_eq!(n.drop_street_types("ленина улица, д 5"), "ленина, д 5");
        assert_eq!(n.drop_street_types("ленина улица 5"), "ленина 5");
        assert_eq!(n.drop_street_types("ленина улица д 5"), "ленина д 5");
        // Type between two name words stays: it distinguishes streets
        assert_eq!(n.drop_street_types("казань улица ленина"), "казань улица ленина");
    }

    #[test]
    fn test_street_named_like_a_type_survives() {
        let n = normalizer();
        assert_eq!(n.drop_street_types("улица набережная, д 3"), "набережная, д 3");
        assert_eq!(n.drop_street_types("набережная улица, 3"), "набережная, 3");
        assert_eq!(n.drop_street_types("площадь улица"), "площадь");
        // A lone name token is never dropped, even on a later pass
        assert_eq!(n.drop_street_types("набережная 3"), "набережная 3");
        assert_eq!(n.drop_street_types("аллея д 3"), "аллея д 3");
    }

    #[test]
    fn test_drop_city_marker() {
        let n = normalizer();
        assert_eq!(n.drop_city_marker("г казань, ленина"), "казань, ленина");
        assert_eq!(n.drop_city_marker("казань г, ленина"), "казань, ленина");
        assert_eq!(n.drop_city_marker("город казань"), "казань");
        // After a number "г" is a litera
        assert_eq!(n.drop_city_marker("ленина 5 г"), "ленина 5 г");
    }

    #[test]
    fn test_compact_building_markers() {
        let n = normalizer();
        assert_eq!(n.compact_building_markers("ленина, д 5"), "ленина 5");
        assert_eq!(n.compact_building_markers("ленина, дом 5, корпус 2"), "ленина 5 к2");
        assert_eq!(n.compact_building_markers("ленина, д5, корп2"), "ленина 5 к2");
        assert_eq!(n.compact_building_markers("ленина, д 5, стр 1"), "ленина 5 с1");
        assert_eq!(n.compact_building_markers("ленина, д 12, лит а"), "ленина 12 а");
        assert_eq!(n.compact_building_markers("ленина, д 5, кв 12"), "ленина 5");
        assert_eq!(n.compact_building_markers("ленина д 5 кв12"), "ленина 5");
        // "с" before a name is a village marker, not a structure
        assert_eq!(n.compact_building_markers("с высокая гора, ленина"), "с высокая гора, ленина");
    }

    #[test]
    fn test_merge_litera() {
        let n = normalizer();
        assert_eq!(n.merge_litera("ленина 12 а"), "ленина 12а");
        assert_eq!(n.merge_litera("ленина 12-а"), "ленина 12а");
        assert_eq!(n.merge_litera("ленина 12/1 б"), "ленина 12/1б");
        assert_eq!(n.merge_litera("ленина 12 к2"), "ленина 12 к2");
    }

    #[test]
    fn test_collapse_separators() {
        let n = normalizer();
        assert_eq!(n.collapse_separators(" , казань ,, ленина   5 ,"), "казань, ленина 5");
    }

    #[test]
    fn test_street_type_position_variants_converge() {
        let n = normalizer();
        assert_eq!(n.normalize("ул. Ленина, д. 5"), n.normalize("Ленина улица 5"));
        assert_eq!(n.normalize("ул. Ленина, д. 5"), "ленина 5");
    }

    #[test]
    fn test_type_word_streets_stay_distinct() {
        let n = normalizer();
        let embankment = n.normalize("г. Казань, ул. Набережная, д. 3");
        let alley = n.normalize("г. Казань, ул. Аллея, д. 3");
        let square = n.normalize("г. Казань, Площадь ул, д. 3");
        let no_street = n.normalize("г. Казань, д. 3");

        assert_eq!(embankment, "казань, набережная 3");
        assert_eq!(alley, "казань, аллея 3");
        assert_eq!(square, "казань, площадь 3");
        assert_eq!(no_street, "казань 3");
        assert_ne!(n.normalize("ул. Набережная, д. 3"), n.normalize("ул. Аллея, д. 3"));
        assert_eq!(n.normalize("Набережная ул, 3"), n.normalize("ул. Набережная, д. 3"));
    }

    #[test]
    fn test_comma_free_address_keeps_inner_street_type() {
        let n = normalizer();
        // A type between two name words is kept, so this form does not meet the comma form
        assert_eq!(n.normalize("г Казань ул Ленина д 5"), "казань улица ленина 5");
        assert_ne!(n.normalize("г Казань ул Ленина д 5"), n.normalize("г Казань, ул Ленина, д 5"));
    }

    #[test]
    fn test_report_and_registry_formats_converge() {
        let n = normalizer();
        let report = n.normalize("Респ. Татарстан, г. Казань, ул. Ленина, д. 5");
        let fias = n.normalize("420111, Татарстан Респ, г Казань, ул Ленина, д. 5");
        let reversed = n.normalize("Республика Татарстан, Казань г, Ленина ул, дом 5");
        assert_eq!(report, "казань, ленина 5");
        assert_eq!(fias, report);
        assert_eq!(reversed, report);
    }

    #[test]
    fn test_block_and_litera_variants_converge() {
        let n = normalizer();
        let a = n.normalize("г. Самара, пр-кт Кирова, д. 12, корп. 2");
        let b = n.normalize("Самара г, Кирова проспект, дом 12 корпус 2");
        assert_eq!(a, "самара, кирова 12 к2");
        assert_eq!(a, b);

        let c = n.normalize("г Пермь, ул Мира, д 12 лит. А");
        let d = n.normalize("Пермь г, Мира ул, 12-а");
        let e = n.normalize("г. Пермь, ул. Мира, д. 12, кв. 7");
        assert_eq!(c, "пермь, мира 12а");
        assert_eq!(c, d);
        assert_eq!(e, "пермь, мира 12");
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        let samples = [
            "ул. Ленина, д. 5",
            "Ленина улица 5",
            "420111, Татарстан Респ, г Казань, ул Ленина, д. 5",
            "Респ Татарстан г Казань ул Ленина д 5",
            "г. Тольятти, Южное ш., д. 23",
            "Самарская обл, г.о. Тольятти, Южное шоссе, 23",
            "Пермский край, г Пермь, ул 25 Октября, д. 1/3 корп. Б",
            "г Уфа, ул. 8 Марта, д. 10 стр. 2, кв. 4",
            "Казань г, Набережная ул, 12 г",
            "г. Казань, ул. Набережная, д. 3",
            "Красная Набережная ул, 7",
            "с. Высокая Гора, ул. Мира, дом 3а",
            "",
            ",,,",
            "123456",
            "д.",
        ];
        for sample in samples {
            let once = n.normalize(sample);
            let twice = n.normalize(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_garbage_never_panics() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize(" , ; . "), "");
        assert_eq!(n.normalize("123456"), "");
        assert!(n.normalize_opt("420111,").is_none());
        assert_eq!(n.normalize_opt("г Казань"), Some("казань".to_string()));
    }
}
