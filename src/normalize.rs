// 🧹 Value Normalizers - canonicalize single field values
//
// Every function here is pure and returns None for "no usable value".
// Address canonicalization lives in address.rs; this module covers identifiers,
// contacts and the numeric/date cells of the regional reports.

use chrono::NaiveDate;
use uuid::Uuid;

/// Registration numbers (OGRN / OGRNIP) are 13 or 15 digits long
pub const REGISTRATION_NUMBER_LENGTHS: [usize; 2] = [13, 15];

/// Administrative codes are compared at municipality granularity
pub const ADMIN_CODE_MATCH_DIGITS: usize = 8;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Strip every non-digit character
///
/// # Examples:
/// ```
/// use capital_repair::normalize::clean_digits;
/// assert_eq!(clean_digits("92 701 000 001"), Some("92701000001".to_string()));
/// assert_eq!(clean_digits("н/д"), None);
/// ```
pub fn clean_digits(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Digits-only registration number, rejected unless exactly 13 or 15 digits
pub fn clean_registration_number(value: &str) -> Option<String> {
    clean_digits(value).filter(|d| REGISTRATION_NUMBER_LENGTHS.contains(&d.len()))
}

/// Administrative (OKTMO) code truncated to municipality granularity
pub fn admin_code_prefix(value: &str) -> Option<String> {
    clean_digits(value).map(|d| d.chars().take(ADMIN_CODE_MATCH_DIGITS).collect())
}

/// Global address identifier: first entry of a `;` list, parsed as a GUID
///
/// Returned lower-case and hyphenated so both sources compare equal.
pub fn clean_guid(value: &str) -> Option<String> {
    let first = value.split(';').next()?.trim();
    if first.is_empty() {
        return None;
    }
    Uuid::parse_str(first)
        .ok()
        .map(|guid| guid.hyphenated().to_string())
}

// ============================================================================
// CONTACTS
// ============================================================================

/// Phone keeps digits and `+()-`
pub fn clean_phone(value: &str) -> Option<String> {
    let phone: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-'))
        .collect();
    if phone.is_empty() {
        None
    } else {
        Some(phone)
    }
}

/// Email trimmed and lower-cased; anything without `@` is rejected
pub fn clean_email(value: &str) -> Option<String> {
    let email = value.trim().to_lowercase();
    if email.contains('@') {
        Some(email)
    } else {
        None
    }
}

/// Trimmed free text, None when blank
pub fn clean_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Header / phrase normalization: BOM removed, lower-case, single spaces
pub fn normalize_phrase(value: &str) -> String {
    value
        .replace('\u{feff}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// REPORT CELLS
// ============================================================================

/// Decimal with spaces as thousands separators and a comma or dot decimal mark
pub fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer, tolerating a decimal tail such as "12,0"
pub fn parse_int(value: &str) -> Option<i32> {
    let number = parse_decimal(value)?;
    if number.abs() > i32::MAX as f64 {
        return None;
    }
    Some(number.trunc() as i32)
}

/// Date in `YYYY-MM-DD`, `DD.MM.YYYY` or a bare year (→ January 1st)
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Try ISO first, then the Russian day-first form
    for fmt in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    // Timestamps: keep the date part
    if let Some((date_part, _)) = value.split_once(|c: char| c == ' ' || c == 'T') {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(date);
        }
    }

    if value.len() == 4 && value.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = value.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    None
}

// ============================================================================
// TESTS
// ============================================================================
