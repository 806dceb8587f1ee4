use chrono::{Datelike, NaiveDate};

use super::ValidationError;

/// Youngest age accepted at registration
pub const MIN_AGE_YEARS: u32 = 12;

/// Split `s` into `N` all-digit parts of the given widths joined by `sep`.
fn split_digits<'a, const N: usize>(s: &'a str, sep: char, widths: [usize; N]) -> Option<[&'a str; N]> {
    let mut parts = [""; N];
    let mut iter = s.split(sep);
    for (slot, width) in parts.iter_mut().zip(widths) {
        let part = iter.next()?;
        if part.len() != width || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *slot = part;
    }
    if iter.next().is_some() {
        return None;
    }
    Some(parts)
}

/// Parse a `DD/MM/YYYY` date. Returns `None` for anything that is not a
/// real calendar date (`31/02/2000`, `1/2/2000`).
pub fn parse_br_date(s: &str) -> Option<NaiveDate> {
    let [day, month, year] = split_digits(s.trim(), '/', [2, 2, 4])?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Whole years between `birth` and `today`
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

pub fn validate_birth_date(s: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::Required);
    }
    let birth = parse_br_date(s).ok_or(ValidationError::InvalidDate)?;
    if age_on(birth, today) < MIN_AGE_YEARS as i32 {
        return Err(ValidationError::TooYoung(MIN_AGE_YEARS));
    }
    Ok(birth)
}

pub fn is_valid_birth_date(s: &str, today: NaiveDate) -> bool {
    validate_birth_date(s, today).is_ok()
}

/// `DD/MM/YYYY` -> `YYYY-MM-DD`, empty on malformed input
pub fn br_date_to_iso(s: &str) -> String {
    match split_digits(s.trim(), '/', [2, 2, 4]) {
        Some([day, month, year]) => format!("{}-{}-{}", year, month, day),
        None => String::new(),
    }
}

/// `YYYY-MM-DD` (optionally followed by a time) -> `DD/MM/YYYY`, empty on
/// malformed input
pub fn iso_to_br_date(s: &str) -> String {
    let date = s.trim().get(..10).unwrap_or("");
    match split_digits(date, '-', [4, 2, 2]) {
        Some([year, month, day]) => format!("{}/{}/{}", day, month, year),
        None => String::new(),
    }
}
