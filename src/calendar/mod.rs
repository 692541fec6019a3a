//! Hebrew calendar dates
//!
//! Dates on the source site are written in Hebrew with gematria numerals
//! (`ט' בכסלו תרנ"ד`). This module parses those strings and converts them to
//! civil dates using the arithmetic Hebrew calendar (molad of Tishri plus the
//! postponement rules), counting days from the same epoch as
//! `chrono::NaiveDate::from_num_days_from_ce_opt`.

use chrono::{Datelike, NaiveDate};

/// Fixed day number of 1 Tishri, year 1
const HEBREW_EPOCH: i64 = -1_373_427;

/// Months of the Hebrew calendar, numbered from Nisan
const MONTHS: &[(&str, u32)] = &[
    ("ניסן", 1),
    ("אייר", 2),
    ("סיון", 3),
    ("סיוון", 3),
    ("תמוז", 4),
    ("אב", 5),
    ("אלול", 6),
    ("תשרי", 7),
    ("חשון", 8),
    ("חשוון", 8),
    ("מרחשון", 8),
    ("מרחשוון", 8),
    ("כסלו", 9),
    ("כסליו", 9),
    ("טבת", 10),
    ("שבט", 11),
    ("אדר", 12),
];

const TISHRI: u32 = 7;
const ADAR: u32 = 12;
const ADAR_II: u32 = 13;

/// A date as written on the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// A bare four-digit civil year
    Gregorian { year: i32 },
    /// A Hebrew date at day, month or year precision
    Hebrew {
        year: i64,
        month: Option<u32>,
        day: Option<u32>,
    },
}

/// Numeric value of a Hebrew letter, final forms included
fn letter_value(c: char) -> u32 {
    match c {
        'א' => 1,
        'ב' => 2,
        'ג' => 3,
        'ד' => 4,
        'ה' => 5,
        'ו' => 6,
        'ז' => 7,
        'ח' => 8,
        'ט' => 9,
        'י' => 10,
        'כ' | 'ך' => 20,
        'ל' => 30,
        'מ' | 'ם' => 40,
        'נ' | 'ן' => 50,
        'ס' => 60,
        'ע' => 70,
        'פ' | 'ף' => 80,
        'צ' | 'ץ' => 90,
        'ק' => 100,
        'ר' => 200,
        'ש' => 300,
        'ת' => 400,
        _ => 0,
    }
}

/// Sums the gematria value of a numeral, ignoring punctuation
pub fn gematria_to_int(text: &str) -> u32 {
    text.chars().map(letter_value).sum()
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, number)| *number)
}

/// Looks a token up as a month name, with or without the `ב` ("in") prefix
fn match_month(token: &str) -> Option<u32> {
    month_number(token).or_else(|| token.strip_prefix('ב').and_then(month_number))
}

/// Parses a date string in one of the forms `D' בMONTH YEAR`, `MONTH YEAR`,
/// `YEAR`, or a four-digit civil year
pub fn parse_hebrew_date(date_str: &str) -> Option<ParsedDate> {
    let date_str = date_str.trim();
    if date_str.is_empty() {
        return None;
    }

    if date_str.len() == 4 && date_str.chars().all(|c| c.is_ascii_digit()) {
        return date_str
            .parse()
            .ok()
            .map(|year| ParsedDate::Gregorian { year });
    }

    let parts: Vec<&str> = date_str.split_whitespace().collect();
    let year_part = parts.last()?;

    let mut year = i64::from(gematria_to_int(year_part));
    if year == 0 {
        return None;
    }
    if year < 1000 {
        year += 5000;
    }

    let mut month = None;
    let mut month_index = None;
    for (index, part) in parts[..parts.len() - 1].iter().enumerate() {
        if let Some(number) = match_month(part) {
            month = Some(number);
            month_index = Some(index);
            if number == ADAR {
                if let Some(next) = parts.get(index + 1) {
                    match next.trim_end_matches(['\'', '\u{05F3}']) {
                        "ב" => month = Some(ADAR_II),
                        "א" => month = Some(ADAR),
                        _ => {}
                    }
                }
            }
            break;
        }
    }

    // A day is only present when something precedes the month
    let day = match month_index {
        Some(index) if index > 0 => Some(gematria_to_int(parts[0])).filter(|d| *d > 0),
        _ => None,
    };

    Some(ParsedDate::Hebrew { year, month, day })
}

fn is_leap_year(year: i64) -> bool {
    (7 * year + 1).rem_euclid(19) < 7
}

fn last_month_of_year(year: i64) -> u32 {
    if is_leap_year(year) {
        ADAR_II
    } else {
        ADAR
    }
}

/// Days from the epoch to the molad of Tishri, with the weekday postponement
fn elapsed_days(year: i64) -> i64 {
    let months_elapsed = (235 * year - 234).div_euclid(19);
    let parts_elapsed = 12084 + 13753 * months_elapsed;
    let days = 29 * months_elapsed + parts_elapsed.div_euclid(25920);
    if (3 * (days + 1)).rem_euclid(7) < 3 {
        days + 1
    } else {
        days
    }
}

/// Delays that keep year lengths within the allowed set
fn year_length_correction(year: i64) -> i64 {
    let ny0 = elapsed_days(year - 1);
    let ny1 = elapsed_days(year);
    let ny2 = elapsed_days(year + 1);
    if ny2 - ny1 == 356 {
        2
    } else if ny1 - ny0 == 382 {
        1
    } else {
        0
    }
}

fn new_year(year: i64) -> i64 {
    HEBREW_EPOCH + elapsed_days(year) + year_length_correction(year)
}

fn days_in_year(year: i64) -> i64 {
    new_year(year + 1) - new_year(year)
}

fn last_day_of_month(month: u32, year: i64) -> u32 {
    let length = days_in_year(year);
    let short = match month {
        2 | 4 | 6 | 10 | 13 => true,
        12 => !is_leap_year(year),
        8 => !matches!(length, 355 | 385),
        9 => matches!(length, 353 | 383),
        _ => false,
    };
    if short {
        29
    } else {
        30
    }
}

/// Fixed day number of a Hebrew date, or `None` if the date does not exist
fn fixed_from_hebrew(year: i64, month: u32, day: u32) -> Option<i64> {
    if year < 1 || month < 1 || month > last_month_of_year(year) {
        return None;
    }
    if day < 1 || day > last_day_of_month(month, year) {
        return None;
    }

    let month_days = |range: std::ops::RangeInclusive<u32>| -> i64 {
        range.map(|m| i64::from(last_day_of_month(m, year))).sum()
    };

    // Months are counted from Tishri, which opens the year
    let preceding = if month < TISHRI {
        month_days(TISHRI..=last_month_of_year(year)) + month_days(1..=month - 1)
    } else {
        month_days(TISHRI..=month - 1)
    };

    Some(new_year(year) + preceding + i64::from(day) - 1)
}

/// Converts a Hebrew date to the civil (proleptic Gregorian) calendar
pub fn hebrew_to_naive_date(year: i64, month: u32, day: u32) -> Option<NaiveDate> {
    let fixed = fixed_from_hebrew(year, month, day)?;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(fixed).ok()?)
}

/// Converts a date as written on the site to a civil date string
///
/// Day precision gives `"18 Nov 1893"`, month precision `"NOV 2023"` (the
/// civil month of the first day), year precision the civil year in which
/// 1 Tishri falls. A four-digit civil year is returned unchanged.
pub fn hebrew_to_civil(date_str: &str) -> Option<String> {
    match parse_hebrew_date(date_str)? {
        ParsedDate::Gregorian { year } => Some(year.to_string()),
        ParsedDate::Hebrew {
            year,
            month: Some(month),
            day: Some(day),
        } => hebrew_to_naive_date(year, month, day).map(|d| d.format("%d %b %Y").to_string()),
        ParsedDate::Hebrew {
            year,
            month: Some(month),
            day: None,
        } => hebrew_to_naive_date(year, month, 1).map(|d| {
            format!("{} {}", d.format("%b").to_string().to_uppercase(), d.year())
        }),
        ParsedDate::Hebrew { year, month: None, .. } => {
            hebrew_to_naive_date(year, TISHRI, 1).map(|d| d.year().to_string())
        }
    }
}
