//! Personal-name decomposition
//!
//! Names on the source site are written the traditional way: a run of
//! rabbinic or honorary titles, the given names, sometimes a locational
//! surname (`מליאדי`, "of Liadi") or a bracketed maiden name, trailing
//! honorifics, and an optional ` - ` description. This module splits such a
//! string into prefix, first name, last name and suffix.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();

    // Maiden or family name written in brackets: "רבקה [סגל]"
    static ref BRACKET_REGEX: Regex = Regex::new(r"\[([^\]]*)\]").unwrap();

    /// Leading titles, each split into its tokens, longest sequence first
    static ref TITLES: Vec<Vec<&'static str>> = {
        let mut titles: Vec<Vec<&'static str>> = [
            "בעל התניא והשולחן ערוך",
            "הרבנית הצדקנית",
            "הרבנית",
            "הצדקנית",
            "מרת",
            "הרה\"ק",
            "הרה\"צ",
            "הרה\"ג",
            "הרה\"ח",
            "הרב",
            "רבי",
            "ר'",
            "רבנו",
            "הגדול",
            "כ\"ק",
            "אדמו\"ר",
            "האדמו\"ר",
        ]
        .iter()
        .map(|title| title.split(' ').collect())
        .collect();
        titles.sort_by(|a, b| b.len().cmp(&a.len()));
        titles
    };
}

/// Titles written immediately before the given names
const NAME_TITLES: &[&str] = &["רבי", "ר'", "הרב", "מרת", "הרבנית"];

/// Most tokens an epithet between two titles may span
const MAX_EPITHET_TOKENS: usize = 2;

/// Honorifics that follow the name of the deceased
const HONORIFICS: &[&str] = &[
    "ע\"ה",
    "זי\"ע",
    "זצוקללה\"ה",
    "זצ\"ל",
    "ז\"ל",
    "נ\"ע",
    "הזקן",
];

/// A name split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedName {
    /// Titles preceding the given names
    pub prefix: Option<String>,
    /// Given names; empty when the input held nothing but titles
    pub first_name: String,
    /// Bracketed or locational surname
    pub last_name: Option<String>,
    /// Trailing honorifics and the ` - ` description
    pub suffix: Option<String>,
}

/// Decomposes a full display name
///
/// Plain given names are never split into first and last: compound names
/// such as `שניאור זלמן` are common, so a surname is only taken from a
/// bracket or a final locational token beginning with `מ`.
pub fn parse_name(full_name: &str) -> ParsedName {
    let normalized = full_name.replace('\u{05F4}', "\"").replace('\u{05F3}', "'");
    let normalized = WHITESPACE_REGEX.replace_all(normalized.trim(), " ");

    let (main, description) = match normalized.split_once(" - ") {
        Some((main, description)) => (main.trim().to_string(), Some(description.trim())),
        None => (normalized.to_string(), None),
    };

    let mut last_name = None;
    let main = match BRACKET_REGEX.captures(&main) {
        Some(caps) => {
            let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
            if !inner.is_empty() {
                last_name = Some(inner.to_string());
            }
            BRACKET_REGEX.replace(&main, " ").into_owned()
        }
        None => main,
    };

    let tokens: Vec<&str> = main.split_whitespace().collect();
    let prefix_len = title_prefix_len(&tokens);

    // Titles after the given names are epithets and join the suffix
    let mut suffix_parts = Vec::new();
    let mut body = Vec::new();
    let mut i = prefix_len;
    while i < tokens.len() {
        if let Some(len) = title_at(&tokens, i) {
            suffix_parts.extend_from_slice(&tokens[i..i + len]);
            i += len;
        } else {
            if HONORIFICS.contains(&tokens[i]) {
                suffix_parts.push(tokens[i]);
            } else {
                body.push(tokens[i]);
            }
            i += 1;
        }
    }

    if last_name.is_none() && body.len() >= 2 {
        if let Some(last) = body.last() {
            if last.starts_with('מ') {
                last_name = Some(last.to_string());
                body.pop();
            }
        }
    }

    if let Some(description) = description.filter(|d| !d.is_empty()) {
        suffix_parts.push(description);
    }

    ParsedName {
        prefix: join_non_empty(&tokens[..prefix_len]),
        first_name: body.join(" "),
        last_name,
        suffix: join_non_empty(&suffix_parts),
    }
}

/// Returns the number of leading tokens that form the title prefix
///
/// The prefix starts with a title at the first token. An epithet between
/// titles (`כ"ק אדמו"ר האמצעי רבי`) stays in the prefix only when a title
/// that introduces the given names follows it.
fn title_prefix_len(tokens: &[&str]) -> usize {
    let mut end = 0;
    let mut i = 0;

    while i < tokens.len() {
        if let Some(len) = title_at(tokens, i) {
            i += len;
            end = i;
            continue;
        }
        if end == 0 {
            break;
        }

        let bridge = (1..=MAX_EPITHET_TOKENS).find(|gap| {
            tokens
                .get(i + gap)
                .map_or(false, |token| NAME_TITLES.contains(token))
        });
        match bridge {
            Some(gap) => i += gap,
            None => break,
        }
    }

    end
}

/// Length of the title sequence starting at `tokens[i]`, if any
fn title_at(tokens: &[&str], i: usize) -> Option<usize> {
    TITLES
        .iter()
        .find(|title| tokens.len() - i >= title.len() && tokens[i..i + title.len()] == title[..])
        .map(|title| title.len())
}

fn join_non_empty(parts: &[&str]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_name() {
        let parsed = parse_name("משה");
        assert_eq!(parsed.first_name, "משה");
        assert_eq!(parsed.last_name, None);
        assert_eq!(parsed.prefix, None);
        assert_eq!(parsed.suffix, None);
    }

    #[test]
    fn test_compound_given_name_is_not_split() {
        let parsed = parse_name("שניאור זלמן");
        assert_eq!(parsed.first_name, "שניאור זלמן");
        assert_eq!(parsed.last_name, None);
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(parse_name(""), ParsedName::default());
        assert_eq!(parse_name("   "), ParsedName::default());
    }

    #[test]
    fn test_only_titles() {
        let parsed = parse_name("הרה\"ק רבי");
        assert_eq!(parsed.prefix.as_deref(), Some("הרה\"ק רבי"));
        assert_eq!(parsed.first_name, "");
        assert_eq!(parsed.last_name, None);
    }

    #[test]
    fn test_prefix() {
        let parsed = parse_name("הרה\"ק רבי שמואל");
        assert_eq!(parsed.prefix.as_deref(), Some("הרה\"ק רבי"));
        assert_eq!(parsed.first_name, "שמואל");
        assert_eq!(parsed.last_name, None);
    }

    #[test]
    fn test_maiden_name_in_brackets() {
        let parsed = parse_name("הרבנית הצדקנית מרת רבקה ע\"ה [סגל]");
        assert_eq!(parsed.prefix.as_deref(), Some("הרבנית הצדקנית מרת"));
        assert_eq!(parsed.first_name, "רבקה");
        assert_eq!(parsed.last_name.as_deref(), Some("סגל"));
        assert_eq!(parsed.suffix.as_deref(), Some("ע\"ה"));
    }

    #[test]
    fn test_trailing_description() {
        let parsed = parse_name("הרה\"ק רבי שלום דובער - האדמו\"ר מהורש\"א");
        assert_eq!(parsed.prefix.as_deref(), Some("הרה\"ק רבי"));
        assert_eq!(parsed.first_name, "שלום דובער");
        assert_eq!(parsed.last_name, None);
        assert_eq!(parsed.suffix.as_deref(), Some("האדמו\"ר מהורש\"א"));
    }

    #[test]
    fn test_locational_surname() {
        let parsed = parse_name("רבי שניאור זלמן מליאדי");
        assert_eq!(parsed.prefix.as_deref(), Some("רבי"));
        assert_eq!(parsed.first_name, "שניאור זלמן");
        assert_eq!(parsed.last_name.as_deref(), Some("מליאדי"));
    }

    #[test]
    fn test_multi_word_title_and_honorific() {
        let parsed = parse_name("רבנו הגדול בעל התניא והשולחן ערוך רבי שניאור זלמן מליאדי זי\"ע");
        assert_eq!(
            parsed.prefix.as_deref(),
            Some("רבנו הגדול בעל התניא והשולחן ערוך רבי")
        );
        assert_eq!(parsed.first_name, "שניאור זלמן");
        assert_eq!(parsed.last_name.as_deref(), Some("מליאדי"));
        assert_eq!(parsed.suffix.as_deref(), Some("זי\"ע"));
    }

    #[test]
    fn test_epithet_between_titles_stays_in_prefix() {
        let parsed = parse_name("כ\"ק אדמו\"ר האמצעי רבי דובער");
        assert_eq!(parsed.prefix.as_deref(), Some("כ\"ק אדמו\"ר האמצעי רבי"));
        assert_eq!(parsed.first_name, "דובער");
    }

    #[test]
    fn test_trailing_epithet_title_joins_suffix() {
        let parsed = parse_name("רבי שניאור זלמן בעל התניא והשולחן ערוך");
        assert_eq!(parsed.prefix.as_deref(), Some("רבי"));
        assert_eq!(parsed.first_name, "שניאור זלמן");
        assert_eq!(parsed.last_name, None);
        assert_eq!(parsed.suffix.as_deref(), Some("בעל התניא והשולחן ערוך"));
    }

    #[test]
    fn test_title_after_given_name_is_not_a_prefix() {
        let parsed = parse_name("משה רבנו");
        assert_eq!(parsed.prefix, None);
        assert_eq!(parsed.first_name, "משה");
        assert_eq!(parsed.suffix.as_deref(), Some("רבנו"));
    }

    #[test]
    fn test_given_names_between_titles_are_kept() {
        let parsed = parse_name("הרב שמואל הגדול ז\"ל");
        assert_eq!(parsed.prefix.as_deref(), Some("הרב"));
        assert_eq!(parsed.first_name, "שמואל");
        assert_eq!(parsed.suffix.as_deref(), Some("הגדול ז\"ל"));
    }

    #[test]
    fn test_single_token_starting_with_mem_is_a_given_name() {
        let parsed = parse_name("מנחם");
        assert_eq!(parsed.first_name, "מנחם");
        assert_eq!(parsed.last_name, None);
    }

    #[test]
    fn test_hebrew_punctuation_is_normalized() {
        let parsed = parse_name("הרה\u{05F4}ק  רבי   שמואל");
        assert_eq!(parsed.prefix.as_deref(), Some("הרה\"ק רבי"));
        assert_eq!(parsed.first_name, "שמואל");
    }
}
