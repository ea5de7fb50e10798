//! City-name normalization and fuzzy matching.
//!
//! Users type "St Louis", "Saint Louis" or "st. louis" for the same place, and
//! drop suffixes like "Beach" or "Heights". These helpers fold those variants
//! together; the catalog's exact lookup never uses them.

use crate::types::City;

/// Suffixes that are commonly added or dropped from a place name.
const OPTIONAL_SUFFIXES: &[&str] = &[
    "beach", "city", "park", "heights", "springs", "falls", "lake", "lakes", "hills", "village",
    "township",
];

/// Case-insensitive name equality, folding case the same way the catalog's
/// exact lookup does (full Unicode lower-casing, surrounding whitespace ignored).
///
/// ```
/// use nearcity::names::same_city_name;
///
/// assert!(same_city_name("CAÑON CITY", "Cañon City"));
/// assert!(!same_city_name("Houston", "Humble"));
/// ```
pub fn same_city_name(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Lower-cases, collapses whitespace and canonicalizes leading abbreviations.
///
/// # Examples
///
/// ```
/// use nearcity::names::normalize_city_name;
///
/// assert_eq!(normalize_city_name("Saint  Petersburg"), "st. petersburg");
/// assert_eq!(normalize_city_name("Ft Worth"), "ft. worth");
/// assert_eq!(normalize_city_name("N Little Rock"), "north little rock");
/// ```
pub fn normalize_city_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut words = lower.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let lead = match first {
        "saint" | "st" | "st." => "st.",
        "fort" | "ft" | "ft." => "ft.",
        "port" | "pt" | "pt." => "port",
        "mount" | "mt" | "mt." => "mt.",
        "n" | "n." => "north",
        "s" | "s." => "south",
        "e" | "e." => "east",
        "w" | "w." => "west",
        other => other,
    };

    let rest: Vec<&str> = words.collect();
    // A lone abbreviation is a name of its own ("St"), not a prefix.
    if rest.is_empty() {
        return first.to_string();
    }

    let mut normalized = String::with_capacity(lower.len());
    normalized.push_str(lead);
    for word in rest {
        normalized.push(' ');
        normalized.push_str(word);
    }
    normalized
}

/// Finds the best fuzzy match for `name` among `candidates`.
///
/// Tries, in order: exact case-insensitive match, normalized match, the input
/// plus an optional suffix, the input minus an optional suffix, and finally a
/// whole-word prefix match in either direction ("Spring Creek" and "Spring",
/// never "Springfield" and "Spring"). The first candidate (in iteration order)
/// satisfying the earliest rule wins.
pub fn find_fuzzy<'a, I>(name: &str, candidates: I) -> Option<&'a City>
where
    I: IntoIterator<Item = &'a City>,
    I::IntoIter: Clone,
{
    let candidates = candidates.into_iter();
    let input = normalize_city_name(name);
    if input.is_empty() {
        return None;
    }

    if let Some(city) = candidates.clone().find(|c| c.is_named(name)) {
        return Some(city);
    }

    let normalized: Vec<(&City, String)> = candidates
        .map(|c| (c, normalize_city_name(&c.name)))
        .collect();
    let lookup = |wanted: &str| {
        normalized
            .iter()
            .find(|(_, n)| n == wanted)
            .map(|(c, _)| *c)
    };

    if let Some(city) = lookup(&input) {
        return Some(city);
    }

    for suffix in OPTIONAL_SUFFIXES {
        if let Some(city) = lookup(&format!("{input} {suffix}")) {
            return Some(city);
        }
    }

    for suffix in OPTIONAL_SUFFIXES {
        if let Some(stem) = input.strip_suffix(&format!(" {suffix}")) {
            if let Some(city) = lookup(stem) {
                return Some(city);
            }
        }
    }

    normalized
        .iter()
        .find(|(_, n)| !n.is_empty() && (word_prefix(n, &input) || word_prefix(&input, n)))
        .map(|(c, _)| *c)
}

// `short` followed by a word break at the start of `long`.
fn word_prefix(long: &str, short: &str) -> bool {
    long.strip_prefix(short)
        .is_some_and(|rest| rest.starts_with(' '))
}
