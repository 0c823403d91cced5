//! Text helpers shared by the extractors.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::RankerConfig;

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel boundary regex"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s/_.\-]+").expect("valid separator regex"));
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9 ]").expect("valid non-alphanumeric regex"));

/// Splits a raw identifier or path into normalized vocabulary tokens.
///
/// Camel-case boundaries become separators, everything is lower-cased,
/// separators and non-alphanumerics collapse to spaces, and tokens shorter
/// than `min_token_len` or listed as stop words are dropped.
#[must_use]
pub fn tokenize(raw: &str, config: &RankerConfig) -> Vec<String> {
    let split = CAMEL_BOUNDARY.replace_all(raw, "$1 $2").to_lowercase();
    let spaced = SEPARATORS.replace_all(&split, " ");
    let cleaned = NON_ALNUM.replace_all(&spaced, " ");
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= config.min_token_len)
        .filter(|t| !config.stop_words.iter().any(|w| w == t))
        .map(str::to_string)
        .collect()
}

/// Deduplicates and sorts by byte order.
#[must_use]
pub fn unique_sorted<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect::<BTreeSet<String>>().into_iter().collect()
}

/// Deduplicates records by a `|`-joined key, returning them sorted by that key.
///
/// The first record seen for a key wins.
pub fn dedupe_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> Vec<&str>,
{
    let mut keyed: std::collections::BTreeMap<String, T> = std::collections::BTreeMap::new();
    for item in items {
        let k = key(&item).join("|");
        keyed.entry(k).or_insert(item);
    }
    keyed.into_values().collect()
}

/// Returns the first quoted string (`'`, `"` or `` ` ``) at the start of `s`.
#[must_use]
pub fn leading_quoted(s: &str) -> Option<&str> {
    let s = s.trim_start();
    let quote = s.chars().next().filter(|c| matches!(c, '\'' | '"' | '`'))?;
    let rest = &s[quote.len_utf8()..];
    rest.find(quote).map(|end| &rest[..end])
}
