//! Categorical derivations on the merged table: tenure buckets and age brackets.

use crate::config::{AgeConfig, TenureBoundaries};
use std::fmt;

/// Career stage derived from years of service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TenureBucket {
    New,
    Experienced,
    Established,
    Veteran,
}

impl TenureBucket {
    pub const ALL: [TenureBucket; 4] = [
        TenureBucket::New,
        TenureBucket::Experienced,
        TenureBucket::Established,
        TenureBucket::Veteran,
    ];

    /// Step function over years of service; lower bounds are inclusive.
    pub fn from_years(years: Option<f64>, bounds: &TenureBoundaries) -> Option<Self> {
        let years = years.filter(|y| !y.is_nan())?;
        let bucket = if years >= bounds.veteran {
            TenureBucket::Veteran
        } else if years >= bounds.established {
            TenureBucket::Established
        } else if years >= bounds.experienced {
            TenureBucket::Experienced
        } else {
            TenureBucket::New
        };
        Some(bucket)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenureBucket::New => "New",
            TenureBucket::Experienced => "Experienced",
            TenureBucket::Established => "Established",
            TenureBucket::Veteran => "Veteran",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == label)
    }
}

impl fmt::Display for TenureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize an age bracket label.
///
/// Separators between the two bounds of a range (`"41  45"`, `"41 - 45"`)
/// become a single hyphen, then any bracket listed in `merge_into_top`
/// is folded into the configured top bracket. Applying it twice is a no-op
/// as long as the top bracket itself survives separator cleanup unchanged.
pub fn normalize_age(raw: &str, rule: &AgeConfig) -> String {
    let cleaned = join_range_bounds(raw.trim());
    if rule.merge_into_top.iter().any(|label| *label == cleaned) {
        rule.top_bracket.clone()
    } else {
        cleaned
    }
}

fn join_range_bounds(label: &str) -> String {
    let is_sep = |c: char| c.is_whitespace() || c == '-';
    let lower_end = label
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(label.len());
    if lower_end == 0 || lower_end == label.len() {
        return label.to_string();
    }

    let (lower, rest) = label.split_at(lower_end);
    let upper = rest.trim_start_matches(is_sep);
    let separator = &rest[..rest.len() - upper.len()];
    let is_range = !separator.is_empty()
        && !upper.is_empty()
        && upper.chars().all(|c| c.is_ascii_digit());

    if is_range {
        format!("{lower}-{upper}")
    } else {
        label.to_string()
    }
}
