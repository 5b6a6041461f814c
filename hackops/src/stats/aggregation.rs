//! Declarative grouped aggregation.
//!
//! A statistic is data, not code: an [`Aggregation`] names the field to group
//! by, an optional filter applied before grouping, whether to count records or
//! sum a numeric field, and an optional small-group threshold. [`aggregate`]
//! evaluates one definition against a slice of records.
//!
//! Records with no value for the grouping field form their own group (key
//! `null`), so the groups always partition the filtered records.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Tokens treated as "no answer" in free-text fields (compared trimmed and
/// case-insensitively).
pub const BLANK_ANSWERS: &[&str] = &["", "n/a", "na", "none", "nothing"];

/// Separator used when free-text answers are joined for display.
pub const FREE_TEXT_SEPARATOR: &str = "<br>";

/// A record type that can be grouped.
pub trait Groupable {
    /// Fields of the record that statistics may refer to.
    type Field: Copy + Debug;

    /// Grouping key for `field`; `None` when the record has no value.
    fn key(&self, field: Self::Field) -> Option<String>;

    /// Numeric value of `field` for sums; `None` counts as zero.
    fn amount(&self, _field: Self::Field) -> Option<i64> {
        None
    }

    /// Human label for a key of `field`, when the field has a fixed vocabulary.
    fn label(_field: Self::Field, _key: &str) -> Option<&'static str> {
        None
    }
}

/// What to compute per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure<F> {
    /// Number of records
    Count,
    /// Sum of a numeric field
    Sum(F),
}

/// One statistic definition.
pub struct Aggregation<R: Groupable> {
    /// Response field name
    pub name: &'static str,
    /// Field to group by
    pub group_by: R::Field,
    /// Records kept before grouping
    pub filter: Option<fn(&R) -> bool>,
    /// Count or sum
    pub measure: Measure<R::Field>,
    /// Groups with this many records or fewer are dropped
    pub suppress_at_or_below: Option<u64>,
}

impl<R: Groupable> Aggregation<R> {
    /// Count records per value of `group_by`.
    #[must_use]
    pub const fn count(name: &'static str, group_by: R::Field) -> Self {
        Self {
            name,
            group_by,
            filter: None,
            measure: Measure::Count,
            suppress_at_or_below: None,
        }
    }

    /// Sum `field` per value of `group_by`.
    #[must_use]
    pub const fn sum(name: &'static str, group_by: R::Field, field: R::Field) -> Self {
        Self {
            name,
            group_by,
            filter: None,
            measure: Measure::Sum(field),
            suppress_at_or_below: None,
        }
    }

    /// Only consider records matching `filter`.
    #[must_use]
    pub const fn filtered(mut self, filter: fn(&R) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Drop groups with `threshold` records or fewer.
    #[must_use]
    pub const fn suppress_small_groups(mut self, threshold: u64) -> Self {
        self.suppress_at_or_below = Some(threshold);
        self
    }

    fn keeps(&self, record: &R) -> bool {
        self.filter.is_none_or(|filter| filter(record))
    }
}

/// One group of an aggregation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRow {
    /// Grouping key (`null` for records without a value)
    pub key: Option<String>,
    /// Human label for the key, when known
    pub name: Option<&'static str>,
    /// Count or sum
    pub value: i64,
}

/// Evaluate one definition.
///
/// Rows come back ordered by key with the `null` group first. Sums saturate at
/// the bounds of `i64` instead of wrapping.
#[must_use]
pub fn aggregate<R: Groupable>(records: &[R], aggregation: &Aggregation<R>) -> Vec<GroupRow> {
    let mut groups: BTreeMap<Option<String>, (u64, i64)> = BTreeMap::new();

    for record in records.iter().filter(|r| aggregation.keeps(r)) {
        let entry = groups.entry(record.key(aggregation.group_by)).or_default();
        entry.0 = entry.0.saturating_add(1);
        entry.1 = entry.1.saturating_add(match aggregation.measure {
            Measure::Count => 1,
            Measure::Sum(field) => record.amount(field).unwrap_or(0),
        });
    }

    groups
        .into_iter()
        .filter(|(_, (count, _))| {
            aggregation
                .suppress_at_or_below
                .is_none_or(|threshold| *count > threshold)
        })
        .map(|(key, (_, value))| GroupRow {
            name: key
                .as_deref()
                .and_then(|k| R::label(aggregation.group_by, k)),
            key,
            value,
        })
        .collect()
}

/// Number of records a definition's filter keeps.
#[must_use]
pub fn filtered_count<R: Groupable>(records: &[R], aggregation: &Aggregation<R>) -> usize {
    records.iter().filter(|r| aggregation.keeps(r)).count()
}

/// A free-text statistic: answers are listed, not counted.
pub struct FreeText<R: Groupable> {
    /// Response field name
    pub name: &'static str,
    /// Field holding the text
    pub field: R::Field,
    /// Records kept before collecting
    pub filter: Option<fn(&R) -> bool>,
}

/// Whether a free-text answer means "nothing to report".
#[must_use]
pub fn is_blank_answer(text: &str) -> bool {
    let trimmed = text.trim();
    BLANK_ANSWERS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Collect the meaningful answers of a free-text field, joined with
/// [`FREE_TEXT_SEPARATOR`].
#[must_use]
pub fn collect_free_text<R: Groupable>(records: &[R], definition: &FreeText<R>) -> String {
    records
        .iter()
        .filter(|r| definition.filter.is_none_or(|filter| filter(r)))
        .filter_map(|r| r.key(definition.field))
        .filter(|text| !is_blank_answer(text))
        .map(|text| text.trim().to_string())
        .collect::<Vec<_>>()
        .join(FREE_TEXT_SEPARATOR)
}
