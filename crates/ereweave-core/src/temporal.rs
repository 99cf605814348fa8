//! # Temporal Matching
//!
//! Partial dates, time windows and the staged relaxation levels used when a
//! query variable carries a temporal constraint.
//!
//! A partial date stands for the range of instants it could denote:
//! `{year: 2020}` covers 2020-01-01 00:00 through 2020-12-31 23:59.
//! Two windows match when those ranges overlap.

use crate::graph::Graph;
use crate::{Triple, predicates};
use serde::{Deserialize, Deserializer, Serialize};

/// (year, month, day, hour, minute) with every part filled.
type Instant = (i32, u32, u32, u32, u32);

// =============================================================================
// DATE POINT
// =============================================================================

/// A date with any subset of its parts known.
///
/// Parts deserialize from either strings (`"2020"`) or integers (`2020`).
/// Non-numeric strings such as `"xxxx"` count as unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePoint {
    #[serde(default, deserialize_with = "de_part", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "de_part", skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, deserialize_with = "de_part", skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, deserialize_with = "de_part", skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, deserialize_with = "de_part", skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPart {
    Int(i64),
    Text(String),
}

fn de_part<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = Option::<RawPart>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let value = match raw {
            RawPart::Int(v) => v,
            RawPart::Text(s) => s.trim().trim_start_matches('-').parse::<i64>().ok()?,
        };
        T::try_from(value).ok()
    }))
}

impl DatePoint {
    /// Date with only the year known.
    #[must_use]
    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    /// Date with year, month and day known.
    #[must_use]
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Self::default()
        }
    }

    /// True if no part is known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.year.is_none()
            && self.month.is_none()
            && self.day.is_none()
            && self.hour.is_none()
            && self.minute.is_none()
    }

    /// Only the year survives.
    #[must_use]
    pub fn coarsen_to_year(self) -> Self {
        Self {
            year: self.year,
            ..Self::default()
        }
    }

    /// Earliest instant this date may denote; `None` without a year.
    fn earliest(&self) -> Option<Instant> {
        let year = self.year?;
        Some((
            year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
        ))
    }

    /// Latest instant this date may denote; `None` without a year.
    fn latest(&self) -> Option<Instant> {
        let year = self.year?;
        Some((
            year,
            self.month.unwrap_or(12),
            self.day.unwrap_or(31),
            self.hour.unwrap_or(23),
            self.minute.unwrap_or(59),
        ))
    }

    /// Triples describing this date on node `label`.
    fn to_triples(self, label: &str) -> Vec<Triple> {
        let parts = [
            (predicates::YEAR, self.year.map(i64::from)),
            (predicates::MONTH, self.month.map(i64::from)),
            (predicates::DAY, self.day.map(i64::from)),
            (predicates::HOUR, self.hour.map(i64::from)),
            (predicates::MINUTE, self.minute.map(i64::from)),
        ];
        parts
            .into_iter()
            .filter_map(|(p, v)| v.map(|v| Triple::new(label, p, v.to_string())))
            .collect()
    }

    fn from_graph(graph: &Graph, label: &str) -> Self {
        let Some(node) = graph.node(label) else {
            return Self::default();
        };
        let part = |p: &str| node.first_value(p).and_then(|v| v.parse::<i64>().ok());
        Self {
            year: part(predicates::YEAR).and_then(|v| i32::try_from(v).ok()),
            month: part(predicates::MONTH).and_then(|v| u32::try_from(v).ok()),
            day: part(predicates::DAY).and_then(|v| u32::try_from(v).ok()),
            hour: part(predicates::HOUR).and_then(|v| u32::try_from(v).ok()),
            minute: part(predicates::MINUTE).and_then(|v| u32::try_from(v).ok()),
        }
    }
}

// =============================================================================
// TIME WINDOW
// =============================================================================

/// A query window or an ERE's dated extent.
///
/// In a query both bounds are independent: a missing start is open to the
/// past, a missing end open to the future. On an ERE a single known bound is
/// read as a point date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default, alias = "start_time", skip_serializing_if = "Option::is_none")]
    pub start: Option<DatePoint>,
    #[serde(default, alias = "end_time", skip_serializing_if = "Option::is_none")]
    pub end: Option<DatePoint>,
}

impl TimeWindow {
    /// Window from optional bounds; unknown dates are dropped.
    #[must_use]
    pub fn new(start: Option<DatePoint>, end: Option<DatePoint>) -> Self {
        Self {
            start: start.filter(|d| !d.is_unknown()),
            end: end.filter(|d| !d.is_unknown()),
        }
    }

    /// Window covering exactly one (partial) date.
    #[must_use]
    pub fn point(date: DatePoint) -> Self {
        Self::new(Some(date), Some(date))
    }

    /// True if neither bound carries a year.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.start.and_then(|d| d.year).is_none() && self.end.and_then(|d| d.year).is_none()
    }

    fn coarsen_to_year(self) -> Self {
        Self {
            start: self.start.map(DatePoint::coarsen_to_year),
            end: self.end.map(DatePoint::coarsen_to_year),
        }
    }

    /// Query reading: independent bounds.
    fn as_query_range(&self) -> (Option<Instant>, Option<Instant>) {
        (
            self.start.and_then(|d| d.earliest()),
            self.end.and_then(|d| d.latest()),
        )
    }

    /// ERE reading: a lone bound is a point date.
    fn as_ere_range(&self) -> (Option<Instant>, Option<Instant>) {
        let lo = self.start.or(self.end).and_then(|d| d.earliest());
        let hi = self.end.or(self.start).and_then(|d| d.latest());
        (lo, hi)
    }

    /// Triples hanging this window off `owner` through an `ldcTime` node.
    #[must_use]
    pub fn to_triples(&self, owner: &str, index: usize) -> Vec<Triple> {
        let time = format!("{owner}#time{index}");
        let mut triples = vec![Triple::new(owner, predicates::LDC_TIME, time.as_str())];
        for (predicate, date) in [(predicates::START, self.start), (predicates::END, self.end)] {
            if let Some(date) = date {
                let node = format!("{time}-{predicate}");
                triples.push(Triple::new(time.as_str(), predicate, node.as_str()));
                triples.extend(date.to_triples(&node));
            }
        }
        triples
    }
}

fn ranges_overlap(
    (a_lo, a_hi): (Option<Instant>, Option<Instant>),
    (b_lo, b_hi): (Option<Instant>, Option<Instant>),
) -> bool {
    let lower_ok = match (a_lo, b_hi) {
        (Some(lo), Some(hi)) => lo <= hi,
        _ => true,
    };
    let upper_ok = match (b_lo, a_hi) {
        (Some(lo), Some(hi)) => lo <= hi,
        _ => true,
    };
    lower_ok && upper_ok
}

/// Dated extents attached to an ERE through `ldcTime` nodes.
#[must_use]
pub fn ere_time_windows(graph: &Graph, ere: &str) -> Vec<TimeWindow> {
    let Some(node) = graph.node(ere) else {
        return Vec::new();
    };
    node.values(predicates::LDC_TIME)
        .filter_map(|time| {
            let time_node = graph.node(time)?;
            let bound = |p: &str| time_node.first_value(p).map(|d| DatePoint::from_graph(graph, d));
            let window = TimeWindow::new(bound(predicates::START), bound(predicates::END));
            (!window.is_unbounded()).then_some(window)
        })
        .collect()
}

// =============================================================================
// LEEWAY
// =============================================================================

/// Relaxation level for temporal matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Leeway {
    /// Compare at every granularity both sides specify.
    Exact,
    /// Compare years only.
    Year,
    /// Temporal constraint ignored.
    Unconstrained,
}

impl Leeway {
    /// Levels in escalation order.
    pub const ALL: [Leeway; 3] = [Leeway::Exact, Leeway::Year, Leeway::Unconstrained];

    /// Number of escalations needed to reach this level.
    #[must_use]
    pub fn steps(self) -> u32 {
        match self {
            Self::Exact => 0,
            Self::Year => 1,
            Self::Unconstrained => 2,
        }
    }
}

/// True if an ERE with `ere_windows` satisfies `window` at `leeway`.
///
/// EREs without any dated extent are not date-bearing and always match.
/// With several extents, one matching extent suffices.
#[must_use]
pub fn window_matches(window: &TimeWindow, ere_windows: &[TimeWindow], leeway: Leeway) -> bool {
    if ere_windows.is_empty() || window.is_unbounded() {
        return true;
    }
    match leeway {
        Leeway::Unconstrained => true,
        Leeway::Exact => ere_windows
            .iter()
            .any(|ere| ranges_overlap(window.as_query_range(), ere.as_ere_range())),
        Leeway::Year => {
            let coarse = window.coarsen_to_year();
            ere_windows.iter().any(|ere| {
                ranges_overlap(coarse.as_query_range(), ere.coarsen_to_year().as_ere_range())
            })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
