//! In-memory representation of SimpleCov results, plus the value types
//! returned by queries. Input types mirror the `.resultset.json` and
//! `.last_run.json` layouts; output types serialize with the camelCase keys
//! clients of the query tools expect.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Hit count of a single source line.
///
/// SimpleCov writes `null` for lines it does not track (blank lines,
/// comments, `end`). Keeping that apart from a count of zero is what makes
/// the relevant/missed distinction possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHits {
    Relevant(u64),
    NotRelevant,
}

impl LineHits {
    /// Combine observations of the same line from two suites.
    ///
    /// A count on either side survives a marker on the other; two counts add
    /// up, saturating at `u64::MAX`.
    #[must_use]
    pub fn combine(self, other: LineHits) -> LineHits {
        match (self, other) {
            (LineHits::Relevant(a), LineHits::Relevant(b)) => {
                LineHits::Relevant(a.saturating_add(b))
            }
            (LineHits::Relevant(a), LineHits::NotRelevant) => LineHits::Relevant(a),
            (LineHits::NotRelevant, LineHits::Relevant(b)) => LineHits::Relevant(b),
            (LineHits::NotRelevant, LineHits::NotRelevant) => LineHits::NotRelevant,
        }
    }

    #[must_use]
    pub fn count(self) -> Option<u64> {
        match self {
            LineHits::Relevant(n) => Some(n),
            LineHits::NotRelevant => None,
        }
    }

    #[must_use]
    pub fn is_relevant(self) -> bool {
        matches!(self, LineHits::Relevant(_))
    }
}

impl Serialize for LineHits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LineHits::Relevant(n) => serializer.serialize_u64(*n),
            LineHits::NotRelevant => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for LineHits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<u64>::deserialize(deserializer)? {
            Some(n) => LineHits::Relevant(n),
            None => LineHits::NotRelevant,
        })
    }
}

/// A JSON object kept in document order.
///
/// Suite order decides which suite's branch data is kept for a file, and
/// branch conditions are reported in the order SimpleCov wrote them, so a
/// sorted or hashed map would lose information.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Walks a JSON object key by key, keeping entries in the order they appear.
struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let value: V = map.next_value()?;
            // A repeated key keeps its first position and its last value.
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => *existing = value,
                None => entries.push((key, value)),
            }
        }
        Ok(OrderedMap(entries))
    }
}

/// Branch outcome label → hit count, e.g. `"[:then, 1, 12, 6, 12, 20]" → 3`.
pub type BranchOutcomes = OrderedMap<u64>;

/// Condition identifier → its outcomes.
pub type Branches = OrderedMap<BranchOutcomes>;

/// Coverage data for a single source file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileCoverage {
    /// One entry per source line; index 0 is line 1.
    pub lines: Vec<LineHits>,
    /// Absent when branch coverage was not enabled for the run.
    #[serde(default)]
    pub branches: Option<Branches>,
}

impl FileCoverage {
    pub fn new(lines: Vec<LineHits>) -> Self {
        Self {
            lines,
            branches: None,
        }
    }

    #[must_use]
    pub fn with_branches(mut self, branches: Branches) -> Self {
        self.branches = Some(branches);
        self
    }
}

/// One suite's entry in `.resultset.json`. SimpleCov also writes a
/// `timestamp`, which is not needed here.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteReport {
    pub coverage: OrderedMap<FileCoverage>,
}

/// The whole of `.resultset.json`: suite name (e.g. "RSpec") → report.
pub type RawSuiteReport = OrderedMap<SuiteReport>;

/// Aggregate percentages recorded by the last SimpleCov run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastRunResult {
    #[serde(serialize_with = "serialize_percent")]
    pub line: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_percent"
    )]
    pub branch: Option<f64>,
}

/// Layout of `.last_run.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct LastRun {
    pub result: LastRunResult,
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// Whole percentages are written as integers (`80`, not `80.0`).
fn serialize_percent<S: Serializer>(
    value: &f64,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if value.fract() == 0.0 && value.abs() < EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_opt_percent<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_percent(v, serializer),
        None => serializer.serialize_none(),
    }
}

/// Freshly computed totals across every file in the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedCoverage {
    #[serde(serialize_with = "serialize_percent")]
    pub line_coverage: f64,
    #[serde(serialize_with = "serialize_opt_percent")]
    pub branch_coverage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    /// Taken verbatim from `.last_run.json`, never recomputed.
    pub last_run: Option<LastRunResult>,
    pub total_files: usize,
    pub computed: ComputedCoverage,
}

/// Per-file statistics row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub file_path: String,
    #[serde(serialize_with = "serialize_percent")]
    pub line_coverage: f64,
    /// `None` when the file has no tracked branches.
    #[serde(serialize_with = "serialize_opt_percent")]
    pub branch_coverage: Option<f64>,
    pub total_lines: u64,
    pub covered_lines: u64,
    pub missed_lines: u64,
    pub total_branches: u64,
    pub covered_branches: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDetail {
    pub line_number: usize,
    pub hits: LineHits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOutcome {
    pub label: String,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchCondition {
    pub condition: String,
    pub branches: Vec<BranchOutcome>,
}

/// Full per-line and per-branch breakdown of a resolved file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    #[serde(flatten)]
    pub stats: FileStats,
    pub lines: Vec<LineDetail>,
    /// Relevant lines with exactly zero hits, ascending.
    pub uncovered_line_numbers: Vec<usize>,
    pub branches: Vec<BranchCondition>,
}

impl FileDetail {
    /// Outcomes that were never taken, in condition order.
    #[must_use]
    pub fn uncovered_branches(&self) -> Vec<UncoveredBranch> {
        self.branches
            .iter()
            .flat_map(|cond| {
                cond.branches
                    .iter()
                    .filter(|b| b.hits == 0)
                    .map(|b| UncoveredBranch {
                        condition: cond.condition.clone(),
                        branch: b.label.clone(),
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredBranch {
    pub condition: String,
    pub branch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredLines {
    pub file_path: String,
    #[serde(serialize_with = "serialize_percent")]
    pub line_coverage: f64,
    pub uncovered_line_numbers: Vec<usize>,
    pub uncovered_branches: Vec<UncoveredBranch>,
}
