//! Derived statistics: relevant/covered line counts, branch unit counts and
//! the percentages computed from them.

use crate::model::{Branches, FileCoverage, FileStats, LineHits};

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `covered / total` as a rounded percentage, or `None` when `total` is zero.
#[must_use]
pub fn percent(covered: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(round2(covered as f64 / total as f64 * 100.0))
    }
}

/// Line tallies for one file, or summed over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub relevant: u64,
    pub covered: u64,
    pub missed: u64,
}

impl LineCounts {
    #[must_use]
    pub fn from_lines(lines: &[LineHits]) -> Self {
        let mut counts = Self::default();
        for hits in lines {
            if let LineHits::Relevant(n) = hits {
                counts.relevant += 1;
                if *n > 0 {
                    counts.covered += 1;
                } else {
                    counts.missed += 1;
                }
            }
        }
        counts
    }

    /// Zero relevant lines counts as fully covered.
    #[must_use]
    pub fn percent(&self) -> f64 {
        percent(self.covered, self.relevant).unwrap_or(100.0)
    }

    pub fn add(&mut self, other: LineCounts) {
        self.relevant += other.relevant;
        self.covered += other.covered;
        self.missed += other.missed;
    }
}

/// Branch tallies: every (condition, outcome) pair is one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchCounts {
    pub total: u64,
    pub covered: u64,
}

impl BranchCounts {
    #[must_use]
    pub fn from_branches(branches: Option<&Branches>) -> Self {
        let mut counts = Self::default();
        let Some(branches) = branches else {
            return counts;
        };
        for outcomes in branches.values() {
            for &hits in outcomes.values() {
                counts.total += 1;
                if hits > 0 {
                    counts.covered += 1;
                }
            }
        }
        counts
    }

    /// `None` means no branches were tracked, which is not the same as 0%.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        percent(self.covered, self.total)
    }

    pub fn add(&mut self, other: BranchCounts) {
        self.total += other.total;
        self.covered += other.covered;
    }
}

impl FileCoverage {
    #[must_use]
    pub fn line_counts(&self) -> LineCounts {
        LineCounts::from_lines(&self.lines)
    }

    #[must_use]
    pub fn branch_counts(&self) -> BranchCounts {
        BranchCounts::from_branches(self.branches.as_ref())
    }

    /// Statistics row for this file, labelled with `path`.
    #[must_use]
    pub fn stats(&self, path: &str) -> FileStats {
        let lines = self.line_counts();
        let branches = self.branch_counts();
        FileStats {
            file_path: path.to_string(),
            line_coverage: lines.percent(),
            branch_coverage: branches.percent(),
            total_lines: lines.relevant,
            covered_lines: lines.covered,
            missed_lines: lines.missed,
            total_branches: branches.total,
            covered_branches: branches.covered,
        }
    }
}

/// Sum line and branch tallies over a set of files.
///
/// Totals are summed before dividing, so large files weigh more than small
/// ones.
pub fn aggregate<'a, I>(files: I) -> (LineCounts, BranchCounts)
where
    I: IntoIterator<Item = &'a FileCoverage>,
{
    let mut lines = LineCounts::default();
    let mut branches = BranchCounts::default();
    for file in files {
        lines.add(file.line_counts());
        branches.add(file.branch_counts());
    }
    (lines, branches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchOutcomes, OrderedMap};
    use LineHits::{NotRelevant, Relevant};

    fn outcomes(pairs: &[(&str, u64)]) -> BranchOutcomes {
        pairs
            .iter()
            .map(|(label, hits)| (label.to_string(), *hits))
            .collect()
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(50.0), 50.0);
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(0, 0), None);
        assert_eq!(percent(1, 3), Some(33.33));
    }

    #[test]
    fn test_line_counts_two_of_three() {
        let cov = FileCoverage::new(vec![Relevant(1), Relevant(0), NotRelevant, Relevant(2)]);
        let counts = cov.line_counts();
        assert_eq!(
            counts,
            LineCounts {
                relevant: 3,
                covered: 2,
                missed: 1
            }
        );
        assert_eq!(counts.percent(), 66.67);
    }

    #[test]
    fn test_all_markers_is_full_coverage() {
        let cov = FileCoverage::new(vec![NotRelevant; 5]);
        assert_eq!(cov.line_counts().relevant, 0);
        assert_eq!(cov.stats("empty.rb").line_coverage, 100.0);
    }

    #[test]
    fn test_no_branches_is_absent_not_zero() {
        let cov = FileCoverage::new(vec![Relevant(1)]);
        let stats = cov.stats("a.rb");
        assert_eq!(stats.branch_coverage, None);
        assert_eq!(stats.total_branches, 0);
    }

    #[test]
    fn test_branch_counts() {
        let cov = FileCoverage::new(vec![Relevant(1)]).with_branches(OrderedMap(vec![
            (
                "[:if, 0, 2, 2, 6, 5]".to_string(),
                outcomes(&[("[:then, 1]", 3), ("[:else, 2]", 0)]),
            ),
            (
                "[:case, 3, 8, 2, 12, 5]".to_string(),
                outcomes(&[("[:when, 4]", 1), ("[:else, 5]", 1)]),
            ),
        ]));
        let counts = cov.branch_counts();
        assert_eq!(counts, BranchCounts { total: 4, covered: 3 });
        assert_eq!(counts.percent(), Some(75.0));
    }

    #[test]
    fn test_empty_branch_map_is_absent() {
        let cov = FileCoverage::new(vec![]).with_branches(OrderedMap::default());
        assert_eq!(cov.stats("a.rb").branch_coverage, None);
    }

    #[test]
    fn test_aggregate_sums_before_dividing() {
        // 1/1 and 1/3: averaging percentages would give 66.67, summing gives 50.
        let small = FileCoverage::new(vec![Relevant(1)]);
        let large = FileCoverage::new(vec![Relevant(1), Relevant(0), Relevant(0)]);
        let (lines, branches) = aggregate([&small, &large]);
        assert_eq!(lines.relevant, 4);
        assert_eq!(lines.covered, 2);
        assert_eq!(lines.percent(), 50.0);
        assert_eq!(branches.percent(), None);
    }
}
