//! Running counters for one export run.
//!
//! Owned by the export worker and passed by `&mut`; nothing else touches it.

use crate::output::ExportProgress;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunAccumulator {
    retrieved_records: usize,
    remaining_records: usize,
    processed_records: usize,
    excluded_records: usize,
    success_count: usize,
    failure_count: usize,
}

impl RunAccumulator {
    pub fn new(total_records: usize) -> Self {
        Self {
            retrieved_records: total_records,
            remaining_records: total_records,
            ..Default::default()
        }
    }

    /// A record yielded no pages: it leaves the denominator and counts as one failure.
    pub fn exclude_record(&mut self) {
        self.remaining_records = self.remaining_records.saturating_sub(1);
        self.excluded_records += 1;
        self.failure_count += 1;
    }

    /// Count one output unit.
    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }

    /// Mark the current record as fully processed.
    pub fn finish_record(&mut self) {
        self.processed_records += 1;
    }

    /// `processed / max(remaining, 1) * 100`, clamped to `[0, 100]`.
    pub fn percentage(&self, processed: usize) -> u8 {
        if processed == 0 {
            return 0;
        }
        let denominator = self.remaining_records.max(1) as u128;
        let pct = (processed as u128 * 100) / denominator;
        pct.min(100) as u8
    }

    pub fn snapshot(&self) -> ExportProgress {
        ExportProgress {
            processed: self.processed_records,
            total: self.remaining_records,
            success_count: self.success_count,
            failure_count: self.failure_count,
            percentage: self.percentage(self.processed_records),
        }
    }

    pub fn retrieved_records(&self) -> usize {
        self.retrieved_records
    }

    pub fn remaining_records(&self) -> usize {
        self.remaining_records
    }

    pub fn processed_records(&self) -> usize {
        self.processed_records
    }

    pub fn excluded_records(&self) -> usize {
        self.excluded_records
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_shrinks_denominator_and_counts_failure() {
        let mut acc = RunAccumulator::new(3);
        acc.exclude_record();
        assert_eq!(acc.remaining_records(), 2);
        assert_eq!(acc.failure_count(), 1);
        assert_eq!(acc.excluded_records(), 1);
        assert_eq!(acc.success_count(), 0);
        assert_eq!(acc.retrieved_records(), 3);
    }

    #[test]
    fn outcomes_hit_matching_counter() {
        let mut acc = RunAccumulator::new(1);
        acc.record_outcome(true);
        acc.record_outcome(true);
        acc.record_outcome(false);
        assert_eq!(acc.success_count(), 2);
        assert_eq!(acc.failure_count(), 1);
    }

    #[test]
    fn percentage_tracks_shrinking_denominator() {
        let mut acc = RunAccumulator::new(4);
        acc.finish_record();
        assert_eq!(acc.percentage(acc.processed_records()), 25);
        acc.exclude_record();
        assert_eq!(acc.percentage(acc.processed_records()), 33);
        acc.finish_record();
        acc.finish_record();
        assert_eq!(acc.percentage(acc.processed_records()), 100);
    }

    #[test]
    fn percentage_is_safe_with_zero_denominator() {
        let mut acc = RunAccumulator::new(1);
        acc.exclude_record();
        assert_eq!(acc.remaining_records(), 0);
        assert_eq!(acc.percentage(0), 0);
        assert_eq!(acc.percentage(5), 100);

        let empty = RunAccumulator::new(0);
        assert_eq!(empty.percentage(0), 0);
    }

    #[test]
    fn exclusion_never_underflows() {
        let mut acc = RunAccumulator::new(0);
        acc.exclude_record();
        assert_eq!(acc.remaining_records(), 0);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let mut acc = RunAccumulator::new(2);
        acc.record_outcome(true);
        acc.finish_record();
        let snap = acc.snapshot();
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.total, 2);
        assert_eq!(snap.success_count, 1);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.percentage, 50);
    }
}
