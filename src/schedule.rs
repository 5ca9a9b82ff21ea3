//! Bottom-up merge schedule.
//!
//! Runs are reduced the way an array is sorted by iterative merge sort: during a pass with run size `s`
//! the run in slot `left` (a multiple of `2s`) absorbs the run in slot `left + s`. A slot without a partner
//! is skipped and picked up by a later pass, so any number of runs ends up as a single run in slot 0.

use std::cmp;

use log;

use crate::merger::RunMerger;
use crate::sort::SortError;

/// A single merge of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    /// Zero-based pass number.
    pub pass: usize,
    /// Slot receiving the merged run.
    pub left: usize,
    /// Slot freed by the merge.
    pub right: usize,
}

/// Iterator over the merges required to reduce `chunks_cnt` runs to one.
#[derive(Debug, Clone)]
pub struct MergeSchedule {
    chunks_cnt: usize,
    cur_size: usize,
    left: usize,
    pass: usize,
}

impl MergeSchedule {
    pub fn new(chunks_cnt: usize) -> Self {
        MergeSchedule {
            chunks_cnt,
            cur_size: 1,
            left: 0,
            pass: 0,
        }
    }
}

impl Iterator for MergeSchedule {
    type Item = MergeStep;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cur_size < self.chunks_cnt {
            if self.left >= self.chunks_cnt {
                self.cur_size *= 2;
                self.left = 0;
                self.pass += 1;
                continue;
            }

            let left = self.left;
            self.left += self.cur_size * 2;

            let right = cmp::min(left + self.cur_size, self.chunks_cnt - 1);
            if right - left < self.cur_size {
                continue;
            }

            return Some(MergeStep {
                pass: self.pass,
                left,
                right,
            });
        }

        None
    }
}

/// Merge phase statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub passes: usize,
    pub merges: usize,
}

/// Executes a [`MergeSchedule`] over runs stored in a workspace.
pub struct MergeScheduler<'a> {
    merger: RunMerger<'a>,
}

impl<'a> MergeScheduler<'a> {
    pub fn new(merger: RunMerger<'a>) -> Self {
        MergeScheduler { merger }
    }

    /// Merges runs `0..chunks_cnt` until only slot 0 is left.
    pub fn run(&self, chunks_cnt: usize) -> Result<MergeSummary, SortError> {
        let mut summary = MergeSummary::default();

        for step in MergeSchedule::new(chunks_cnt) {
            if step.pass >= summary.passes {
                log::debug!("merge pass {} (run size: {})", step.pass, 1usize << step.pass);
                summary.passes = step.pass + 1;
            }

            self.merger.merge(step.left, step.right)?;
            summary.merges += 1;
        }

        log::debug!("{} runs merged in {} passes", chunks_cnt, summary.passes);

        return Ok(summary);
    }
}
