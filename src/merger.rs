//! Pairwise run merger.

use std::fs;
use std::io;
use std::io::prelude::*;

use log;

use crate::line::{buffered_reader, buffered_writer, write_line, LineReader};
use crate::sort::SortError;
use crate::workspace::TempWorkspace;

/// Merges two sorted line streams into `writer`.
///
/// Both inputs must be sorted in ascending byte-lexicographic order, otherwise the result is undefined.
/// As soon as one side is exhausted the rest of the other side is copied verbatim, without being split into lines.
pub fn merge_sorted<L, R, W>(left: LineReader<L>, right: LineReader<R>, writer: &mut W) -> io::Result<()>
where
    L: BufRead,
    R: BufRead,
    W: Write,
{
    let (mut left, mut right) = (left, right);
    let mut left_line = left.read_line()?;
    let mut right_line = right.read_line()?;

    while let (Some(l), Some(r)) = (&left_line, &right_line) {
        if l <= r {
            write_line(writer, l)?;
            left_line = left.read_line()?;
        } else {
            write_line(writer, r)?;
            right_line = right.read_line()?;
        }
    }

    if let Some(line) = left_line {
        write_line(writer, &line)?;
        io::copy(&mut left.into_inner(), writer)?;
    } else if let Some(line) = right_line {
        write_line(writer, &line)?;
        io::copy(&mut right.into_inner(), writer)?;
    }

    return Ok(());
}

/// Merges pairs of runs stored in a workspace.
///
/// Merging runs `left` and `right` produces a single run in slot `left` and frees slot `right`.
pub struct RunMerger<'a> {
    workspace: &'a TempWorkspace,
    rw_buf_size: Option<usize>,
}

impl<'a> RunMerger<'a> {
    pub fn new(workspace: &'a TempWorkspace, rw_buf_size: Option<usize>) -> Self {
        RunMerger { workspace, rw_buf_size }
    }

    /// Merges runs `left` and `right` (`left < right`) into slot `left`.
    pub fn merge(&self, left: usize, right: usize) -> Result<(), SortError> {
        debug_assert!(left < right, "merging slots out of order: {} {}", left, right);
        log::debug!("merging runs {} and {}", left, right);

        self.merge_into_pair(left, right).map_err(|err| {
            log::error!("runs {} and {} merging error: {}", left, right, err);
            SortError::Merge { left, right, source: err }
        })?;

        self.replace_pair(left, right).map_err(|err| {
            log::error!("runs {} and {} replacing error: {}", left, right, err);
            SortError::RunReplace { left, right, source: err }
        })
    }

    fn open_run(&self, slot: usize) -> io::Result<LineReader<io::BufReader<fs::File>>> {
        let run_file = fs::File::open(self.workspace.chunk_path(slot))?;
        return Ok(LineReader::new(buffered_reader(run_file, self.rw_buf_size)));
    }

    fn merge_into_pair(&self, left: usize, right: usize) -> io::Result<()> {
        let left_run = self.open_run(left)?;
        let right_run = self.open_run(right)?;

        let pair_file = fs::File::create(self.workspace.pair_path(left, right))?;
        let mut pair_writer = buffered_writer(pair_file, self.rw_buf_size);

        merge_sorted(left_run, right_run, &mut pair_writer)?;

        return pair_writer.flush();
    }

    // The merged file atomically takes the place of the left run before the right one is removed,
    // so slot `left` is never missing.
    fn replace_pair(&self, left: usize, right: usize) -> io::Result<()> {
        fs::rename(self.workspace.pair_path(left, right), self.workspace.chunk_path(left))?;
        fs::remove_file(self.workspace.chunk_path(right))
    }
}
