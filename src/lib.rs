//! `ext-merge-sort` sorts line-oriented text files that do not fit into memory.
//!
//! External sorting is required when the data being sorted do not fit into the main memory (RAM) of a computer
//! and instead must be resided in slower external memory, usually a hard disk drive. The input is split into
//! chunks that fit in RAM, every chunk is sorted and saved to a temporary file (a *run*), then runs are merged
//! pairwise, pass after pass, until a single sorted run is left. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Byte ordering:**
//!   lines are compared byte-lexicographically, no locale or numeric collation is applied.
//! * **Bounded memory:**
//!   chunks are limited by line count (1000 lines by default) or, with the `memory-limit` feature,
//!   by consumed memory.
//! * **Bounded file handles:**
//!   a merge never opens more than three files at once.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_merge_sort::{ExternalSorter, ExternalSorterBuilder, LimitedBufferBuilder};
//!
//! fn main() {
//!     let sorter: ExternalSorter = ExternalSorterBuilder::new()
//!         .with_tmp_dir(Path::new("./"))
//!         .with_buffer(LimitedBufferBuilder::new(100_000, true))
//!         .build();
//!
//!     let summary = sorter.sort(Path::new("input.txt"), Path::new("output.txt")).unwrap();
//!     println!("{} lines sorted", summary.lines);
//! }
//! ```

pub mod buffer;
pub mod chunk;
#[cfg(any(test, feature = "rand"))]
pub mod generator;
pub mod line;
pub mod merger;
pub mod schedule;
pub mod sort;
pub mod workspace;

pub use buffer::{ChunkBuffer, ChunkBufferBuilder, LimitedBuffer, LimitedBufferBuilder};
pub use chunk::{ChunkBuilder, Chunks};
pub use line::{Line, LineReader};
pub use merger::RunMerger;
pub use schedule::{MergeSchedule, MergeScheduler, MergeStep, MergeSummary};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};
pub use workspace::TempWorkspace;
