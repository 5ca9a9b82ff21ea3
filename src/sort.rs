//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::chunk::ChunkBuilder;
use crate::line::{buffered_reader, Line, LineReader};
use crate::merger::RunMerger;
use crate::schedule::MergeScheduler;
use crate::workspace::TempWorkspace;
use crate::{ChunkBufferBuilder, LimitedBufferBuilder};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory creation error.
    TempDir(io::Error),
    /// Input file opening error.
    InputOpen { path: PathBuf, source: io::Error },
    /// Input data stream error.
    Input(io::Error),
    /// Run file creation or writing error.
    ChunkWrite { slot: usize, source: io::Error },
    /// Runs reading or merged run writing error.
    Merge { left: usize, right: usize, source: io::Error },
    /// Merged runs replacement (rename or removal) error.
    RunReplace { left: usize, right: usize, source: io::Error },
    /// Result file creation or relocation error.
    Output { path: PathBuf, source: io::Error },
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::TempDir(err) => err,
            SortError::InputOpen { source, .. } => source,
            SortError::Input(err) => err,
            SortError::ChunkWrite { source, .. } => source,
            SortError::Merge { source, .. } => source,
            SortError::RunReplace { source, .. } => source,
            SortError::Output { source, .. } => source,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory not created: {}", err),
            SortError::InputOpen { path, source } => {
                write!(f, "input file {} opening failed: {}", path.display(), source)
            }
            SortError::Input(err) => write!(f, "input data stream error: {}", err),
            SortError::ChunkWrite { slot, source } => write!(f, "chunk {} saving failed: {}", slot, source),
            SortError::Merge { left, right, source } => {
                write!(f, "runs {} and {} merging failed: {}", left, right, source)
            }
            SortError::RunReplace { left, right, source } => {
                write!(f, "runs {} and {} replacement failed: {}", left, right, source)
            }
            SortError::Output { path, source } => {
                write!(f, "result file {} saving failed: {}", path.display(), source)
            }
        }
    }
}

/// Sorting statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSummary {
    /// Number of sorted lines.
    pub lines: u64,
    /// Number of runs produced by the chunking phase.
    pub chunks: usize,
    /// Number of merge passes.
    pub passes: usize,
    /// Number of pairwise run merges.
    pub merges: usize,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder<B = LimitedBufferBuilder>
where
    B: ChunkBufferBuilder<Line>,
{
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Chunk buffer builder.
    buffer_builder: B,
    /// Keep temporary directory if sorting fails.
    keep_tmp_dir: bool,
}

impl<B> ExternalSorterBuilder<B>
where
    B: ChunkBufferBuilder<Line>,
{
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> ExternalSorter<B> {
        ExternalSorter::new(
            self.tmp_dir.as_deref(),
            self.buffer_builder,
            self.rw_buf_size,
            self.keep_tmp_dir,
        )
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder<B> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets buffer builder.
    pub fn with_buffer(mut self, buffer_builder: B) -> ExternalSorterBuilder<B> {
        self.buffer_builder = buffer_builder;
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder<B> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Keeps the temporary directory with all its runs if sorting fails.
    pub fn with_keep_tmp_dir(mut self, keep: bool) -> ExternalSorterBuilder<B> {
        self.keep_tmp_dir = keep;
        return self;
    }
}

impl<B> Default for ExternalSorterBuilder<B>
where
    B: ChunkBufferBuilder<Line>,
{
    fn default() -> Self {
        ExternalSorterBuilder {
            tmp_dir: None,
            rw_buf_size: None,
            buffer_builder: B::default(),
            keep_tmp_dir: false,
        }
    }
}

/// External sorter.
///
/// Every sort creates its own temporary workspace, so one sorter can be used for any number of sorts.
pub struct ExternalSorter<B = LimitedBufferBuilder>
where
    B: ChunkBufferBuilder<Line>,
{
    /// Directory the workspaces are created in.
    tmp_dir: Option<PathBuf>,
    /// Chunk buffer builder.
    buffer_builder: B,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Keep temporary directory if sorting fails.
    keep_tmp_dir: bool,
}

impl<B> ExternalSorter<B>
where
    B: ChunkBufferBuilder<Line>,
{
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `buffer_builder` - An instance of a buffer builder that will be used for chunk buffer creation.
    /// * `rw_buf_size` - Run files read/write buffer size.
    /// * `keep_tmp_dir` - Whether the temporary directory is left in place when sorting fails.
    pub fn new(tmp_path: Option<&Path>, buffer_builder: B, rw_buf_size: Option<usize>, keep_tmp_dir: bool) -> Self {
        ExternalSorter {
            tmp_dir: tmp_path.map(Path::to_path_buf),
            buffer_builder,
            rw_buf_size,
            keep_tmp_dir,
        }
    }

    /// Sorts lines of the input file and saves them to the output file, replacing it if it exists.
    ///
    /// # Arguments
    /// * `input` - File to be sorted
    /// * `output` - Result file path
    pub fn sort(&self, input: &Path, output: &Path) -> Result<SortSummary, SortError> {
        let input_file = fs::File::open(input).map_err(|err| {
            log::error!("input file {} opening error: {}", input.display(), err);
            SortError::InputOpen {
                path: input.to_path_buf(),
                source: err,
            }
        })?;

        self.sort_reader(input_file, output)
    }

    /// Sorts lines read from the input stream and saves them to the output file, replacing it if it exists.
    ///
    /// # Arguments
    /// * `input` - Input stream data to be fetched from
    /// * `output` - Result file path
    pub fn sort_reader<R: io::Read>(&self, input: R, output: &Path) -> Result<SortSummary, SortError> {
        let workspace = TempWorkspace::create(self.tmp_dir.as_deref()).map_err(|err| {
            log::error!("temporary directory creation error: {}", err);
            SortError::TempDir(err)
        })?;

        let result = self.sort_in(&workspace, input, output);

        if result.is_err() && self.keep_tmp_dir {
            let path = workspace.persist();
            log::warn!("temporary directory {} kept", path.display());
        }

        return result;
    }

    fn sort_in<R: io::Read>(
        &self,
        workspace: &TempWorkspace,
        input: R,
        output: &Path,
    ) -> Result<SortSummary, SortError> {
        let input = LineReader::new(buffered_reader(input, self.rw_buf_size));
        let chunks = ChunkBuilder::new(workspace, &self.buffer_builder, self.rw_buf_size).build(input)?;

        let mut summary = SortSummary {
            lines: chunks.lines,
            chunks: chunks.count,
            ..SortSummary::default()
        };

        if chunks.count == 0 {
            log::debug!("input is empty");
            fs::File::create(output).map_err(|err| Self::output_error(output, err))?;
            return Ok(summary);
        }

        let merges = MergeScheduler::new(RunMerger::new(workspace, self.rw_buf_size)).run(chunks.count)?;
        summary.passes = merges.passes;
        summary.merges = merges.merges;

        let result_path = workspace.chunk_path(0);
        if !chunks.terminated {
            log::debug!("input last line is unterminated, trimming the result terminator");
            trim_terminator(&result_path).map_err(|err| Self::output_error(output, err))?;
        }
        move_file(&result_path, output).map_err(|err| Self::output_error(output, err))?;

        log::info!(
            "{} lines sorted ({} chunks, {} merges in {} passes)",
            summary.lines,
            summary.chunks,
            summary.merges,
            summary.passes
        );

        return Ok(summary);
    }

    fn output_error(output: &Path, err: io::Error) -> SortError {
        log::error!("result file {} saving error: {}", output.display(), err);
        SortError::Output {
            path: output.to_path_buf(),
            source: err,
        }
    }
}

/// Drops the trailing line terminator of a run.
fn trim_terminator(path: &Path) -> io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path)?;
    let len = file.metadata()?.len();
    if len > 0 {
        file.set_len(len - 1)?;
    }

    return Ok(());
}

/// Moves a file replacing the destination. Falls back to copying if renaming is not possible,
/// for example when the destination is located on another file system.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(err) = fs::rename(from, to) {
        log::debug!("renaming {} failed ({}), copying", from.display(), err);
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }

    return Ok(());
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;
    use std::path::Path;

    use rand::distributions::{Alphanumeric, DistString};
    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{ExternalSorter, ExternalSorterBuilder, LimitedBufferBuilder, SortError, SortSummary};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn sorter(tmp_dir: &Path, chunk_size: usize) -> ExternalSorter {
        ExternalSorterBuilder::new()
            .with_buffer(LimitedBufferBuilder::new(chunk_size, true))
            .with_tmp_dir(tmp_dir)
            .build()
    }

    #[rstest]
    fn test_concrete_scenario(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "banana\napple\ncherry\napple").unwrap();

        let summary = sorter(tmp_dir.path(), 2).sort(&input, &output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "apple\napple\nbanana\ncherry");
        assert_eq!(
            summary,
            SortSummary {
                lines: 4,
                chunks: 2,
                passes: 1,
                merges: 1
            }
        );
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 1, 0)]
    #[case(4, 1, 0)]
    #[case(5, 2, 1)]
    #[case(8, 2, 1)]
    #[case(9, 3, 2)]
    #[case(20, 5, 4)]
    #[case(28, 7, 6)]
    #[case(29, 8, 7)]
    fn test_chunk_counts(
        tmp_dir: tempfile::TempDir,
        #[case] lines: usize,
        #[case] expected_chunks: usize,
        #[case] expected_merges: usize,
    ) {
        let mut input_lines: Vec<String> = (0..lines).map(|i| format!("line-{:03}", i)).collect();
        let expected = input_lines.join("\n");
        input_lines.shuffle(&mut rand::thread_rng());

        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, input_lines.join("\n")).unwrap();

        let summary = sorter(tmp_dir.path(), 4).sort(&input, &output).unwrap();

        assert_eq!(summary.lines, lines as u64);
        assert_eq!(summary.chunks, expected_chunks);
        assert_eq!(summary.merges, expected_merges);
        assert_eq!(fs::read_to_string(&output).unwrap(), expected);
    }

    #[rstest]
    fn test_empty_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "").unwrap();
        fs::write(&output, "stale\n").unwrap();

        let summary = sorter(tmp_dir.path(), 4).sort(&input, &output).unwrap();

        assert_eq!(summary, SortSummary::default());
        assert_eq!(fs::read(&output).unwrap(), b"");
    }

    #[rstest]
    #[case("\n")]
    #[case("")]
    fn test_sorted_input_is_unchanged(tmp_dir: tempfile::TempDir, #[case] last_terminator: &str) {
        let mut data = (0..50).map(|i| format!("{:02}", i)).collect::<Vec<_>>().join("\n");
        data.push_str(last_terminator);
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, &data).unwrap();

        sorter(tmp_dir.path(), 7).sort(&input, &output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), data);
    }

    #[rstest]
    fn test_output_overwritten(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input.txt");
        let output = tmp_dir.path().join("output.txt");
        fs::write(&input, "b\na\nc\n").unwrap();
        fs::write(&output, "a much longer previous content\n").unwrap();

        sorter(tmp_dir.path(), 1).sort(&input, &output).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\nc\n");
    }

    #[rstest]
    #[case(1)]
    #[case(10)]
    #[case(97)]
    #[case(1000)]
    fn test_random_input(tmp_dir: tempfile::TempDir, #[case] chunk_size: usize) {
        let mut rng = rand::thread_rng();
        let mut expected: Vec<Vec<u8>> = (0..2003)
            .map(|_| {
                let len = rng.gen_range(0..24);
                Alphanumeric.sample_string(&mut rng, len).into_bytes()
            })
            .collect();

        let mut data = expected.join(&b'\n');
        data.push(b'\n');
        expected.sort();

        let output = tmp_dir.path().join("output.txt");
        let summary = sorter(tmp_dir.path(), chunk_size).sort_reader(&data[..], &output).unwrap();
        assert_eq!(summary.lines, 2003);
        assert_eq!(summary.chunks, (2003 + chunk_size - 1) / chunk_size);

        let actual = fs::read(&output).unwrap();
        assert_eq!(actual.len(), data.len());

        let mut actual_lines: Vec<&[u8]> = actual.split(|&b| b == b'\n').collect();
        assert_eq!(actual_lines.pop(), Some(&b""[..]));
        assert_eq!(actual_lines, expected.iter().map(Vec::as_slice).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_binary_lines(tmp_dir: tempfile::TempDir) {
        let output = tmp_dir.path().join("output.txt");
        let data: &[u8] = b"\xff\x00\n\x7f\n\x80abc\n\x00";

        sorter(tmp_dir.path(), 2).sort_reader(data, &output).unwrap();

        assert_eq!(fs::read(&output).unwrap(), b"\x00\n\x7f\n\x80abc\n\xff\x00");
    }

    #[rstest]
    fn test_missing_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("missing.txt");
        let output = tmp_dir.path().join("output.txt");

        let result = sorter(tmp_dir.path(), 2).sort(&input, &output);

        assert!(matches!(result, Err(SortError::InputOpen { ref path, .. }) if path == &input));
        assert!(!output.exists());
    }

    #[rstest]
    fn test_missing_tmp_dir(tmp_dir: tempfile::TempDir) {
        let output = tmp_dir.path().join("output.txt");

        let result = sorter(&tmp_dir.path().join("missing"), 2).sort_reader(&b"a\n"[..], &output);

        assert!(matches!(result, Err(SortError::TempDir(_))));
    }

    struct FailingReader {
        data: &'static [u8],
    }

    impl io::Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return Err(io::Error::new(io::ErrorKind::Other, "test error"));
            }
            let len = buf.len().min(self.data.len());
            buf[..len].copy_from_slice(&self.data[..len]);
            self.data = &self.data[len..];
            Ok(len)
        }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_failed_sort_tmp_dir(tmp_dir: tempfile::TempDir, #[case] keep: bool) {
        let output = tmp_dir.path().join("output.txt");
        let sorter: ExternalSorter = ExternalSorterBuilder::new()
            .with_buffer(LimitedBufferBuilder::new(1, false))
            .with_tmp_dir(tmp_dir.path())
            .with_keep_tmp_dir(keep)
            .build();

        let result = sorter.sort_reader(FailingReader { data: b"b\na\n" }, &output);
        assert!(matches!(result, Err(SortError::Input(_))));
        assert!(!output.exists());

        let workspaces: Vec<_> = fs::read_dir(tmp_dir.path()).unwrap().map(Result::unwrap).collect();
        if keep {
            assert_eq!(workspaces.len(), 1);
            assert!(workspaces[0].path().join("0.txt").exists());
            assert!(workspaces[0].path().join("1.txt").exists());
        } else {
            assert!(workspaces.is_empty());
        }
    }

    #[rstest]
    fn test_sorter_reusable(tmp_dir: tempfile::TempDir) {
        let sorter = sorter(tmp_dir.path(), 2);
        let first = tmp_dir.path().join("first.txt");
        let second = tmp_dir.path().join("second.txt");

        sorter.sort_reader(&b"c\nb\na\n"[..], &first).unwrap();
        sorter.sort_reader(&b"z\ny\n"[..], &second).unwrap();

        assert_eq!(fs::read_to_string(&first).unwrap(), "a\nb\nc\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "y\nz\n");
        assert_eq!(fs::read_dir(tmp_dir.path()).unwrap().count(), 2);
    }
}
