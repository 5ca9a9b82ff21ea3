//! Owned text lines and line-oriented I/O helpers.

use std::fmt;
use std::io;
use std::io::prelude::*;

/// Line terminator byte. Never part of a [`Line`].
pub const LINE_TERMINATOR: u8 = b'\n';

/// A single line of text without its terminator.
///
/// Lines are compared byte-lexicographically: a line that is a strict prefix of another sorts first.
/// A `Line` always owns its bytes, it is never a view into a reader's internal buffer, so retained
/// lines stay valid no matter how the reader reuses its storage afterwards.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "memory-limit", derive(deepsize::DeepSizeOf))]
pub struct Line(Vec<u8>);

impl Line {
    /// Creates a line from raw bytes. The bytes must not contain [`LINE_TERMINATOR`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        debug_assert!(!bytes.contains(&LINE_TERMINATOR), "line contains a terminator");
        Line(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s.as_bytes())
    }
}

impl From<Vec<u8>> for Line {
    fn from(bytes: Vec<u8>) -> Self {
        Line::new(bytes)
    }
}

impl AsRef<[u8]> for Line {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

/// Streaming line reader.
///
/// Splits the underlying stream on [`LINE_TERMINATOR`]. The last line may omit the terminator.
/// An empty line in the middle of the stream is returned as an empty [`Line`], end of stream as `None`.
pub struct LineReader<R> {
    reader: R,
    terminated: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        LineReader {
            reader,
            terminated: true,
        }
    }

    /// Reads the next line into freshly allocated storage sized to the line.
    pub fn read_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        if self.reader.read_until(LINE_TERMINATOR, &mut buf)? == 0 {
            return Ok(None);
        }

        self.terminated = buf.last() == Some(&LINE_TERMINATOR);
        if self.terminated {
            buf.pop();
        }
        buf.shrink_to_fit();

        return Ok(Some(Line(buf)));
    }

    /// Checks if the last line read was followed by a terminator. True if nothing was read.
    pub fn last_line_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns the underlying reader positioned right after the last line read.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}

/// Writes a line followed by the terminator.
pub fn write_line<W: Write>(writer: &mut W, line: &Line) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(&[LINE_TERMINATOR])
}

/// Wraps a reader into a [`io::BufReader`] with an optional explicit capacity.
pub(crate) fn buffered_reader<R: Read>(reader: R, buf_size: Option<usize>) -> io::BufReader<R> {
    match buf_size {
        Some(buf_size) => io::BufReader::with_capacity(buf_size, reader),
        None => io::BufReader::new(reader),
    }
}

/// Wraps a writer into a [`io::BufWriter`] with an optional explicit capacity.
pub(crate) fn buffered_writer<W: Write>(writer: W, buf_size: Option<usize>) -> io::BufWriter<W> {
    match buf_size {
        Some(buf_size) => io::BufWriter::with_capacity(buf_size, writer),
        None => io::BufWriter::new(writer),
    }
}
