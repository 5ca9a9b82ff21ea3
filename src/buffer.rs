//! Limited chunk buffer implementations.

/// Default number of lines in a chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Buffer builder.
pub trait ChunkBufferBuilder<T: Ord>: Default {
    type Buffer: ChunkBuffer<T>;

    /// Creates a new buffer.
    fn build(&self) -> Self::Buffer;
}

/// Base limited buffer interface.
pub trait ChunkBuffer<T: Ord>: IntoIterator<Item = T> {
    /// Adds a new element to the buffer.
    fn push(&mut self, item: T);

    /// Returns buffer length
    fn len(&self) -> usize;

    /// Checks if the buffer reached the limit.
    fn is_full(&self) -> bool;

    /// Sorts buffered elements in ascending order. The sort is not guaranteed to be stable.
    fn sort(&mut self);
}

/// Builder of buffers limited by elements count.
#[derive(Clone)]
pub struct LimitedBufferBuilder {
    buffer_limit: usize,
    preallocate: bool,
}

impl LimitedBufferBuilder {
    pub fn new(buffer_limit: usize, preallocate: bool) -> Self {
        LimitedBufferBuilder {
            buffer_limit: buffer_limit.max(1),
            preallocate,
        }
    }
}

impl<T: Ord> ChunkBufferBuilder<T> for LimitedBufferBuilder {
    type Buffer = LimitedBuffer<T>;

    fn build(&self) -> Self::Buffer {
        if self.preallocate {
            LimitedBuffer::with_capacity(self.buffer_limit)
        } else {
            LimitedBuffer::new(self.buffer_limit)
        }
    }
}

impl Default for LimitedBufferBuilder {
    fn default() -> Self {
        LimitedBufferBuilder {
            buffer_limit: DEFAULT_CHUNK_SIZE,
            preallocate: false,
        }
    }
}

/// Buffer limited by elements count.
pub struct LimitedBuffer<T> {
    limit: usize,
    inner: Vec<T>,
}

impl<T> LimitedBuffer<T> {
    pub fn new(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::new(),
        }
    }

    pub fn with_capacity(limit: usize) -> Self {
        LimitedBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }
}

impl<T: Ord> ChunkBuffer<T> for LimitedBuffer<T> {
    fn push(&mut self, item: T) {
        self.inner.push(item);
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    fn sort(&mut self) {
        self.inner.sort_unstable();
    }
}

impl<T> IntoIterator for LimitedBuffer<T> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::{ChunkBuffer, ChunkBufferBuilder, LimitedBufferBuilder};
    use crate::Line;

    #[test]
    fn test_limited_buffer() {
        let builder = LimitedBufferBuilder::new(2, true);
        let mut buffer = builder.build();

        buffer.push(Line::from("b"));
        assert_eq!(buffer.is_full(), false);
        buffer.push(Line::from("a"));
        assert_eq!(buffer.is_full(), true);

        buffer.sort();
        let data = Vec::from_iter(buffer);
        assert_eq!(data, vec![Line::from("a"), Line::from("b")]);
    }

    #[test]
    fn test_default_limit() {
        let mut buffer = ChunkBufferBuilder::<u32>::build(&LimitedBufferBuilder::default());
        for item in 0..(super::DEFAULT_CHUNK_SIZE as u32 - 1) {
            buffer.push(item);
        }
        assert_eq!(buffer.is_full(), false);
        buffer.push(0);
        assert_eq!(buffer.is_full(), true);
    }

    #[test]
    fn test_zero_limit_holds_one_line() {
        let mut buffer = ChunkBufferBuilder::<Line>::build(&LimitedBufferBuilder::new(0, false));
        assert_eq!(buffer.is_full(), false);
        buffer.push(Line::from("x"));
        assert_eq!(buffer.is_full(), true);
    }
}

#[cfg(feature = "memory-limit")]
pub mod mem {
    use deepsize;

    use super::{ChunkBuffer, ChunkBufferBuilder};

    /// Builder of buffers limited by consumed memory.
    #[derive(Clone)]
    pub struct MemoryLimitedBufferBuilder {
        buffer_limit: u64,
    }

    impl MemoryLimitedBufferBuilder {
        pub fn new(buffer_limit: u64) -> Self {
            MemoryLimitedBufferBuilder { buffer_limit }
        }
    }

    impl<T: Ord> ChunkBufferBuilder<T> for MemoryLimitedBufferBuilder
    where
        T: deepsize::DeepSizeOf,
    {
        type Buffer = MemoryLimitedBuffer<T>;

        fn build(&self) -> Self::Buffer {
            MemoryLimitedBuffer::new(self.buffer_limit)
        }
    }

    impl Default for MemoryLimitedBufferBuilder {
        fn default() -> Self {
            MemoryLimitedBufferBuilder { buffer_limit: u64::MAX }
        }
    }

    /// Buffer limited by consumed memory.
    pub struct MemoryLimitedBuffer<T> {
        limit: u64,
        current_size: u64,
        inner: Vec<T>,
    }

    impl<T> MemoryLimitedBuffer<T> {
        pub fn new(limit: u64) -> Self {
            MemoryLimitedBuffer {
                limit,
                current_size: 0,
                inner: Vec::new(),
            }
        }

        pub fn mem_size(&self) -> u64 {
            self.current_size
        }
    }

    impl<T: Ord> ChunkBuffer<T> for MemoryLimitedBuffer<T>
    where
        T: deepsize::DeepSizeOf,
    {
        fn push(&mut self, item: T) {
            self.current_size += item.deep_size_of() as u64;
            self.inner.push(item);
        }

        fn len(&self) -> usize {
            self.inner.len()
        }

        fn is_full(&self) -> bool {
            self.current_size >= self.limit
        }

        fn sort(&mut self) {
            self.inner.sort_unstable();
        }
    }

    impl<T> IntoIterator for MemoryLimitedBuffer<T> {
        type Item = T;
        type IntoIter = <Vec<T> as IntoIterator>::IntoIter;

        fn into_iter(self) -> Self::IntoIter {
            self.inner.into_iter()
        }
    }

    #[cfg(test)]
    mod test {
        use std::io;
        use std::mem;

        use super::{ChunkBuffer, ChunkBufferBuilder, MemoryLimitedBufferBuilder};
        use crate::{Line, LineReader};

        #[test]
        fn test_memory_limited_buffer() {
            // struct itself + heap bytes of a 6 byte line
            let line_size = (mem::size_of::<Line>() + 6) as u64;

            let builder = MemoryLimitedBufferBuilder::new(2 * line_size);
            let mut buffer = builder.build();

            buffer.push(Line::from("world!"));
            assert_eq!(buffer.mem_size(), line_size);
            assert_eq!(buffer.is_full(), false);

            buffer.push(Line::from("hello!"));
            assert_eq!(buffer.mem_size(), 2 * line_size);
            assert_eq!(buffer.is_full(), true);

            buffer.sort();
            let actual_data = Vec::from_iter(buffer);
            let expected_data = vec![Line::from("hello!"), Line::from("world!")];
            assert_eq!(actual_data, expected_data);
        }

        #[test]
        fn test_read_lines_accounted_by_length() {
            let data = format!("{}\n{}\n", "a".repeat(300), "b".repeat(5));
            let mut reader = LineReader::new(io::BufReader::with_capacity(8, data.as_bytes()));
            let mut buffer = ChunkBufferBuilder::<Line>::build(&MemoryLimitedBufferBuilder::new(u64::MAX));

            while let Some(line) = reader.read_line().unwrap() {
                buffer.push(line);
            }

            assert_eq!(buffer.mem_size(), (2 * mem::size_of::<Line>() + 305) as u64);
        }
    }
}
