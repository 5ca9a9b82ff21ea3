use std::fs;
use std::io;
use std::io::prelude::*;

use log;

use crate::line::{buffered_writer, write_line, Line, LineReader};
use crate::sort::SortError;
use crate::workspace::TempWorkspace;
use crate::{ChunkBuffer, ChunkBufferBuilder};

/// Result of the chunking phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunks {
    /// Number of runs written, they occupy slots `0..count`.
    pub count: usize,
    /// Number of lines read from the input.
    pub lines: u64,
    /// Whether the last input line ended with a terminator. Runs always terminate every line.
    pub terminated: bool,
}

/// Splits an input stream into sorted runs stored in a workspace.
pub struct ChunkBuilder<'a, B> {
    workspace: &'a TempWorkspace,
    buffer_builder: &'a B,
    rw_buf_size: Option<usize>,
}

impl<'a, B> ChunkBuilder<'a, B>
where
    B: ChunkBufferBuilder<Line>,
{
    pub fn new(workspace: &'a TempWorkspace, buffer_builder: &'a B, rw_buf_size: Option<usize>) -> Self {
        ChunkBuilder {
            workspace,
            buffer_builder,
            rw_buf_size,
        }
    }

    /// Reads the whole input, writing every full buffer (and the trailing partial one) as a sorted run.
    pub fn build<R: BufRead>(&self, mut input: LineReader<R>) -> Result<Chunks, SortError> {
        let mut chunks = Chunks {
            count: 0,
            lines: 0,
            terminated: true,
        };
        let mut chunk_buf = self.buffer_builder.build();

        for line in input.by_ref() {
            match line {
                Ok(line) => chunk_buf.push(line),
                Err(err) => {
                    log::error!("input reading error after {} lines: {}", chunks.lines, err);
                    return Err(SortError::Input(err));
                }
            }
            chunks.lines += 1;

            if chunk_buf.is_full() {
                self.save_chunk(chunk_buf, chunks.count)?;
                chunks.count += 1;
                chunk_buf = self.buffer_builder.build();
            }
        }

        if chunk_buf.len() > 0 {
            self.save_chunk(chunk_buf, chunks.count)?;
            chunks.count += 1;
        }
        chunks.terminated = input.last_line_terminated();

        log::debug!("input split into {} chunks ({} lines)", chunks.count, chunks.lines);

        return Ok(chunks);
    }

    fn save_chunk(&self, mut buffer: B::Buffer, slot: usize) -> Result<(), SortError> {
        log::debug!("sorting chunk {} ({} lines) ...", slot, buffer.len());
        buffer.sort();

        log::debug!("saving chunk {}", slot);
        self.dump(buffer, slot).map_err(|err| {
            log::error!("chunk {} saving error: {}", slot, err);
            SortError::ChunkWrite { slot, source: err }
        })
    }

    fn dump(&self, buffer: B::Buffer, slot: usize) -> io::Result<()> {
        let chunk_file = fs::File::create(self.workspace.chunk_path(slot))?;
        let mut chunk_writer = buffered_writer(chunk_file, self.rw_buf_size);

        for line in buffer {
            write_line(&mut chunk_writer, &line)?;
        }

        return chunk_writer.flush();
    }
}
