//! Random test file generator.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::Path;

use log;
use rand::Rng;

/// Minimal length of a generated line. Shorter maximum lengths produce lines of exactly that length.
pub const MIN_LINE_LENGTH: usize = 10;

const WRITE_BUF_SIZE: usize = 1024 * 1024;

/// Creates a file of `lines` random lines of uppercase latin letters.
///
/// Line lengths are uniformly distributed in `[MIN_LINE_LENGTH, max_length)`. The last line has no terminator.
pub fn generate_file(path: &Path, lines: u64, max_length: usize) -> io::Result<()> {
    let file = fs::File::create(path).map_err(|err| {
        log::error!("file {} creation error: {}", path.display(), err);
        err
    })?;
    let mut writer = io::BufWriter::with_capacity(WRITE_BUF_SIZE, file);

    generate(&mut writer, &mut rand::thread_rng(), lines, max_length)?;

    return writer.flush();
}

/// Writes `lines` random lines to `writer`.
pub fn generate<W, G>(writer: &mut W, rng: &mut G, lines: u64, max_length: usize) -> io::Result<()>
where
    W: Write,
    G: Rng,
{
    let mut line = Vec::with_capacity(max_length + 1);

    for i in 0..lines {
        let len = if max_length > MIN_LINE_LENGTH {
            rng.gen_range(MIN_LINE_LENGTH..max_length)
        } else {
            max_length
        };

        line.clear();
        line.extend((0..len).map(|_| rng.gen_range(b'A'..=b'Z')));
        if i != lines - 1 {
            line.push(b'\n');
        }

        writer.write_all(&line)?;
    }

    return Ok(());
}
