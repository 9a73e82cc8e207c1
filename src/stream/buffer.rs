// src/stream/buffer.rs

//! A seekable, monotonically growable in-memory byte buffer.
//!
//! Write sessions stage the main body and every compound body in one of
//! these before the final assembly pass; tests use it as an in-memory file.
//! Read and write keep independent cursors, and `seek` moves the cursor
//! matching the buffer's mode, so a reader over a finished buffer never
//! disturbs a writer's append position.

use super::{Mode, Stream};
use std::io::{self, Read, Seek, SeekFrom, Write};

pub struct BufferStream {
    buf: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
    mode: Mode,
}

impl BufferStream {
    pub fn new(mode: Mode) -> Self {
        Self {
            buf: Vec::new(),
            read_pos: 0,
            write_pos: 0,
            mode,
        }
    }

    pub fn with_capacity(mode: Mode, capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            read_pos: 0,
            write_pos: 0,
            mode,
        }
    }

    /// Wraps existing bytes, e.g. a finished snowball image.
    pub fn from_vec(buf: Vec<u8>, mode: Mode) -> Self {
        Self {
            buf,
            read_pos: 0,
            write_pos: 0,
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl Read for BufferStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.mode != Mode::Reader {
            return Ok(0);
        }

        let available = self.buf.len().saturating_sub(self.read_pos);
        let count = out.len().min(available);
        if count > 0 {
            out[..count].copy_from_slice(&self.buf[self.read_pos..self.read_pos + count]);
            self.read_pos += count;
        }
        Ok(count)
    }
}

impl Write for BufferStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.mode != Mode::Writer {
            return Ok(0);
        }

        if self.write_pos == self.buf.len() {
            self.buf.extend_from_slice(data);
        } else {
            // Overwrite in the middle, growing if the run extends past the end.
            let end = self.write_pos + data.len();
            if end > self.buf.len() {
                self.buf.resize(end, 0);
            }
            self.buf[self.write_pos..end].copy_from_slice(data);
        }

        self.write_pos += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for BufferStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let cursor = match self.mode {
            Mode::Writer => self.write_pos,
            Mode::Reader => self.read_pos,
        };

        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => cursor as i64 + delta,
            SeekFrom::End(delta) => self.buf.len() as i64 + delta,
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        let target = (target as usize).min(self.buf.len());

        match self.mode {
            Mode::Writer => self.write_pos = target,
            Mode::Reader => self.read_pos = target,
        }
        Ok(target as u64)
    }
}

impl Stream for BufferStream {
    fn eof(&self) -> bool {
        match self.mode {
            Mode::Reader => self.read_pos >= self.buf.len(),
            Mode::Writer => false,
        }
    }
}
