// src/session/mod.rs

//! Session lifecycle shared by the writer and the reader.
//!
//! A session is bound to a stream while closed, opened, driven through typed
//! operations, and closed again. [`SessionCore`] carries the pieces both
//! directions need: the bound stream, the session's origin within it
//! (captured at bind time, so a snowball may sit mid-file), the open flag,
//! and the last-error memory.

pub mod reader;
pub mod writer;

pub use reader::Reader;
pub use writer::{CompoundId, Writer};

use crate::stream::{Mode, Stream};
use crate::utils::error::{Result, SnowballError};
use std::io::{self, SeekFrom};

pub(crate) struct SessionCore<S> {
    mode: Mode,
    stream: Option<S>,
    origin: u64,
    open: bool,
    last_error: Option<String>,
}

impl<S: Stream> SessionCore<S> {
    pub(crate) fn new(mode: Mode) -> Self {
        Self {
            mode,
            stream: None,
            origin: 0,
            open: false,
            last_error: None,
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub(crate) fn origin(&self) -> u64 {
        self.origin
    }

    pub(crate) fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Binds the underlying stream. Only legal while the session is closed;
    /// the stream's current position becomes the session origin.
    pub(crate) fn bind(&mut self, mut stream: S) -> Result<()> {
        if self.open {
            return Err(SnowballError::ContextOpen);
        }
        let origin = stream
            .seek(SeekFrom::Current(0))
            .map_err(|_| SnowballError::InvalidStream)?;
        self.origin = origin;
        self.stream = Some(stream);
        Ok(())
    }

    /// Unbinds and returns the stream. Only legal while the session is
    /// closed.
    pub(crate) fn unbind(&mut self) -> Result<S> {
        if self.open {
            return Err(SnowballError::ContextOpen);
        }
        self.stream.take().ok_or(SnowballError::InvalidStream)
    }

    pub(crate) fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(SnowballError::InvalidStream)
    }

    pub(crate) fn require_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(SnowballError::ContextClosed)
        }
    }

    pub(crate) fn require_closed(&self) -> Result<()> {
        if self.open {
            Err(SnowballError::ContextOpen)
        } else {
            Ok(())
        }
    }

    pub(crate) fn tell(&mut self) -> Result<u64> {
        let position = self.stream_mut()?.seek(SeekFrom::Current(0));
        match position {
            Ok(pos) => Ok(pos),
            Err(err) => Err(self.io_error(err)),
        }
    }

    pub(crate) fn seek_to(&mut self, pos: u64) -> Result<u64> {
        let position = self.stream_mut()?.seek(SeekFrom::Start(pos));
        match position {
            Ok(pos) => Ok(pos),
            Err(err) => Err(self.io_error(err)),
        }
    }

    /// Classifies an I/O failure on the bound stream: end of stream maps to
    /// `Eof`, anything else to the direction-appropriate error.
    pub(crate) fn io_error(&mut self, err: io::Error) -> SnowballError {
        let at_eof = err.kind() == io::ErrorKind::UnexpectedEof
            || self.stream.as_ref().map(|s| s.eof()).unwrap_or(false);
        if at_eof {
            SnowballError::Eof
        } else if self.mode == Mode::Reader {
            SnowballError::CannotRead(err)
        } else {
            SnowballError::CannotWrite(err)
        }
    }

    /// Records a failure message so `last_error` can report it later.
    pub(crate) fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
