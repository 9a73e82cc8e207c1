// src/utils/error.rs

use crate::wire::frame::ChunkKind;
use thiserror::Error;

/// The primary error type for all operations in the snowball library.
///
/// Readers restore the stream to the pre-operation position before returning
/// any of these, so a failed read can be diagnosed or retried without losing
/// place. Sessions also keep the rendered message of their last failure,
/// retrievable through `last_error`.
#[derive(Error, Debug)]
pub enum SnowballError {
    /// The root header's offsets do not describe a well-formed layout.
    #[error("invalid root: {0}")]
    InvalidRoot(&'static str),

    /// The first two bytes of the stream magic are not the format identifier.
    #[error("first two bytes of the magic number for the stream are invalid")]
    MalformedMagicHead,

    /// The stream was written by a newer format version.
    #[error("snowball version {version} is not supported (this library reads up to {supported})")]
    MalformedMagicVersion { version: u32, supported: u32 },

    /// A chunk header carried an unexpected kind tag.
    #[error("invalid chunk header: expected {expected:?}, found kind tag {found}")]
    WrongKind { expected: ChunkKind, found: u32 },

    /// A chunk header carried an unexpected name; reader and writer are out
    /// of sync.
    #[error("invalid chunk header: expected name {expected:#010x}, found {found:#010x}")]
    BadName { expected: u32, found: u32 },

    /// An array chunk declared length zero. Recoverable: the stream is left
    /// at the start of the offending chunk.
    #[error("array chunk is empty")]
    EmptyArray,

    /// The operation cannot be performed in the session's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The operation is only legal while the session is closed.
    #[error("invalid operation on open session")]
    ContextOpen,

    /// The operation is only legal while the session is open.
    #[error("session is not open")]
    ContextClosed,

    /// No usable stream is bound to the session.
    #[error("stream is missing or unusable")]
    InvalidStream,

    /// The underlying stream transferred fewer bytes than requested.
    #[error("unable to read from stream")]
    CannotRead(#[source] std::io::Error),

    /// The underlying stream accepted fewer bytes than requested.
    #[error("unable to write to stream")]
    CannotWrite(#[source] std::io::Error),

    /// End of stream reached prematurely.
    #[error("unexpected end of stream reached")]
    Eof,
}

/// A specialized `Result` type for snowball operations.
pub type Result<T> = std::result::Result<T, SnowballError>;
