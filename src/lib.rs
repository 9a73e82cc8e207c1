//! A binary serialization codec for structured object graphs.
//!
//! A producer drives a write session by emitting a sequence of named, typed
//! chunks (primitives, arrays, raw byte runs, and references to *compound*
//! sub-objects) and a consumer replays the same sequence of typed reads
//! against the finished stream to reconstruct the graph. Compounds are
//! deduplicated by caller-supplied identity on write and memoized by index
//! on read, which is what lets shared and cyclic references round-trip to
//! the same value.
//!
//! The wire format is a single self-describing little-endian file: a fixed
//! root, a compound offset table, the compound bodies, and the main data
//! section. Every chunk carries a caller-chosen 32-bit name that reader and
//! writer must agree on; a name mismatch is the primary out-of-sync
//! detector, and the reader restores its position on any failed match.
//!
//! # Quick start
//!
//! ```
//! use snowball::{BufferStream, Mode, Reader, Writer};
//!
//! const WIDTH: u32 = 0x57445448;
//!
//! let mut file = BufferStream::new(Mode::Writer);
//! let mut writer = Writer::new();
//! writer.set_stream(&mut file)?;
//! writer.open()?;
//! writer.write_float(WIDTH, 2.5)?;
//! writer.close()?;
//! drop(writer);
//!
//! let mut reader: Reader<_, ()> = Reader::new();
//! reader.set_stream(BufferStream::from_vec(file.into_vec(), Mode::Reader))?;
//! reader.open()?;
//! assert_eq!(reader.read_float(WIDTH)?, 2.5);
//! reader.close()?;
//! # Ok::<(), snowball::SnowballError>(())
//! ```
//!
//! # Compounds
//!
//! [`Writer::write_compound`] takes an opaque [`CompoundId`]; the first
//! sight of an identity stages its body through the supplied callback, every
//! later sight emits only a reference. [`Reader::read_compound`] expands a
//! body lazily on first reference; the callback publishes its value with
//! [`Reader::publish`] before any nested read that could reach back, which
//! is what makes cycles and diamonds reconstruct to one shared value.

// Core modules
pub mod session;
pub mod stream;
pub mod utils;
pub mod wire;

// Public session surface
pub use session::reader::Reader;
pub use session::writer::{CompoundId, Writer};

// Stream capability and the bundled implementations
pub use stream::{BufferStream, FileStream, Mode, NullStream, Stream};

// Error types
pub use utils::error::{Result, SnowballError};

// Wire-level constants callers may want for diagnostics
pub use wire::frame::{ChunkKind, DATA_NAME, MAGIC, VERSION};

pub const SNOWBALL_VERSION: &str = "0.2.0";
