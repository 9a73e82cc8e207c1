// src/wire/frame.rs

//! On-wire frame layout: the file root, chunk headers, array framing, and
//! the chunk kind tags.

use super::{WireRead, WireWrite};
use std::io::{self, Read, Write};

/// Magic bytes `'S' 'Z' '2' '0'` read as a little-endian word. The first two
/// bytes identify the format; the high two are the ASCII decimal digits of
/// the format version.
pub const MAGIC: u32 = u32::from_le_bytes(*b"SZ20");

/// Format version encoded in [`MAGIC`].
pub const VERSION: u32 = 20;

/// Name of the single chunk wrapping the main body.
pub const DATA_NAME: u32 = u32::from_le_bytes(*b"DATA");

/// Serialized size of [`Root`].
pub const ROOT_SIZE: u32 = 24;

/// Serialized size of [`ChunkHeader`].
pub const HEADER_SIZE: u32 = 12;

/// Serialized size of an array chunk's framing: the header plus the length
/// and element-kind words.
pub const ARRAY_HEADER_SIZE: u32 = 20;

/// Whether a magic word starts with the `'S' 'Z'` identifier bytes.
pub fn magic_head_matches(magic: u32) -> bool {
    magic & 0xFFFF == MAGIC & 0xFFFF
}

/// The two-digit ASCII version carried in a magic word. Non-digit bytes
/// produce an out-of-range value, which the version gate then rejects.
pub fn magic_version(magic: u32) -> u32 {
    let tens = ((magic >> 16) & 0xFF).wrapping_sub(b'0' as u32);
    let ones = ((magic >> 24) & 0xFF).wrapping_sub(b'0' as u32);
    tens.wrapping_mul(10).wrapping_add(ones)
}

/// Chunk type tags as they appear on the wire.
///
/// `Invalid` and `Double` are reserved: neither is ever emitted, and both
/// fail the kind match on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChunkKind {
    Invalid = 0,
    /// Body of a compound sub-object; only appears in the compound section.
    Compound = 1,
    /// 32-bit index into the compound table.
    CompoundRef = 2,
    /// IEEE-754 binary32.
    Float = 3,
    Uint32 = 4,
    Sint32 = 5,
    /// Homogeneous array; framing carries element count and element kind.
    Array = 6,
    /// Raw byte run; length implied by chunk size.
    Bytes = 7,
    /// Substitutes any compound, array, or bytes chunk whose source was
    /// null or empty.
    NullPointer = 8,
    Double = 9,
    /// Wrapper around the main-body chunk sequence.
    Data = 10,
}

impl ChunkKind {
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// The six-word file root.
///
/// All offsets are byte distances from the root itself, so a snowball can be
/// embedded mid-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root {
    pub magic: u32,
    /// Total bytes from the root onward.
    pub size: u32,
    pub num_compounds: u32,
    /// Always immediately follows the root, so `ROOT_SIZE`.
    pub mappings_offset: u32,
    /// Follows the mapping table.
    pub compounds_offset: u32,
    /// Follows the compound bodies.
    pub data_offset: u32,
}

impl Root {
    pub fn read<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            magic: r.read_u32()?,
            size: r.read_u32()?,
            num_compounds: r.read_u32()?,
            mappings_offset: r.read_u32()?,
            compounds_offset: r.read_u32()?,
            data_offset: r.read_u32()?,
        })
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32(self.magic)?;
        w.write_u32(self.size)?;
        w.write_u32(self.num_compounds)?;
        w.write_u32(self.mappings_offset)?;
        w.write_u32(self.compounds_offset)?;
        w.write_u32(self.data_offset)
    }
}

/// `{kind, name, size}` framing every chunk; `size` includes the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: u32,
    pub name: u32,
    pub size: u32,
}

impl ChunkHeader {
    pub fn new(kind: ChunkKind, name: u32, size: u32) -> Self {
        Self {
            kind: kind.tag(),
            name,
            size,
        }
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            kind: r.read_u32()?,
            name: r.read_u32()?,
            size: r.read_u32()?,
        })
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32(self.kind)?;
        w.write_u32(self.name)?;
        w.write_u32(self.size)
    }

    pub fn is_null(&self) -> bool {
        self.kind == ChunkKind::NullPointer.tag()
    }

    /// Payload length after the header.
    pub fn payload_len(&self) -> u32 {
        self.size.saturating_sub(HEADER_SIZE)
    }
}

/// Framing of an array chunk: base header, element count, element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    pub base: ChunkHeader,
    pub length: u32,
    pub element_kind: u32,
}
