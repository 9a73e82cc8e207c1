// src/session/reader.rs

//! The read session.
//!
//! Opening parses and validates the root, loads the compound offset table,
//! and positions the stream inside the DATA chunk. Every typed read then
//! matches the next (kind, name) pair at the current position; a mismatch
//! restores the pre-read position so the caller can diagnose or retry.
//!
//! Compounds expand lazily: the first reference to an index seeks to the
//! compound's body, runs the caller's reader, and memoizes whatever value it
//! published; later references return the memoized value without touching
//! the stream. The slot is marked unpacked *before* the reader runs, which
//! is the entire cycle-safety mechanism: a back-reference into a compound
//! that is still being read resolves to the value published so far.

use super::SessionCore;
use crate::stream::{Mode, Stream};
use crate::utils::error::{Result, SnowballError};
use crate::wire::WireRead;
use crate::wire::frame::{
    ARRAY_HEADER_SIZE, ArrayHeader, ChunkHeader, ChunkKind, DATA_NAME, HEADER_SIZE, MAGIC,
    ROOT_SIZE, Root, VERSION, magic_head_matches, magic_version,
};
use log::debug;
use std::io;

/// One entry in the compound table.
#[derive(Debug, Clone)]
struct Slot<V> {
    /// Absolute stream position of the compound's header.
    offset: u64,
    /// Whatever the user reader published; stays `None` until it does.
    value: Option<V>,
    /// Set immediately before the user reader is first invoked and never
    /// cleared, so references during and after expansion reuse `value`.
    unpacked: bool,
}

/// A read session over a [`Stream`].
///
/// `V` is the caller's compound value type, memoized per compound index and
/// cloned out at every reference site. Typically an `Rc<RefCell<T>>`, so a
/// reader callback can publish the allocation first and fill it afterward.
pub struct Reader<S, V> {
    core: SessionCore<S>,
    slots: Vec<Slot<V>>,
    /// Indices of compounds currently being expanded, innermost last;
    /// `publish` targets the top entry.
    expanding: Vec<u32>,
}

impl<S: Stream, V: Clone> Reader<S, V> {
    pub fn new() -> Self {
        Self {
            core: SessionCore::new(Mode::Reader),
            slots: Vec::new(),
            expanding: Vec::new(),
        }
    }

    /// Binds the input stream. Only legal while the session is closed; the
    /// stream's current position becomes the root position.
    pub fn set_stream(&mut self, stream: S) -> Result<()> {
        let r = self.core.bind(stream);
        self.core.track(r)
    }

    /// Parses the root and compound table and enters the DATA chunk.
    pub fn open(&mut self) -> Result<()> {
        let r = self.open_inner();
        self.core.track(r)
    }

    pub fn close(&mut self) -> Result<()> {
        let r = self.close_inner();
        self.core.track(r)
    }

    /// Unbinds and returns the stream. Only legal while the session is
    /// closed.
    pub fn take_stream(&mut self) -> Result<S> {
        let r = self.core.unbind();
        self.core.track(r)
    }

    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    /// The rendered message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.core.last_error()
    }

    /// Matches and reads a float chunk.
    pub fn read_float(&mut self, name: u32) -> Result<f32> {
        let r = self.read_primitive(ChunkKind::Float, name, |s| s.read_f32());
        self.core.track(r)
    }

    /// Matches and reads an unsigned 32-bit integer chunk.
    pub fn read_uint(&mut self, name: u32) -> Result<u32> {
        let r = self.read_primitive(ChunkKind::Uint32, name, |s| WireRead::read_u32(s));
        self.core.track(r)
    }

    /// Matches and reads a signed 32-bit integer chunk.
    pub fn read_int(&mut self, name: u32) -> Result<i32> {
        let r = self.read_primitive(ChunkKind::Sint32, name, |s| s.read_i32());
        self.core.track(r)
    }

    /// Matches and reads a float array chunk; a null chunk yields `None`.
    pub fn read_floats(&mut self, name: u32) -> Result<Option<Vec<f32>>> {
        let r = self.read_primitive_array(ChunkKind::Float, name, |s, n| s.read_f32_slice(n));
        self.core.track(r)
    }

    /// Matches and reads an unsigned integer array chunk; a null chunk
    /// yields `None`.
    pub fn read_uints(&mut self, name: u32) -> Result<Option<Vec<u32>>> {
        let r = self.read_primitive_array(ChunkKind::Uint32, name, |s, n| s.read_u32_slice(n));
        self.core.track(r)
    }

    /// Matches and reads a signed integer array chunk; a null chunk yields
    /// `None`.
    pub fn read_ints(&mut self, name: u32) -> Result<Option<Vec<i32>>> {
        let r = self.read_primitive_array(ChunkKind::Sint32, name, |s, n| s.read_i32_slice(n));
        self.core.track(r)
    }

    /// Reads a float array into a caller buffer without allocating. Returns
    /// the element count, 0 for a null chunk.
    pub fn read_floats_into(&mut self, name: u32, out: &mut [f32]) -> Result<usize> {
        let capacity = out.len();
        let r = self.read_array_into(ChunkKind::Float, name, capacity, |s, n| {
            s.read_f32_slice_into(&mut out[..n])
        });
        self.core.track(r)
    }

    /// Reads an unsigned integer array into a caller buffer. Returns the
    /// element count, 0 for a null chunk.
    pub fn read_uints_into(&mut self, name: u32, out: &mut [u32]) -> Result<usize> {
        let capacity = out.len();
        let r = self.read_array_into(ChunkKind::Uint32, name, capacity, |s, n| {
            s.read_u32_slice_into(&mut out[..n])
        });
        self.core.track(r)
    }

    /// Reads a signed integer array into a caller buffer. Returns the
    /// element count, 0 for a null chunk.
    pub fn read_ints_into(&mut self, name: u32, out: &mut [i32]) -> Result<usize> {
        let capacity = out.len();
        let r = self.read_array_into(ChunkKind::Sint32, name, capacity, |s, n| {
            s.read_i32_slice_into(&mut out[..n])
        });
        self.core.track(r)
    }

    /// Matches and reads a raw byte run; a null chunk yields `None`.
    pub fn read_bytes(&mut self, name: u32) -> Result<Option<Vec<u8>>> {
        let r = self.read_bytes_inner(name);
        self.core.track(r)
    }

    /// Reads a byte run into a caller buffer. Returns the byte count, 0 for
    /// a null chunk.
    pub fn read_bytes_into(&mut self, name: u32, out: &mut [u8]) -> Result<usize> {
        let r = self.read_bytes_into_inner(name, out);
        self.core.track(r)
    }

    /// Matches a compound reference and resolves it, expanding the body
    /// through `read_body` on first encounter. A null chunk yields `None`.
    ///
    /// `read_body` must publish the new value with [`Reader::publish`]
    /// *before* reading anything that can reach back to this compound;
    /// back-references observed earlier resolve to `None`. No reader is
    /// invoked more than once per compound.
    pub fn read_compound<F>(&mut self, name: u32, mut read_body: F) -> Result<Option<V>>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        let r = self.read_compound_inner(name, &mut read_body);
        self.core.track(r)
    }

    /// Matches a compound reference array and resolves every element; a
    /// null chunk yields `None`. Duplicate indices resolve to clones of the
    /// same memoized value.
    pub fn read_compounds<F>(&mut self, name: u32, mut read_body: F) -> Result<Option<Vec<Option<V>>>>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        let r = self.read_compounds_inner(name, &mut read_body);
        self.core.track(r)
    }

    /// Publishes the value of the compound currently being expanded.
    ///
    /// Only valid inside a compound `read_body`; a cycle-safe reader calls
    /// this before its first nested read.
    pub fn publish(&mut self, value: V) -> Result<()> {
        let r = match self.expanding.last() {
            Some(&index) => {
                self.slots[index as usize - 1].value = Some(value);
                Ok(())
            }
            None => Err(SnowballError::InvalidOperation(
                "publish is only valid inside a compound reader".into(),
            )),
        };
        self.core.track(r)
    }

    fn open_inner(&mut self) -> Result<()> {
        self.core.require_closed()?;
        let root = self.read_root()?;
        let origin = self.core.origin();

        self.slots.clear();
        self.slots.resize(
            root.num_compounds as usize,
            Slot {
                offset: 0,
                value: None,
                unpacked: false,
            },
        );
        self.expanding.clear();

        // Mapping values are relative to the compound section; rebase them
        // onto the file.
        self.core.seek_to(origin + root.mappings_offset as u64)?;
        let compounds_base = origin + root.compounds_offset as u64;
        for i in 0..root.num_compounds as usize {
            let mapping = self.get_u32()?;
            self.slots[i].offset = compounds_base + mapping as u64;
        }

        self.core.seek_to(origin + root.data_offset as u64)?;
        self.match_header(ChunkKind::Data, DATA_NAME, false)?;

        self.core.set_open(true);
        debug!("read session opened: {} compounds", root.num_compounds);
        Ok(())
    }

    fn close_inner(&mut self) -> Result<()> {
        self.core.require_open()?;
        self.core.set_open(false);
        self.slots.clear();
        self.expanding.clear();
        debug!("read session closed");
        Ok(())
    }

    fn read_root(&mut self) -> Result<Root> {
        let origin = self.core.origin();
        self.core.seek_to(origin)?;

        let root = match Root::read(self.core.stream_mut()?) {
            Ok(root) => root,
            Err(err) => return Err(self.core.io_error(err)),
        };

        if root.magic != MAGIC {
            if !magic_head_matches(root.magic) {
                return Err(SnowballError::MalformedMagicHead);
            }
            let version = magic_version(root.magic);
            if version > VERSION {
                return Err(SnowballError::MalformedMagicVersion {
                    version,
                    supported: VERSION,
                });
            }
        }

        // Offsets must describe a well-formed layout before any is trusted
        // for seeking. The compound section starts exactly where the mapping
        // table ends.
        let mappings_end = root.mappings_offset as u64 + root.num_compounds as u64 * 4;
        if (root.mappings_offset as u64) < ROOT_SIZE as u64
            || (root.compounds_offset as u64) != mappings_end
            || root.data_offset < root.compounds_offset
            || (root.size as u64) < root.data_offset as u64 + HEADER_SIZE as u64
        {
            return Err(SnowballError::InvalidRoot("inconsistent section offsets"));
        }

        Ok(root)
    }

    /// Reads a chunk header at the current position and matches it against
    /// the expected kind and name. A null chunk passes the kind test where
    /// null substitution is permitted.
    fn match_header(
        &mut self,
        expected: ChunkKind,
        name: u32,
        null_allowed: bool,
    ) -> Result<ChunkHeader> {
        let header = match ChunkHeader::read(self.core.stream_mut()?) {
            Ok(header) => header,
            Err(err) => return Err(self.core.io_error(err)),
        };

        let kind_ok = header.kind == expected.tag()
            || (null_allowed && header.kind == ChunkKind::NullPointer.tag());
        if !kind_ok {
            return Err(SnowballError::WrongKind {
                expected,
                found: header.kind,
            });
        }
        if header.name != name {
            return Err(SnowballError::BadName {
                expected: name,
                found: header.name,
            });
        }
        Ok(header)
    }

    /// Runs a read operation, restoring the pre-read stream position if it
    /// fails so the caller can diagnose or retry without losing place.
    fn restoring<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = self.core.tell()?;
        let result = op(self);
        if result.is_err() {
            let _ = self.core.seek_to(start);
        }
        result
    }

    fn read_primitive<T>(
        &mut self,
        kind: ChunkKind,
        name: u32,
        get: impl FnOnce(&mut S) -> io::Result<T>,
    ) -> Result<T> {
        self.core.require_open()?;
        self.restoring(|this| {
            let header = this.match_header(kind, name, false)?;
            if header.size != HEADER_SIZE + 4 {
                return Err(SnowballError::WrongKind {
                    expected: kind,
                    found: header.kind,
                });
            }
            get(this.core.stream_mut()?).map_err(|e| this.core.io_error(e))
        })
    }

    /// Matches an array chunk's framing. `None` means a null chunk was
    /// substituted; the declared element kind must otherwise match.
    fn read_array_header(
        &mut self,
        element_kind: ChunkKind,
        name: u32,
    ) -> Result<Option<ArrayHeader>> {
        let base = self.match_header(ChunkKind::Array, name, true)?;
        if base.is_null() {
            return Ok(None);
        }

        let length = self.get_u32()?;
        let found_kind = self.get_u32()?;
        if found_kind != element_kind.tag() {
            return Err(SnowballError::WrongKind {
                expected: element_kind,
                found: found_kind,
            });
        }
        Ok(Some(ArrayHeader {
            base,
            length,
            element_kind: found_kind,
        }))
    }

    fn read_primitive_array<T>(
        &mut self,
        element_kind: ChunkKind,
        name: u32,
        read_payload: impl FnOnce(&mut S, usize) -> io::Result<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        self.core.require_open()?;
        self.restoring(|this| {
            let Some(header) = this.read_array_header(element_kind, name)? else {
                return Ok(None);
            };
            if header.length == 0 {
                return Err(SnowballError::EmptyArray);
            }

            let remainder = (header.base.size as u64).saturating_sub(ARRAY_HEADER_SIZE as u64);
            let tail = this.core.tell()? + remainder;
            let values = match read_payload(this.core.stream_mut()?, header.length as usize) {
                Ok(values) => values,
                Err(err) => return Err(this.core.io_error(err)),
            };
            // Land on the chunk tail so the next read starts at the next
            // chunk even if the chunk declared trailing slack.
            this.core.seek_to(tail)?;
            Ok(Some(values))
        })
    }

    fn read_array_into(
        &mut self,
        element_kind: ChunkKind,
        name: u32,
        capacity: usize,
        read_payload: impl FnOnce(&mut S, usize) -> io::Result<()>,
    ) -> Result<usize> {
        self.core.require_open()?;
        self.restoring(|this| {
            let Some(header) = this.read_array_header(element_kind, name)? else {
                return Ok(0);
            };
            if header.length == 0 {
                return Err(SnowballError::EmptyArray);
            }
            let length = header.length as usize;
            if length > capacity {
                return Err(SnowballError::InvalidOperation(format!(
                    "destination holds {capacity} elements, chunk has {length}"
                )));
            }

            let remainder = (header.base.size as u64).saturating_sub(ARRAY_HEADER_SIZE as u64);
            let tail = this.core.tell()? + remainder;
            read_payload(this.core.stream_mut()?, length).map_err(|e| this.core.io_error(e))?;
            this.core.seek_to(tail)?;
            Ok(length)
        })
    }

    fn read_bytes_inner(&mut self, name: u32) -> Result<Option<Vec<u8>>> {
        self.core.require_open()?;
        self.restoring(|this| {
            let header = this.match_header(ChunkKind::Bytes, name, true)?;
            if header.is_null() {
                return Ok(None);
            }

            let mut buffer = vec![0u8; header.payload_len() as usize];
            let r = this.core.stream_mut()?.read_exact(&mut buffer);
            r.map_err(|e| this.core.io_error(e))?;
            Ok(Some(buffer))
        })
    }

    fn read_bytes_into_inner(&mut self, name: u32, out: &mut [u8]) -> Result<usize> {
        self.core.require_open()?;
        self.restoring(|this| {
            let header = this.match_header(ChunkKind::Bytes, name, true)?;
            if header.is_null() {
                return Ok(0);
            }

            let length = header.payload_len() as usize;
            if length > out.len() {
                return Err(SnowballError::InvalidOperation(format!(
                    "destination holds {} bytes, chunk has {length}",
                    out.len()
                )));
            }
            let r = this.core.stream_mut()?.read_exact(&mut out[..length]);
            r.map_err(|e| this.core.io_error(e))?;
            Ok(length)
        })
    }

    fn read_compound_inner(
        &mut self,
        name: u32,
        read_body: &mut dyn FnMut(&mut Self) -> Result<()>,
    ) -> Result<Option<V>> {
        self.core.require_open()?;
        self.restoring(|this| {
            let header = this.match_header(ChunkKind::CompoundRef, name, true)?;
            if header.is_null() {
                return Ok(None);
            }
            let index = this.get_u32()?;
            this.resolve_compound(index, read_body)
        })
    }

    fn read_compounds_inner(
        &mut self,
        name: u32,
        read_body: &mut dyn FnMut(&mut Self) -> Result<()>,
    ) -> Result<Option<Vec<Option<V>>>> {
        self.core.require_open()?;
        self.restoring(|this| {
            let Some(header) = this.read_array_header(ChunkKind::CompoundRef, name)? else {
                return Ok(None);
            };

            // A zero-length reference array is tolerated on read even
            // though the writer never produces one.
            let mut values = Vec::with_capacity(header.length as usize);
            for _ in 0..header.length {
                let index = this.get_u32()?;
                values.push(this.resolve_compound(index, &mut *read_body)?);
            }
            Ok(Some(values))
        })
    }

    /// Resolves a 1-based compound index through the slot table, expanding
    /// the body on first use and restoring the stream position afterward.
    fn resolve_compound(
        &mut self,
        index: u32,
        read_body: &mut dyn FnMut(&mut Self) -> Result<()>,
    ) -> Result<Option<V>> {
        if index == 0 {
            return Err(SnowballError::InvalidOperation(
                "compound index zero is reserved".into(),
            ));
        }
        let slot = index as usize - 1;
        if slot >= self.slots.len() {
            return Err(SnowballError::InvalidOperation(format!(
                "compound index {index} out of range ({} declared)",
                self.slots.len()
            )));
        }

        if !self.slots[slot].unpacked {
            let resume = self.core.tell()?;
            self.core.seek_to(self.slots[slot].offset)?;
            self.match_header(ChunkKind::Compound, index, false)?;

            // Marked before the callback runs: a back-reference to this
            // index inside the body resolves to whatever has been published
            // so far instead of recursing forever.
            self.slots[slot].unpacked = true;
            self.expanding.push(index);
            let result = read_body(self);
            self.expanding.pop();
            let restored = self.core.seek_to(resume);
            result?;
            restored?;
        }

        Ok(self.slots[slot].value.clone())
    }

    fn get_u32(&mut self) -> Result<u32> {
        let r = WireRead::read_u32(self.core.stream_mut()?);
        r.map_err(|e| self.core.io_error(e))
    }
}

impl<S: Stream, V: Clone> Default for Reader<S, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::writer::Writer;
    use crate::stream::BufferStream;
    use crate::wire::WireWrite;

    type ByteReader = Reader<BufferStream, ()>;

    fn open_reader(bytes: Vec<u8>) -> ByteReader {
        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
            .unwrap();
        reader.open().unwrap();
        reader
    }

    fn written(build: impl FnOnce(&mut Writer<BufferStream>)) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.set_stream(BufferStream::new(Mode::Writer)).unwrap();
        writer.open().unwrap();
        build(&mut writer);
        writer.close().unwrap();
        writer.take_stream().unwrap().into_vec()
    }

    /// A minimal hand-rolled file: root plus an empty DATA chunk, with the
    /// given magic bytes.
    fn file_with_magic(magic: [u8; 4]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&magic);
        for word in [36u32, 0, 24, 24, 24] {
            bytes.write_u32(word).unwrap();
        }
        for word in [ChunkKind::Data.tag(), DATA_NAME, 12] {
            bytes.write_u32(word).unwrap();
        }
        bytes
    }

    #[test]
    fn version_gate() {
        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(
                file_with_magic(*b"SZ30"),
                Mode::Reader,
            ))
            .unwrap();
        assert!(matches!(
            reader.open(),
            Err(SnowballError::MalformedMagicVersion { version: 30, .. })
        ));
        assert!(!reader.is_open());

        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(
                file_with_magic(*b"JZ20"),
                Mode::Reader,
            ))
            .unwrap();
        assert!(matches!(
            reader.open(),
            Err(SnowballError::MalformedMagicHead)
        ));
        assert!(reader.last_error().is_some());
    }

    #[test]
    fn older_version_is_accepted() {
        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(
                file_with_magic(*b"SZ19"),
                Mode::Reader,
            ))
            .unwrap();
        reader.open().unwrap();
    }

    #[test]
    fn inconsistent_root_is_rejected() {
        let mut bytes = file_with_magic(*b"SZ20");
        // data_offset behind compounds_offset.
        bytes[20..24].copy_from_slice(&8u32.to_le_bytes());
        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
            .unwrap();
        assert!(matches!(
            reader.open(),
            Err(SnowballError::InvalidRoot(_))
        ));
    }

    #[test]
    fn compound_section_must_follow_mapping_table_exactly() {
        // compounds_offset one word past the end of the (empty) mapping
        // table: slack between the sections is not a valid layout, even
        // when every other offset relation still holds.
        let mut bytes = file_with_magic(*b"SZ20");
        bytes[4..8].copy_from_slice(&40u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&28u32.to_le_bytes());
        bytes[20..24].copy_from_slice(&28u32.to_le_bytes());
        let mut reader = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
            .unwrap();
        assert!(matches!(
            reader.open(),
            Err(SnowballError::InvalidRoot(_))
        ));
    }

    #[test]
    fn bad_name_restores_position() {
        let bytes = written(|w| {
            w.write_int(0x41, 1).unwrap();
            w.write_int(0x42, 2).unwrap();
        });
        let mut reader = open_reader(bytes);

        assert_eq!(reader.read_int(0x41).unwrap(), 1);
        assert!(matches!(
            reader.read_int(0x41),
            Err(SnowballError::BadName {
                expected: 0x41,
                found: 0x42
            })
        ));
        // The failed match did not advance the stream.
        assert_eq!(reader.read_int(0x42).unwrap(), 2);
    }

    #[test]
    fn wrong_kind_restores_position() {
        let bytes = written(|w| w.write_float(0x46, 3.25).unwrap());
        let mut reader = open_reader(bytes);

        assert!(matches!(
            reader.read_int(0x46),
            Err(SnowballError::WrongKind {
                expected: ChunkKind::Sint32,
                found: 3
            })
        ));
        assert_eq!(reader.read_float(0x46).unwrap(), 3.25);
    }

    #[test]
    fn element_kind_mismatch_is_wrong_kind() {
        let bytes = written(|w| w.write_uints(0x55, &[1, 2, 3]).unwrap());
        let mut reader = open_reader(bytes);

        assert!(matches!(
            reader.read_ints(0x55),
            Err(SnowballError::WrongKind { .. })
        ));
        assert_eq!(reader.read_uints(0x55).unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn null_chunks_read_back_as_none() {
        let bytes = written(|w| {
            w.write_floats(0x4B, &[]).unwrap();
            w.write_bytes(0x4C, &[]).unwrap();
        });
        let mut reader = open_reader(bytes);

        assert_eq!(reader.read_floats(0x4B).unwrap(), None);
        assert_eq!(reader.read_bytes(0x4C).unwrap(), None);
    }

    #[test]
    fn empty_array_chunk_is_recoverable() {
        // Hand-rolled: a real ARRAY chunk declaring zero elements.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"SZ20");
        for word in [56u32, 0, 24, 24, 24] {
            bytes.write_u32(word).unwrap();
        }
        for word in [ChunkKind::Data.tag(), DATA_NAME, 32] {
            bytes.write_u32(word).unwrap();
        }
        for word in [
            ChunkKind::Array.tag(),
            0x4B,
            ARRAY_HEADER_SIZE,
            0,
            ChunkKind::Float.tag(),
        ] {
            bytes.write_u32(word).unwrap();
        }

        let mut reader = open_reader(bytes);
        assert!(matches!(
            reader.read_floats(0x4B),
            Err(SnowballError::EmptyArray)
        ));
        // Recoverable: the stream is back at the chunk start.
        assert!(matches!(
            reader.read_floats(0x4B),
            Err(SnowballError::EmptyArray)
        ));
    }

    #[test]
    fn compound_index_zero_is_rejected() {
        // A COMPOUND_REF chunk carrying the reserved index 0.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"SZ20");
        for word in [52u32, 0, 24, 24, 24] {
            bytes.write_u32(word).unwrap();
        }
        for word in [ChunkKind::Data.tag(), DATA_NAME, 28] {
            bytes.write_u32(word).unwrap();
        }
        for word in [ChunkKind::CompoundRef.tag(), 0x43, 16, 0] {
            bytes.write_u32(word).unwrap();
        }

        let mut reader: Reader<BufferStream, ()> = ByteReader::new();
        reader
            .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
            .unwrap();
        reader.open().unwrap();
        assert!(matches!(
            reader.read_compound(0x43, |_| Ok(())),
            Err(SnowballError::InvalidOperation(_))
        ));
    }

    #[test]
    fn reading_past_the_last_chunk_reports_eof() {
        let bytes = written(|w| w.write_int(0x41, 1).unwrap());
        let mut reader = open_reader(bytes);

        assert_eq!(reader.read_int(0x41).unwrap(), 1);
        assert!(matches!(
            reader.read_int(0x42),
            Err(SnowballError::Eof) | Err(SnowballError::CannotRead(_))
        ));
    }

    #[test]
    fn publish_outside_compound_reader_is_rejected() {
        let bytes = written(|_| {});
        let mut reader: Reader<BufferStream, u8> = Reader::new();
        reader
            .set_stream(BufferStream::from_vec(bytes, Mode::Reader))
            .unwrap();
        reader.open().unwrap();
        assert!(matches!(
            reader.publish(1),
            Err(SnowballError::InvalidOperation(_))
        ));
    }

    #[test]
    fn into_variants_fill_caller_buffers() {
        let bytes = written(|w| {
            w.write_ints(0x49, &[5, -6, 7]).unwrap();
            w.write_bytes(0x42, b"abc").unwrap();
        });
        let mut reader = open_reader(bytes);

        let mut ints = [0i32; 8];
        assert_eq!(reader.read_ints_into(0x49, &mut ints).unwrap(), 3);
        assert_eq!(&ints[..3], &[5, -6, 7]);

        let mut small = [0u8; 2];
        assert!(matches!(
            reader.read_bytes_into(0x42, &mut small),
            Err(SnowballError::InvalidOperation(_))
        ));
        let mut buf = [0u8; 3];
        assert_eq!(reader.read_bytes_into(0x42, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
    }
}
