// src/session/writer.rs

//! The write session.
//!
//! Chunks are staged entirely in memory: every write lands in the *active*
//! buffer, which is the main body except while a compound body is being
//! serialized. Compounds are deduplicated by caller-supplied identity and
//! staged in per-compound buffers; `close` computes the section offsets and
//! assembles the whole file onto the bound stream in one pass.

use super::SessionCore;
use crate::stream::{BufferStream, Mode, Stream};
use crate::utils::error::{Result, SnowballError};
use crate::wire::WireWrite;
use crate::wire::frame::{
    ARRAY_HEADER_SIZE, ChunkHeader, ChunkKind, DATA_NAME, HEADER_SIZE, MAGIC, ROOT_SIZE, Root,
};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{self, Write};

/// Opaque identity of a compound sub-object within one write session.
///
/// The session only compares identities: equal tokens share one serialized
/// body, distinct tokens get distinct bodies, and an assignment is never
/// revoked. Arena-backed graphs typically use the arena index,
/// `Rc`-backed graphs `Rc::as_ptr(..) as u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompoundId(pub u64);

/// Handle to the buffer currently receiving chunks.
#[derive(Debug, Clone, Copy)]
enum ActiveBuffer {
    Main,
    Compound(usize),
}

/// A write session over a [`Stream`].
///
/// Lifecycle: [`Writer::set_stream`] while closed, [`Writer::open`], any
/// number of typed writes, then [`Writer::close`], which assembles and emits
/// the file. A session whose write failed should be discarded; nothing is
/// rolled back.
pub struct Writer<S> {
    core: SessionCore<S>,
    main: BufferStream,
    active: ActiveBuffer,
    suspended: Vec<ActiveBuffer>,
    compounds: Vec<BufferStream>,
    indices: HashMap<CompoundId, u32>,
}

impl<S: Stream> Writer<S> {
    pub fn new() -> Self {
        Self {
            core: SessionCore::new(Mode::Writer),
            main: BufferStream::new(Mode::Writer),
            active: ActiveBuffer::Main,
            suspended: Vec::new(),
            compounds: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Binds the output stream. Only legal while the session is closed; the
    /// stream's current position becomes the start of the snowball.
    pub fn set_stream(&mut self, stream: S) -> Result<()> {
        let r = self.core.bind(stream);
        self.core.track(r)
    }

    pub fn open(&mut self) -> Result<()> {
        let r = self.open_inner();
        self.core.track(r)
    }

    /// Assembles and writes the file, then releases all staged buffers.
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

    /// Writes a single IEEE-754 binary32 chunk.
    pub fn write_float(&mut self, name: u32, value: f32) -> Result<()> {
        let r = self.write_primitive(ChunkKind::Float, name, &value.to_le_bytes());
        self.core.track(r)
    }

    /// Writes a single unsigned 32-bit integer chunk.
    pub fn write_uint(&mut self, name: u32, value: u32) -> Result<()> {
        let r = self.write_primitive(ChunkKind::Uint32, name, &value.to_le_bytes());
        self.core.track(r)
    }

    /// Writes a single signed 32-bit integer chunk.
    pub fn write_int(&mut self, name: u32, value: i32) -> Result<()> {
        let r = self.write_primitive(ChunkKind::Sint32, name, &value.to_le_bytes());
        self.core.track(r)
    }

    /// Writes a float array chunk; an empty slice degenerates into a null
    /// chunk.
    pub fn write_floats(&mut self, name: u32, values: &[f32]) -> Result<()> {
        let r = self.write_primitive_array(ChunkKind::Float, name, values.len(), |buf| {
            buf.write_f32_slice(values)
        });
        self.core.track(r)
    }

    /// Writes an unsigned integer array chunk; an empty slice degenerates
    /// into a null chunk.
    pub fn write_uints(&mut self, name: u32, values: &[u32]) -> Result<()> {
        let r = self.write_primitive_array(ChunkKind::Uint32, name, values.len(), |buf| {
            buf.write_u32_slice(values)
        });
        self.core.track(r)
    }

    /// Writes a signed integer array chunk; an empty slice degenerates into
    /// a null chunk.
    pub fn write_ints(&mut self, name: u32, values: &[i32]) -> Result<()> {
        let r = self.write_primitive_array(ChunkKind::Sint32, name, values.len(), |buf| {
            buf.write_i32_slice(values)
        });
        self.core.track(r)
    }

    /// Writes a raw byte run; an empty slice degenerates into a null chunk.
    pub fn write_bytes(&mut self, name: u32, values: &[u8]) -> Result<()> {
        let r = self.write_bytes_inner(name, values);
        self.core.track(r)
    }

    /// Serializes a compound sub-object and emits a reference to it.
    ///
    /// The first time an identity is seen, a fresh buffer becomes the active
    /// one and `write_body` serializes the body into it; `write_body` may
    /// recursively write further chunks on the same session, including other
    /// compounds and references back to this one. Later writes of the same
    /// identity emit only the reference. `None` degenerates into a null
    /// chunk.
    pub fn write_compound<F>(
        &mut self,
        name: u32,
        compound: Option<CompoundId>,
        mut write_body: F,
    ) -> Result<()>
    where
        F: FnMut(CompoundId, &mut Self) -> Result<()>,
    {
        let r = self.write_compound_inner(name, compound, &mut write_body);
        self.core.track(r)
    }

    /// Serializes an array of compounds as inline references, resolving (or
    /// newly assigning) each identity exactly as [`Writer::write_compound`]
    /// does. An empty slice degenerates into a null chunk.
    pub fn write_compounds<F>(
        &mut self,
        name: u32,
        compounds: &[CompoundId],
        mut write_body: F,
    ) -> Result<()>
    where
        F: FnMut(CompoundId, &mut Self) -> Result<()>,
    {
        let r = self.write_compounds_inner(name, compounds, &mut write_body);
        self.core.track(r)
    }

    fn open_inner(&mut self) -> Result<()> {
        self.core.require_closed()?;
        if !self.core.has_stream() {
            return Err(SnowballError::InvalidStream);
        }

        self.main = BufferStream::new(Mode::Writer);
        self.active = ActiveBuffer::Main;
        self.suspended.clear();
        self.compounds.clear();
        self.indices.clear();
        self.core.set_open(true);
        debug!("write session opened");
        Ok(())
    }

    fn close_inner(&mut self) -> Result<()> {
        self.core.require_open()?;

        let compounds = std::mem::take(&mut self.compounds);
        let main = std::mem::replace(&mut self.main, BufferStream::new(Mode::Writer));
        self.indices.clear();
        self.suspended.clear();
        self.active = ActiveBuffer::Main;

        let num_compounds = compounds.len() as u32;
        let compounds_size: u32 = compounds
            .iter()
            .map(|body| HEADER_SIZE + body.len() as u32)
            .sum();
        let mappings_offset = ROOT_SIZE;
        let compounds_offset = mappings_offset + num_compounds * 4;
        let data_offset = compounds_offset + compounds_size;
        let data_size = HEADER_SIZE + main.len() as u32;
        let root = Root {
            magic: MAGIC,
            size: data_offset + data_size,
            num_compounds,
            mappings_offset,
            compounds_offset,
            data_offset,
        };

        self.put_root(&root)?;

        // Mapping table: byte distance from the start of the compound
        // section to each compound's header.
        let mut mapping = 0u32;
        for body in &compounds {
            self.put_u32(mapping)?;
            mapping += HEADER_SIZE + body.len() as u32;
        }

        for (i, body) in compounds.iter().enumerate() {
            let header = ChunkHeader::new(
                ChunkKind::Compound,
                i as u32 + 1,
                HEADER_SIZE + body.len() as u32,
            );
            self.put_header(&header)?;
            self.put(body.as_slice())?;
        }

        let header = ChunkHeader::new(ChunkKind::Data, DATA_NAME, data_size);
        self.put_header(&header)?;
        self.put(main.as_slice())?;

        self.core.set_open(false);
        debug!(
            "write session closed: {} compounds, {} bytes",
            num_compounds, root.size
        );
        Ok(())
    }

    fn write_bytes_inner(&mut self, name: u32, values: &[u8]) -> Result<()> {
        self.core.require_open()?;
        if values.is_empty() {
            return self.write_null(name);
        }
        self.write_primitive(ChunkKind::Bytes, name, values)
    }

    fn write_compound_inner(
        &mut self,
        name: u32,
        compound: Option<CompoundId>,
        write_body: &mut dyn FnMut(CompoundId, &mut Self) -> Result<()>,
    ) -> Result<()> {
        self.core.require_open()?;
        let Some(id) = compound else {
            return self.write_null(name);
        };
        let index = self.store_compound(id, write_body)?;
        self.write_primitive(ChunkKind::CompoundRef, name, &index.to_le_bytes())
    }

    fn write_compounds_inner(
        &mut self,
        name: u32,
        compounds: &[CompoundId],
        write_body: &mut dyn FnMut(CompoundId, &mut Self) -> Result<()>,
    ) -> Result<()> {
        self.core.require_open()?;
        if compounds.is_empty() {
            return self.write_null(name);
        }

        let size = ARRAY_HEADER_SIZE + compounds.len() as u32 * 4;
        self.emit_header(ChunkKind::Array, name, size)?;
        self.emit_array_prefix(compounds.len() as u32, ChunkKind::CompoundRef)?;
        for &id in compounds {
            let index = self.store_compound(id, &mut *write_body)?;
            // The reference lands inline in the array payload, in whichever
            // buffer was active when the array chunk began.
            self.emit(&index.to_le_bytes())?;
        }
        Ok(())
    }

    /// Resolves an identity to its 1-based index, staging the body through
    /// `write_body` on first sight. The identity is registered before the
    /// body runs so self-references resolve to the index being assigned.
    fn store_compound(
        &mut self,
        id: CompoundId,
        write_body: &mut dyn FnMut(CompoundId, &mut Self) -> Result<()>,
    ) -> Result<u32> {
        if let Some(&index) = self.indices.get(&id) {
            return Ok(index);
        }

        self.compounds.push(BufferStream::new(Mode::Writer));
        let index = self.compounds.len() as u32;
        self.indices.insert(id, index);
        trace!("compound {:?} assigned index {}", id, index);

        self.suspended.push(self.active);
        self.active = ActiveBuffer::Compound(index as usize - 1);
        let result = write_body(id, self);
        self.active = self
            .suspended
            .pop()
            .expect("suspended buffer stack underflow");
        result.map(|_| index)
    }

    fn write_primitive(&mut self, kind: ChunkKind, name: u32, payload: &[u8]) -> Result<()> {
        self.core.require_open()?;
        self.emit_header(kind, name, HEADER_SIZE + payload.len() as u32)?;
        self.emit(payload)
    }

    fn write_primitive_array<F>(
        &mut self,
        element_kind: ChunkKind,
        name: u32,
        length: usize,
        write_payload: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut BufferStream) -> io::Result<()>,
    {
        self.core.require_open()?;
        if length == 0 {
            return self.write_null(name);
        }

        // Every array element kind on the wire is four bytes wide.
        let size = ARRAY_HEADER_SIZE + length as u32 * 4;
        self.emit_header(ChunkKind::Array, name, size)?;
        self.emit_array_prefix(length as u32, element_kind)?;
        write_payload(self.active_mut()).map_err(|e| self.core.io_error(e))
    }

    fn write_null(&mut self, name: u32) -> Result<()> {
        self.emit_header(ChunkKind::NullPointer, name, HEADER_SIZE)
    }

    fn active_mut(&mut self) -> &mut BufferStream {
        match self.active {
            ActiveBuffer::Main => &mut self.main,
            ActiveBuffer::Compound(i) => &mut self.compounds[i],
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.active_mut()
            .write_all(bytes)
            .map_err(|e| self.core.io_error(e))
    }

    fn emit_header(&mut self, kind: ChunkKind, name: u32, size: u32) -> Result<()> {
        ChunkHeader::new(kind, name, size)
            .write(self.active_mut())
            .map_err(|e| self.core.io_error(e))
    }

    fn emit_array_prefix(&mut self, length: u32, element_kind: ChunkKind) -> Result<()> {
        let r = {
            let buf = self.active_mut();
            buf.write_u32(length)
                .and_then(|_| buf.write_u32(element_kind.tag()))
        };
        r.map_err(|e| self.core.io_error(e))
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        let r = self.core.stream_mut()?.write_all(bytes);
        r.map_err(|e| self.core.io_error(e))
    }

    fn put_u32(&mut self, value: u32) -> Result<()> {
        let r = self.core.stream_mut()?.write_u32(value);
        r.map_err(|e| self.core.io_error(e))
    }

    fn put_root(&mut self, root: &Root) -> Result<()> {
        let r = root.write(self.core.stream_mut()?);
        r.map_err(|e| self.core.io_error(e))
    }

    fn put_header(&mut self, header: &ChunkHeader) -> Result<()> {
        let r = header.write(self.core.stream_mut()?);
        r.map_err(|e| self.core.io_error(e))
    }
}

impl<S: Stream> Default for Writer<S> {
    fn default() -> Self {
        Self::new()
    }
}
