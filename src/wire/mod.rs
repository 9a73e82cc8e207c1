// src/wire/mod.rs

//! Fixed-width wire primitives with base-endian normalization.
//!
//! Everything multi-byte is little-endian on the wire; this module is the
//! only place where byte order is touched. Scalar access goes through the
//! [`WireRead`]/[`WireWrite`] extension traits, bulk array payloads through
//! the `Pod` wrapper types ([`LeU32`], [`LeI32`], [`LeF32`]) so whole slices
//! can be cast to and from raw bytes.

pub mod frame;

use bytemuck::{Pod, Zeroable, cast_slice, cast_slice_mut};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Little-endian primitive reads over any `Read`.
pub trait WireRead: Read {
    fn read_u32(&mut self) -> io::Result<u32> {
        ReadBytesExt::read_u32::<LittleEndian>(self)
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        ReadBytesExt::read_i32::<LittleEndian>(self)
    }

    fn read_f32(&mut self) -> io::Result<f32> {
        ReadBytesExt::read_f32::<LittleEndian>(self)
    }

    /// Reads `count` u32 values in wire order.
    fn read_u32_slice(&mut self, count: usize) -> io::Result<Vec<u32>> {
        let mut buffer = vec![0u8; count * 4];
        self.read_exact(&mut buffer)?;
        let values: &[LeU32] = cast_slice(&buffer);
        Ok(values.iter().map(|&v| v.into()).collect())
    }

    fn read_i32_slice(&mut self, count: usize) -> io::Result<Vec<i32>> {
        let mut buffer = vec![0u8; count * 4];
        self.read_exact(&mut buffer)?;
        let values: &[LeI32] = cast_slice(&buffer);
        Ok(values.iter().map(|&v| v.into()).collect())
    }

    fn read_f32_slice(&mut self, count: usize) -> io::Result<Vec<f32>> {
        let mut buffer = vec![0u8; count * 4];
        self.read_exact(&mut buffer)?;
        let values: &[LeF32] = cast_slice(&buffer);
        Ok(values.iter().map(|&v| v.into()).collect())
    }

    /// Reads directly into a caller buffer, normalizing in place.
    fn read_u32_slice_into(&mut self, out: &mut [u32]) -> io::Result<()> {
        self.read_exact(cast_slice_mut(out))?;
        for value in out.iter_mut() {
            *value = u32::from_le(*value);
        }
        Ok(())
    }

    fn read_i32_slice_into(&mut self, out: &mut [i32]) -> io::Result<()> {
        self.read_exact(cast_slice_mut(out))?;
        for value in out.iter_mut() {
            *value = i32::from_le(*value);
        }
        Ok(())
    }

    fn read_f32_slice_into(&mut self, out: &mut [f32]) -> io::Result<()> {
        self.read_exact(cast_slice_mut(out))?;
        for value in out.iter_mut() {
            *value = f32::from_bits(u32::from_le(value.to_bits()));
        }
        Ok(())
    }
}

impl<R: Read + ?Sized> WireRead for R {}

/// Little-endian primitive writes over any `Write`.
pub trait WireWrite: Write {
    fn write_u32(&mut self, value: u32) -> io::Result<()> {
        WriteBytesExt::write_u32::<LittleEndian>(self, value)
    }

    fn write_i32(&mut self, value: i32) -> io::Result<()> {
        WriteBytesExt::write_i32::<LittleEndian>(self, value)
    }

    fn write_f32(&mut self, value: f32) -> io::Result<()> {
        WriteBytesExt::write_f32::<LittleEndian>(self, value)
    }

    /// Writes a slice of u32 values in wire order using bytemuck.
    fn write_u32_slice(&mut self, values: &[u32]) -> io::Result<()> {
        let wire: Vec<LeU32> = values.iter().map(|&v| v.into()).collect();
        self.write_all(cast_slice(&wire))
    }

    fn write_i32_slice(&mut self, values: &[i32]) -> io::Result<()> {
        let wire: Vec<LeI32> = values.iter().map(|&v| v.into()).collect();
        self.write_all(cast_slice(&wire))
    }

    fn write_f32_slice(&mut self, values: &[f32]) -> io::Result<()> {
        let wire: Vec<LeF32> = values.iter().map(|&v| v.into()).collect();
        self.write_all(cast_slice(&wire))
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

/// Little-endian u32 that can be safely cast to/from bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LeU32([u8; 4]);

/// Little-endian i32 that can be safely cast to/from bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LeI32([u8; 4]);

/// Little-endian IEEE-754 binary32 that can be safely cast to/from bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LeF32([u8; 4]);

impl From<u32> for LeU32 {
    fn from(value: u32) -> Self {
        LeU32(value.to_le_bytes())
    }
}

impl From<LeU32> for u32 {
    fn from(value: LeU32) -> Self {
        u32::from_le_bytes(value.0)
    }
}

impl From<i32> for LeI32 {
    fn from(value: i32) -> Self {
        LeI32(value.to_le_bytes())
    }
}

impl From<LeI32> for i32 {
    fn from(value: LeI32) -> Self {
        i32::from_le_bytes(value.0)
    }
}

impl From<f32> for LeF32 {
    fn from(value: f32) -> Self {
        LeF32(value.to_le_bytes())
    }
}

impl From<LeF32> for f32 {
    fn from(value: LeF32) -> Self {
        f32::from_le_bytes(value.0)
    }
}
