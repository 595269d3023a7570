//! Decoding of raw byte ranges into typed records.
//!
//! Decoding is pure: given the bytes of one record and its [`StructLayout`],
//! a [`Decode`] implementation pulls named fields out at the exact width,
//! signedness and byte order the layout declares. A short buffer, a
//! missing field or a width disagreement is a [`Error::LayoutMismatch`];
//! nothing falls back to a default value.

use crate::error::{Error, Result};
use crate::layout::{FieldKind, LayoutSet, StructLayout};
use crate::memory::{Address, ReadMemory};

/// A record that can be decoded from a named layout
pub trait Decode: Sized {
    /// Name of the layout in a [`LayoutSet`]
    const LAYOUT: &'static str;

    fn decode_fields(fields: &Fields<'_>) -> Result<Self>;
}

/// Decode one record from `bytes`
pub fn decode<T: Decode>(bytes: &[u8], layout: &StructLayout) -> Result<T> {
    if layout.name != T::LAYOUT {
        return Err(Error::LayoutMismatch(format!(
            "expected {} layout, got {}",
            T::LAYOUT,
            layout.name
        )));
    }
    if bytes.len() < layout.size {
        return Err(Error::LayoutMismatch(format!(
            "{} needs {} bytes, got {}",
            layout.name,
            layout.size,
            bytes.len()
        )));
    }
    T::decode_fields(&Fields { bytes, layout })
}

/// Read and decode the record at `address`
pub fn read_struct<T: Decode, R: ReadMemory + ?Sized>(
    reader: &R,
    layouts: &LayoutSet,
    address: Address,
) -> Result<T> {
    let layout = layouts.get(T::LAYOUT)?;
    let bytes = reader.read_bytes(address.get(), layout.size)?;
    decode(&bytes, layout)
}

/// Field accessor over one record's bytes
pub struct Fields<'a> {
    bytes: &'a [u8],
    layout: &'a StructLayout,
}

impl<'a> Fields<'a> {
    fn raw(&self, name: &str, expected: FieldKind) -> Result<&'a [u8]> {
        let spec = self.layout.field(name)?;
        if spec.kind != expected {
            return Err(Error::LayoutMismatch(format!(
                "{}.{} is {:?}, read as {:?}",
                self.layout.name, name, spec.kind, expected
            )));
        }
        spec.end()
            .and_then(|end| self.bytes.get(spec.offset..end))
            .ok_or_else(|| {
                Error::LayoutMismatch(format!(
                    "{}.{} (offset 0x{:X}, {} bytes) lies outside the 0x{:X}-byte record",
                    self.layout.name,
                    name,
                    spec.offset,
                    spec.kind.width(),
                    self.bytes.len()
                ))
            })
    }

    fn array<const N: usize>(&self, name: &str, kind: FieldKind) -> Result<[u8; N]> {
        let raw = self.raw(name, kind)?;
        raw.try_into().map_err(|_| {
            Error::LayoutMismatch(format!("{}.{} is not {} bytes", self.layout.name, name, N))
        })
    }

    pub fn u8(&self, name: &str) -> Result<u8> {
        Ok(self.raw(name, FieldKind::U8)?[0])
    }

    pub fn u16(&self, name: &str) -> Result<u16> {
        self.array::<2>(name, FieldKind::U16).map(u16::from_le_bytes)
    }

    pub fn u32(&self, name: &str) -> Result<u32> {
        self.array::<4>(name, FieldKind::U32).map(u32::from_le_bytes)
    }

    pub fn i32(&self, name: &str) -> Result<i32> {
        self.array::<4>(name, FieldKind::I32).map(i32::from_le_bytes)
    }

    pub fn u64(&self, name: &str) -> Result<u64> {
        self.array::<8>(name, FieldKind::U64).map(u64::from_le_bytes)
    }

    pub fn ptr(&self, name: &str) -> Result<Address> {
        self.array::<8>(name, FieldKind::Ptr)
            .map(|b| Address::new(u64::from_le_bytes(b)))
    }

    pub fn bytes(&self, name: &str) -> Result<&'a [u8]> {
        let spec = self.layout.field(name)?;
        match spec.kind {
            FieldKind::Bytes(len) => self.raw(name, FieldKind::Bytes(len)),
            other => Err(Error::LayoutMismatch(format!(
                "{}.{} is {:?}, read as bytes",
                self.layout.name, name, other
            ))),
        }
    }
}
