//! Program schema tables and the little-endian binary layout reader.
//!
//! Each supported program ships a static `ProgramSchema`: event names keyed
//! by 8-byte discriminator with their field layouts, plus instruction
//! discriminators with account-role tables. Payloads are little-endian with
//! length-prefixed strings and sequences, the common on-chain serialization.

use thiserror::Error;

use crate::value::{DataMap, Value};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("buffer underflow reading {what} at byte {at}")]
    Short { what: &'static str, at: usize },
    #[error("string field is not valid utf-8")]
    Utf8,
    #[error("length {len} exceeds cap {cap}")]
    Oversize { len: usize, cap: usize },
}

/// Binary field type descriptor.
#[derive(Debug, Clone, Copy)]
pub enum FieldTy {
    U8,
    U16,
    U32,
    U64,
    U128,
    I32,
    I64,
    Bool,
    /// 32 bytes, rendered base58.
    Pubkey,
    /// u32 length prefix + utf-8 bytes.
    Str,
    /// u8 tag (0/1) + inner value.
    Option(&'static FieldTy),
    /// u32 length prefix + repeated inner values.
    Vec(&'static FieldTy),
    /// Nested struct, preserved as a nested map.
    Struct(&'static [FieldDef]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldTy,
}

#[derive(Debug, Clone, Copy)]
pub struct EventDef {
    pub name: &'static str,
    pub discriminator: [u8; 8],
    pub fields: &'static [FieldDef],
}

#[derive(Debug, Clone, Copy)]
pub struct InstructionDef {
    pub name: &'static str,
    pub discriminator: [u8; 8],
    /// Account roles in instruction-account order; empty entries are
    /// unnamed and skipped.
    pub accounts: &'static [&'static str],
}

/// Static per-program schema, immutable for the process lifetime.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSchema {
    pub address: &'static str,
    pub events: &'static [EventDef],
    pub instructions: &'static [InstructionDef],
}

impl ProgramSchema {
    pub fn event_by_discriminator(&self, disc: &[u8]) -> Option<&'static EventDef> {
        if disc.len() < 8 {
            return None;
        }
        self.events.iter().find(|e| e.discriminator == disc[..8])
    }

    pub fn instruction_by_discriminator(&self, disc: &[u8]) -> Option<&'static InstructionDef> {
        if disc.len() < 8 {
            return None;
        }
        self.instructions
            .iter()
            .find(|i| i.discriminator == disc[..8])
    }
}

const STRING_CAP: usize = 4096;

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], LayoutError> {
        if self.remaining() < n {
            return Err(LayoutError::Short { what, at: self.pos });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn u16(&mut self) -> Result<u16, LayoutError> {
        let b = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, LayoutError> {
        let b = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, LayoutError> {
        let b = self.take(8, "u64")?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn u128(&mut self) -> Result<u128, LayoutError> {
        let b = self.take(16, "u128")?;
        let mut arr = [0u8; 16];
        arr.copy_from_slice(b);
        Ok(u128::from_le_bytes(arr))
    }

    pub fn i32(&mut self) -> Result<i32, LayoutError> {
        let b = self.take(4, "i32")?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i64(&mut self) -> Result<i64, LayoutError> {
        let b = self.take(8, "i64")?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(i64::from_le_bytes(arr))
    }

    pub fn bool(&mut self) -> Result<bool, LayoutError> {
        Ok(self.take(1, "bool")?[0] != 0)
    }

    pub fn pubkey(&mut self) -> Result<String, LayoutError> {
        let b = self.take(32, "pubkey")?;
        Ok(bs58::encode(b).into_string())
    }

    /// Length-prefixed utf-8 string with an upper bound on the declared
    /// length.
    pub fn string(&mut self, cap: usize) -> Result<String, LayoutError> {
        let len = self.u32()? as usize;
        if len > cap {
            return Err(LayoutError::Oversize { len, cap });
        }
        let bytes = self.take(len, "string")?;
        String::from_utf8(bytes.to_vec()).map_err(|_| LayoutError::Utf8)
    }
}

/// Decode one value per the descriptor. u64/u128/i64 become decimal strings,
/// pubkeys become base58 strings, structs become nested maps.
pub fn decode_value(ty: &FieldTy, r: &mut ByteReader<'_>) -> Result<Value, LayoutError> {
    match ty {
        FieldTy::U8 => Ok(Value::Num(r.u8()? as f64)),
        FieldTy::U16 => Ok(Value::Num(r.u16()? as f64)),
        FieldTy::U32 => Ok(Value::Num(r.u32()? as f64)),
        FieldTy::U64 => Ok(Value::big(r.u64()?)),
        FieldTy::U128 => Ok(Value::big(r.u128()?)),
        FieldTy::I32 => Ok(Value::Num(r.i32()? as f64)),
        FieldTy::I64 => Ok(Value::big(r.i64()?)),
        FieldTy::Bool => Ok(Value::Bool(r.bool()?)),
        FieldTy::Pubkey => Ok(Value::Str(r.pubkey()?)),
        FieldTy::Str => Ok(Value::Str(r.string(STRING_CAP)?)),
        FieldTy::Option(inner) => {
            if r.u8()? == 0 {
                Ok(Value::Null)
            } else {
                decode_value(inner, r)
            }
        }
        FieldTy::Vec(inner) => {
            let len = r.u32()? as usize;
            // Each element consumes at least one byte.
            if len > r.remaining() {
                return Err(LayoutError::Oversize {
                    len,
                    cap: r.remaining(),
                });
            }
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(inner, r)?);
            }
            Ok(Value::List(items))
        }
        FieldTy::Struct(fields) => Ok(Value::Map(decode_fields(fields, r)?)),
    }
}

/// Decode an ordered field list into a data map.
pub fn decode_fields(fields: &[FieldDef], r: &mut ByteReader<'_>) -> Result<DataMap, LayoutError> {
    let mut out = DataMap::new();
    for field in fields {
        let value = decode_value(&field.ty, r)?;
        out.insert(field.name.to_string(), value);
    }
    Ok(out)
}
