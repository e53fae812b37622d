//! Compact AST Loader.
//!
//! Decodes the little-endian binary format into an [`Ast`]. The byte
//! cursor is modeled on `llvm-bitcode-rs`'s `bits::Cursor` (adapted from
//! bit-level to byte-level reads, since this format is byte-aligned
//! throughout), and node/value tag bytes are decoded with `num_enum`'s
//! `TryFromPrimitive`, the same crate `llvm-bitcode-rs` and `datex-core`
//! use for their own tag bytes.

use std::convert::TryFrom;

use crate::ast::{Ast, AstNode, NodeKind, NumberPayload, Payload, ValueType};
use crate::error::AstFormatError;

const MAGIC: u32 = 0x5054_5341;
const SUPPORTED_VERSION: u16 = 0x0100;

/// Decodes a compact AST buffer. Rejects bad magic/version, `node_count
/// == 0`, a string-table offset past the buffer, a node whose payload
/// overruns the buffer, and any node tagged as a preprocessor directive.
pub fn load(bytes: &[u8]) -> Result<Ast, AstFormatError> {
    let mut cursor = Cursor::new(bytes);

    let magic = cursor.read_u32("header.magic")?;
    if magic != MAGIC {
        return Err(AstFormatError::BadMagic(magic));
    }
    let version = cursor.read_u16("header.version")?;
    if version != SUPPORTED_VERSION {
        return Err(AstFormatError::UnsupportedVersion(version));
    }
    let _flags = cursor.read_u16("header.flags")?;
    let node_count = cursor.read_u32("header.node_count")?;
    if node_count == 0 {
        return Err(AstFormatError::EmptyTree);
    }
    let _string_table_size = cursor.read_u32("header.string_table_size")?;

    let strings = read_string_table(&mut cursor)?;

    let root = read_node(&mut cursor, &strings)?;

    log::debug!(
        "loaded compact AST: {} declared node(s), {} string(s)",
        node_count,
        strings.len()
    );

    Ok(Ast { root, strings })
}

fn read_string_table(cursor: &mut Cursor<'_>) -> Result<Vec<String>, AstFormatError> {
    let count = cursor.read_u32("string_table.count")?;
    let mut strings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = cursor.read_u16("string_table.entry.length")? as usize;
        let bytes = cursor.read_bytes(len, "string_table.entry.data")?;
        let s = std::str::from_utf8(bytes)
            .map_err(|_| AstFormatError::Truncated {
                context: "string_table.entry.data (invalid utf-8)",
            })?
            .to_string();
        let nul = cursor.read_u8("string_table.entry.nul")?;
        if nul != 0 {
            return Err(AstFormatError::Truncated {
                context: "string_table.entry.nul",
            });
        }
        strings.push(s);
    }
    Ok(strings)
}

fn resolve_string<'a>(
    strings: &'a [String],
    index: u32,
    cursor_offset: usize,
) -> Result<&'a str, AstFormatError> {
    strings
        .get(index as usize)
        .map(String::as_str)
        .ok_or(AstFormatError::StringTableOverrun {
            offset: cursor_offset,
            len: strings.len(),
        })
}

fn read_node(cursor: &mut Cursor<'_>, strings: &[String]) -> Result<AstNode, AstFormatError> {
    let kind_byte = cursor.read_u8("node.kind")?;
    let kind = NodeKind::try_from(kind_byte).map_err(|_| AstFormatError::UnknownNodeKind(kind_byte))?;
    if kind == NodeKind::PreprocessorDirective {
        return Err(AstFormatError::PreprocessorDirective);
    }
    let flags = cursor.read_u8("node.flags")?;
    let payload_size = cursor.read_u16("node.payload_size")? as usize;
    let payload_bytes = cursor.read_bytes(payload_size, "node.payload")?;
    let payload = decode_payload(kind, payload_bytes, strings, cursor.offset())?;
    let child_count = cursor.read_u16("node.child_count")?;

    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        children.push(read_node(cursor, strings)?);
    }

    Ok(AstNode::new(kind, flags, payload, children))
}

fn decode_payload(
    kind: NodeKind,
    bytes: &[u8],
    strings: &[String],
    offset: usize,
) -> Result<Payload, AstFormatError> {
    use NodeKind::*;
    match kind {
        NumberLiteral => decode_number_payload(bytes, offset),
        Identifier | StringLiteral | CharLiteral | WideCharLiteral | WideStringLiteral
        | ConstantSymbol | Comment | ErrorNode => {
            let index = read_payload_u32(bytes, offset)?;
            Ok(Payload::Str(resolve_string(strings, index, offset)?.to_string()))
        }
        BinaryExpr | UnaryExpr | PostfixExpr => {
            let index = read_payload_u32(bytes, offset)?;
            Ok(Payload::Operator(
                resolve_string(strings, index, offset)?.to_string(),
            ))
        }
        TypeScalar | TypeStruct | TypeUnion | TypeEnum | TypeRef => {
            let index = read_payload_u32(bytes, offset)?;
            Ok(Payload::TypeName(
                resolve_string(strings, index, offset)?.to_string(),
            ))
        }
        _ => Ok(Payload::None),
    }
}

fn read_payload_u32(bytes: &[u8], offset: usize) -> Result<u32, AstFormatError> {
    let arr: [u8; 4] = bytes
        .get(0..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(AstFormatError::PayloadOverrun { offset })?;
    Ok(u32::from_le_bytes(arr))
}

fn decode_number_payload(bytes: &[u8], offset: usize) -> Result<Payload, AstFormatError> {
    let tag_byte = *bytes.first().ok_or(AstFormatError::PayloadOverrun { offset })?;
    let value_type =
        ValueType::try_from(tag_byte).map_err(|_| AstFormatError::UnknownValueType(tag_byte))?;
    let rest = &bytes[1..];

    let overrun = || AstFormatError::PayloadOverrun { offset };
    let number = match value_type {
        ValueType::Void => NumberPayload::Void,
        ValueType::Bool => NumberPayload::Bool(*rest.first().ok_or_else(overrun)? != 0),
        ValueType::I8 => NumberPayload::Int(*rest.first().ok_or_else(overrun)? as i8 as i32),
        ValueType::U8 => NumberPayload::Int(*rest.first().ok_or_else(overrun)? as i32),
        ValueType::I16 => NumberPayload::Int(read_le::<2>(rest, offset)?.0 as i16 as i32),
        ValueType::U16 => NumberPayload::Int(u16::from_le_bytes(read_le::<2>(rest, offset)?) as i32),
        ValueType::I32 => NumberPayload::Int(i32::from_le_bytes(read_le::<4>(rest, offset)?)),
        ValueType::U32 => {
            NumberPayload::Int(u32::from_le_bytes(read_le::<4>(rest, offset)?) as i32)
        }
        ValueType::I64 => {
            let v = i64::from_le_bytes(read_le::<8>(rest, offset)?);
            if v > i32::MAX as i64 || v < i32::MIN as i64 {
                log::warn!("64-bit literal {v} narrowed to i32, overflow diagnosed");
            }
            NumberPayload::Int(v as i32)
        }
        ValueType::U64 => {
            let v = u64::from_le_bytes(read_le::<8>(rest, offset)?);
            if v > i32::MAX as u64 {
                log::warn!("64-bit literal {v} narrowed to i32, overflow diagnosed");
            }
            NumberPayload::Int(v as i32)
        }
        ValueType::F32 => NumberPayload::Double(f32::from_le_bytes(read_le::<4>(rest, offset)?) as f64),
        ValueType::F64 => NumberPayload::Double(f64::from_le_bytes(read_le::<8>(rest, offset)?)),
        ValueType::Str => {
            return Err(AstFormatError::UnknownValueType(tag_byte));
        }
    };
    Ok(Payload::Number(number))
}

fn read_le<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], AstFormatError> {
    bytes
        .get(0..N)
        .and_then(|s| s.try_into().ok())
        .ok_or(AstFormatError::PayloadOverrun { offset })
}

/// A byte-aligned, forward-only cursor over a borrowed buffer. Every read
/// is bounds-checked against the buffer length, so a truncated or
/// malformed payload is reported rather than read out of bounds.
struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Cursor { buffer, offset: 0 }
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], AstFormatError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(AstFormatError::Truncated { context })?;
        let slice = self
            .buffer
            .get(self.offset..end)
            .ok_or(AstFormatError::Truncated { context })?;
        self.offset = end;
        Ok(slice)
    }

    fn read_u8(&mut self, context: &'static str) -> Result<u8, AstFormatError> {
        Ok(self.read_bytes(1, context)?[0])
    }

    fn read_u16(&mut self, context: &'static str) -> Result<u16, AstFormatError> {
        let bytes = self.read_bytes(2, context)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self, context: &'static str) -> Result<u32, AstFormatError> {
        let bytes = self.read_bytes(4, context)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-builds a compact-AST buffer for a single bare `Identifier`
    /// node named `x`, standing in for real `.ast` fixtures (the writer
    /// that would produce those is out of scope here).
    fn build_single_identifier_ast(name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&SUPPORTED_VERSION.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // flags
        buf.extend_from_slice(&1u32.to_le_bytes()); // node_count

        let mut string_table = Vec::new();
        string_table.extend_from_slice(&1u32.to_le_bytes()); // one string
        string_table.extend_from_slice(&(name.len() as u16).to_le_bytes());
        string_table.extend_from_slice(name.as_bytes());
        string_table.push(0);
        buf.extend_from_slice(&(string_table.len() as u32).to_le_bytes());
        buf.extend_from_slice(&string_table);

        // One Identifier node: kind, flags, payload_size, payload (u32 index 0), child_count=0
        buf.push(NodeKind::Identifier as u8);
        buf.push(0); // flags
        buf.extend_from_slice(&4u16.to_le_bytes()); // payload size
        buf.extend_from_slice(&0u32.to_le_bytes()); // string index 0
        buf.extend_from_slice(&0u16.to_le_bytes()); // child_count

        buf
    }

    #[test]
    fn test_round_trip_single_identifier() {
        let bytes = build_single_identifier_ast("sensorValue");
        let ast = load(&bytes).expect("should decode");
        assert_eq!(ast.root.kind, NodeKind::Identifier);
        assert_eq!(ast.root.text(), "sensorValue");
        assert!(ast.root.children.is_empty());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        assert_eq!(load(&bytes), Err(AstFormatError::BadMagic(0)));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&0x0200u16.to_le_bytes());
        buf.extend_from_slice(&[0u8; 10]);
        assert_eq!(load(&buf), Err(AstFormatError::UnsupportedVersion(0x0200)));
    }

    #[test]
    fn test_rejects_zero_nodes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.extend_from_slice(&SUPPORTED_VERSION.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // node_count = 0
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(load(&buf), Err(AstFormatError::EmptyTree));
    }

    #[test]
    fn test_rejects_truncated_buffer() {
        let bytes = build_single_identifier_ast("x");
        let truncated = &bytes[..bytes.len() - 2];
        assert!(load(truncated).is_err());
    }

    #[test]
    fn test_rejects_preprocessor_directive_node() {
        let mut bytes = build_single_identifier_ast("x");
        // Flip the single node's kind byte to PreprocessorDirective. It's
        // the first byte after the 16-byte header + string table.
        let node_offset = 16 + 4 + 2 + "x".len() + 1;
        bytes[node_offset] = NodeKind::PreprocessorDirective as u8;
        assert_eq!(load(&bytes), Err(AstFormatError::PreprocessorDirective));
    }
}
