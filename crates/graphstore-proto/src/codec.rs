//! Pluggable (de)serialization for [`Data`] payloads.
//!
//! Two codecs are provided, matching the two storage shapes backends tend
//! to expose: [`PropertyMapCodec`] writes a compact tagged binary form
//! suitable for a key-value or columnar store, and [`TextualCodec`] writes
//! JSON suitable for a document store or for human inspection. Both codecs
//! round-trip the same [`Data`] values; callers pick whichever matches
//! their backend.

use crate::data::Data;
use crate::error::CodecError;
use crate::value::Value;

/// A pluggable serializer/deserializer for [`Data`] payloads.
pub trait Codec {
    fn serialize(&self, data: &Data) -> Vec<u8>;
    fn deserialize(&self, bytes: &[u8], class_hint: &str) -> Result<Data, CodecError>;
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq)]
enum ValueTag {
    Null = 0,
    Bool = 1,
    Int32 = 2,
    Int64 = 3,
    Float32 = 4,
    Float64 = 5,
    String = 6,
    Bytes = 7,
    Timestamp = 8,
    Uuid = 9,
    BoolArray = 10,
    Int32Array = 11,
    Int64Array = 12,
    Float32Array = 13,
    Float64Array = 14,
    StringArray = 15,
    UuidArray = 16,
}

impl TryFrom<u8> for ValueTag {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, CodecError> {
        Ok(match tag {
            0 => ValueTag::Null,
            1 => ValueTag::Bool,
            2 => ValueTag::Int32,
            3 => ValueTag::Int64,
            4 => ValueTag::Float32,
            5 => ValueTag::Float64,
            6 => ValueTag::String,
            7 => ValueTag::Bytes,
            8 => ValueTag::Timestamp,
            9 => ValueTag::Uuid,
            10 => ValueTag::BoolArray,
            11 => ValueTag::Int32Array,
            12 => ValueTag::Int64Array,
            13 => ValueTag::Float32Array,
            14 => ValueTag::Float64Array,
            15 => ValueTag::StringArray,
            16 => ValueTag::UuidArray,
            other => return Err(CodecError::UnknownTag(other)),
        })
    }
}

/// Tagged binary codec: each field is written as a length-prefixed name
/// followed by a one-byte type tag and the value's native encoding.
pub struct PropertyMapCodec;

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.bytes.len() {
            return Err(CodecError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_string(&mut self) -> Result<String, CodecError> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.push(ValueTag::Null as u8),
        Value::Bool(b) => {
            out.push(ValueTag::Bool as u8);
            out.push(*b as u8);
        }
        Value::Int32(i) => {
            out.push(ValueTag::Int32 as u8);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Int64(i) => {
            out.push(ValueTag::Int64 as u8);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float32(f) => {
            out.push(ValueTag::Float32 as u8);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Float64(f) => {
            out.push(ValueTag::Float64 as u8);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::String(s) => {
            out.push(ValueTag::String as u8);
            write_string(out, s);
        }
        Value::Bytes(b) => {
            out.push(ValueTag::Bytes as u8);
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        Value::Timestamp(t) => {
            out.push(ValueTag::Timestamp as u8);
            out.extend_from_slice(&t.to_le_bytes());
        }
        Value::Uuid(u) => {
            out.push(ValueTag::Uuid as u8);
            out.extend_from_slice(u);
        }
        Value::BoolArray(items) => {
            out.push(ValueTag::BoolArray as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for b in items {
                out.push(*b as u8);
            }
        }
        Value::Int32Array(items) => {
            out.push(ValueTag::Int32Array as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for i in items {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        Value::Int64Array(items) => {
            out.push(ValueTag::Int64Array as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for i in items {
                out.extend_from_slice(&i.to_le_bytes());
            }
        }
        Value::Float32Array(items) => {
            out.push(ValueTag::Float32Array as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for f in items {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
        Value::Float64Array(items) => {
            out.push(ValueTag::Float64Array as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for f in items {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
        Value::StringArray(items) => {
            out.push(ValueTag::StringArray as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for s in items {
                write_string(out, s);
            }
        }
        Value::UuidArray(items) => {
            out.push(ValueTag::UuidArray as u8);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for u in items {
                out.extend_from_slice(u);
            }
        }
    }
}

fn read_value(r: &mut Reader<'_>) -> Result<Value, CodecError> {
    let tag = ValueTag::try_from(r.take_u8()?)?;
    Ok(match tag {
        ValueTag::Null => Value::Null,
        ValueTag::Bool => Value::Bool(r.take_u8()? != 0),
        ValueTag::Int32 => Value::Int32(i32::from_le_bytes(r.take(4)?.try_into().unwrap())),
        ValueTag::Int64 => Value::Int64(i64::from_le_bytes(r.take(8)?.try_into().unwrap())),
        ValueTag::Float32 => Value::Float32(f32::from_le_bytes(r.take(4)?.try_into().unwrap())),
        ValueTag::Float64 => Value::Float64(f64::from_le_bytes(r.take(8)?.try_into().unwrap())),
        ValueTag::String => Value::String(r.take_string()?),
        ValueTag::Bytes => {
            let len = r.take_u32()? as usize;
            Value::Bytes(r.take(len)?.to_vec())
        }
        ValueTag::Timestamp => {
            Value::Timestamp(i64::from_le_bytes(r.take(8)?.try_into().unwrap()))
        }
        ValueTag::Uuid => Value::Uuid(r.take(16)?.try_into().unwrap()),
        ValueTag::BoolArray => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(r.take_u8()? != 0);
            }
            Value::BoolArray(items)
        }
        ValueTag::Int32Array => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(i32::from_le_bytes(r.take(4)?.try_into().unwrap()));
            }
            Value::Int32Array(items)
        }
        ValueTag::Int64Array => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(i64::from_le_bytes(r.take(8)?.try_into().unwrap()));
            }
            Value::Int64Array(items)
        }
        ValueTag::Float32Array => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(f32::from_le_bytes(r.take(4)?.try_into().unwrap()));
            }
            Value::Float32Array(items)
        }
        ValueTag::Float64Array => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(f64::from_le_bytes(r.take(8)?.try_into().unwrap()));
            }
            Value::Float64Array(items)
        }
        ValueTag::StringArray => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(r.take_string()?);
            }
            Value::StringArray(items)
        }
        ValueTag::UuidArray => {
            let len = r.take_u32()? as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(r.take(16)?.try_into().unwrap());
            }
            Value::UuidArray(items)
        }
    })
}

impl Codec for PropertyMapCodec {
    fn serialize(&self, data: &Data) -> Vec<u8> {
        let mut out = Vec::new();
        write_string(&mut out, &data.class);
        out.extend_from_slice(&(data.fields.len() as u32).to_le_bytes());
        for (name, value) in &data.fields {
            write_string(&mut out, name);
            write_value(&mut out, value);
        }
        out
    }

    fn deserialize(&self, bytes: &[u8], class_hint: &str) -> Result<Data, CodecError> {
        let mut r = Reader::new(bytes);
        let class = r.take_string()?;
        let field_count = r.take_u32()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let name = r.take_string()?;
            let value = read_value(&mut r)?;
            fields.push((name, value));
        }
        let class = if class.is_empty() {
            class_hint.to_string()
        } else {
            class
        };
        Ok(Data { class, fields })
    }
}

/// JSON codec: `Data` becomes
/// `{"class": ..., "fields": [{"name": .., "value": ..}, ...]}`.
///
/// `fields` is an array of name/value pairs, not a JSON object — `serde_json`
/// backs objects with a plain (alphabetically ordered) `BTreeMap` unless the
/// crate's `preserve_order` feature is enabled, which this workspace does not
/// do. `Data::fields` order is part of its `PartialEq`, so an object would
/// silently permute fields on every round trip.
pub struct TextualCodec;

/// Converts a [`Value`] to its JSON form. `Int32`/`Float32` (and their array
/// variants) are wrapped in a tagged object, the same way `Timestamp` already
/// is, since plain JSON numbers and arrays carry no width of their own and
/// would otherwise come back as `Int64`/`Float64` on the way in.
fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::json;
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int32(i) => json!({ "$i32": i }),
        Value::Int64(i) => json!(i),
        Value::Float32(f) => json!({ "$f32": f }),
        Value::Float64(f) => json!(f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => json!(hex::encode(b)),
        Value::Timestamp(t) => json!({ "$timestamp": t }),
        Value::Uuid(u) => json!(hex::encode(u)),
        Value::BoolArray(items) => json!(items),
        Value::Int32Array(items) => json!({ "$i32array": items }),
        Value::Int64Array(items) => json!(items),
        Value::Float32Array(items) => json!({ "$f32array": items }),
        Value::Float64Array(items) => json!(items),
        Value::StringArray(items) => json!(items),
        Value::UuidArray(items) => json!(items
            .iter()
            .map(hex::encode)
            .collect::<Vec<_>>()),
    }
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, CodecError> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float64(f)
            } else {
                return Err(CodecError::Deserialization(format!(
                    "unsupported number: {n}"
                )));
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            if items.iter().all(|v| v.is_string()) {
                Value::StringArray(
                    items
                        .iter()
                        .map(|v| v.as_str().unwrap().to_string())
                        .collect(),
                )
            } else if items.iter().all(|v| v.is_i64() || v.is_u64()) {
                Value::Int64Array(items.iter().map(|v| v.as_i64().unwrap()).collect())
            } else if items.iter().all(|v| v.is_number()) {
                Value::Float64Array(items.iter().map(|v| v.as_f64().unwrap()).collect())
            } else if items.iter().all(|v| v.is_boolean()) {
                Value::BoolArray(items.iter().map(|v| v.as_bool().unwrap()).collect())
            } else if items.is_empty() {
                Value::StringArray(Vec::new())
            } else {
                return Err(CodecError::Deserialization(
                    "unsupported mixed-type array".into(),
                ));
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(t) = map.get("$timestamp").and_then(|v| v.as_i64()) {
                Value::Timestamp(t)
            } else if let Some(i) = map.get("$i32").and_then(|v| v.as_i64()) {
                Value::Int32(i as i32)
            } else if let Some(f) = map.get("$f32").and_then(|v| v.as_f64()) {
                Value::Float32(f as f32)
            } else if let Some(items) = map.get("$i32array").and_then(|v| v.as_array()) {
                Value::Int32Array(
                    items
                        .iter()
                        .map(|v| v.as_i64().map(|i| i as i32))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| CodecError::Deserialization("invalid $i32array entry".into()))?,
                )
            } else if let Some(items) = map.get("$f32array").and_then(|v| v.as_array()) {
                Value::Float32Array(
                    items
                        .iter()
                        .map(|v| v.as_f64().map(|f| f as f32))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| CodecError::Deserialization("invalid $f32array entry".into()))?,
                )
            } else {
                return Err(CodecError::Deserialization(
                    "unsupported nested object value".into(),
                ));
            }
        }
    })
}

impl Codec for TextualCodec {
    fn serialize(&self, data: &Data) -> Vec<u8> {
        let fields: Vec<serde_json::Value> = data
            .fields
            .iter()
            .map(|(name, value)| {
                serde_json::json!({ "name": name, "value": value_to_json(value) })
            })
            .collect();
        let envelope = serde_json::json!({
            "class": data.class,
            "fields": fields,
        });
        serde_json::to_vec(&envelope).expect("json serialization of Data cannot fail")
    }

    fn deserialize(&self, bytes: &[u8], class_hint: &str) -> Result<Data, CodecError> {
        let envelope: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::Deserialization(e.to_string()))?;
        let class = envelope
            .get("class")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| class_hint.to_string());
        let fields_arr = envelope
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| CodecError::Deserialization("missing fields array".into()))?;
        let mut fields = Vec::with_capacity(fields_arr.len());
        for entry in fields_arr {
            let name = entry
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| CodecError::Deserialization("missing field name".into()))?
                .to_string();
            let value_json = entry
                .get("value")
                .ok_or_else(|| CodecError::Deserialization("missing field value".into()))?;
            fields.push((name, json_to_value(value_json)?));
        }
        Ok(Data { class, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Data {
        Data::new("person")
            .with_field("name", "Ada Lovelace")
            .with_field("age", 36i64)
            .with_field("active", true)
            .with_field("score", 3.5f64)
            .with_field("tags", vec!["math".to_string(), "computing".to_string()])
    }

    #[test]
    fn property_map_roundtrip() {
        let codec = PropertyMapCodec;
        let data = sample();
        let bytes = codec.serialize(&data);
        let decoded = codec.deserialize(&bytes, "unused").unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn textual_roundtrip_scalars() {
        // Field names are deliberately not alphabetical (name, age, active)
        // so a codec that round-trips through an unordered JSON object would
        // come back permuted and fail this `assert_eq!`.
        let codec = TextualCodec;
        let data = Data::new("person")
            .with_field("name", "Grace Hopper")
            .with_field("age", 85i64)
            .with_field("active", false);
        let bytes = codec.serialize(&data);
        let decoded = codec.deserialize(&bytes, "unused").unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn textual_roundtrip_preserves_narrow_numeric_widths() {
        let codec = TextualCodec;
        let data = Data::new("metrics")
            .with_field("count32", 7i32)
            .with_field("ratio32", 0.5f32)
            .with_field("counts32", vec![1i32, 2, 3])
            .with_field("count64", 7i64)
            .with_field("ratio64", 0.5f64);
        let bytes = codec.serialize(&data);
        let decoded = codec.deserialize(&bytes, "unused").unwrap();
        assert_eq!(data, decoded);
        assert!(matches!(decoded.get("count32"), Some(Value::Int32(7))));
        assert!(matches!(decoded.get("ratio32"), Some(Value::Float32(_))));
        assert!(matches!(decoded.get("counts32"), Some(Value::Int32Array(_))));
        assert!(matches!(decoded.get("count64"), Some(Value::Int64(7))));
        assert!(matches!(decoded.get("ratio64"), Some(Value::Float64(_))));
    }

    #[test]
    fn property_map_handles_empty_data() {
        let codec = PropertyMapCodec;
        let data = Data::new("empty");
        let bytes = codec.serialize(&data);
        let decoded = codec.deserialize(&bytes, "unused").unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut bytes = Vec::new();
        write_string(&mut bytes, "x");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        write_string(&mut bytes, "field");
        bytes.push(200);
        let codec = PropertyMapCodec;
        assert!(matches!(
            codec.deserialize(&bytes, "x"),
            Err(CodecError::UnknownTag(200))
        ));
    }
}
