//! Parsing proto2 default values from their text form.

use tessera_core::FieldType;
use tessera_message::Value;

use crate::descriptor::EnumValueDescriptor;

/// Parse `text` as a default for a field of type `ty`.
///
/// Enum defaults name a value of `enum_values`. Returns `None` if the text
/// does not parse or the type has no defaults (messages).
pub(crate) fn parse_default(
    ty: FieldType,
    text: &str,
    enum_values: &[EnumValueDescriptor],
) -> Option<Value> {
    match ty {
        FieldType::Bool => match text {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            text.parse().ok().map(Value::Int32)
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            text.parse().ok().map(Value::Int64)
        }
        FieldType::UInt32 | FieldType::Fixed32 => text.parse().ok().map(Value::UInt32),
        FieldType::UInt64 | FieldType::Fixed64 => text.parse().ok().map(Value::UInt64),
        FieldType::Float => parse_float(text).map(|x| Value::Float(x as f32)),
        FieldType::Double => parse_float(text).map(Value::Double),
        FieldType::String => Some(Value::String(text.to_owned())),
        FieldType::Bytes => unescape(text).map(Value::Bytes),
        FieldType::Enum => enum_values
            .iter()
            .find(|v| v.name == text)
            .map(|v| Value::Enum(v.number)),
        FieldType::Message => None,
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

/// Undo C-style escaping: `\n \r \t \" \' \\ \ooo \xHH`.
fn unescape(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = *bytes.get(i)?;
        i += 1;
        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'"' | b'\'' | b'\\' | b'?' => out.push(esc),
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                for _ in 0..2 {
                    match bytes.get(i) {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value).ok()?);
            }
            b'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    let Some(d) = bytes.get(i).and_then(|c| (*c as char).to_digit(16)) else {
                        break;
                    };
                    value = value * 16 + d;
                    i += 1;
                    digits += 1;
                }
                if digits == 0 {
                    return None;
                }
                out.push(value as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}
