// Value types carried by operation-graph results. Besides integers, floats and fixed
// vectors the graph has two non-data types: `ch`, the chain token that orders side
// effects, and `glue`, which ties a flag-producing node to its consumer. Data types map
// one-to-one onto IR types; chain and glue have no IR counterpart. The textual spelling
// (i64, f32, v4i32, ch, glue) is what the graph parser and printer use.

//! Operation-graph value types.

use crate::ir::{ScalarKind, Type};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int(u16),
    F32,
    F64,
    Vector { lanes: u16, elem: ScalarKind },
    /// Chain token.
    Other,
    Glue,
}

impl ValueType {
    pub const I1: ValueType = ValueType::Int(1);
    pub const I8: ValueType = ValueType::Int(8);
    pub const I16: ValueType = ValueType::Int(16);
    pub const I32: ValueType = ValueType::Int(32);
    pub const I64: ValueType = ValueType::Int(64);

    pub fn is_chain(self) -> bool {
        matches!(self, ValueType::Other)
    }

    pub fn is_glue(self) -> bool {
        matches!(self, ValueType::Glue)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ValueType::Int(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }

    pub fn is_vector(self) -> bool {
        matches!(self, ValueType::Vector { .. })
    }

    pub fn bits(self) -> u32 {
        match self {
            ValueType::Int(bits) => bits as u32,
            ValueType::F32 => 32,
            ValueType::F64 => 64,
            ValueType::Vector { lanes, elem } => lanes as u32 * elem.bits(),
            ValueType::Other | ValueType::Glue => 0,
        }
    }

    /// IR type of a data value; `None` for chain and glue.
    pub fn to_ir(self) -> Option<Type> {
        match self {
            ValueType::Int(bits) => Some(Type::Int(bits)),
            ValueType::F32 => Some(Type::F32),
            ValueType::F64 => Some(Type::F64),
            ValueType::Vector { lanes, elem } => Some(Type::Vector { lanes, elem }),
            ValueType::Other | ValueType::Glue => None,
        }
    }

    /// Parse the textual spelling used by graph dumps.
    pub fn parse(text: &str) -> Option<ValueType> {
        match text {
            "ch" | "Other" => return Some(ValueType::Other),
            "glue" => return Some(ValueType::Glue),
            _ => {}
        }
        if let Some(rest) = text.strip_prefix('v') {
            let split = rest.find(|c: char| !c.is_ascii_digit())?;
            let lanes: u16 = rest[..split].parse().ok()?;
            let elem = match ValueType::parse(&rest[split..])? {
                ValueType::Int(bits) => ScalarKind::Int(bits),
                ValueType::F32 => ScalarKind::F32,
                ValueType::F64 => ScalarKind::F64,
                _ => return None,
            };
            return (lanes > 0).then_some(ValueType::Vector { lanes, elem });
        }
        match text {
            "f32" => Some(ValueType::F32),
            "f64" => Some(ValueType::F64),
            _ => {
                let bits: u16 = text.strip_prefix('i')?.parse().ok()?;
                (bits > 0).then_some(ValueType::Int(bits))
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int(bits) => write!(f, "i{bits}"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
            ValueType::Vector { lanes, elem } => write!(f, "v{lanes}{}", Type::from(*elem).mangle()),
            ValueType::Other => write!(f, "ch"),
            ValueType::Glue => write!(f, "glue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        assert_eq!(ValueType::parse("i64"), Some(ValueType::I64));
        assert_eq!(ValueType::parse("ch"), Some(ValueType::Other));
        assert_eq!(
            ValueType::parse("v4i32"),
            Some(ValueType::Vector { lanes: 4, elem: ScalarKind::Int(32) })
        );
        assert_eq!(
            ValueType::parse("v2f64"),
            Some(ValueType::Vector { lanes: 2, elem: ScalarKind::F64 })
        );
        assert_eq!(ValueType::parse("i0"), None);
        assert_eq!(ValueType::parse("x64"), None);
    }

    #[test]
    fn test_display_matches_parse() {
        for text in ["i1", "i32", "f64", "v8i16", "v4f32", "ch", "glue"] {
            assert_eq!(ValueType::parse(text).map(|t| t.to_string()).as_deref(), Some(text));
        }
    }
}
