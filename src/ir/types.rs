// This module defines the type vocabulary of the output IR. Type covers the handful of
// first-class types the lifter produces: void, arbitrary-width integers, the two IEEE
// float widths, an opaque pointer and fixed-length vectors of scalars. ScalarKind is the
// element vocabulary shared with the operation graph's value types, so a vector value
// type converts to an IR vector type without a lookup table. Types print in the familiar
// LLVM spelling (i64, double, ptr, <4 x i32>).

//! IR type vocabulary.

use std::fmt;

/// Scalar element kinds shared by IR vectors and graph vector value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int(u16),
    F32,
    F64,
}

impl ScalarKind {
    /// Width of one element in bits.
    pub fn bits(self) -> u32 {
        match self {
            ScalarKind::Int(bits) => bits as u32,
            ScalarKind::F32 => 32,
            ScalarKind::F64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }
}

/// First-class IR types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int(u16),
    F32,
    F64,
    Ptr,
    Vector { lanes: u16, elem: ScalarKind },
}

impl Type {
    pub const I1: Type = Type::Int(1);
    pub const I8: Type = Type::Int(8);
    pub const I16: Type = Type::Int(16);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);

    pub fn is_void(self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_pointer(self) -> bool {
        matches!(self, Type::Ptr)
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Type::Vector { .. })
    }

    /// Total width in bits. Pointers are 64 bits wide; void has no width.
    pub fn bits(self) -> u32 {
        match self {
            Type::Void => 0,
            Type::Int(bits) => bits as u32,
            Type::F32 => 32,
            Type::F64 => 64,
            Type::Ptr => 64,
            Type::Vector { lanes, elem } => lanes as u32 * elem.bits(),
        }
    }

    /// Element type of a vector, or the type itself for scalars.
    pub fn element(self) -> Type {
        match self {
            Type::Vector { elem, .. } => Type::from(elem),
            other => other,
        }
    }

    pub fn lanes(self) -> Option<u16> {
        match self {
            Type::Vector { lanes, .. } => Some(lanes),
            _ => None,
        }
    }

    /// Same shape with a different lane count.
    pub fn with_lanes(self, lanes: u16) -> Type {
        match self {
            Type::Vector { elem, .. } => Type::Vector { lanes, elem },
            other => other,
        }
    }

    /// Suffix used to mangle overloaded intrinsic names (`i64`, `f64`, `v4i32`).
    pub fn mangle(self) -> String {
        match self {
            Type::Void => "isVoid".to_string(),
            Type::Int(bits) => format!("i{bits}"),
            Type::F32 => "f32".to_string(),
            Type::F64 => "f64".to_string(),
            Type::Ptr => "p0".to_string(),
            Type::Vector { lanes, elem } => format!("v{lanes}{}", Type::from(elem).mangle()),
        }
    }
}

impl From<ScalarKind> for Type {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Int(bits) => Type::Int(bits),
            ScalarKind::F32 => Type::F32,
            ScalarKind::F64 => Type::F64,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::F32 => write!(f, "float"),
            Type::F64 => write!(f, "double"),
            Type::Ptr => write!(f, "ptr"),
            Type::Vector { lanes, elem } => write!(f, "<{lanes} x {}>", Type::from(*elem)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::I64.to_string(), "i64");
        assert_eq!(Type::F64.to_string(), "double");
        assert_eq!(
            Type::Vector { lanes: 4, elem: ScalarKind::Int(32) }.to_string(),
            "<4 x i32>"
        );
    }

    #[test]
    fn test_type_widths() {
        assert_eq!(Type::I1.bits(), 1);
        assert_eq!(Type::Ptr.bits(), 64);
        assert_eq!(Type::Vector { lanes: 2, elem: ScalarKind::F64 }.bits(), 128);
        assert_eq!(Type::Vector { lanes: 2, elem: ScalarKind::F32 }.mangle(), "v2f32");
    }
}
