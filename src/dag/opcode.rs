// The canonical opcode vocabulary of the operation graph, plus an escape hatch for
// target machine opcodes. The canonical set is the contract between the reverse
// instruction selector and the emitter: anything the selector produces is one of these
// variants. The enum, its textual names and the name lookup are generated from one table
// by a macro so the three can never drift apart. Machine opcodes are opaque numbers
// whose names live in the target description.

//! Canonical opcodes and condition codes.

use std::fmt;

macro_rules! canonical_opcodes {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$meta])* $variant,)*
            /// Target machine opcode that has not been rewritten into canonical form.
            Machine(u16),
        }

        impl Opcode {
            /// Every canonical opcode, in declaration order.
            pub const CANONICAL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Textual name of a canonical opcode; `None` for machine opcodes.
            pub fn canonical_name(self) -> Option<&'static str> {
                match self {
                    $(Opcode::$variant => Some($name),)*
                    Opcode::Machine(_) => None,
                }
            }

            pub fn from_canonical_name(name: &str) -> Option<Opcode> {
                match name {
                    $($name => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

canonical_opcodes! {
    EntryToken => "EntryToken",
    /// Keeps a value alive across rewrites; never emitted.
    HandleNode => "HandleNode",
    Undef => "undef",
    TokenFactor => "TokenFactor",
    MergeValues => "merge_values",
    Register => "Register",
    CopyFromReg => "CopyFromReg",
    CopyToReg => "CopyToReg",
    Constant => "Constant",
    ConstantFP => "ConstantFP",
    CondCode => "CondCode",
    ValueType => "ValueType",
    TargetAddress => "TargetAddress",

    Add => "add",
    Sub => "sub",
    Mul => "mul",
    SDiv => "sdiv",
    UDiv => "udiv",
    SRem => "srem",
    URem => "urem",
    MulHU => "mulhu",
    MulHS => "mulhs",
    SMulLoHi => "smul_lohi",
    UMulLoHi => "umul_lohi",
    SDivRem => "sdivrem",
    UDivRem => "udivrem",
    SMulO => "smulo",
    UMulO => "umulo",
    AddC => "addc",
    SubC => "subc",
    AddE => "adde",
    SubE => "sube",

    And => "and",
    Or => "or",
    Xor => "xor",
    Shl => "shl",
    Sra => "sra",
    Srl => "srl",
    Rotl => "rotl",
    Rotr => "rotr",
    Ctlz => "ctlz",
    CtlzZeroUndef => "ctlz_zero_undef",
    Cttz => "cttz",
    CttzZeroUndef => "cttz_zero_undef",
    Ctpop => "ctpop",

    Select => "select",
    VSelect => "vselect",
    SelectCC => "select_cc",
    SetCC => "setcc",

    SignExtend => "sign_extend",
    ZeroExtend => "zero_extend",
    AnyExtend => "any_extend",
    SignExtendInReg => "sign_extend_inreg",
    Truncate => "truncate",
    Bitcast => "bitcast",
    BuildPair => "build_pair",
    FpRound => "fp_round",
    FpRoundInReg => "fp_round_inreg",
    FpExtend => "fp_extend",
    SintToFp => "sint_to_fp",
    UintToFp => "uint_to_fp",
    FpToSint => "fp_to_sint",
    FpToUint => "fp_to_uint",

    FAdd => "fadd",
    FSub => "fsub",
    FMul => "fmul",
    FDiv => "fdiv",
    FRem => "frem",
    FNeg => "fneg",
    FMA => "fma",
    FCopySign => "fcopysign",
    FAbs => "fabs",
    FFloor => "ffloor",
    FCeil => "fceil",
    FTrunc => "ftrunc",

    Load => "load",
    Store => "store",

    Br => "br",
    BrCond => "brcond",
    BrCC => "br_cc",
    Ret => "Ret",

    InsertVectorElt => "insert_vector_elt",
    ExtractVectorElt => "extract_vector_elt",
    BuildVector => "BUILD_VECTOR",
    ConcatVectors => "concat_vectors",
    ExtractSubvector => "extract_subvector",
    VectorShuffle => "vector_shuffle",
}

impl Opcode {
    pub fn is_machine(self) -> bool {
        matches!(self, Opcode::Machine(_))
    }

    /// Opcodes whose node carries literal data instead of computing anything.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Opcode::Register
                | Opcode::Constant
                | Opcode::ConstantFP
                | Opcode::CondCode
                | Opcode::ValueType
                | Opcode::TargetAddress
                | Opcode::Undef
                | Opcode::EntryToken
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_name() {
            Some(name) => f.write_str(name),
            None => match self {
                Opcode::Machine(raw) => write!(f, "machine#{raw}"),
                _ => Ok(()),
            },
        }
    }
}

/// Comparison condition codes carried by `CondCode` nodes.
///
/// The plain forms are "don't care" about NaNs for floats; `O*` are ordered and
/// `U*` are unordered for floats and unsigned for integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CondCode {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Ult,
    Ule,
    Ugt,
    Uge,
    Ueq,
    Une,
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
    O,
    Uo,
}

impl CondCode {
    const NAMES: &'static [(CondCode, &'static str)] = &[
        (CondCode::Eq, "seteq"),
        (CondCode::Ne, "setne"),
        (CondCode::Lt, "setlt"),
        (CondCode::Le, "setle"),
        (CondCode::Gt, "setgt"),
        (CondCode::Ge, "setge"),
        (CondCode::Ult, "setult"),
        (CondCode::Ule, "setule"),
        (CondCode::Ugt, "setugt"),
        (CondCode::Uge, "setuge"),
        (CondCode::Ueq, "setueq"),
        (CondCode::Une, "setune"),
        (CondCode::Oeq, "setoeq"),
        (CondCode::One, "setone"),
        (CondCode::Olt, "setolt"),
        (CondCode::Ole, "setole"),
        (CondCode::Ogt, "setogt"),
        (CondCode::Oge, "setoge"),
        (CondCode::O, "seto"),
        (CondCode::Uo, "setuo"),
    ];

    pub fn name(self) -> &'static str {
        CondCode::NAMES
            .iter()
            .find(|(cc, _)| *cc == self)
            .map(|(_, name)| *name)
            .unwrap_or("setcc")
    }

    pub fn from_name(name: &str) -> Option<CondCode> {
        CondCode::NAMES.iter().find(|(_, n)| *n == name).map(|(cc, _)| *cc)
    }
}

impl fmt::Display for CondCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for &opcode in Opcode::CANONICAL {
            let name = opcode.canonical_name().unwrap();
            assert_eq!(Opcode::from_canonical_name(name), Some(opcode));
        }
        assert_eq!(Opcode::from_canonical_name("STD"), None);
        assert_eq!(Opcode::Machine(3).canonical_name(), None);
    }

    #[test]
    fn test_vocabulary_size() {
        assert!(Opcode::CANONICAL.len() >= 70);
    }

    #[test]
    fn test_cond_code_names() {
        assert_eq!(CondCode::from_name("setlt"), Some(CondCode::Lt));
        assert_eq!(CondCode::Uge.to_string(), "setuge");
        assert_eq!(CondCode::from_name("lt"), None);
    }
}
