// PowerPC machine opcodes known to the lifter. The raw number of an opcode is its
// position in the table, which is also what Opcode::Machine carries inside a graph;
// mnemonics are the instruction-definition names the decoder prints.

use crate::dag::Opcode;

macro_rules! ppc_opcodes {
    ($($variant:ident,)*) => {
        #[allow(clippy::upper_case_acronyms)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum PpcOpcode {
            $($variant,)*
        }

        impl PpcOpcode {
            pub const ALL: &'static [PpcOpcode] = &[$(PpcOpcode::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(PpcOpcode::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

ppc_opcodes! {
    // Stores, plain and with update.
    STD,
    STW,
    STDU,
    STWU,
    // Branches.
    B,
    BA,
    BL,
    BLA,
    BLR,
    // Rotate and mask.
    RLDICL,
    RLDICR,
    RLWINM,
    RLWINM8,
    // Integer arithmetic.
    ADD4,
    ADD8,
    ADDI,
    ADDI8,
    SUBF,
    SUBF8,
    NEG,
    NEG8,
    MULLW,
    MULLD,
    DIVW,
    DIVD,
    DIVWU,
    DIVDU,
    // Logic and shifts.
    AND,
    AND8,
    OR,
    OR8,
    XOR,
    XOR8,
    SLW,
    SLD,
    SRW,
    SRD,
    SRAW,
    SRAD,
    EXTSB,
    EXTSH,
    EXTSW,
    CNTLZW,
    CNTLZD,
    // Immediates and loads.
    LI,
    LI8,
    LD,
    LWZ,
    LHZ,
    LHA,
    LBZ,
}

impl PpcOpcode {
    pub fn raw(self) -> u16 {
        self as u16
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// The PowerPC opcode behind a graph opcode, if it is one.
    pub fn of(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Machine(raw) => Self::from_raw(raw),
            _ => None,
        }
    }
}

impl From<PpcOpcode> for Opcode {
    fn from(op: PpcOpcode) -> Opcode {
        Opcode::Machine(op.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_numbers_follow_table_order() {
        for (i, op) in PpcOpcode::ALL.iter().enumerate() {
            assert_eq!(op.raw() as usize, i);
            assert_eq!(PpcOpcode::from_raw(op.raw()), Some(*op));
            assert_eq!(PpcOpcode::from_name(op.name()), Some(*op));
        }
        assert_eq!(PpcOpcode::from_raw(PpcOpcode::ALL.len() as u16), None);
    }

    #[test]
    fn test_graph_opcode_conversion() {
        let opcode = Opcode::from(PpcOpcode::RLDICL);
        assert!(opcode.is_machine());
        assert_eq!(PpcOpcode::of(opcode), Some(PpcOpcode::RLDICL));
        assert_eq!(PpcOpcode::of(Opcode::Add), None);
        assert_eq!(PpcOpcode::from_name("rldicl"), None);
    }
}
