//! Parser for the textual operation-graph format.
//!
//! ```text
//! function name {
//!   t0: ch = EntryToken
//!   t1: i64 = Register %X3
//!   t2: i64,ch = CopyFromReg t0, t1
//!   t3: i64 = Constant<4>
//!   t4: i64 = add t2, t3
//!   t5: ch = CopyToReg t2:1, t1, t4
//!   t6: ch = Ret t5
//! }
//! ```
//!
//! Node ids are local to a function and may be referenced before they are
//! defined. Machine opcodes are looked up in the target's opcode table.

use super::graph::SelectionDag;
use super::node::{LoadExt, MemOperand, Node, NodeId, Payload, Reg, SdValue};
use super::opcode::{CondCode, Opcode};
use super::types::ValueType;
use crate::core::{LiftError, ParseError, Target};
use crate::ir::value::truncate_bits;
use crate::ir::{DebugLoc, Destination};
use hashbrown::HashMap;

/// Parse every function in `text`.
pub fn parse_dags(text: &str, target: &dyn Target) -> Result<Vec<SelectionDag>, ParseError> {
    let mut dags = Vec::new();
    let mut current: Option<FunctionBuilder> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = match raw.find(';') {
            Some(pos) => &raw[..pos],
            None => raw,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        let Some(builder) = current.as_mut() else {
            let header = line
                .strip_prefix("function")
                .and_then(|rest| rest.trim().strip_suffix('{'))
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ParseError::new(line_no, "expected 'function <name> {'"))?;
            current = Some(FunctionBuilder::new(header, line_no));
            continue;
        };

        if line == "}" {
            if let Some(builder) = current.take() {
                dags.push(builder.finish(line_no)?);
            }
        } else if let Some(rest) = line.strip_prefix("root ") {
            let mut cursor = Cursor::new(rest, line_no);
            builder.root = Some(cursor.read_node_ref()?);
            cursor.expect_end()?;
        } else {
            builder.add(parse_node_line(line, line_no, target)?)?;
        }
    }

    if let Some(builder) = current {
        return Err(ParseError::new(builder.line, format!("function {} is not closed", builder.name)));
    }
    Ok(dags)
}

/// A node whose operands still name textual ids.
struct PendingNode {
    id: u32,
    node: Node,
    refs: Vec<(u32, u32)>,
    line: usize,
}

struct FunctionBuilder {
    name: String,
    line: usize,
    nodes: Vec<PendingNode>,
    ids: HashMap<u32, usize>,
    root: Option<(u32, u32)>,
}

impl FunctionBuilder {
    fn new(name: &str, line: usize) -> Self {
        Self { name: name.to_string(), line, nodes: Vec::new(), ids: HashMap::new(), root: None }
    }

    fn add(&mut self, pending: PendingNode) -> Result<(), ParseError> {
        if self.ids.insert(pending.id, self.nodes.len()).is_some() {
            return Err(ParseError::new(pending.line, format!("t{} is defined twice", pending.id)));
        }
        self.nodes.push(pending);
        Ok(())
    }

    fn resolve(&self, (id, res): (u32, u32), line: usize) -> Result<SdValue, ParseError> {
        let index = *self
            .ids
            .get(&id)
            .ok_or_else(|| ParseError::new(line, format!("t{id} is not defined")))?;
        let results = self.nodes[index].node.num_values() as u32;
        if res >= results {
            return Err(ParseError::new(line, format!("t{id} has no result {res}")));
        }
        Ok(SdValue::new(NodeId(index as u32), res))
    }

    fn finish(self, line: usize) -> Result<SelectionDag, ParseError> {
        let mut dag = SelectionDag::new(self.name.clone());
        for pending in &self.nodes {
            let mut node = pending.node.clone();
            node.operands = pending
                .refs
                .iter()
                .map(|&r| self.resolve(r, pending.line))
                .collect::<Result<_, _>>()?;
            dag.add_node(node);
        }
        let root = match self.root {
            Some(r) => Some(self.resolve(r, line)?),
            None => (!self.nodes.is_empty()).then(|| SdValue::new(NodeId(self.nodes.len() as u32 - 1), 0)),
        };
        if let Some(root) = root {
            dag.set_root(root);
        }
        Ok(dag)
    }
}

fn parse_node_line(line: &str, line_no: usize, target: &dyn Target) -> Result<PendingNode, ParseError> {
    let mut cursor = Cursor::new(line, line_no);
    let (id, res) = cursor.read_node_ref()?;
    if res != 0 {
        return Err(cursor.error("node definitions cannot carry a result index"));
    }
    cursor.expect(':')?;

    let mut value_types = Vec::new();
    loop {
        let word = cursor.read_word()?;
        let vt = ValueType::parse(word).ok_or_else(|| cursor.error(format!("unknown value type '{word}'")))?;
        value_types.push(vt);
        if !cursor.try_read(',') {
            break;
        }
    }
    cursor.expect('=')?;

    let name = cursor.read_word()?;
    let opcode = match Opcode::from_canonical_name(name) {
        Some(opcode) => opcode,
        None => match target.machine_opcode(name) {
            Some(raw) => Opcode::Machine(raw),
            None => {
                let err = LiftError::UnknownMachineOpcode {
                    name: name.to_string(),
                    target: target.name().to_string(),
                };
                return Err(cursor.error(err.to_string()));
            }
        },
    };

    let mut node = Node::new(opcode, value_types, Vec::new());
    if cursor.peek() == Some('<') {
        let text = cursor.read_angle()?;
        node.payload = parse_payload(opcode, text, &node.value_types, &cursor)?;
    }
    if opcode == Opcode::Register {
        node.payload = Payload::Register(cursor.read_register(target)?);
    }

    let mut refs = Vec::new();
    if cursor.peek_node_ref() {
        loop {
            refs.push(cursor.read_node_ref()?);
            if !cursor.try_read(',') {
                break;
            }
        }
    }

    if cursor.try_read('(') {
        node.mem = Some(cursor.read_mem_operand()?);
    }
    if cursor.try_read('@') {
        let address = cursor.read_unsigned()?;
        node.loc = Some(DebugLoc::new(address));
    }
    cursor.expect_end()?;

    Ok(PendingNode { id, node, refs, line: line_no })
}

fn parse_payload(
    opcode: Opcode,
    text: &str,
    value_types: &[ValueType],
    cursor: &Cursor<'_>,
) -> Result<Payload, ParseError> {
    let text = text.trim();
    let bad = |what: &str| cursor.error(format!("malformed {what} payload '{text}'"));
    match opcode {
        Opcode::Constant => {
            let bits = parse_integer(text).ok_or_else(|| bad("constant"))?;
            let width = value_types.first().map(|vt| vt.bits()).unwrap_or(64);
            Ok(Payload::Constant(truncate_bits(bits, width)))
        }
        Opcode::ConstantFP => text.parse::<f64>().map(Payload::ConstantFP).map_err(|_| bad("float")),
        Opcode::CondCode => CondCode::from_name(text).map(Payload::CondCode).ok_or_else(|| bad("condition code")),
        Opcode::ValueType => ValueType::parse(text).map(Payload::ValueType).ok_or_else(|| bad("value type")),
        Opcode::TargetAddress => {
            let dest = if text.starts_with('+') || text.starts_with('-') {
                parse_integer(text).map(|d| Destination::Relative(d as i64))
            } else {
                parse_integer(text).map(Destination::Address)
            };
            dest.map(Payload::Target).ok_or_else(|| bad("target address"))
        }
        Opcode::VectorShuffle => text
            .split(',')
            .map(|lane| match lane.trim() {
                "u" | "undef" => Some(-1),
                lane => lane.parse::<i32>().ok(),
            })
            .collect::<Option<Vec<_>>>()
            .map(Payload::ShuffleMask)
            .ok_or_else(|| bad("shuffle mask")),
        _ => Err(cursor.error(format!("{opcode} takes no '<...>' payload"))),
    }
}

/// Decimal or `0x` hexadecimal, optionally signed; negative values wrap to two's complement.
fn parse_integer(text: &str) -> Option<u64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

/// Character cursor over one line.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self { text, pos: 0, line }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    fn try_read(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), ParseError> {
        if self.try_read(ch) {
            Ok(())
        } else {
            let found = self.peek();
            Err(self.error(format!("expected '{ch}' but found {found:?}")))
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error(format!("unexpected trailing text '{}'", self.rest()))),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn read_word(&mut self) -> Result<&'a str, ParseError> {
        let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if word.is_empty() {
            let found = self.peek();
            Err(self.error(format!("expected a name but found {found:?}")))
        } else {
            Ok(word)
        }
    }

    fn read_unsigned(&mut self) -> Result<u64, ParseError> {
        let text = self.take_while(|c| c.is_ascii_hexdigit() || c == 'x' || c == 'X');
        parse_integer(text).ok_or_else(|| self.error(format!("malformed number '{text}'")))
    }

    fn peek_node_ref(&mut self) -> bool {
        self.skip_whitespace();
        let mut chars = self.rest().chars();
        chars.next() == Some('t') && chars.next().is_some_and(|c| c.is_ascii_digit())
    }

    /// `tN` or `tN:k`.
    fn read_node_ref(&mut self) -> Result<(u32, u32), ParseError> {
        if !self.peek_node_ref() {
            let found = self.peek();
            return Err(self.error(format!("expected a node reference but found {found:?}")));
        }
        self.pos += 1;
        let digits = self.take_while(|c| c.is_ascii_digit());
        let id = digits.parse().map_err(|_| self.error("node id out of range"))?;
        // A ':' not followed by a digit ends a definition id (`t0: ch = ...`).
        let mut after = self.rest().chars();
        let indexed = after.next() == Some(':') && after.next().is_some_and(|c| c.is_ascii_digit());
        let res = if indexed {
            self.pos += 1;
            let digits = self.take_while(|c| c.is_ascii_digit());
            digits.parse().map_err(|_| self.error("malformed result index"))?
        } else {
            0
        };
        Ok((id, res))
    }

    /// Contents of a `<...>` group.
    fn read_angle(&mut self) -> Result<&'a str, ParseError> {
        self.expect('<')?;
        let rest = self.rest();
        let end = rest.find('>').ok_or_else(|| self.error("unterminated '<'"))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    /// `%NAME` or `$noreg`.
    fn read_register(&mut self, target: &dyn Target) -> Result<Reg, ParseError> {
        if self.try_read('$') {
            let word = self.read_word()?;
            return if word == "noreg" {
                Ok(Reg::NONE)
            } else {
                Err(self.error(format!("unknown register '${word}'")))
            };
        }
        self.expect('%')?;
        let word = self.read_word()?;
        target
            .register_info()
            .find_reg(word)
            .ok_or_else(|| self.error(format!("unknown register '%{word}' for target {}", target.name())))
    }

    /// Access width in bytes, between 1 and `MemOperand::MAX_SIZE`.
    fn read_size(&mut self) -> Result<u32, ParseError> {
        let size = self.read_unsigned()?;
        u32::try_from(size)
            .ok()
            .filter(|s| (1..=MemOperand::MAX_SIZE).contains(s))
            .ok_or_else(|| {
                self.error(format!("memory access size {size} is outside 1..={}", MemOperand::MAX_SIZE))
            })
    }

    /// `load|store N [sext|zext|trunc] [volatile] [align N])`, opening parenthesis consumed.
    fn read_mem_operand(&mut self) -> Result<MemOperand, ParseError> {
        let kind = self.read_word()?;
        if kind != "load" && kind != "store" {
            return Err(self.error(format!("expected 'load' or 'store' but found '{kind}'")));
        }
        let size = self.read_size()?;
        let mut mem = if kind == "store" { MemOperand::store(size) } else { MemOperand::load(size) };
        loop {
            if self.try_read(')') {
                return Ok(mem);
            }
            match self.read_word()? {
                "sext" => mem.ext = LoadExt::Sext,
                "zext" => mem.ext = LoadExt::Zext,
                "trunc" => mem.truncating = true,
                "volatile" => mem.volatile = true,
                "align" => {
                    let align = self.read_unsigned()?;
                    mem.align = u32::try_from(align)
                        .ok()
                        .filter(|a| a.is_power_of_two())
                        .ok_or_else(|| self.error(format!("alignment {align} is not a power of two")))?;
                }
                other => return Err(self.error(format!("unknown memory operand flag '{other}'"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::PowerPc64;

    const SCENARIO: &str = "
; add four to X3
function bump {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = CopyFromReg t0, t1
  t3: i64 = Constant<4>
  t4: i64 = add t2, t3
  t5: ch = CopyToReg t2:1, t1, t4
  t6: ch = Ret t5
}
";

    #[test]
    fn test_parse_scenario() {
        let target = PowerPc64::new();
        let dags = parse_dags(SCENARIO, &target).unwrap();
        assert_eq!(dags.len(), 1);
        let dag = &dags[0];
        assert_eq!(dag.name(), "bump");
        assert_eq!(dag.len(), 7);
        assert_eq!(dag.root(), Some(SdValue::new(NodeId(6), 0)));

        let copy = dag.node(NodeId(5));
        assert_eq!(copy.opcode, Opcode::CopyToReg);
        assert_eq!(copy.operands[0], SdValue::new(NodeId(2), 1));
        assert_eq!(dag.node(NodeId(3)).constant(), Some(4));
        assert_eq!(dag.node(NodeId(1)).register(), target.register_info().find_reg("X3"));
    }

    #[test]
    fn test_forward_references_and_explicit_root() {
        let target = PowerPc64::new();
        let text = "function f {
  t9: ch = Ret t0
  t0: ch = EntryToken
  root t9
}";
        let dags = parse_dags(text, &target).unwrap();
        let dag = &dags[0];
        assert_eq!(dag.root(), Some(SdValue::new(NodeId(0), 0)));
        assert_eq!(dag.node(NodeId(0)).operands, vec![SdValue::new(NodeId(1), 0)]);
    }

    #[test]
    fn test_payloads_and_memory_operands() {
        let target = PowerPc64::new();
        let text = "function f {
  t0: ch = EntryToken
  t1: i32 = Constant<-1>
  t2: i64 = Register $noreg
  t3: i32,ch = load t0, t2 (load 2 sext align 2) @0x1000
  t4: ch = CondCode<setult>
  t5: ch = TargetAddress<-8>
  t6: v4i32 = vector_shuffle<0,u,2,7> t1, t1
  t7: ch = STD t3:1, t3, t1, t2 (store 8 volatile)
}";
        let dags = parse_dags(text, &target).unwrap();
        let dag = &dags[0];

        assert_eq!(dag.node(NodeId(1)).constant(), Some(0xFFFF_FFFF));
        assert_eq!(dag.node(NodeId(2)).register(), Some(Reg::NONE));

        let load = dag.node(NodeId(3));
        let mem = load.mem.unwrap();
        assert_eq!((mem.size, mem.ext, mem.align, mem.is_store), (2, LoadExt::Sext, 2, false));
        assert_eq!(load.loc, Some(DebugLoc::new(0x1000)));

        assert_eq!(dag.node(NodeId(4)).cond_code(), Some(CondCode::Ult));
        assert_eq!(dag.node(NodeId(5)).payload, Payload::Target(Destination::Relative(-8)));
        assert_eq!(dag.node(NodeId(6)).payload, Payload::ShuffleMask(vec![0, -1, 2, 7]));

        let store = dag.node(NodeId(7));
        assert!(store.opcode.is_machine());
        assert!(store.mem.unwrap().volatile);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let target = PowerPc64::new();

        let err = parse_dags("function f {\n  t0: ch = EntryToken\n  t1: i64 = FROB t0\n}", &target).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("FROB"), "{err}");

        let err = parse_dags("function f {\n  t0: ch = Ret t4\n}", &target).unwrap_err();
        assert!(err.message.contains("t4 is not defined"), "{err}");

        let err = parse_dags("function f {\n  t0: ch = EntryToken\n  t0: ch = EntryToken\n}", &target).unwrap_err();
        assert_eq!(err.line, 3);

        let err = parse_dags("function f {\n  t0: ch = EntryToken\n", &target).unwrap_err();
        assert!(err.message.contains("not closed"), "{err}");

        let err = parse_dags("function f {\n  t0: i64 = Register %Q9\n}", &target).unwrap_err();
        assert!(err.message.contains("unknown register"), "{err}");
    }

    #[test]
    fn test_single_definition_line() {
        let target = PowerPc64::new();
        let dags = parse_dags("function f {\n  t0: ch = EntryToken\n}", &target).unwrap();
        let entry = dags[0].node(NodeId(0));
        assert_eq!(entry.opcode, Opcode::EntryToken);
        assert_eq!(entry.value_types, vec![ValueType::Other]);
        assert!(entry.operands.is_empty());

        let text = "function f {\n  t0: i64,ch = EntryToken\n  t1:ch = Ret t0:1\n}";
        let dags = parse_dags(text, &target).unwrap();
        assert_eq!(dags[0].node(NodeId(1)).operands, vec![SdValue::new(NodeId(0), 1)]);

        let err = parse_dags("function f {\n  t0:1: ch = EntryToken\n}", &target).unwrap_err();
        assert!(err.message.contains("result index"), "{err}");
    }

    #[test]
    fn test_memory_operand_sizes_are_checked() {
        let target = PowerPc64::new();
        let with_mem = |mem: &str| {
            let text = format!(
                "function f {{\n  t0: ch = EntryToken\n  t1: i64 = Register %X3\n  t2: i64,ch = load t0, t1 {mem}\n}}"
            );
            parse_dags(&text, &target)
        };

        let err = with_mem("(load 0)").unwrap_err();
        assert_eq!(err.line, 4);
        assert!(err.message.contains("size 0"), "{err}");
        assert!(with_mem("(store 536870912)").is_err());
        assert!(with_mem("(load 99999999999)").is_err());
        assert!(with_mem("(load 4 align 3)").is_err());

        let dags = with_mem("(load 64)").unwrap();
        let mem = dags[0].node(NodeId(2)).mem.unwrap();
        assert_eq!((mem.size, mem.bits()), (64, 512));
    }

    #[test]
    fn test_alignment_survives_printing() {
        let target = PowerPc64::new();
        let text = "function f {
  t0: ch = EntryToken
  t1: i64 = Register %X3
  t2: i64,ch = load t0, t1 (load 8 align 4)
  t3: i32,ch = load t2:1, t1 (load 4)
}";
        let dags = parse_dags(text, &target).unwrap();
        let printed = dags[0].display(&target).to_string();
        assert!(printed.contains("(load 8 align 4)"), "{printed}");
        assert!(printed.contains("(load 4)"), "{printed}");

        let reparsed = parse_dags(&printed, &target).unwrap();
        assert_eq!(reparsed[0].node(NodeId(2)).mem.unwrap().align, 4);
    }

    #[test]
    fn test_printer_output_parses_back() {
        let target = PowerPc64::new();
        let dags = parse_dags(SCENARIO, &target).unwrap();
        let printed = dags[0].display(&target).to_string();
        let reparsed = parse_dags(&printed, &target).unwrap();
        assert_eq!(reparsed[0].len(), dags[0].len());
        assert_eq!(reparsed[0].display(&target).to_string(), printed);
    }
}
