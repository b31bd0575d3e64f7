// IR functions. A Function owns its instructions in one dense vector and its blocks as
// ordered lists of instruction ids, so instructions can be inserted in the middle of a
// block (materialization code at the entry, register flushes before a return) without
// invalidating ids held by the lifter's caches. The function also owns the symbol table
// that keeps value names unique.

//! IR function bodies.

use super::instruction::{InstKind, Instruction};
use super::symbols::SymbolTable;
use super::types::Type;
use super::value::{BlockId, InstId, Value};

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub insts: Vec<InstId>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    blocks: Vec<Block>,
    insts: Vec<Instruction>,
    symbols: SymbolTable,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), blocks: Vec::new(), insts: Vec::new(), symbols: SymbolTable::new() }
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block { name: name.into(), insts: Vec::new() });
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i as u32), b))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.index()]
    }

    /// Number of instructions placed in blocks.
    pub fn num_insts(&self) -> usize {
        self.blocks.iter().map(|b| b.insts.len()).sum()
    }

    /// Instructions in layout order.
    pub fn insts(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.blocks
            .iter()
            .flat_map(|b| b.insts.iter())
            .map(move |&id| (id, &self.insts[id.index()]))
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    fn push(&mut self, inst: Instruction) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(inst);
        id
    }

    pub fn append(&mut self, block: BlockId, inst: Instruction) -> InstId {
        let id = self.push(inst);
        self.blocks[block.index()].insts.push(id);
        id
    }

    /// Insert ahead of the block terminator, or at the end of an open block.
    pub fn insert_before_terminator(&mut self, block: BlockId, inst: Instruction) -> InstId {
        let pos = match self.terminator(block) {
            Some(_) => self.blocks[block.index()].insts.len() - 1,
            None => self.blocks[block.index()].insts.len(),
        };
        let id = self.push(inst);
        self.blocks[block.index()].insts.insert(pos, id);
        id
    }

    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        let last = *self.blocks[block.index()].insts.last()?;
        self.insts[last.index()].is_terminator().then_some(last)
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.terminator(block).is_some()
    }

    /// Type of an operand as seen by the instruction using it.
    pub fn type_of(&self, value: Value) -> Type {
        match value {
            Value::Inst(id) => self.insts[id.index()].ty,
            Value::Global(_) => Type::Ptr,
            Value::ConstInt { ty, .. } | Value::ConstFloat { ty, .. } | Value::Undef(ty) => ty,
        }
    }

    /// Symbolic name of an instruction result, if it has one.
    pub fn value_name(&self, value: Value) -> Option<&str> {
        match value {
            Value::Inst(id) => {
                let name = self.insts[id.index()].name.as_str();
                (!name.is_empty()).then_some(name)
            }
            _ => None,
        }
    }

    /// Allocated type of a stack slot.
    pub fn allocated_type(&self, slot: InstId) -> Option<Type> {
        match self.insts[slot.index()].kind {
            InstKind::Alloca { allocated } => Some(allocated),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::Destination;

    #[test]
    fn test_insert_before_terminator() {
        let mut func = Function::new("f");
        let entry = func.add_block("entry");
        let body = func.add_block("body");
        func.append(entry, Instruction::new(InstKind::Br { dest: Destination::Block(body) }, Type::Void));
        let slot = func.insert_before_terminator(entry, Instruction::new(InstKind::Alloca { allocated: Type::I64 }, Type::Ptr));

        assert_eq!(func.block(entry).insts.first(), Some(&slot));
        assert!(func.is_terminated(entry));
        assert!(!func.is_terminated(body));
        assert_eq!(func.allocated_type(slot), Some(Type::I64));
        assert_eq!(func.num_insts(), 2);
    }
}
