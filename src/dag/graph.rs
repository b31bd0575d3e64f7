// The operation graph of one function. Nodes live in a dense arena indexed by NodeId and
// edges are (node, result) pairs, so there is no shared ownership between nodes. The
// graph supports the handful of mutations the reverse selector needs: appending new
// nodes, redirecting every use of one result to another, and marking replaced nodes
// dead. Use lists are not maintained incrementally; queries scan the live nodes, which
// is cheap at the size of one decoded function. Traversal orders are computed with an
// explicit stack so graph depth never turns into call-stack depth.

//! Arena-backed operation graph.

use super::node::{MemOperand, Node, NodeId, Payload, Reg, SdValue};
use super::opcode::Opcode;
use super::types::ValueType;
use crate::ir::{DebugLoc, Destination};

#[derive(Debug, Clone, Default)]
pub struct SelectionDag {
    name: String,
    nodes: Vec<Node>,
    root: Option<SdValue>,
}

impl SelectionDag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), nodes: Vec::new(), root: None }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes ever created, dead ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Ids of live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.dead)
            .map(|(i, _)| NodeId(i as u32))
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get_node(
        &mut self,
        opcode: Opcode,
        value_types: &[ValueType],
        operands: &[SdValue],
        loc: Option<DebugLoc>,
    ) -> NodeId {
        self.add_node(Node::new(opcode, value_types.to_vec(), operands.to_vec()).with_loc(loc))
    }

    /// The entry token, created on first request.
    pub fn entry_token(&mut self) -> SdValue {
        let existing = self.node_ids().find(|&id| self.node(id).opcode == Opcode::EntryToken);
        let id = match existing {
            Some(id) => id,
            None => self.get_node(Opcode::EntryToken, &[ValueType::Other], &[], None),
        };
        SdValue::new(id, 0)
    }

    pub fn get_constant(&mut self, bits: u64, vt: ValueType) -> SdValue {
        let node = Node::new(Opcode::Constant, vec![vt], vec![]).with_payload(Payload::Constant(bits));
        self.add_node(node).into()
    }

    pub fn get_constant_fp(&mut self, value: f64, vt: ValueType) -> SdValue {
        let node = Node::new(Opcode::ConstantFP, vec![vt], vec![]).with_payload(Payload::ConstantFP(value));
        self.add_node(node).into()
    }

    pub fn get_register(&mut self, reg: Reg, vt: ValueType) -> SdValue {
        let node = Node::new(Opcode::Register, vec![vt], vec![]).with_payload(Payload::Register(reg));
        self.add_node(node).into()
    }

    pub fn get_target_address(&mut self, dest: Destination) -> SdValue {
        let node = Node::new(Opcode::TargetAddress, vec![ValueType::Other], vec![])
            .with_payload(Payload::Target(dest));
        self.add_node(node).into()
    }

    /// Type operand node, as taken by `sign_extend_inreg`.
    pub fn get_value_type(&mut self, vt: ValueType) -> SdValue {
        let node = Node::new(Opcode::ValueType, vec![ValueType::Other], vec![]).with_payload(Payload::ValueType(vt));
        self.add_node(node).into()
    }

    pub fn get_undef(&mut self, vt: ValueType) -> SdValue {
        self.get_node(Opcode::Undef, &[vt], &[], None).into()
    }

    pub fn get_store(
        &mut self,
        chain: SdValue,
        value: SdValue,
        addr: SdValue,
        mem: MemOperand,
        loc: Option<DebugLoc>,
    ) -> SdValue {
        let node = Node::new(Opcode::Store, vec![ValueType::Other], vec![chain, value, addr])
            .with_mem(mem)
            .with_loc(loc);
        self.add_node(node).into()
    }

    pub fn get_load(
        &mut self,
        vt: ValueType,
        chain: SdValue,
        addr: SdValue,
        mem: MemOperand,
        loc: Option<DebugLoc>,
    ) -> NodeId {
        let node = Node::new(Opcode::Load, vec![vt, ValueType::Other], vec![chain, addr])
            .with_mem(mem)
            .with_loc(loc);
        self.add_node(node)
    }

    pub fn get_copy_to_reg(
        &mut self,
        chain: SdValue,
        reg: Reg,
        value: SdValue,
        loc: Option<DebugLoc>,
    ) -> SdValue {
        let vt = self.value_type(value).unwrap_or(ValueType::I64);
        let reg_node = self.get_register(reg, vt);
        self.get_node(Opcode::CopyToReg, &[ValueType::Other], &[chain, reg_node, value], loc)
            .into()
    }

    pub fn value_type(&self, value: SdValue) -> Option<ValueType> {
        self.node(value.node).value_type(value.res)
    }

    pub fn root(&self) -> Option<SdValue> {
        self.root
    }

    pub fn set_root(&mut self, root: SdValue) {
        self.root = Some(root);
    }

    pub fn mark_dead(&mut self, id: NodeId) {
        self.nodes[id.index()].dead = true;
    }

    /// Live users of any result of `id`, with the operand position of each use.
    pub fn uses_of(&self, id: NodeId) -> Vec<(NodeId, usize)> {
        let mut uses = Vec::new();
        for user in self.node_ids() {
            for (i, op) in self.node(user).operands.iter().enumerate() {
                if op.node == id {
                    uses.push((user, i));
                }
            }
        }
        uses
    }

    /// Live users of exactly `value`.
    pub fn users_of_value(&self, value: SdValue) -> Vec<(NodeId, usize)> {
        self.uses_of(value.node)
            .into_iter()
            .filter(|&(user, i)| self.node(user).operands[i] == value)
            .collect()
    }

    pub fn has_any_use_of_value(&self, value: SdValue) -> bool {
        self.root == Some(value)
            || self.node_ids().any(|user| self.node(user).operands.contains(&value))
    }

    /// Redirect every use of `from`, including the root, to `to`.
    pub fn replace_all_uses_of_value_with(&mut self, from: SdValue, to: SdValue) {
        for node in self.nodes.iter_mut().filter(|n| !n.dead) {
            for op in node.operands.iter_mut() {
                if *op == from {
                    *op = to;
                }
            }
        }
        if self.root == Some(from) {
            self.root = Some(to);
        }
    }

    /// Live nodes with every operand ahead of its users.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for start in self.node_ids() {
            if visited[start.index()] {
                continue;
            }
            // (node, next operand to descend into)
            let mut stack = vec![(start, 0usize)];
            visited[start.index()] = true;
            while let Some((id, next)) = stack.pop() {
                let operands = &self.nodes[id.index()].operands;
                if let Some(op) = operands.get(next) {
                    stack.push((id, next + 1));
                    let child = op.node;
                    if child.index() < self.nodes.len()
                        && !visited[child.index()]
                        && !self.nodes[child.index()].dead
                    {
                        visited[child.index()] = true;
                        stack.push((child, 0));
                    }
                } else {
                    order.push(id);
                }
            }
        }
        order
    }

    /// The nodes a driver has to emit: every live side-effecting node, in an order where
    /// operands come first, followed by the root if it is a pure value.
    pub fn emission_order(&self) -> Vec<NodeId> {
        let mut order: Vec<NodeId> = self
            .topological_order()
            .into_iter()
            .filter(|&id| self.node(id).has_chain())
            .collect();
        if let Some(root) = self.root {
            if !order.contains(&root.node) && !self.node(root.node).dead {
                order.push(root.node);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_chain() -> (SelectionDag, SdValue, SdValue) {
        let mut dag = SelectionDag::new("f");
        let entry = dag.entry_token();
        let four = dag.get_constant(4, ValueType::I64);
        let sum = dag.get_node(Opcode::Add, &[ValueType::I64], &[four, four], None);
        let store = dag.get_store(entry, sum.into(), four, MemOperand::store(8), None);
        dag.set_root(store);
        (dag, four, SdValue::from(sum))
    }

    #[test]
    fn test_replace_all_uses() {
        let (mut dag, four, sum) = add_chain();
        let five = dag.get_constant(5, ValueType::I64);
        dag.replace_all_uses_of_value_with(four, five);

        assert!(!dag.has_any_use_of_value(four));
        assert_eq!(dag.node(sum.node).operands, vec![five, five]);
    }

    #[test]
    fn test_topological_order_after_rewrite() {
        let (mut dag, four, sum) = add_chain();
        let later = dag.get_node(Opcode::Sub, &[ValueType::I64], &[four, four], None);
        dag.replace_all_uses_of_value_with(sum, later.into());
        dag.mark_dead(sum.node);

        let order = dag.topological_order();
        let pos = |id: NodeId| order.iter().position(|&n| n == id);
        assert_eq!(pos(sum.node), None);
        assert!(pos(later).unwrap() < pos(dag.root().unwrap().node).unwrap());
        assert!(pos(four.node).unwrap() < pos(later).unwrap());
    }

    #[test]
    fn test_emission_order_skips_pure_nodes() {
        let (dag, _, sum) = add_chain();
        let order = dag.emission_order();
        assert_eq!(order.len(), 2);
        assert!(!order.contains(&sum.node));
        assert_eq!(dag.node(order[0]).opcode, Opcode::EntryToken);
    }
}
