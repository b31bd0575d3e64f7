// Per-function translation state. The visit cache memoizes the IR value of every result
// of every node already emitted, so each node is translated at most once per pass and
// shared subexpressions are reused. The name resolver remembers which base name each
// disambiguated value name came from, so a value derived from %X3_2 is named after X3
// again. Both live in TranslationContext together with the register slots. A return
// resets the context except for the cached side-effecting nodes; the function's symbol
// table is not part of it and keeps its suffix counters.

//! Translation context for one function.

use super::materializer::RegisterMaterializer;
use crate::dag::NodeId;
use crate::ir::{SymbolTable, Value};
use hashbrown::HashMap;

/// IR values produced for each result slot of a node.
pub type NodeValues = Vec<Option<Value>>;

/// Memo table from graph node to its emitted values.
#[derive(Debug, Default, Clone)]
pub struct VisitCache {
    entries: HashMap<NodeId, NodeValues>,
}

impl VisitCache {
    pub fn get(&self, node: NodeId) -> Option<&NodeValues> {
        self.entries.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn insert(&mut self, node: NodeId, values: NodeValues) {
        self.entries.insert(node, values);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry whose node fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.entries.retain(|node, _| keep(*node));
    }
}

/// Maps disambiguated value names back to their base names.
#[derive(Debug, Default, Clone)]
pub struct NameResolver {
    base_names: HashMap<String, String>,
}

impl NameResolver {
    /// Base name of `name`, or `name` itself if it was never disambiguated.
    pub fn base_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.base_names.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Reserve a unique name for `base` and remember where it came from.
    pub fn indexed_name(&mut self, symbols: &mut SymbolTable, base: &str) -> String {
        let name = symbols.unique_name(base);
        if name != base {
            self.base_names.insert(name.clone(), base.to_string());
        }
        name
    }

    pub fn clear(&mut self) {
        self.base_names.clear();
    }
}

/// All state scoped to the translation of one function.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub cache: VisitCache,
    pub names: NameResolver,
    pub regs: RegisterMaterializer,
}

impl TranslationContext {
    pub fn new(num_regs: usize) -> Self {
        Self {
            cache: VisitCache::default(),
            names: NameResolver::default(),
            regs: RegisterMaterializer::new(num_regs),
        }
    }

    /// Reset after a return. Nodes accepted by `emitted_once` (side-effecting nodes)
    /// stay cached so a later return sharing their chain does not emit them again;
    /// everything derived from register slots is re-read.
    pub fn reset_after_return(&mut self, emitted_once: impl FnMut(NodeId) -> bool) {
        self.cache.retain(emitted_once);
        self.names.clear();
        self.regs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_names_see_through_suffixes() {
        let mut symbols = SymbolTable::new();
        let mut names = NameResolver::default();

        assert_eq!(names.indexed_name(&mut symbols, "X3"), "X3");
        let second = names.indexed_name(&mut symbols, "X3");
        assert_eq!(second, "X3_1");
        assert_eq!(names.base_name(&second), "X3");
        assert_eq!(names.base_name("X3"), "X3");
        assert_eq!(names.base_name("other"), "other");
    }

    #[test]
    fn test_reset_keeps_symbol_suffixes_increasing() {
        let mut symbols = SymbolTable::new();
        let mut cx = TranslationContext::new(4);

        cx.names.indexed_name(&mut symbols, "X3");
        assert_eq!(cx.names.indexed_name(&mut symbols, "X3"), "X3_1");
        cx.reset_after_return(|_| false);
        assert_eq!(cx.names.base_name("X3_1"), "X3_1");
        assert_eq!(cx.names.indexed_name(&mut symbols, "X3"), "X3_2");
    }

    #[test]
    fn test_reset_after_return_keeps_side_effects() {
        let mut cx = TranslationContext::new(4);
        cx.cache.insert(NodeId(1), vec![None]);
        cx.cache.insert(NodeId(2), vec![None, None]);
        cx.cache.insert(NodeId(3), vec![None]);

        cx.reset_after_return(|node| node == NodeId(2));
        assert!(!cx.cache.contains(NodeId(1)));
        assert!(cx.cache.contains(NodeId(2)));
        assert!(!cx.cache.contains(NodeId(3)));
        assert_eq!(cx.cache.len(), 1);
    }
}
