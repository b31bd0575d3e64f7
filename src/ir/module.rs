// IR module: the module-scope namespace shared by every lifted function. It holds the
// global storage cells that carry register values across function boundaries and the
// finished functions. Globals are looked up by name and only ever added; nothing removes
// an entry during a run.

//! IR module and globals.

use super::function::Function;
use super::types::Type;
use super::value::{GlobalId, Value};
use hashbrown::HashMap;

#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub name: String,
    pub ty: Type,
    pub init: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    globals: Vec<GlobalVariable>,
    global_index: HashMap<String, GlobalId>,
    functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Look up a global by name.
    pub fn global(&self, name: &str) -> Option<GlobalId> {
        self.global_index.get(name).copied()
    }

    /// Declare a global. An existing global of the same name is returned unchanged.
    pub fn add_global(&mut self, name: &str, ty: Type, init: Value) -> GlobalId {
        if let Some(id) = self.global(name) {
            return id;
        }
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalVariable { name: name.to_string(), ty, init });
        self.global_index.insert(name.to_string(), id);
        id
    }

    pub fn global_var(&self, id: GlobalId) -> &GlobalVariable {
        &self.globals[id.index()]
    }

    pub fn globals(&self) -> &[GlobalVariable] {
        &self.globals
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_global_is_idempotent() {
        let mut module = Module::new("m");
        let a = module.add_global("X3", Type::I64, Value::zero(Type::I64));
        let b = module.add_global("X3", Type::I32, Value::zero(Type::I32));
        assert_eq!(a, b);
        assert_eq!(module.globals().len(), 1);
        assert_eq!(module.global_var(a).ty, Type::I64);
        assert_eq!(module.global("X4"), None);
    }
}
