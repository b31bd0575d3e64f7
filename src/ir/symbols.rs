// Per-function symbol table. Every named value of a function reserves its name here, and
// a colliding request is disambiguated with a numeric suffix. The table remembers the
// last suffix handed out per base name, so a later collision on the same base always gets
// a strictly larger suffix even after the lifter's own name-derivation state is reset at
// a return. A base ending in a digit gets an underscore separator (X3 becomes X3_1) so
// the suffix cannot be confused with part of the base.

//! Function-scoped symbol table with suffix disambiguation.

use hashbrown::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    names: HashSet<String>,
    last_suffix: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reserve `base` if it is free, otherwise the first free suffixed form.
    ///
    /// Returns the reserved name. An empty base stays empty and reserves nothing.
    pub fn unique_name(&mut self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }
        if !self.names.contains(base) {
            self.names.insert(base.to_string());
            return base.to_string();
        }

        let separator = if base.ends_with(|c: char| c.is_ascii_digit()) { "_" } else { "" };
        let counter = self.last_suffix.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}{separator}{counter}");
            if !self.names.contains(&candidate) {
                self.names.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_use_keeps_base() {
        let mut table = SymbolTable::new();
        assert_eq!(table.unique_name("tmp"), "tmp");
        assert_eq!(table.unique_name("tmp"), "tmp1");
        assert_eq!(table.unique_name("tmp"), "tmp2");
    }

    #[test]
    fn test_digit_suffix_gets_separator() {
        let mut table = SymbolTable::new();
        assert_eq!(table.unique_name("X3"), "X3");
        assert_eq!(table.unique_name("X3"), "X3_1");
        assert_eq!(table.unique_name("X3"), "X3_2");
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut table = SymbolTable::new();
        table.unique_name("a");
        table.unique_name("a1");
        assert_eq!(table.unique_name("a"), "a2");
        assert_eq!(table.unique_name("a"), "a3");
    }

    #[test]
    fn test_empty_base_is_unnamed() {
        let mut table = SymbolTable::new();
        assert_eq!(table.unique_name(""), "");
        assert!(table.is_empty());
    }
}
