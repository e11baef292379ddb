//! Type-checker output attached to a load: canonical signatures, method sets
//! of named types, and folded constant values. Keys are fully qualified
//! (`"<pkg>.<Name>"` for types, function keys for signatures).

use crate::MethodSig;
use rustc_hash::FxHashMap;

/// Method set of a named type `T`. The set of `*T` is the union of both
/// lists; the set of `T` is the value-receiver list alone.
#[derive(Debug, Clone, Default)]
pub struct MethodSet {
    pub value_methods: Vec<MethodSig>,
    pub pointer_methods: Vec<MethodSig>,
}

impl MethodSet {
    /// Look up a method in the method set of `*T`.
    pub fn find(&self, name: &str) -> Option<&MethodSig> {
        self.value_methods
            .iter()
            .chain(self.pointer_methods.iter())
            .find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.value_methods.len() + self.pointer_methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_methods.is_empty() && self.pointer_methods.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    /// Function key → canonical signature.
    pub signatures: FxHashMap<String, String>,
    /// Type key → method set.
    pub method_sets: FxHashMap<String, MethodSet>,
    /// Constant key → statically folded value.
    pub const_values: FxHashMap<String, String>,
    /// Raw receiver text → canonical type key, as normalized by the checker.
    pub receiver_types: FxHashMap<String, String>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method_set(&self, type_key: &str) -> Option<&MethodSet> {
        self.method_sets.get(type_key)
    }

    /// Subtype check of `*type_key` against an interface method set: every
    /// interface method must exist with an identical canonical signature.
    /// Returns the missing method names; empty means the check holds.
    pub fn missing_methods(&self, type_key: &str, iface_methods: &[MethodSig]) -> Vec<String> {
        let set = self.method_sets.get(type_key);
        iface_methods
            .iter()
            .filter(|wanted| {
                set.and_then(|s| s.find(&wanted.name))
                    .map_or(true, |found| found.signature != wanted.signature)
            })
            .map(|m| m.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(name: &str, signature: &str) -> MethodSig {
        MethodSig {
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }

    #[test]
    fn pointer_receiver_methods_count_toward_subtyping() {
        let mut table = TypeTable::new();
        table.method_sets.insert(
            "pkg.FileWriter".to_string(),
            MethodSet {
                value_methods: vec![],
                pointer_methods: vec![sig("Write", "([]byte) (int, error)")],
            },
        );

        let iface = vec![sig("Write", "([]byte) (int, error)")];
        assert!(table.missing_methods("pkg.FileWriter", &iface).is_empty());
    }

    #[test]
    fn signature_mismatch_reports_missing() {
        let mut table = TypeTable::new();
        table.method_sets.insert(
            "pkg.T".to_string(),
            MethodSet {
                value_methods: vec![sig("Write", "(string) error")],
                pointer_methods: vec![],
            },
        );

        let iface = vec![sig("Write", "([]byte) (int, error)")];
        assert_eq!(table.missing_methods("pkg.T", &iface), vec!["Write"]);
    }

    #[test]
    fn empty_interface_is_satisfied_by_any_type() {
        let table = TypeTable::new();
        assert!(table.missing_methods("pkg.Anything", &[]).is_empty());
    }
}
