use crate::protocol::SCHEMAS;
use std::collections::BTreeSet;

/// Schema names the converter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    names: BTreeSet<String>,
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Registry holding every built-in protocol record.
    pub fn mesos() -> Self {
        let mut registry = Self::empty();
        for schema in SCHEMAS {
            registry.register(schema);
        }
        registry
    }

    pub fn register(&mut self, schema: &str) -> bool {
        self.names.insert(schema.to_string())
    }

    pub fn unregister(&mut self, schema: &str) -> bool {
        self.names.remove(schema)
    }

    pub fn contains(&self, schema: &str) -> bool {
        self.names.contains(schema)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::mesos()
    }
}
