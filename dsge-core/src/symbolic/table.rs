//! Name resolution for equation parsing.

use super::expr::RESERVED_NAMES;
use crate::errors::ModelSpecError;
use crate::FloatValue;
use std::collections::HashMap;

/// What a name in an equation string refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NameKind {
    /// Endogenous variable, by position in the model's variable list
    Variable(usize),
    /// Exogenous shock, by position in the model's shock list
    Shock(usize),
    /// Parameter, already resolved to its value
    Parameter(FloatValue),
}

/// Every name declared by a model.
///
/// Names are unique across variables, shocks and parameters.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: HashMap<String, NameKind>,
}

impl SymbolTable {
    /// Declare a new name.
    ///
    /// Fails if the name was already declared or is reserved for a function.
    pub fn insert(&mut self, name: &str, kind: NameKind) -> Result<(), ModelSpecError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(ModelSpecError::ReservedName(name.to_string()));
        }
        if self.names.contains_key(name) {
            return Err(ModelSpecError::DuplicateName(name.to_string()));
        }
        self.names.insert(name.to_string(), kind);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<NameKind> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_and_reserved_names() {
        let mut table = SymbolTable::default();
        table.insert("y", NameKind::Variable(0)).unwrap();

        assert_eq!(
            table.insert("y", NameKind::Shock(0)),
            Err(ModelSpecError::DuplicateName("y".to_string()))
        );
        assert_eq!(
            table.insert("exp", NameKind::Parameter(1.0)),
            Err(ModelSpecError::ReservedName("exp".to_string()))
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("y"), Some(NameKind::Variable(0)));
        assert_eq!(table.resolve("z"), None);
    }
}
