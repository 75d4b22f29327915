//! Static stack types supplied by the verifier.

use std::{collections::HashMap, sync::Arc};

use crate::compiler::types::JavaClass;

/// Answers what type sits on the operand stack before an instruction executes.
pub trait StackTypeOracle: Send + Sync {
    /// Type at `depth` (0 = top) of the stack before instruction `index`, `None` when the
    /// analyzer has nothing for that slot.
    fn stack_type(&self, index: usize, depth: usize) -> Option<Arc<JavaClass>>;
}

/// A [`StackTypeOracle`] backed by a precomputed table.
#[derive(Debug, Default)]
pub struct StaticStackTypes {
    types: HashMap<(usize, usize), Arc<JavaClass>>,
}

impl StaticStackTypes {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        StaticStackTypes::default()
    }

    /// Record the type at `depth` before instruction `index`.
    #[must_use]
    pub fn with(mut self, index: usize, depth: usize, class: &Arc<JavaClass>) -> Self {
        self.types.insert((index, depth), class.clone());
        self
    }
}

impl StackTypeOracle for StaticStackTypes {
    fn stack_type(&self, index: usize, depth: usize) -> Option<Arc<JavaClass>> {
        self.types.get(&(index, depth)).cloned()
    }
}
