//! Deferred finalization of generated types.

use std::sync::Arc;

use crate::{compiler::module::DynamicModule, Result};

/// A generated type whose creation waits for its enclosing class to finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFinish {
    /// Full name of the generated type
    pub type_name: Arc<str>,
    /// Base class that must be finished first
    pub base: Arc<str>,
}

/// Collects the finalization work registered while a class is translated.
///
/// Registration takes `&self`, so concurrent rules may append while the context is
/// shared. [`FinishContext::finish`] consumes the context, which makes draining happen
/// exactly once.
#[derive(Debug)]
pub struct FinishContext {
    module: Arc<DynamicModule>,
    pending: boxcar::Vec<PendingFinish>,
}

impl FinishContext {
    /// Create a context whose types live in `module`.
    #[must_use]
    pub fn new(module: Arc<DynamicModule>) -> Self {
        FinishContext {
            module,
            pending: boxcar::Vec::new(),
        }
    }

    /// The module generated types are defined in.
    #[must_use]
    pub fn module(&self) -> &Arc<DynamicModule> {
        &self.module
    }

    /// Queue `finish` to run when the enclosing class is done.
    pub fn register_post_finish(&self, finish: PendingFinish) {
        log::debug!("Deferring creation of {}", finish.type_name);
        self.pending.push(finish);
    }

    /// Number of queued finalizations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.count()
    }

    /// Create every queued type in registration order.
    ///
    /// Returns the names of the created types.
    ///
    /// # Errors
    /// Returns an error if a queued type was never defined or was already created.
    pub fn finish(self) -> Result<Vec<Arc<str>>> {
        let mut created = Vec::with_capacity(self.pending.count());
        for pending in self.pending {
            log::debug!(
                "Creating {} after base {}",
                pending.type_name,
                pending.base
            );
            self.module.create_type(&pending.type_name)?;
            created.push(pending.type_name);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{
        emit::{RuntimeType, TypeRef},
        module::{GeneratedType, TypeAttributes},
    };

    fn pending(name: &str) -> PendingFinish {
        PendingFinish {
            type_name: Arc::from(name),
            base: Arc::from("java.lang.Object"),
        }
    }

    #[test]
    fn finish_creates_in_order() {
        let module = Arc::new(DynamicModule::new());
        for name in ["A", "B"] {
            module
                .define_type(GeneratedType::new(
                    name,
                    TypeRef::Runtime(RuntimeType::Object),
                    TypeAttributes::SEALED,
                ))
                .unwrap();
        }

        let context = FinishContext::new(module.clone());
        context.register_post_finish(pending("B"));
        context.register_post_finish(pending("A"));
        assert_eq!(context.pending_count(), 2);

        let created = context.finish().unwrap();
        assert_eq!(created, vec![Arc::<str>::from("B"), Arc::from("A")]);
        assert!(module.is_created("A") && module.is_created("B"));
    }

    #[test]
    fn finish_fails_on_undefined_type() {
        let context = FinishContext::new(Arc::new(DynamicModule::new()));
        context.register_post_finish(pending("Ghost"));
        assert!(context.finish().is_err());
    }

    #[test]
    fn concurrent_registration() {
        let context = FinishContext::new(Arc::new(DynamicModule::new()));
        std::thread::scope(|scope| {
            for thread in 0..4 {
                let context = &context;
                scope.spawn(move || {
                    for index in 0..8 {
                        context.register_post_finish(pending(&format!("T{thread}_{index}")));
                    }
                });
            }
        });
        assert_eq!(context.pending_count(), 32);
    }
}
