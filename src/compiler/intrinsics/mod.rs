//! Intrinsic call substitution.
//!
//! An intrinsic is a core-library method whose call sites the translator may replace with
//! a specialized instruction sequence. [`IntrinsicRegistry`] maps `(class, name,
//! signature)` triples to [`IntrinsicRule`]s. A rule looks at a window of instructions
//! around the call through a [`CallSite`], checks its preconditions and either emits the
//! replacement and reports [`Substitution::Handled`], or touches nothing and reports
//! [`Substitution::Declined`] so the caller falls back to a regular call.
//!
//! # Rules
//!
//! | Method | Module |
//! |--------|--------|
//! | `Object.getClass` | [`identity`] |
//! | `Float` / `Double` raw bit conversions | [`conversions`] |
//! | `System.arraycopy` | [`arraycopy`] |
//! | `Reflection.getCallerClass`, `ClassLoader.getCallerClassLoader`, `CallerID.getCallerID` | [`caller`] |
//! | `Class.desiredAssertionStatus`, `Util.getInstanceTypeFromClass`, `Class.getPrimitiveClass`, `String.toCharArray` | [`literals`] |
//! | `ThreadLocal.<init>` | [`threadlocal`] |
//! | `AtomicReferenceFieldUpdater.newUpdater` | [`atomic`] |
//!
//! Only methods declared by classes of the configured core loader qualify; a class with
//! the same name from another loader is never treated as intrinsic.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use jcil::compiler::{
//!     config::{CoreLibrary, IntrinsicConfig},
//!     intrinsics::IntrinsicRegistry,
//!     types::JavaMethodFlags,
//! };
//!
//! let core = Arc::new(CoreLibrary::standard());
//! let registry = IntrinsicRegistry::new(IntrinsicConfig::static_compiler(core.clone()));
//!
//! let get_class = core.method_wrapper(
//!     "java.lang.Object",
//!     "getClass",
//!     "()Ljava.lang.Class;",
//!     JavaMethodFlags::empty(),
//! )?;
//! assert!(registry.is_intrinsic(&get_class));
//! # Ok::<(), jcil::Error>(())
//! ```

pub mod arraycopy;
pub mod atomic;
pub mod caller;
pub mod conversions;
pub mod identity;
pub mod literals;
pub mod threadlocal;

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    compiler::{
        analyzer::StackTypeOracle,
        classfile::{ClassFile, MethodRefConstant},
        config::{IntrinsicConfig, ATOMIC_REFERENCE_FIELD_UPDATER, CALLER_ID, JAVA_LANG_CLASS, JAVA_LANG_OBJECT},
        context::FinishContext,
        emit::{CodeEmitter, RuntimeMethod, RuntimeType},
        instruction::{Instruction, InstructionFlags, NormalizedOpCode},
        types::{JavaClass, MethodWrapper},
        Substitution,
    },
    Result,
};

/// Structural identity of an intrinsic: declaring class, name and descriptor.
#[derive(Debug, Clone, Eq)]
pub struct IntrinsicKey {
    class: Arc<str>,
    name: Arc<str>,
    signature: Arc<str>,
}

impl IntrinsicKey {
    /// Create a key.
    #[must_use]
    pub fn new(class: Arc<str>, name: Arc<str>, signature: Arc<str>) -> Self {
        IntrinsicKey {
            class,
            name,
            signature,
        }
    }

    /// The key of a linked method.
    #[must_use]
    pub fn of(method: &MethodWrapper) -> Self {
        IntrinsicKey::new(
            method.declaring.name.clone(),
            method.name.clone(),
            method.signature.clone(),
        )
    }

    /// Declaring class name.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method descriptor.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

fn same_str(a: &Arc<str>, b: &Arc<str>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}

impl PartialEq for IntrinsicKey {
    fn eq(&self, other: &Self) -> bool {
        same_str(&self.name, &other.name)
            && same_str(&self.class, &other.class)
            && same_str(&self.signature, &other.signature)
    }
}

impl Hash for IntrinsicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.name.hash(state);
        self.signature.hash(state);
    }
}

/// A substitution rule for one intrinsic.
pub trait IntrinsicRule: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Try to replace the call at `site`.
    ///
    /// A rule must not emit anything or change `site.code` unless it returns
    /// [`Substitution::Handled`]; lazily consumed values are put back before declining.
    ///
    /// # Errors
    /// Fatal conditions only: corrupt input or a configuration the rule cannot work with.
    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution>;
}

/// Everything a rule may inspect or change at one call instruction.
pub struct CallSite<'s> {
    /// Deferred finalization of generated types
    pub context: &'s FinishContext,
    /// Output
    pub emitter: &'s mut dyn CodeEmitter,
    /// The called method
    pub method: &'s MethodWrapper,
    /// Verifier stack types
    pub stack: &'s dyn StackTypeOracle,
    /// Index of the call in `code`
    pub index: usize,
    /// The method being translated
    pub caller: &'s MethodWrapper,
    /// Constant pool of the class being translated
    pub class_file: &'s ClassFile,
    /// Instructions of the method being translated
    pub code: &'s mut [Instruction],
    /// Per-instruction analyzer flags, parallel to `code`
    pub flags: &'s [InstructionFlags],
}

impl CallSite<'_> {
    fn absolute(&self, offset: isize) -> Option<usize> {
        self.index
            .checked_add_signed(offset)
            .filter(|index| *index < self.code.len())
    }

    /// The instruction `offset` positions away from the call.
    #[must_use]
    pub fn instruction(&self, offset: isize) -> Option<&Instruction> {
        self.absolute(offset).map(|index| &self.code[index])
    }

    /// The opcode `offset` positions away from the call.
    #[must_use]
    pub fn opcode_at(&self, offset: isize) -> Option<NormalizedOpCode> {
        self.instruction(offset).map(|instruction| instruction.opcode)
    }

    /// Returns `true` if the instruction `offset` positions away is a branch target.
    #[must_use]
    pub fn is_branch_target(&self, offset: isize) -> bool {
        self.absolute(offset)
            .and_then(|index| self.flags.get(index))
            .is_some_and(|flags| flags.contains(InstructionFlags::BRANCH_TARGET))
    }

    /// Returns `true` if every offset in `offsets` exists and none is a branch target.
    #[must_use]
    pub fn is_straight_line(&self, offsets: std::ops::RangeInclusive<isize>) -> bool {
        offsets
            .into_iter()
            .all(|offset| self.absolute(offset).is_some() && !self.is_branch_target(offset))
    }

    /// Stack type at `depth` before the instruction `offset` positions away.
    #[must_use]
    pub fn stack_type(&self, offset: isize, depth: usize) -> Option<Arc<JavaClass>> {
        self.absolute(offset)
            .and_then(|index| self.stack.stack_type(index, depth))
    }

    /// Replace the opcode `offset` positions away.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there is no such instruction.
    pub fn patch(&mut self, offset: isize, opcode: NormalizedOpCode) -> Result<()> {
        let index = self.absolute(offset).ok_or(crate::Error::OutOfBounds)?;
        self.code[index].patch_opcode(opcode);
        Ok(())
    }
}

/// Returns `true` if `constant` refers to `class.name signature`, following the link when
/// the reference was resolved.
pub(crate) fn refers_to(
    constant: &MethodRefConstant,
    class: &str,
    name: &str,
    signature: &str,
) -> bool {
    match &constant.target {
        Some(target) => {
            &*target.declaring.name == class
                && &*target.name == name
                && &*target.signature == signature
        }
        None => {
            &*constant.class == class && &*constant.name == name && &*constant.signature == signature
        }
    }
}

/// The table of intrinsics for one configuration.
pub struct IntrinsicRegistry {
    config: IntrinsicConfig,
    rules: HashMap<IntrinsicKey, Box<dyn IntrinsicRule>>,
}

impl IntrinsicRegistry {
    /// Build the table for `config`.
    ///
    /// Rules that are only valid ahead of time are registered only when
    /// [`IntrinsicConfig::static_compiler`] is set.
    #[must_use]
    pub fn new(config: IntrinsicConfig) -> Self {
        let mut registry = IntrinsicRegistry {
            config,
            rules: HashMap::new(),
        };

        registry.register(
            JAVA_LANG_OBJECT,
            "getClass",
            "()Ljava.lang.Class;",
            identity::ObjectGetClass,
        );
        registry.register(
            JAVA_LANG_CLASS,
            "desiredAssertionStatus",
            "()Z",
            literals::DesiredAssertionStatus,
        );
        registry.register(
            "java.lang.Float",
            "floatToRawIntBits",
            "(F)I",
            conversions::BitConversion::new(
                RuntimeType::FloatConverter,
                RuntimeMethod::FloatConverterToInt,
            ),
        );
        registry.register(
            "java.lang.Float",
            "intBitsToFloat",
            "(I)F",
            conversions::BitConversion::new(
                RuntimeType::FloatConverter,
                RuntimeMethod::FloatConverterToFloat,
            ),
        );
        registry.register(
            "java.lang.Double",
            "doubleToRawLongBits",
            "(D)J",
            conversions::BitConversion::new(
                RuntimeType::DoubleConverter,
                RuntimeMethod::DoubleConverterToLong,
            ),
        );
        registry.register(
            "java.lang.Double",
            "longBitsToDouble",
            "(J)D",
            conversions::BitConversion::new(
                RuntimeType::DoubleConverter,
                RuntimeMethod::DoubleConverterToDouble,
            ),
        );
        registry.register(
            "java.lang.System",
            "arraycopy",
            "(Ljava.lang.Object;ILjava.lang.Object;II)V",
            arraycopy::ArrayCopy,
        );
        registry.register(
            ATOMIC_REFERENCE_FIELD_UPDATER,
            "newUpdater",
            "(Ljava.lang.Class;Ljava.lang.Class;Ljava.lang.String;)Ljava.util.concurrent.atomic.AtomicReferenceFieldUpdater;",
            atomic::AtomicFieldUpdaterEmitter::new(),
        );
        registry.register(
            "sun.reflect.Reflection",
            "getCallerClass",
            "(I)Ljava.lang.Class;",
            caller::GetCallerClass,
        );
        registry.register(
            "java.lang.ClassLoader",
            "getCallerClassLoader",
            "()Ljava.lang.ClassLoader;",
            caller::GetCallerClassLoader,
        );
        registry.register(
            CALLER_ID,
            "getCallerID",
            "()Likvm.internal.CallerID;",
            caller::GetCallerId,
        );
        registry.register(
            "ikvm.runtime.Util",
            "getInstanceTypeFromClass",
            "(Ljava.lang.Class;)Lcli.System.Type;",
            literals::GetInstanceTypeFromClass,
        );
        registry.register(
            "java.lang.ThreadLocal",
            "<init>",
            "()V",
            threadlocal::ThreadLocalInit,
        );

        if registry.config.static_compiler {
            registry.register(
                "java.lang.String",
                "toCharArray",
                "()[C",
                literals::ToCharArray,
            );
            registry.register(
                JAVA_LANG_CLASS,
                "getPrimitiveClass",
                "(Ljava.lang.String;)Ljava.lang.Class;",
                literals::GetPrimitiveClass,
            );
        }

        registry
    }

    fn register<R: IntrinsicRule + 'static>(
        &mut self,
        class: &str,
        name: &str,
        signature: &str,
        rule: R,
    ) {
        // Share the core class's name so lookups from linked methods hit the pointer check
        let class = match self.config.core.class(class) {
            Ok(core_class) => core_class.name.clone(),
            Err(_) => Arc::from(class),
        };
        let key = IntrinsicKey::new(class, Arc::from(name), Arc::from(signature));
        self.rules.insert(key, Box::new(rule));
    }

    /// The configuration the table was built for.
    #[must_use]
    pub fn config(&self) -> &IntrinsicConfig {
        &self.config
    }

    /// Number of registered intrinsics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no intrinsic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns `true` if calls to `method` may be substituted.
    ///
    /// The method must match a registered triple and its declaring class must come from
    /// the core loader.
    #[must_use]
    pub fn is_intrinsic(&self, method: &MethodWrapper) -> bool {
        Arc::ptr_eq(&method.declaring.loader, self.config.core.scope())
            && self.rules.contains_key(&IntrinsicKey::of(method))
    }

    /// Try to replace the call at `site`.
    ///
    /// Methods that are not intrinsic are declined.
    ///
    /// # Errors
    /// Propagates fatal errors from the matched rule.
    pub fn substitute(&self, site: &mut CallSite<'_>) -> Result<Substitution> {
        if !Arc::ptr_eq(&site.method.declaring.loader, self.config.core.scope()) {
            return Ok(Substitution::Declined);
        }
        let Some(rule) = self.rules.get(&IntrinsicKey::of(site.method)) else {
            return Ok(Substitution::Declined);
        };

        let outcome = rule.apply(&self.config, site)?;
        if outcome == Substitution::Handled {
            log::debug!(
                "{}: substituted call at {} in {}.{}",
                rule.name(),
                site.index,
                site.caller.declaring.name,
                site.caller.name
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            config::CoreLibrary,
            types::{ClassLoader, JavaMethodFlags},
        },
        test::factories::SiteFixture,
    };

    #[test]
    fn key_equality_is_structural() {
        let a = IntrinsicKey::new(Arc::from("A"), Arc::from("m"), Arc::from("()V"));
        let b = IntrinsicKey::new(Arc::from("A"), Arc::from("m"), Arc::from("()V"));
        let c = IntrinsicKey::new(Arc::from("A"), Arc::from("m"), Arc::from("(I)V"));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut map = HashMap::new();
        map.insert(a, 1);
        assert_eq!(map.get(&b), Some(&1));
    }

    #[test]
    fn static_only_rules() {
        let core = Arc::new(CoreLibrary::standard());
        let aot = IntrinsicRegistry::new(IntrinsicConfig::static_compiler(core.clone()));
        let jit = IntrinsicRegistry::new(IntrinsicConfig::dynamic(core.clone()));
        assert_eq!(aot.len(), jit.len() + 2);

        let to_char_array = core
            .method_wrapper("java.lang.String", "toCharArray", "()[C", JavaMethodFlags::empty())
            .unwrap();
        assert!(aot.is_intrinsic(&to_char_array));
        assert!(!jit.is_intrinsic(&to_char_array));
    }

    #[test]
    fn scope_check_rejects_look_alikes() {
        let core = Arc::new(CoreLibrary::standard());
        let registry = IntrinsicRegistry::new(IntrinsicConfig::static_compiler(core.clone()));

        let impostor_loader = ClassLoader::scope("core", false);
        let impostor = Arc::new(JavaClass::new("java.lang.Object", &impostor_loader));
        let fake = MethodWrapper::new(
            &impostor,
            "getClass",
            "()Ljava.lang.Class;",
            JavaMethodFlags::empty(),
            0,
        );
        assert!(!registry.is_intrinsic(&fake));

        let real = core
            .method_wrapper(
                JAVA_LANG_OBJECT,
                "getClass",
                "()Ljava.lang.Class;",
                JavaMethodFlags::empty(),
            )
            .unwrap();
        assert!(registry.is_intrinsic(&real));

        let wrong_signature = MethodWrapper::new(
            &real.declaring,
            "getClass",
            "()Ljava.lang.Object;",
            JavaMethodFlags::empty(),
            0,
        );
        assert!(!registry.is_intrinsic(&wrong_signature));
    }

    #[test]
    fn substitute_declines_look_alikes_without_emitting() {
        let fixture = SiteFixture::new();
        let impostor_loader = ClassLoader::scope("core", false);
        let impostor = Arc::new(JavaClass::new("java.lang.Object", &impostor_loader));
        let fake = MethodWrapper::new(
            &impostor,
            "getClass",
            "()Ljava.lang.Class;",
            JavaMethodFlags::empty(),
            0,
        );

        let mut code = vec![
            Instruction::new(0, NormalizedOpCode::Invokevirtual, 1),
            Instruction::new(3, NormalizedOpCode::Pop, 0),
        ];
        let outcome = fixture.run(&fake, &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn window_helpers() {
        let fixture = SiteFixture::new();
        let mut code = vec![
            Instruction::new(0, NormalizedOpCode::Aload, 0),
            Instruction::new(1, NormalizedOpCode::Invokevirtual, 1),
            Instruction::new(4, NormalizedOpCode::Pop, 0),
        ];
        let flags = [
            InstructionFlags::empty(),
            InstructionFlags::empty(),
            InstructionFlags::BRANCH_TARGET,
        ];
        fixture.with_site(&fixture.get_class(), &mut code, &flags, 1, |site| {
            assert_eq!(site.opcode_at(-1), Some(NormalizedOpCode::Aload));
            assert_eq!(site.opcode_at(2), None);
            assert!(site.opcode_at(-2).is_none());
            assert!(site.is_branch_target(1));
            assert!(!site.is_branch_target(5));
            assert!(site.is_straight_line(-1..=0));
            assert!(!site.is_straight_line(0..=1));
            assert!(!site.is_straight_line(0..=2));
            assert!(site.patch(3, NormalizedOpCode::Nop).is_err());
        });
    }
}
