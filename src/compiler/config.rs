//! Translator configuration.
//!
//! Everything the intrinsic rules depend on besides the call site itself lives here: the
//! compilation mode and the set of trusted core-library classes. Nothing is read from
//! global state.

use std::{collections::HashMap, sync::Arc};

use crate::{
    compiler::{
        emit::MethodRef,
        types::{ClassFlags, ClassLoader, JavaClass, JavaMethodFlags, LoaderScope, MethodWrapper},
    },
    Error, Result,
};

/// `java.lang.Object`
pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";
/// `java.lang.Class`
pub const JAVA_LANG_CLASS: &str = "java.lang.Class";
/// `ikvm.internal.CallerID`
pub const CALLER_ID: &str = "ikvm.internal.CallerID";
/// `ikvm.internal.IntrinsicThreadLocal`
pub const INTRINSIC_THREAD_LOCAL: &str = "ikvm.internal.IntrinsicThreadLocal";
/// `java.util.concurrent.atomic.AtomicReferenceFieldUpdater`
pub const ATOMIC_REFERENCE_FIELD_UPDATER: &str =
    "java.util.concurrent.atomic.AtomicReferenceFieldUpdater";

/// The trusted core-library classes, all defined by one loader.
#[derive(Debug)]
pub struct CoreLibrary {
    scope: LoaderScope,
    classes: HashMap<Arc<str>, Arc<JavaClass>>,
}

impl CoreLibrary {
    /// Create an empty core library for `scope`.
    #[must_use]
    pub fn new(scope: LoaderScope) -> Self {
        CoreLibrary {
            scope,
            classes: HashMap::new(),
        }
    }

    /// The classes and members intrinsic rules refer to, defined by a fresh `core` loader.
    #[must_use]
    pub fn standard() -> Self {
        let mut core = CoreLibrary::new(ClassLoader::scope("core", false));
        let scope = core.scope.clone();

        let object = core.insert(
            JavaClass::new(JAVA_LANG_OBJECT, &scope)
                .with_method("getClass", "()Ljava.lang.Class;")
                .with_method("<init>", "()V"),
        );
        let final_class = |name: &str| {
            JavaClass::new(name, &scope)
                .with_super(&object)
                .with_flags(ClassFlags::FINAL)
        };

        core.insert(
            final_class(JAVA_LANG_CLASS)
                .with_method("<init>", "(Lcli.System.Type;)V")
                .with_method("desiredAssertionStatus", "()Z")
                .with_method(
                    "getPrimitiveClass",
                    "(Ljava.lang.String;)Ljava.lang.Class;",
                ),
        );
        core.insert(
            final_class("java.lang.String")
                .with_flags(ClassFlags::FINAL | ClassFlags::REMAPPED)
                .with_method("toCharArray", "()[C"),
        );
        core.insert(
            final_class("java.lang.Float")
                .with_method("floatToRawIntBits", "(F)I")
                .with_method("intBitsToFloat", "(I)F"),
        );
        core.insert(
            final_class("java.lang.Double")
                .with_method("doubleToRawLongBits", "(D)J")
                .with_method("longBitsToDouble", "(J)D"),
        );
        core.insert(final_class("java.lang.System").with_method(
            "arraycopy",
            "(Ljava.lang.Object;ILjava.lang.Object;II)V",
        ));
        core.insert(
            final_class(CALLER_ID)
                .with_method("getCallerClass", "()Ljava.lang.Class;")
                .with_method("getCallerClassLoader", "()Ljava.lang.ClassLoader;")
                .with_method("getCallerID", "()Likvm.internal.CallerID;"),
        );
        core.insert(
            final_class("sun.reflect.Reflection")
                .with_method("getCallerClass", "(I)Ljava.lang.Class;"),
        );
        core.insert(
            JavaClass::new("java.lang.ClassLoader", &scope)
                .with_super(&object)
                .with_method("getCallerClassLoader", "()Ljava.lang.ClassLoader;"),
        );
        core.insert(final_class("ikvm.runtime.Util").with_method(
            "getInstanceTypeFromClass",
            "(Ljava.lang.Class;)Lcli.System.Type;",
        ));
        let thread_local = core.insert(
            JavaClass::new("java.lang.ThreadLocal", &scope)
                .with_super(&object)
                .with_method("<init>", "()V"),
        );
        core.insert(
            JavaClass::new(INTRINSIC_THREAD_LOCAL, &scope)
                .with_super(&thread_local)
                .with_method("<init>", "()V"),
        );
        core.insert(
            JavaClass::new(ATOMIC_REFERENCE_FIELD_UPDATER, &scope)
                .with_super(&object)
                .with_method("<init>", "()V")
                .with_method(
                    "newUpdater",
                    "(Ljava.lang.Class;Ljava.lang.Class;Ljava.lang.String;)Ljava.util.concurrent.atomic.AtomicReferenceFieldUpdater;",
                ),
        );

        core
    }

    /// Add a class, returning the shared handle.
    pub fn insert(&mut self, class: JavaClass) -> Arc<JavaClass> {
        let class = Arc::new(class);
        self.classes.insert(class.name.clone(), class.clone());
        class
    }

    /// The loader all core classes belong to.
    #[must_use]
    pub fn scope(&self) -> &LoaderScope {
        &self.scope
    }

    /// Look up a core class.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the class is not configured.
    pub fn class(&self, name: &str) -> Result<&Arc<JavaClass>> {
        self.classes
            .get(name)
            .ok_or_else(|| Error::TypeNotFound(name.to_string()))
    }

    /// A reference to a method of a core class.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the class or the method is not configured.
    pub fn method(&self, class: &str, name: &str, signature: &str) -> Result<MethodRef> {
        if self.class(class)?.has_method(name, signature) {
            Ok(MethodRef::new(class, name, signature))
        } else {
            Err(Error::TypeNotFound(format!("{class}.{name}{signature}")))
        }
    }

    /// A linked method of a core class, as the class loader would hand it out.
    ///
    /// # Errors
    /// Returns [`Error::TypeNotFound`] if the class or the method is not configured, or
    /// [`crate::Error::Malformed`] if `signature` is not a method descriptor.
    pub fn method_wrapper(
        &self,
        class: &str,
        name: &str,
        signature: &str,
        flags: JavaMethodFlags,
    ) -> Result<Arc<MethodWrapper>> {
        self.method(class, name, signature)?;
        let Some(count) = MethodWrapper::descriptor_parameter_count(signature) else {
            return Err(malformed_error!("Invalid method descriptor - {}", signature));
        };

        Ok(Arc::new(MethodWrapper::new(
            self.class(class)?,
            name,
            signature,
            flags,
            count,
        )))
    }
}

/// Settings for the intrinsic registry and its rules.
#[derive(Debug, Clone)]
pub struct IntrinsicConfig {
    /// Ahead-of-time compilation; enables the rules that are only valid for the static
    /// compiler
    pub static_compiler: bool,

    /// Generated classes may be unloaded; disables the thread-local rule
    pub class_unloading: bool,

    /// String literals longer than this many UTF-16 units become char-array literals
    pub char_array_literal_threshold: usize,

    /// The trusted core library
    pub core: Arc<CoreLibrary>,
}

impl IntrinsicConfig {
    /// Ahead-of-time compilation against `core`.
    #[must_use]
    pub fn static_compiler(core: Arc<CoreLibrary>) -> Self {
        Self {
            static_compiler: true,
            class_unloading: false,
            char_array_literal_threshold: 128,
            core,
        }
    }

    /// Runtime compilation against `core`.
    #[must_use]
    pub fn dynamic(core: Arc<CoreLibrary>) -> Self {
        Self {
            static_compiler: false,
            ..Self::static_compiler(core)
        }
    }

    /// Set whether generated classes may be unloaded.
    #[must_use]
    pub fn with_class_unloading(mut self, enabled: bool) -> Self {
        self.class_unloading = enabled;
        self
    }

    /// Set the char-array literal threshold.
    #[must_use]
    pub fn with_char_array_literal_threshold(mut self, threshold: usize) -> Self {
        self.char_array_literal_threshold = threshold;
        self
    }
}
