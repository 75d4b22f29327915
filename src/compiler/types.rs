//! The Java-side class model the translator works against.
//!
//! Classes, fields and methods here are the already-linked view the class loader produces.
//! The translator never loads classes itself; it only compares and inspects them.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{
    metadata::method::MethodDef,
    Result,
};

/// A class loader. Scopes are compared by identity, never by name.
#[derive(Debug)]
pub struct ClassLoader {
    /// Display name
    pub name: String,
    /// Classes of this loader are compiled with assertions removed
    pub remove_asserts: bool,
}

/// Shared handle on a [`ClassLoader`].
pub type LoaderScope = Arc<ClassLoader>;

impl ClassLoader {
    /// Create a loader scope.
    #[must_use]
    pub fn scope(name: &str, remove_asserts: bool) -> LoaderScope {
        Arc::new(ClassLoader {
            name: name.to_string(),
            remove_asserts,
        })
    }
}

bitflags! {
    /// Class modifiers relevant to intrinsic rules.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        /// Class cannot be subclassed
        const FINAL = 0x0001;
        /// Java class mapped onto an existing CLR type
        const REMAPPED = 0x0002;
        /// Interface
        const INTERFACE = 0x0004;
    }
}

/// What kind of type a [`JavaClass`] is.
#[derive(Debug, Clone)]
pub enum ClassKind {
    /// An ordinary reference type
    Reference,
    /// A primitive, named by its descriptor character
    Primitive(char),
    /// A CLR value type that is not a Java primitive
    Value,
    /// An array; the class name is the array descriptor
    Array(Arc<JavaClass>),
    /// A class that failed to load
    Unloadable,
}

bitflags! {
    /// Field modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        /// Per-class field
        const STATIC = 0x0008;
        /// Accesses have volatile semantics
        const VOLATILE = 0x0040;
        /// Assigned once
        const FINAL = 0x0010;
    }
}

/// A field declared by a class.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name
    pub name: Arc<str>,
    /// Field descriptor, e.g. `Ljava.lang.String;`
    pub signature: Arc<str>,
    /// The field's type
    pub field_type: Arc<JavaClass>,
    /// Modifiers
    pub flags: FieldFlags,
}

/// A method declared by a class, by name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Method name
    pub name: Arc<str>,
    /// Method descriptor
    pub signature: Arc<str>,
}

/// A loaded class.
#[derive(Debug)]
pub struct JavaClass {
    /// Dotted name, or the descriptor for arrays (`[I`, `[Ljava.lang.String;`)
    pub name: Arc<str>,
    /// Defining loader
    pub loader: LoaderScope,
    /// Type kind
    pub kind: ClassKind,
    /// Modifiers
    pub flags: ClassFlags,
    /// Superclass, `None` for `java.lang.Object`, primitives and interfaces
    pub super_class: Option<Arc<JavaClass>>,
    /// Declared fields
    pub fields: Vec<FieldInfo>,
    /// Declared methods
    pub methods: Vec<MethodDecl>,
}

impl JavaClass {
    /// An ordinary reference class without members.
    #[must_use]
    pub fn new(name: &str, loader: &LoaderScope) -> Self {
        JavaClass {
            name: Arc::from(name),
            loader: loader.clone(),
            kind: ClassKind::Reference,
            flags: ClassFlags::empty(),
            super_class: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A primitive class for descriptor character `descriptor`.
    #[must_use]
    pub fn primitive(descriptor: char, loader: &LoaderScope) -> Self {
        let name = match descriptor {
            'Z' => "boolean",
            'B' => "byte",
            'C' => "char",
            'S' => "short",
            'I' => "int",
            'J' => "long",
            'F' => "float",
            'D' => "double",
            _ => "void",
        };
        JavaClass {
            kind: ClassKind::Primitive(descriptor),
            flags: ClassFlags::FINAL,
            ..JavaClass::new(name, loader)
        }
    }

    /// The array class with elements of type `element`.
    #[must_use]
    pub fn array_of(element: &Arc<JavaClass>) -> Self {
        let name = format!("[{}", element.sig_name());
        JavaClass {
            kind: ClassKind::Array(element.clone()),
            flags: ClassFlags::FINAL,
            ..JavaClass::new(&name, &element.loader)
        }
    }

    /// Replace the modifiers.
    #[must_use]
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace the superclass.
    #[must_use]
    pub fn with_super(mut self, super_class: &Arc<JavaClass>) -> Self {
        self.super_class = Some(super_class.clone());
        self
    }

    /// Replace the kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, name: &str, field_type: &Arc<JavaClass>, flags: FieldFlags) -> Self {
        self.fields.push(FieldInfo {
            name: Arc::from(name),
            signature: Arc::from(field_type.sig_name()),
            field_type: field_type.clone(),
            flags,
        });
        self
    }

    /// Add a method declaration.
    #[must_use]
    pub fn with_method(mut self, name: &str, signature: &str) -> Self {
        self.methods.push(MethodDecl {
            name: Arc::from(name),
            signature: Arc::from(signature),
        });
        self
    }

    /// Same name from the same loader.
    #[must_use]
    pub fn same_class(&self, other: &JavaClass) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.loader, &other.loader)
    }

    /// The name as it appears in a descriptor.
    #[must_use]
    pub fn sig_name(&self) -> String {
        match self.kind {
            ClassKind::Primitive(descriptor) => descriptor.to_string(),
            ClassKind::Array(_) => self.name.to_string(),
            _ => format!("L{};", self.name),
        }
    }

    /// `true` for `java.lang.Object`.
    #[must_use]
    pub fn is_java_lang_object(&self) -> bool {
        &*self.name == "java.lang.Object"
    }

    /// `true` for array classes.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ClassKind::Array(_))
    }

    /// Element type of an array class.
    #[must_use]
    pub fn element_type(&self) -> Option<&Arc<JavaClass>> {
        match &self.kind {
            ClassKind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// `true` for Java primitives.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    /// `true` for CLR value types that are not Java primitives.
    #[must_use]
    pub fn is_non_primitive_value_type(&self) -> bool {
        matches!(self.kind, ClassKind::Value)
    }

    /// `true` for classes that failed to load.
    #[must_use]
    pub fn is_unloadable(&self) -> bool {
        matches!(self.kind, ClassKind::Unloadable)
    }

    /// `true` for final classes. Arrays report `true` as well.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }

    /// `true` for remapped classes.
    #[must_use]
    pub fn is_remapped(&self) -> bool {
        self.flags.contains(ClassFlags::REMAPPED)
    }

    /// `true` if a method `name` with descriptor `signature` is declared here.
    #[must_use]
    pub fn has_method(&self, name: &str, signature: &str) -> bool {
        self.methods
            .iter()
            .any(|method| &*method.name == name && &*method.signature == signature)
    }

    /// Find a field by name and descriptor, searching superclasses.
    ///
    /// Returns the field together with the class that declares it.
    #[must_use]
    pub fn find_field<'c>(
        self: &'c Arc<Self>,
        name: &str,
        signature: &str,
    ) -> Option<(&'c FieldInfo, &'c Arc<JavaClass>)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class
                .fields
                .iter()
                .find(|field| &*field.name == name && &*field.signature == signature)
            {
                return Some((field, class));
            }
            current = class.super_class.as_ref();
        }
        None
    }
}

bitflags! {
    /// Method modifiers as the translator sees them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JavaMethodFlags: u32 {
        /// Static method
        const STATIC = 0x0001;
        /// Receives the caller's identity as an implicit trailing parameter
        const HAS_CALLER_ID = 0x0002;
    }
}

/// A linked method.
#[derive(Debug, Clone)]
pub struct MethodWrapper {
    /// Declaring class
    pub declaring: Arc<JavaClass>,
    /// Method name
    pub name: Arc<str>,
    /// Java descriptor
    pub signature: Arc<str>,
    /// Modifiers
    pub flags: JavaMethodFlags,
    /// Number of parameters of the emitted method, including an implicit caller identity
    pub define_parameter_count: usize,
}

impl MethodWrapper {
    /// Create a method of `declaring`.
    #[must_use]
    pub fn new(
        declaring: &Arc<JavaClass>,
        name: &str,
        signature: &str,
        flags: JavaMethodFlags,
        define_parameter_count: usize,
    ) -> Self {
        MethodWrapper {
            declaring: declaring.clone(),
            name: Arc::from(name),
            signature: Arc::from(signature),
            flags,
            define_parameter_count,
        }
    }

    /// Wrap a method that already exists in a compiled module.
    ///
    /// Name, static-ness and parameter count come from the metadata; the Java descriptor
    /// is supplied by the caller since it is not recorded in the module.
    ///
    /// # Errors
    /// Returns an error if the method's name or signature cannot be resolved.
    pub fn from_metadata(
        declaring: &Arc<JavaClass>,
        method: &MethodDef,
        signature: &str,
    ) -> Result<Self> {
        let flags = if method.is_static() {
            JavaMethodFlags::STATIC
        } else {
            JavaMethodFlags::empty()
        };

        Ok(MethodWrapper::new(
            declaring,
            method.name()?,
            signature,
            flags,
            method.parameter_count()?,
        ))
    }

    /// Number of parameters declared by a Java method descriptor.
    ///
    /// Returns `None` if the descriptor is not of the form `(...)R`.
    #[must_use]
    pub fn descriptor_parameter_count(signature: &str) -> Option<usize> {
        let mut chars = signature.strip_prefix('(')?.chars();
        let mut count = 0;
        loop {
            match chars.next()? {
                ')' => return Some(count),
                '[' => continue,
                'L' => {
                    chars.by_ref().find(|c| *c == ';')?;
                    count += 1;
                }
                _ => count += 1,
            }
        }
    }

    /// Mark the method as receiving the caller's identity.
    #[must_use]
    pub fn with_caller_id(mut self) -> Self {
        self.flags |= JavaMethodFlags::HAS_CALLER_ID;
        self
    }

    /// `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(JavaMethodFlags::STATIC)
    }

    /// `true` when the method receives the caller's identity.
    #[must_use]
    pub fn has_caller_id(&self) -> bool {
        self.flags.contains(JavaMethodFlags::HAS_CALLER_ID)
    }
}
