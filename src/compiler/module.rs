//! Types generated while translating, and the module that owns them.
//!
//! Rules define helper types (accessor subclasses, thread-local holders, packed array
//! layouts) as plain data. [`DynamicModule`] is shared between all translations of one
//! output module and may be touched from several threads at once.

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use dashmap::{mapref::entry::Entry, DashMap, DashSet};

use crate::{
    compiler::emit::{EmittedOp, FieldRef, TypeRef},
    metadata::method::{MethodAccess, MethodAttributes},
    Result,
};

bitflags! {
    /// Attributes of a generated type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeAttributes: u32 {
        /// Visible outside the module
        const PUBLIC = 0x0000_0001;
        /// Nested, visible to the enclosing type only
        const NESTED_PRIVATE = 0x0000_0003;
        /// Fields are placed at explicit offsets
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Cannot be derived from
        const SEALED = 0x0000_0100;
    }
}

/// Explicit packing and size of a value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructLayout {
    /// Packing size in bytes
    pub pack: u16,
    /// Total size in bytes
    pub size: u32,
}

/// A field of a generated type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedField {
    /// Field name
    pub name: Arc<str>,
    /// Field type
    pub field_type: TypeRef,
    /// Per-type storage
    pub is_static: bool,
    /// One slot per thread
    pub thread_static: bool,
}

/// A method of a generated type.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMethod {
    /// Method name
    pub name: Arc<str>,
    /// Accessibility
    pub access: MethodAccess,
    /// Method attributes
    pub attributes: MethodAttributes,
    /// Return type
    pub return_type: TypeRef,
    /// Parameter types, excluding `this`
    pub parameters: Vec<TypeRef>,
    /// Method body
    pub body: Vec<EmittedOp>,
}

/// The constructor of a generated type.
#[derive(Debug)]
pub struct GeneratedConstructor {
    /// Full name of the type the constructor belongs to
    pub type_name: Arc<str>,
    /// Constructor body
    pub body: Vec<EmittedOp>,
}

/// Shared handle on a generated constructor. Equality is identity.
#[derive(Clone)]
pub struct ConstructorRef(Arc<GeneratedConstructor>);

impl ConstructorRef {
    /// Wrap a constructor.
    #[must_use]
    pub fn new(constructor: GeneratedConstructor) -> Self {
        ConstructorRef(Arc::new(constructor))
    }

    /// The constructor.
    #[must_use]
    pub fn get(&self) -> &GeneratedConstructor {
        &self.0
    }

    /// Returns `true` if both handles point at the same constructor.
    #[must_use]
    pub fn ptr_eq(&self, other: &ConstructorRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ConstructorRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ConstructorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstructorRef({})", self.0.type_name)
    }
}

/// A type defined by the translator.
#[derive(Debug, Clone)]
pub struct GeneratedType {
    /// Simple name
    pub name: Arc<str>,
    /// Enclosing class for nested types
    pub declaring: Option<Arc<str>>,
    /// Base type
    pub base: TypeRef,
    /// Type attributes
    pub attributes: TypeAttributes,
    /// Explicit layout, value types only
    pub layout: Option<StructLayout>,
    /// Fields
    pub fields: Vec<GeneratedField>,
    /// Methods
    pub methods: Vec<GeneratedMethod>,
    /// Constructor
    pub constructor: Option<ConstructorRef>,
}

impl GeneratedType {
    /// A type named `name` deriving from `base`, with no members.
    #[must_use]
    pub fn new(name: &str, base: TypeRef, attributes: TypeAttributes) -> Self {
        GeneratedType {
            name: Arc::from(name),
            declaring: None,
            base,
            attributes,
            layout: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
        }
    }

    /// Nest the type inside `declaring`.
    #[must_use]
    pub fn nested_in(mut self, declaring: &Arc<str>) -> Self {
        self.declaring = Some(declaring.clone());
        self
    }

    /// `Outer+Inner` for nested types, the simple name otherwise.
    #[must_use]
    pub fn full_name(&self) -> Arc<str> {
        match &self.declaring {
            Some(declaring) => Arc::from(format!("{declaring}+{}", self.name)),
            None => self.name.clone(),
        }
    }

    /// Returns `true` when the base is `System.ValueType`.
    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.base == TypeRef::Runtime(crate::compiler::emit::RuntimeType::ValueType)
    }

    /// Find a method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&GeneratedMethod> {
        self.methods.iter().find(|method| &*method.name == name)
    }
}

/// A blob of initialized data placed in the module.
#[derive(Debug, Clone)]
pub struct InitializedData {
    /// Field name
    pub name: Arc<str>,
    /// Contents
    pub data: Vec<u8>,
}

/// Registry of the types and data generated for one output module.
#[derive(Debug, Default)]
pub struct DynamicModule {
    types: DashMap<Arc<str>, Arc<GeneratedType>>,
    created: DashSet<Arc<str>>,
    initialized_data: boxcar::Vec<InitializedData>,
}

impl DynamicModule {
    /// Create an empty module.
    #[must_use]
    pub fn new() -> Self {
        DynamicModule::default()
    }

    /// Define a type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a type with the same full name exists.
    pub fn define_type(&self, generated: GeneratedType) -> Result<Arc<GeneratedType>> {
        let name = generated.full_name();
        match self.types.entry(name) {
            Entry::Occupied(entry) => Err(malformed_error!(
                "Type {} is already defined",
                entry.key()
            )),
            Entry::Vacant(entry) => {
                let generated = Arc::new(generated);
                entry.insert(generated.clone());
                Ok(generated)
            }
        }
    }

    /// Define a type unless one with the same full name exists.
    ///
    /// Returns the type stored under the name and whether this call defined it.
    pub fn get_or_define_type(&self, generated: GeneratedType) -> (Arc<GeneratedType>, bool) {
        match self.types.entry(generated.full_name()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let generated = Arc::new(generated);
                entry.insert(generated.clone());
                (generated, true)
            }
        }
    }

    /// Look up a type by full name.
    #[must_use]
    pub fn find_type(&self, full_name: &str) -> Option<Arc<GeneratedType>> {
        self.types.get(full_name).map(|entry| entry.value().clone())
    }

    /// Number of defined types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Bake a defined type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the type is unknown or already created.
    pub fn create_type(&self, full_name: &str) -> Result<()> {
        let Some(entry) = self.types.get(full_name) else {
            return Err(malformed_error!("Cannot create undefined type {}", full_name));
        };

        if !self.created.insert(entry.key().clone()) {
            return Err(malformed_error!("Type {} was created twice", full_name));
        }
        Ok(())
    }

    /// Returns `true` once [`DynamicModule::create_type`] succeeded for `full_name`.
    #[must_use]
    pub fn is_created(&self, full_name: &str) -> bool {
        self.created.contains(full_name)
    }

    /// Place `data` in the module and return the field that refers to it.
    pub fn define_initialized_data(&self, name: &str, data: Vec<u8>) -> FieldRef {
        let name: Arc<str> = Arc::from(name);
        let index = self.initialized_data.push(InitializedData {
            name: name.clone(),
            data,
        });
        FieldRef::InitializedData { name, index }
    }

    /// The initialized data at `index`.
    #[must_use]
    pub fn initialized_data(&self, index: usize) -> Option<&InitializedData> {
        self.initialized_data.get(index)
    }
}
