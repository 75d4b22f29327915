//! The constant pool of the class being compiled.

use std::sync::Arc;

use crate::{
    compiler::types::{JavaClass, MethodWrapper},
    Result,
};

/// A method reference constant, with its link target when resolution succeeded.
#[derive(Debug, Clone)]
pub struct MethodRefConstant {
    /// Referenced class name
    pub class: Arc<str>,
    /// Method name
    pub name: Arc<str>,
    /// Method descriptor
    pub signature: Arc<str>,
    /// Linked method, `None` if the reference did not resolve
    pub target: Option<Arc<MethodWrapper>>,
}

/// A constant-pool entry.
#[derive(Debug, Clone)]
pub enum Constant {
    /// `CONSTANT_Class`, already loaded
    Class(Arc<JavaClass>),
    /// `CONSTANT_String`
    String(Arc<str>),
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Methodref` / `CONSTANT_InterfaceMethodref`
    MethodRef(MethodRefConstant),
}

/// A class being compiled and its constant pool.
///
/// Index 0 of the pool is unused, as in the class-file format.
#[derive(Debug)]
pub struct ClassFile {
    this_class: Arc<JavaClass>,
    constants: Vec<Option<Constant>>,
}

impl ClassFile {
    /// Create an empty constant pool for `this_class`.
    #[must_use]
    pub fn new(this_class: &Arc<JavaClass>) -> Self {
        ClassFile {
            this_class: this_class.clone(),
            constants: vec![None],
        }
    }

    /// Append a constant, returning its index.
    pub fn push(&mut self, constant: Constant) -> i32 {
        self.constants.push(Some(constant));
        i32::try_from(self.constants.len() - 1).unwrap_or(i32::MAX)
    }

    /// Append a linked method reference to `target`.
    pub fn push_method(&mut self, target: &Arc<MethodWrapper>) -> i32 {
        self.push(Constant::MethodRef(MethodRefConstant {
            class: target.declaring.name.clone(),
            name: target.name.clone(),
            signature: target.signature.clone(),
            target: Some(target.clone()),
        }))
    }

    /// The class this pool belongs to.
    #[must_use]
    pub fn this_class(&self) -> &Arc<JavaClass> {
        &self.this_class
    }

    /// The constant at `index`, if any.
    #[must_use]
    pub fn constant(&self, index: i32) -> Option<&Constant> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.constants.get(index))
            .and_then(Option::as_ref)
    }

    /// The class constant at `index`.
    #[must_use]
    pub fn class_constant(&self, index: i32) -> Option<&Arc<JavaClass>> {
        match self.constant(index) {
            Some(Constant::Class(class)) => Some(class),
            _ => None,
        }
    }

    /// The string constant at `index`.
    #[must_use]
    pub fn string_constant(&self, index: i32) -> Option<&Arc<str>> {
        match self.constant(index) {
            Some(Constant::String(value)) => Some(value),
            _ => None,
        }
    }

    /// The method reference an invoke instruction points at.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is not a method reference.
    pub fn methodref(&self, index: i32) -> Result<&MethodRefConstant> {
        match self.constant(index) {
            Some(Constant::MethodRef(method)) => Ok(method),
            _ => Err(malformed_error!(
                "Constant {} of {} is not a method reference",
                index,
                self.this_class.name
            )),
        }
    }
}
