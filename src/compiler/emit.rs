//! The emission boundary.
//!
//! Rules never write a method body directly; they talk to a [`CodeEmitter`]. The trait is
//! the seam to whatever backend produces the final CIL. [`CodeBuffer`] is the in-crate
//! implementation: it records what was emitted, which is all the translator and its tests
//! need.
//!
//! # Lazy emission
//!
//! The most recent constant push (class literal, string, `int`) is held back as a pending
//! value. A rule can look at it, drop it or take it without anything having been written.
//! Any other emission materializes the pending value first.

use std::sync::Arc;

use strum::{Display, IntoStaticStr};

use crate::compiler::{instruction::Instruction, module::ConstructorRef, types::JavaClass};

/// CIL opcodes the translator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[allow(missing_docs)]
pub enum CilOpCode {
    #[strum(serialize = "nop")]
    Nop,
    #[strum(serialize = "dup")]
    Dup,
    #[strum(serialize = "pop")]
    Pop,
    #[strum(serialize = "ldnull")]
    Ldnull,
    #[strum(serialize = "ldc.i4")]
    LdcI4,
    #[strum(serialize = "ldstr")]
    Ldstr,
    #[strum(serialize = "ldarg")]
    Ldarg,
    #[strum(serialize = "ldloca")]
    Ldloca,
    #[strum(serialize = "call")]
    Call,
    #[strum(serialize = "callvirt")]
    Callvirt,
    #[strum(serialize = "newobj")]
    Newobj,
    #[strum(serialize = "newarr")]
    Newarr,
    #[strum(serialize = "ldtoken")]
    Ldtoken,
    #[strum(serialize = "castclass")]
    Castclass,
    #[strum(serialize = "ldflda")]
    Ldflda,
    #[strum(serialize = "ldfld")]
    Ldfld,
    #[strum(serialize = "stfld")]
    Stfld,
    #[strum(serialize = "ldsfld")]
    Ldsfld,
    #[strum(serialize = "stsfld")]
    Stsfld,
    #[strum(serialize = "ldvirtftn")]
    Ldvirtftn,
    #[strum(serialize = "volatile.")]
    Volatile,
    #[strum(serialize = "ceq")]
    Ceq,
    #[strum(serialize = "ret")]
    Ret,
}

/// Runtime types referenced by emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[allow(missing_docs)]
pub enum RuntimeType {
    #[strum(serialize = "System.Object")]
    Object,
    #[strum(serialize = "System.Char")]
    Char,
    #[strum(serialize = "System.Boolean")]
    Boolean,
    #[strum(serialize = "System.Void")]
    Void,
    #[strum(serialize = "System.ValueType")]
    ValueType,
    #[strum(serialize = "IKVM.Runtime.FloatConverter")]
    FloatConverter,
    #[strum(serialize = "IKVM.Runtime.DoubleConverter")]
    DoubleConverter,
}

/// Runtime helper methods referenced by emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[allow(missing_docs)]
pub enum RuntimeMethod {
    #[strum(serialize = "System.Object::GetType")]
    ObjectGetType,
    #[strum(serialize = "System.Object::ToString")]
    ObjectToString,
    #[strum(serialize = "System.Type::GetTypeFromHandle")]
    TypeGetTypeFromHandle,
    #[strum(serialize = "IKVM.Runtime.FloatConverter::ToInt")]
    FloatConverterToInt,
    #[strum(serialize = "IKVM.Runtime.FloatConverter::ToFloat")]
    FloatConverterToFloat,
    #[strum(serialize = "IKVM.Runtime.DoubleConverter::ToLong")]
    DoubleConverterToLong,
    #[strum(serialize = "IKVM.Runtime.DoubleConverter::ToDouble")]
    DoubleConverterToDouble,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy_primitive_8")]
    ArrayCopyPrimitive8,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy_primitive_4")]
    ArrayCopyPrimitive4,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy_primitive_2")]
    ArrayCopyPrimitive2,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy_primitive_1")]
    ArrayCopyPrimitive1,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy_fast")]
    ArrayCopyFast,
    #[strum(serialize = "IKVM.Runtime.ByteCodeHelper::arraycopy")]
    ArrayCopy,
    #[strum(serialize = "System.Runtime.CompilerServices.RuntimeHelpers::InitializeArray")]
    InitializeArray,
    #[strum(serialize = "System.String::ToCharArray")]
    StringToCharArray,
    #[strum(serialize = "System.Threading.Interlocked::CompareExchange")]
    InterlockedCompareExchange,
}

/// A type operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A runtime type
    Runtime(RuntimeType),
    /// The CLR type a Java class compiles to
    Class(Arc<str>),
    /// The to-be-defined type of a remapped Java class
    Tbd(Arc<str>),
    /// A type generated during translation, by full name
    Generated(Arc<str>),
}

/// A field operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// A field of a Java class
    Java {
        /// Declaring class
        class: Arc<str>,
        /// Field name
        name: Arc<str>,
        /// Field descriptor
        signature: Arc<str>,
    },
    /// A field of a generated type
    Generated {
        /// Full name of the generated type
        owner: Arc<str>,
        /// Field name
        name: Arc<str>,
    },
    /// A module-level field holding initialized data
    InitializedData {
        /// Field name
        name: Arc<str>,
        /// Position in the module's data list
        index: usize,
    },
    /// The cached `java.lang.Class` instance of a class literal
    ClassLiteral(Arc<str>),
}

/// A Java method operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Declaring class
    pub class: Arc<str>,
    /// Method name
    pub name: Arc<str>,
    /// Method descriptor
    pub signature: Arc<str>,
}

impl MethodRef {
    /// Create a method operand.
    #[must_use]
    pub fn new(class: &str, name: &str, signature: &str) -> Self {
        MethodRef {
            class: Arc::from(class),
            name: Arc::from(name),
            signature: Arc::from(signature),
        }
    }
}

/// The operand of an emitted opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// 32-bit constant
    I4(i32),
    /// String literal
    String(Arc<str>),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// Java method
    Method(MethodRef),
    /// Runtime helper method
    Runtime(RuntimeMethod),
    /// Generic runtime helper method, instantiated over one type
    RuntimeGeneric(RuntimeMethod, TypeRef),
    /// Type
    Type(TypeRef),
    /// Field
    Field(FieldRef),
    /// Constructor of a generated type
    Constructor(ConstructorRef),
}

/// A recorded emission.
#[derive(Debug, Clone, PartialEq)]
pub enum EmittedOp {
    /// A CIL opcode with its operand
    Cil(CilOpCode, Operand),
    /// A bytecode instruction handed to the backend untranslated
    Bytecode(Instruction),
}

impl EmittedOp {
    /// Shorthand for an opcode without operand.
    #[must_use]
    pub fn op(opcode: CilOpCode) -> Self {
        EmittedOp::Cil(opcode, Operand::None)
    }

    /// Shorthand for an opcode with operand.
    #[must_use]
    pub fn with(opcode: CilOpCode, operand: Operand) -> Self {
        EmittedOp::Cil(opcode, operand)
    }
}

/// A constant push that has not been written yet.
#[derive(Debug, Clone)]
pub enum LazyValue {
    /// Class literal
    ClassLiteral(Arc<JavaClass>),
    /// String literal
    String(Arc<str>),
    /// 32-bit constant
    I4(i32),
}

/// Backend that receives the translated method body.
pub trait CodeEmitter {
    /// Emit `opcode` with `operand`.
    fn emit(&mut self, opcode: CilOpCode, operand: Operand);

    /// Hand a bytecode instruction to the backend's generic translation.
    fn emit_bytecode(&mut self, instruction: &Instruction);

    /// Allocate a fresh temporary local of `local_type`.
    fn alloc_temp_local(&mut self, local_type: RuntimeType) -> u16;

    /// Push `value` lazily.
    fn lazy_emit_ldc_i4(&mut self, value: i32);

    /// Push the string `value` lazily.
    fn lazy_emit_ldstr(&mut self, value: Arc<str>);

    /// Push the class literal of `class` lazily.
    fn lazy_emit_class_literal(&mut self, class: Arc<JavaClass>);

    /// Drop the pending value, or emit `pop` when nothing is pending.
    fn lazy_emit_pop(&mut self);

    /// The pending class literal, if the pending value is one.
    fn peek_lazy_class_literal(&self) -> Option<Arc<JavaClass>>;

    /// Take the pending string literal, if the pending value is one.
    fn pop_lazy_ldstr(&mut self) -> Option<Arc<str>>;

    /// Emit an opcode without operand.
    fn emit_op(&mut self, opcode: CilOpCode) {
        self.emit(opcode, Operand::None);
    }

    /// Throw `NullReferenceException` if the reference on the stack is null, consuming it.
    fn emit_null_check(&mut self) {
        self.emit(
            CilOpCode::Ldvirtftn,
            Operand::Runtime(RuntimeMethod::ObjectToString),
        );
        self.emit_op(CilOpCode::Pop);
    }
}

/// A [`CodeEmitter`] that records its input.
#[derive(Debug, Default)]
pub struct CodeBuffer {
    ops: Vec<EmittedOp>,
    locals: Vec<RuntimeType>,
    pending: Option<LazyValue>,
}

impl CodeBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        CodeBuffer::default()
    }

    /// Everything emitted so far, excluding a pending value.
    #[must_use]
    pub fn ops(&self) -> &[EmittedOp] {
        &self.ops
    }

    /// The pending value.
    #[must_use]
    pub fn pending(&self) -> Option<&LazyValue> {
        self.pending.as_ref()
    }

    /// Types of the allocated temporary locals.
    #[must_use]
    pub fn locals(&self) -> &[RuntimeType] {
        &self.locals
    }

    /// Materialize the pending value and return the recorded body.
    #[must_use]
    pub fn finish(mut self) -> Vec<EmittedOp> {
        self.flush();
        self.ops
    }

    fn flush(&mut self) {
        let Some(value) = self.pending.take() else {
            return;
        };

        let op = match value {
            LazyValue::ClassLiteral(class) => EmittedOp::with(
                CilOpCode::Ldsfld,
                Operand::Field(FieldRef::ClassLiteral(class.name.clone())),
            ),
            LazyValue::String(value) => EmittedOp::with(CilOpCode::Ldstr, Operand::String(value)),
            LazyValue::I4(value) => EmittedOp::with(CilOpCode::LdcI4, Operand::I4(value)),
        };
        self.ops.push(op);
    }
}

impl CodeEmitter for CodeBuffer {
    fn emit(&mut self, opcode: CilOpCode, operand: Operand) {
        self.flush();
        self.ops.push(EmittedOp::Cil(opcode, operand));
    }

    fn emit_bytecode(&mut self, instruction: &Instruction) {
        self.flush();
        self.ops.push(EmittedOp::Bytecode(*instruction));
    }

    fn alloc_temp_local(&mut self, local_type: RuntimeType) -> u16 {
        self.locals.push(local_type);
        u16::try_from(self.locals.len() - 1).unwrap_or(u16::MAX)
    }

    fn lazy_emit_ldc_i4(&mut self, value: i32) {
        self.flush();
        self.pending = Some(LazyValue::I4(value));
    }

    fn lazy_emit_ldstr(&mut self, value: Arc<str>) {
        self.flush();
        self.pending = Some(LazyValue::String(value));
    }

    fn lazy_emit_class_literal(&mut self, class: Arc<JavaClass>) {
        self.flush();
        self.pending = Some(LazyValue::ClassLiteral(class));
    }

    fn lazy_emit_pop(&mut self) {
        if self.pending.take().is_none() {
            self.ops.push(EmittedOp::op(CilOpCode::Pop));
        }
    }

    fn peek_lazy_class_literal(&self) -> Option<Arc<JavaClass>> {
        match &self.pending {
            Some(LazyValue::ClassLiteral(class)) => Some(class.clone()),
            _ => None,
        }
    }

    fn pop_lazy_ldstr(&mut self) -> Option<Arc<str>> {
        match self.pending.take() {
            Some(LazyValue::String(value)) => Some(value),
            other => {
                self.pending = other;
                None
            }
        }
    }
}
