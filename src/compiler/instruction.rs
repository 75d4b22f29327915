//! Normalized bytecode instructions as the translator receives them.

use bitflags::bitflags;
use strum::{Display, IntoStaticStr};

/// Opcodes of the normalized instruction set.
///
/// Wide and short forms are already folded: every load/store carries its slot in `arg1`,
/// every constant push is `Iconst` (value in `arg1`) or `Ldc` (constant-pool index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum NormalizedOpCode {
    Nop,
    AconstNull,
    Iconst,
    Ldc,
    Iload,
    Aload,
    Istore,
    Astore,
    Pop,
    Dup,
    Getstatic,
    Putstatic,
    Getfield,
    Putfield,
    New,
    Invokevirtual,
    Invokespecial,
    Invokestatic,
    Invokeinterface,
    Ifeq,
    Ifne,
    IfAcmpeq,
    IfAcmpne,
    Goto,
    Ireturn,
    Areturn,
    Return,
    Athrow,
    /// A second `getClass` patched by the identity-compare rule; translated to a bare
    /// `GetType` call.
    #[strum(serialize = "__intrinsic_gettype")]
    IntrinsicGetType,
}

impl NormalizedOpCode {
    /// Returns `true` for the four invoke opcodes.
    #[must_use]
    pub fn is_invoke(self) -> bool {
        matches!(
            self,
            NormalizedOpCode::Invokevirtual
                | NormalizedOpCode::Invokespecial
                | NormalizedOpCode::Invokestatic
                | NormalizedOpCode::Invokeinterface
        )
    }
}

/// One instruction of a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Bytecode offset
    pub pc: u32,
    /// Normalized opcode
    pub opcode: NormalizedOpCode,
    /// Operand: slot, constant value or constant-pool index depending on the opcode
    pub arg1: i32,
}

impl Instruction {
    /// Create an instruction.
    #[must_use]
    pub fn new(pc: u32, opcode: NormalizedOpCode, arg1: i32) -> Self {
        Instruction { pc, opcode, arg1 }
    }

    /// Overwrite the opcode in place, keeping offset and operand.
    pub fn patch_opcode(&mut self, opcode: NormalizedOpCode) {
        self.opcode = opcode;
    }
}

bitflags! {
    /// Per-instruction facts computed by the analyzer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstructionFlags: u8 {
        /// Some branch or exception handler jumps here
        const BRANCH_TARGET = 0x01;
        /// Reachable from the method entry
        const REACHABLE = 0x02;
    }
}
