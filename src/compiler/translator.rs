//! Translation of one method body.

use crate::{
    compiler::{
        analyzer::StackTypeOracle,
        classfile::{ClassFile, Constant},
        context::FinishContext,
        emit::{CilOpCode, CodeEmitter, MethodRef, Operand, RuntimeMethod},
        instruction::{Instruction, InstructionFlags, NormalizedOpCode},
        intrinsics::{CallSite, IntrinsicRegistry},
        types::MethodWrapper,
        Substitution,
    },
    Result,
};

/// A method body and the analysis results that go with it.
pub struct MethodBody<'b> {
    /// The method being translated
    pub method: &'b MethodWrapper,
    /// Constant pool of the declaring class
    pub class_file: &'b ClassFile,
    /// Verifier stack types
    pub stack: &'b dyn StackTypeOracle,
    /// Instructions; rules may patch opcodes ahead of the current position
    pub code: &'b mut [Instruction],
    /// Analyzer flags, parallel to `code`
    pub flags: &'b [InstructionFlags],
}

/// Counters for one translated method.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranslationStats {
    /// Instructions visited
    pub instructions: usize,
    /// Invoke instructions
    pub calls: usize,
    /// Calls replaced by an intrinsic rule
    pub substituted: usize,
    /// Intrinsic calls whose rule declined
    pub declined: usize,
}

/// Walks a method body, consulting the intrinsic registry at every call.
pub struct MethodTranslator<'r> {
    registry: &'r IntrinsicRegistry,
}

impl<'r> MethodTranslator<'r> {
    /// Create a translator using `registry`.
    #[must_use]
    pub fn new(registry: &'r IntrinsicRegistry) -> Self {
        MethodTranslator { registry }
    }

    /// Translate `body` into `emitter`.
    ///
    /// Constant pushes are emitted lazily so a following intrinsic can fold them. Calls
    /// to intrinsics go through the registry; declined and ordinary calls become plain
    /// `call` / `callvirt`. Everything else is handed to the emitter unchanged.
    ///
    /// # Errors
    /// Returns an error on malformed constant-pool references or when a rule fails.
    pub fn translate(
        &self,
        context: &FinishContext,
        emitter: &mut dyn CodeEmitter,
        mut body: MethodBody<'_>,
    ) -> Result<TranslationStats> {
        let mut stats = TranslationStats::default();

        let mut index = 0;
        while index < body.code.len() {
            // Re-read every time: a rule may have patched this slot
            let instruction = body.code[index];
            stats.instructions += 1;

            match instruction.opcode {
                NormalizedOpCode::Iconst => emitter.lazy_emit_ldc_i4(instruction.arg1),
                NormalizedOpCode::Ldc => match body.class_file.constant(instruction.arg1) {
                    Some(Constant::Class(class)) => emitter.lazy_emit_class_literal(class.clone()),
                    Some(Constant::String(value)) => emitter.lazy_emit_ldstr(value.clone()),
                    Some(Constant::Integer(value)) => emitter.lazy_emit_ldc_i4(*value),
                    _ => {
                        return Err(malformed_error!(
                            "ldc at {} references unusable constant {}",
                            instruction.pc,
                            instruction.arg1
                        ))
                    }
                },
                NormalizedOpCode::IntrinsicGetType => emitter.emit(
                    CilOpCode::Callvirt,
                    Operand::Runtime(RuntimeMethod::ObjectGetType),
                ),
                opcode if opcode.is_invoke() => {
                    stats.calls += 1;
                    self.translate_call(context, emitter, &mut body, index, &mut stats)?;
                }
                _ => emitter.emit_bytecode(&instruction),
            }

            index += 1;
        }

        log::debug!(
            "Translated {}.{}: {} calls, {} substituted, {} declined",
            body.method.declaring.name,
            body.method.name,
            stats.calls,
            stats.substituted,
            stats.declined
        );
        Ok(stats)
    }

    fn translate_call(
        &self,
        context: &FinishContext,
        emitter: &mut dyn CodeEmitter,
        body: &mut MethodBody<'_>,
        index: usize,
        stats: &mut TranslationStats,
    ) -> Result<()> {
        let class_file = body.class_file;
        let instruction = body.code[index];
        let constant = class_file.methodref(instruction.arg1)?;

        if let Some(target) = &constant.target {
            if self.registry.is_intrinsic(target) {
                let mut site = CallSite {
                    context,
                    emitter: &mut *emitter,
                    method: target,
                    stack: body.stack,
                    index,
                    caller: body.method,
                    class_file,
                    code: &mut *body.code,
                    flags: body.flags,
                };

                match self.registry.substitute(&mut site)? {
                    Substitution::Handled => {
                        stats.substituted += 1;
                        return Ok(());
                    }
                    Substitution::Declined => stats.declined += 1,
                }
            }
        }

        let opcode = match instruction.opcode {
            NormalizedOpCode::Invokestatic | NormalizedOpCode::Invokespecial => CilOpCode::Call,
            _ => CilOpCode::Callvirt,
        };
        emitter.emit(
            opcode,
            Operand::Method(MethodRef {
                class: constant.class.clone(),
                name: constant.name.clone(),
                signature: constant.signature.clone(),
            }),
        );
        Ok(())
    }
}
