//! `Object.getClass()` idioms.
//!
//! Two shapes are recognized:
//!
//! - `getClass(); pop` is a null check, so the call becomes `dup` plus a null check and
//!   the following `pop` removes the original reference.
//! - `a.getClass() == b.getClass()` compares runtime types. When at least one operand is
//!   statically known to be neither `java.lang.Object` nor an array, both calls are
//!   replaced by `Object.GetType()`, which yields the same identity for such types
//!   without materializing `java.lang.Class` instances.

use std::sync::Arc;

use crate::{
    compiler::{
        config::{IntrinsicConfig, JAVA_LANG_OBJECT},
        emit::{CilOpCode, Operand, RuntimeMethod},
        instruction::NormalizedOpCode,
        intrinsics::{refers_to, CallSite, IntrinsicRule},
        types::JavaClass,
        Substitution,
    },
    Result,
};

/// Rule for `java.lang.Object.getClass()`.
pub struct ObjectGetClass;

fn is_safe_for_type_identity(class: Option<Arc<JavaClass>>) -> bool {
    class.is_some_and(|class| !class.is_java_lang_object() && !class.is_array())
}

impl IntrinsicRule for ObjectGetClass {
    fn name(&self) -> &'static str {
        "Object.getClass"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        if site.opcode_at(1) == Some(NormalizedOpCode::Pop) && !site.is_branch_target(1) {
            site.emitter.emit_op(CilOpCode::Dup);
            site.emitter.emit_null_check();
            return Ok(Substitution::Handled);
        }

        if !site.is_straight_line(1..=3)
            || site.opcode_at(1) != Some(NormalizedOpCode::Aload)
            || site.opcode_at(2) != Some(NormalizedOpCode::Invokevirtual)
            || !matches!(
                site.opcode_at(3),
                Some(NormalizedOpCode::IfAcmpeq | NormalizedOpCode::IfAcmpne)
            )
        {
            return Ok(Substitution::Declined);
        }

        if !is_safe_for_type_identity(site.stack_type(0, 0))
            && !is_safe_for_type_identity(site.stack_type(2, 0))
        {
            return Ok(Substitution::Declined);
        }

        let Some(second_call) = site.instruction(2) else {
            return Ok(Substitution::Declined);
        };
        let second = site.class_file.methodref(second_call.arg1)?;
        if !refers_to(second, JAVA_LANG_OBJECT, "getClass", "()Ljava.lang.Class;") {
            return Ok(Substitution::Declined);
        }

        site.emitter.emit(
            CilOpCode::Callvirt,
            Operand::Runtime(RuntimeMethod::ObjectGetType),
        );
        site.patch(2, NormalizedOpCode::IntrinsicGetType)?;
        Ok(Substitution::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            analyzer::StaticStackTypes,
            emit::EmittedOp,
            instruction::{Instruction, InstructionFlags},
            types::ClassFlags,
        },
        test::factories::SiteFixture,
    };

    #[test]
    fn null_check_idiom() {
        let fixture = SiteFixture::new();
        let mut code = vec![
            Instruction::new(0, NormalizedOpCode::Aload, 0),
            Instruction::new(1, NormalizedOpCode::Invokevirtual, 1),
            Instruction::new(4, NormalizedOpCode::Pop, 0),
        ];

        let outcome = fixture.run(&fixture.get_class(), &mut code, &[], 1);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(outcome.ops[0], EmittedOp::op(CilOpCode::Dup));
        assert_eq!(outcome.ops.len(), 3);
    }

    #[test]
    fn pop_on_branch_target_declines() {
        let fixture = SiteFixture::new();
        let mut code = vec![
            Instruction::new(0, NormalizedOpCode::Invokevirtual, 1),
            Instruction::new(3, NormalizedOpCode::Pop, 0),
        ];
        let flags = [InstructionFlags::empty(), InstructionFlags::BRANCH_TARGET];

        let outcome = fixture.run(&fixture.get_class(), &mut code, &flags, 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn call_at_end_of_body_declines() {
        let fixture = SiteFixture::new();
        let mut code = vec![Instruction::new(0, NormalizedOpCode::Invokevirtual, 1)];

        let outcome = fixture.run(&fixture.get_class(), &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
    }

    fn compare_window(call: i32) -> Vec<Instruction> {
        vec![
            Instruction::new(0, NormalizedOpCode::Invokevirtual, call),
            Instruction::new(3, NormalizedOpCode::Aload, 1),
            Instruction::new(4, NormalizedOpCode::Invokevirtual, call),
            Instruction::new(7, NormalizedOpCode::IfAcmpne, 20),
        ]
    }

    #[test]
    fn identity_compare_patches_second_call() {
        let mut fixture = SiteFixture::new();
        let call = fixture.get_class_constant();
        let name = Arc::new(
            JavaClass::new("com.example.Name", &fixture.app).with_flags(ClassFlags::FINAL),
        );
        fixture.stack = StaticStackTypes::new().with(0, 0, &name);

        let mut code = compare_window(call);
        let outcome = fixture.run(&fixture.get_class(), &mut code, &[], 0);

        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops,
            vec![EmittedOp::with(
                CilOpCode::Callvirt,
                Operand::Runtime(RuntimeMethod::ObjectGetType)
            )]
        );
        assert_eq!(code[2].opcode, NormalizedOpCode::IntrinsicGetType);
        assert_eq!(code[2].arg1, call);
    }

    #[test]
    fn identity_compare_second_operand_is_enough() {
        let mut fixture = SiteFixture::new();
        let call = fixture.get_class_constant();
        let object = fixture.core.class(JAVA_LANG_OBJECT).unwrap().clone();
        let name = Arc::new(JavaClass::new("com.example.Name", &fixture.app));
        fixture.stack = StaticStackTypes::new()
            .with(0, 0, &object)
            .with(2, 0, &name);

        let mut code = compare_window(call);
        let outcome = fixture.run(&fixture.get_class(), &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Handled);
    }

    #[test]
    fn identity_compare_needs_safe_operand() {
        let mut fixture = SiteFixture::new();
        let call = fixture.get_class_constant();
        let object = fixture.core.class(JAVA_LANG_OBJECT).unwrap().clone();
        let int = Arc::new(JavaClass::primitive('I', &fixture.app));
        let ints = Arc::new(JavaClass::array_of(&int));
        fixture.stack = StaticStackTypes::new()
            .with(0, 0, &object)
            .with(2, 0, &ints);

        let mut code = compare_window(call);
        let outcome = fixture.run(&fixture.get_class(), &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());
        assert_eq!(code[2].opcode, NormalizedOpCode::Invokevirtual);
    }

    #[test]
    fn identity_compare_rejects_branch_target_in_window() {
        let mut fixture = SiteFixture::new();
        let call = fixture.get_class_constant();
        let name = Arc::new(JavaClass::new("com.example.Name", &fixture.app));
        fixture.stack = StaticStackTypes::new().with(0, 0, &name);

        let mut code = compare_window(call);
        let flags = [
            InstructionFlags::empty(),
            InstructionFlags::empty(),
            InstructionFlags::BRANCH_TARGET,
            InstructionFlags::empty(),
        ];
        let outcome = fixture.run(&fixture.get_class(), &mut code, &flags, 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert_eq!(code[2].opcode, NormalizedOpCode::Invokevirtual);
    }
}
