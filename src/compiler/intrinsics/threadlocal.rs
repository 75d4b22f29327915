//! `new ThreadLocal()` in a static initializer.
//!
//! A thread-local created exactly once per class can be backed by a thread-static field
//! of a private nested subclass instead of the general per-thread map.

use std::sync::Arc;

use crate::{
    compiler::{
        config::{IntrinsicConfig, INTRINSIC_THREAD_LOCAL},
        context::PendingFinish,
        emit::{CilOpCode, EmittedOp, FieldRef, Operand, RuntimeType, TypeRef},
        instruction::InstructionFlags,
        intrinsics::{CallSite, IntrinsicRule},
        module::{
            ConstructorRef, GeneratedConstructor, GeneratedField, GeneratedMethod, GeneratedType,
            TypeAttributes,
        },
        Substitution,
    },
    metadata::method::{MethodAccess, MethodAttributes},
    Result,
};

/// Rule for `java.lang.ThreadLocal.<init>()`.
pub struct ThreadLocalInit;

impl IntrinsicRule for ThreadLocalInit {
    fn name(&self) -> &'static str {
        "ThreadLocal.<init>"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        if &*site.caller.name != "<clinit>" || config.class_unloading {
            return Ok(Substitution::Declined);
        }

        // Any jump into the initializer up to here could run the constructor twice
        if site.flags[..site.flags.len().min(site.index + 1)]
            .iter()
            .any(|flags| flags.contains(InstructionFlags::BRANCH_TARGET))
        {
            return Ok(Substitution::Declined);
        }

        let base_constructor = config.core.method(INTRINSIC_THREAD_LOCAL, "<init>", "()V")?;

        let declaring = site.caller.declaring.name.clone();
        let mut holder = GeneratedType::new(
            &format!("__<tls>_{}", site.index),
            TypeRef::Class(Arc::from(INTRINSIC_THREAD_LOCAL)),
            TypeAttributes::NESTED_PRIVATE | TypeAttributes::SEALED,
        )
        .nested_in(&declaring);
        let full_name = holder.full_name();

        let field = FieldRef::Generated {
            owner: full_name.clone(),
            name: Arc::from("field"),
        };
        let object = TypeRef::Runtime(RuntimeType::Object);

        holder.fields.push(GeneratedField {
            name: Arc::from("field"),
            field_type: object.clone(),
            is_static: true,
            thread_static: true,
        });
        holder.methods.push(GeneratedMethod {
            name: Arc::from("get"),
            access: MethodAccess::Public,
            attributes: MethodAttributes::VIRTUAL | MethodAttributes::FINAL,
            return_type: object.clone(),
            parameters: Vec::new(),
            body: vec![
                EmittedOp::with(CilOpCode::Ldsfld, Operand::Field(field.clone())),
                EmittedOp::op(CilOpCode::Ret),
            ],
        });
        holder.methods.push(GeneratedMethod {
            name: Arc::from("set"),
            access: MethodAccess::Public,
            attributes: MethodAttributes::VIRTUAL | MethodAttributes::FINAL,
            return_type: TypeRef::Runtime(RuntimeType::Void),
            parameters: vec![object],
            body: vec![
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(1)),
                EmittedOp::with(CilOpCode::Stsfld, Operand::Field(field)),
                EmittedOp::op(CilOpCode::Ret),
            ],
        });

        let constructor = ConstructorRef::new(GeneratedConstructor {
            type_name: full_name.clone(),
            body: vec![
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(0)),
                EmittedOp::with(CilOpCode::Call, Operand::Method(base_constructor)),
                EmittedOp::op(CilOpCode::Ret),
            ],
        });
        holder.constructor = Some(constructor.clone());

        site.context.module().define_type(holder)?;
        site.context.register_post_finish(PendingFinish {
            type_name: full_name,
            base: Arc::from(INTRINSIC_THREAD_LOCAL),
        });

        site.emitter
            .emit(CilOpCode::Newobj, Operand::Constructor(constructor));
        Ok(Substitution::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            instruction::{Instruction, NormalizedOpCode},
            types::{JavaMethodFlags, MethodWrapper},
        },
        test::factories::SiteFixture,
    };

    fn initializer(fixture: &mut SiteFixture) {
        fixture.caller = MethodWrapper::new(
            fixture.class_file.this_class(),
            "<clinit>",
            "()V",
            JavaMethodFlags::STATIC,
            0,
        );
    }

    fn body() -> Vec<Instruction> {
        vec![
            Instruction::new(0, NormalizedOpCode::New, 2),
            Instruction::new(3, NormalizedOpCode::Dup, 0),
            Instruction::new(4, NormalizedOpCode::Invokespecial, 1),
            Instruction::new(7, NormalizedOpCode::Putstatic, 3),
        ]
    }

    fn thread_local(fixture: &SiteFixture) -> Arc<MethodWrapper> {
        fixture.core_method("java.lang.ThreadLocal", "<init>", "()V", JavaMethodFlags::empty())
    }

    #[test]
    fn static_initializer_gets_holder_type() {
        let mut fixture = SiteFixture::new();
        initializer(&mut fixture);

        let outcome = fixture.run(&thread_local(&fixture), &mut body(), &[], 2);
        assert_eq!(outcome.substitution, Substitution::Handled);

        let name = format!("{}+__<tls>_2", fixture.class_file.this_class().name);
        let holder = fixture.context.module().find_type(&name).unwrap();
        assert!(holder.attributes.contains(TypeAttributes::NESTED_PRIVATE | TypeAttributes::SEALED));
        assert!(holder.fields[0].thread_static && holder.fields[0].is_static);
        for name in ["get", "set"] {
            let method = holder.method(name).unwrap();
            assert_eq!(method.access, MethodAccess::Public, "{name}");
            assert_eq!(
                method.attributes,
                MethodAttributes::VIRTUAL | MethodAttributes::FINAL,
                "{name}"
            );
        }

        let constructor = holder.constructor.clone().unwrap();
        assert_eq!(
            outcome.ops,
            vec![EmittedOp::with(CilOpCode::Newobj, Operand::Constructor(constructor))]
        );
        assert_eq!(fixture.context.pending_count(), 1);
    }

    #[test]
    fn other_methods_decline() {
        let fixture = SiteFixture::new();
        let outcome = fixture.run(&thread_local(&fixture), &mut body(), &[], 2);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert_eq!(fixture.context.module().type_count(), 0);
    }

    #[test]
    fn branch_target_before_call_declines() {
        let mut fixture = SiteFixture::new();
        initializer(&mut fixture);

        let flags = [
            InstructionFlags::empty(),
            InstructionFlags::BRANCH_TARGET,
            InstructionFlags::empty(),
            InstructionFlags::empty(),
        ];
        let outcome = fixture.run(&thread_local(&fixture), &mut body(), &flags, 2);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());
        assert_eq!(fixture.context.pending_count(), 0);

        // A branch target after the call does not matter
        let flags = [
            InstructionFlags::empty(),
            InstructionFlags::empty(),
            InstructionFlags::empty(),
            InstructionFlags::BRANCH_TARGET,
        ];
        let outcome = fixture.run(&thread_local(&fixture), &mut body(), &flags, 2);
        assert_eq!(outcome.substitution, Substitution::Handled);
    }

    #[test]
    fn class_unloading_declines() {
        let mut fixture = SiteFixture::with_config(|config| config.with_class_unloading(true));
        initializer(&mut fixture);

        let outcome = fixture.run(&thread_local(&fixture), &mut body(), &[], 2);
        assert_eq!(outcome.substitution, Substitution::Declined);
    }
}
