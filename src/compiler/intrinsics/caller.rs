//! Caller-identity intrinsics.
//!
//! Methods annotated as caller-sensitive receive a `CallerID` as an implicit last
//! parameter. Inside such a method the stack-walking lookups are replaced by loads of that
//! parameter.

use crate::{
    compiler::{
        config::{IntrinsicConfig, CALLER_ID},
        emit::{CilOpCode, Operand},
        instruction::NormalizedOpCode,
        intrinsics::{CallSite, IntrinsicRule},
        types::MethodWrapper,
        Substitution,
    },
    Error, Result,
};

/// Argument slot of the implicit caller-identity parameter of `caller`.
///
/// The parameter is the last one of the emitted method; instance methods shift it by one
/// for `this`.
///
/// # Errors
/// Returns [`Error::Configuration`] if the method has no parameter slot to hold it.
pub fn caller_id_argument(caller: &MethodWrapper) -> Result<u16> {
    let Some(last) = caller.define_parameter_count.checked_sub(1) else {
        return Err(Error::Configuration(format!(
            "{}.{}{} is marked as receiving a CallerID but has no parameters",
            caller.declaring.name, caller.name, caller.signature
        )));
    };

    let slot = if caller.is_static() { last } else { last + 1 };
    u16::try_from(slot).map_err(|_| {
        Error::Configuration(format!(
            "CallerID argument of {}.{} is out of range",
            caller.declaring.name, caller.name
        ))
    })
}

/// Rule for `sun.reflect.Reflection.getCallerClass(int)`.
///
/// Only the `getCallerClass(2)` form is replaced; the constant is dropped.
pub struct GetCallerClass;

impl IntrinsicRule for GetCallerClass {
    fn name(&self) -> &'static str {
        "Reflection.getCallerClass"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        if !site.caller.has_caller_id()
            || site.is_branch_target(-1)
            || !site.instruction(-1).is_some_and(|previous| {
                previous.opcode == NormalizedOpCode::Iconst && previous.arg1 == 2
            })
        {
            return Ok(Substitution::Declined);
        }

        let slot = caller_id_argument(site.caller)?;
        let method = config
            .core
            .method(CALLER_ID, "getCallerClass", "()Ljava.lang.Class;")?;

        site.emitter.lazy_emit_pop();
        site.emitter.emit(CilOpCode::Ldarg, Operand::Argument(slot));
        site.emitter.emit(CilOpCode::Callvirt, Operand::Method(method));
        Ok(Substitution::Handled)
    }
}

/// Rule for `java.lang.ClassLoader.getCallerClassLoader()`.
pub struct GetCallerClassLoader;

impl IntrinsicRule for GetCallerClassLoader {
    fn name(&self) -> &'static str {
        "ClassLoader.getCallerClassLoader"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        if !site.caller.has_caller_id() {
            return Ok(Substitution::Declined);
        }

        let slot = caller_id_argument(site.caller)?;
        let method = config.core.method(
            CALLER_ID,
            "getCallerClassLoader",
            "()Ljava.lang.ClassLoader;",
        )?;

        site.emitter.emit(CilOpCode::Ldarg, Operand::Argument(slot));
        site.emitter.emit(CilOpCode::Callvirt, Operand::Method(method));
        Ok(Substitution::Handled)
    }
}

/// Rule for `ikvm.internal.CallerID.getCallerID()`.
///
/// The call is only legal inside caller-sensitive methods, so its absence is fatal.
pub struct GetCallerId;

impl IntrinsicRule for GetCallerId {
    fn name(&self) -> &'static str {
        "CallerID.getCallerID"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        if !site.caller.has_caller_id() {
            return Err(Error::Configuration(format!(
                "CallerID.getCallerID() requires a HasCallerID annotation in {}.{}{}",
                site.caller.declaring.name, site.caller.name, site.caller.signature
            )));
        }

        let slot = caller_id_argument(site.caller)?;
        site.emitter.emit(CilOpCode::Ldarg, Operand::Argument(slot));
        Ok(Substitution::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            emit::{CodeEmitter, EmittedOp, LazyValue, MethodRef},
            instruction::{Instruction, InstructionFlags},
            types::JavaMethodFlags,
        },
        test::factories::{Outcome, SiteFixture},
    };

    fn sensitive(fixture: &mut SiteFixture, flags: JavaMethodFlags, parameters: usize) {
        fixture.caller = MethodWrapper::new(
            fixture.class_file.this_class(),
            "lookup",
            "(Likvm.internal.CallerID;)V",
            flags,
            parameters,
        )
        .with_caller_id();
    }

    #[test]
    fn slot_arithmetic() {
        let fixture = SiteFixture::new();
        let class = fixture.class_file.this_class();

        let instance = MethodWrapper::new(class, "m", "()V", JavaMethodFlags::empty(), 2);
        let statik = MethodWrapper::new(class, "m", "()V", JavaMethodFlags::STATIC, 2);
        let empty = MethodWrapper::new(class, "m", "()V", JavaMethodFlags::STATIC, 0);

        assert_eq!(caller_id_argument(&instance).unwrap(), 2);
        assert_eq!(caller_id_argument(&statik).unwrap(), 1);
        assert!(matches!(
            caller_id_argument(&empty),
            Err(Error::Configuration(_))
        ));
    }

    fn get_caller_class(fixture: &SiteFixture, iconst: i32, flags: &[InstructionFlags]) -> Outcome {
        let target = fixture.core_method(
            "sun.reflect.Reflection",
            "getCallerClass",
            "(I)Ljava.lang.Class;",
            JavaMethodFlags::STATIC,
        );
        let mut code = vec![
            Instruction::new(0, NormalizedOpCode::Iconst, iconst),
            Instruction::new(1, NormalizedOpCode::Invokestatic, 1),
        ];
        fixture.run_after(&target, &mut code, flags, 1, |buffer| {
            buffer.lazy_emit_ldc_i4(iconst);
        })
    }

    #[test]
    fn get_caller_class_drops_depth_constant() {
        let mut fixture = SiteFixture::new();
        sensitive(&mut fixture, JavaMethodFlags::empty(), 3);

        let outcome = get_caller_class(&fixture, 2, &[]);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert!(outcome.pending.is_none());
        assert_eq!(
            outcome.ops,
            vec![
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(3)),
                EmittedOp::with(
                    CilOpCode::Callvirt,
                    Operand::Method(MethodRef::new(
                        CALLER_ID,
                        "getCallerClass",
                        "()Ljava.lang.Class;"
                    ))
                ),
            ]
        );
    }

    #[test]
    fn get_caller_class_declines() {
        let mut fixture = SiteFixture::new();

        let outcome = get_caller_class(&fixture, 2, &[]);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(matches!(outcome.pending, Some(LazyValue::I4(2))));

        sensitive(&mut fixture, JavaMethodFlags::STATIC, 1);
        let outcome = get_caller_class(&fixture, 1, &[]);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());

        let flags = [InstructionFlags::BRANCH_TARGET, InstructionFlags::empty()];
        let outcome = get_caller_class(&fixture, 2, &flags);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(matches!(outcome.pending, Some(LazyValue::I4(2))));
    }

    #[test]
    fn get_caller_class_loader() {
        let mut fixture = SiteFixture::new();
        let target = fixture.core_method(
            "java.lang.ClassLoader",
            "getCallerClassLoader",
            "()Ljava.lang.ClassLoader;",
            JavaMethodFlags::STATIC,
        );
        let mut code = vec![Instruction::new(0, NormalizedOpCode::Invokestatic, 1)];

        assert_eq!(
            fixture.run(&target, &mut code, &[], 0).substitution,
            Substitution::Declined
        );

        sensitive(&mut fixture, JavaMethodFlags::STATIC, 1);
        let outcome = fixture.run(&target, &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops[0],
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(0))
        );
    }

    #[test]
    fn get_caller_id_requires_marker() {
        let mut fixture = SiteFixture::new();
        let target = fixture.core_method(
            CALLER_ID,
            "getCallerID",
            "()Likvm.internal.CallerID;",
            JavaMethodFlags::STATIC,
        );
        let mut code = vec![Instruction::new(0, NormalizedOpCode::Invokestatic, 1)];

        assert!(matches!(
            fixture.try_run(&target, &mut code, &[], 0),
            Err(Error::Configuration(_))
        ));

        sensitive(&mut fixture, JavaMethodFlags::empty(), 1);
        let outcome = fixture.run(&target, &mut code, &[], 0);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops,
            vec![EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(1))]
        );
    }
}
