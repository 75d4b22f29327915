//! Rules that fold a pending constant push into the call.
//!
//! Each of these looks at the value the emitter is holding back (see
//! [`crate::compiler::emit`]) and either consumes it or leaves it exactly as it was.

use std::sync::Arc;

use crate::{
    compiler::{
        config::{IntrinsicConfig, JAVA_LANG_CLASS},
        emit::{CilOpCode, Operand, RuntimeMethod, RuntimeType, TypeRef},
        intrinsics::{CallSite, IntrinsicRule},
        module::{GeneratedType, StructLayout, TypeAttributes},
        Substitution,
    },
    Result,
};

/// Rule for `java.lang.Class.desiredAssertionStatus()`.
///
/// Folds to `false` for class literals whose loader strips assertions.
pub struct DesiredAssertionStatus;

impl IntrinsicRule for DesiredAssertionStatus {
    fn name(&self) -> &'static str {
        "Class.desiredAssertionStatus"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        match site.emitter.peek_lazy_class_literal() {
            Some(literal) if literal.loader.remove_asserts => {
                site.emitter.lazy_emit_pop();
                site.emitter.lazy_emit_ldc_i4(0);
                Ok(Substitution::Handled)
            }
            _ => Ok(Substitution::Declined),
        }
    }
}

/// Rule for `ikvm.runtime.Util.getInstanceTypeFromClass(Class)`.
pub struct GetInstanceTypeFromClass;

impl IntrinsicRule for GetInstanceTypeFromClass {
    fn name(&self) -> &'static str {
        "Util.getInstanceTypeFromClass"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let Some(literal) = site.emitter.peek_lazy_class_literal() else {
            return Ok(Substitution::Declined);
        };

        let token = if literal.is_remapped() && literal.is_final() {
            TypeRef::Tbd(literal.name.clone())
        } else {
            TypeRef::Class(literal.name.clone())
        };

        site.emitter.lazy_emit_pop();
        site.emitter.emit(CilOpCode::Ldtoken, Operand::Type(token));
        site.emitter.emit(
            CilOpCode::Call,
            Operand::Runtime(RuntimeMethod::TypeGetTypeFromHandle),
        );
        Ok(Substitution::Handled)
    }
}

/// Rule for `java.lang.Class.getPrimitiveClass(String)`, ahead of time only.
///
/// Primitive classes are constructed around a null type; the name argument is dropped.
pub struct GetPrimitiveClass;

impl IntrinsicRule for GetPrimitiveClass {
    fn name(&self) -> &'static str {
        "Class.getPrimitiveClass"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let constructor = config
            .core
            .method(JAVA_LANG_CLASS, "<init>", "(Lcli.System.Type;)V")?;

        site.emitter.lazy_emit_pop();
        site.emitter.emit_op(CilOpCode::Ldnull);
        site.emitter
            .emit(CilOpCode::Newobj, Operand::Method(constructor));
        Ok(Substitution::Handled)
    }
}

/// Rule for `java.lang.String.toCharArray()`, ahead of time only.
///
/// A long string literal turns into a `char[]` initialized from module data instead of
/// being interned and copied at run time.
pub struct ToCharArray;

impl IntrinsicRule for ToCharArray {
    fn name(&self) -> &'static str {
        "String.toCharArray"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let Some(value) = site.emitter.pop_lazy_ldstr() else {
            return Ok(Substitution::Declined);
        };

        let units: Vec<u16> = value.encode_utf16().collect();
        if units.len() <= config.char_array_literal_threshold {
            site.emitter.lazy_emit_ldstr(value);
            return Ok(Substitution::Declined);
        }

        emit_char_array_literal(site, value, &units)?;
        Ok(Substitution::Handled)
    }
}

/// Emit a `char[]` holding `units`, initialized from a packed data blob.
///
/// The blob needs a `$ArrayType$<bytes>` value type of exactly its size. If a type of that
/// name already exists with another layout, the string is loaded and copied instead.
fn emit_char_array_literal(site: &mut CallSite<'_>, value: Arc<str>, units: &[u16]) -> Result<()> {
    let byte_length = units.len() * 2;
    let Ok(size) = u32::try_from(byte_length) else {
        return Err(malformed_error!("String literal of {} bytes is too large", byte_length));
    };
    let length = i32::try_from(units.len()).unwrap_or(i32::MAX);

    let type_name = format!("$ArrayType${byte_length}");
    let layout = StructLayout { pack: 1, size };

    let module = site.context.module();
    let mut packed = GeneratedType::new(
        &type_name,
        TypeRef::Runtime(RuntimeType::ValueType),
        TypeAttributes::EXPLICIT_LAYOUT | TypeAttributes::SEALED,
    );
    packed.layout = Some(layout);

    let (array_type, defined) = module.get_or_define_type(packed);
    if defined {
        module.create_type(&type_name)?;
    }

    if !array_type.is_value_type() || array_type.layout != Some(layout) {
        log::warn!(
            "{} exists with a different layout, loading {}-char literal through String.ToCharArray",
            type_name,
            units.len()
        );
        site.emitter.emit(CilOpCode::Ldstr, Operand::String(value));
        site.emitter.emit(
            CilOpCode::Call,
            Operand::Runtime(RuntimeMethod::StringToCharArray),
        );
        return Ok(());
    }

    let data = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();
    let field = module.define_initialized_data("__<str>", data);

    site.emitter.emit(CilOpCode::LdcI4, Operand::I4(length));
    site.emitter.emit(
        CilOpCode::Newarr,
        Operand::Type(TypeRef::Runtime(RuntimeType::Char)),
    );
    site.emitter.emit_op(CilOpCode::Dup);
    site.emitter.emit(CilOpCode::Ldtoken, Operand::Field(field));
    site.emitter.emit(
        CilOpCode::Call,
        Operand::Runtime(RuntimeMethod::InitializeArray),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            emit::{CodeEmitter, EmittedOp, FieldRef, LazyValue, MethodRef},
            instruction::{Instruction, NormalizedOpCode},
            types::{ClassFlags, ClassLoader, JavaClass, JavaMethodFlags},
        },
        test::factories::{Outcome, SiteFixture},
    };

    fn call() -> Vec<Instruction> {
        vec![Instruction::new(0, NormalizedOpCode::Invokevirtual, 1)]
    }

    #[test]
    fn assertion_status_folds_when_asserts_removed() {
        let fixture = SiteFixture::new();
        let target = fixture.core_method(
            JAVA_LANG_CLASS,
            "desiredAssertionStatus",
            "()Z",
            JavaMethodFlags::empty(),
        );

        let stripped = Arc::new(JavaClass::new("com.example.Foo", &ClassLoader::scope("release", true)));
        let outcome = fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_class_literal(stripped.clone());
        });
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert!(outcome.ops.is_empty());
        assert!(matches!(outcome.pending, Some(LazyValue::I4(0))));

        let kept = Arc::new(JavaClass::new("com.example.Foo", &fixture.app));
        let outcome = fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_class_literal(kept.clone());
        });
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(matches!(outcome.pending, Some(LazyValue::ClassLiteral(_))));

        let outcome = fixture.run(&target, &mut call(), &[], 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
    }

    #[test]
    fn instance_type_from_class_literal() {
        let fixture = SiteFixture::new();
        let target = fixture.core_method(
            "ikvm.runtime.Util",
            "getInstanceTypeFromClass",
            "(Ljava.lang.Class;)Lcli.System.Type;",
            JavaMethodFlags::STATIC,
        );

        let string = fixture.core.class("java.lang.String").unwrap().clone();
        let outcome = fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_class_literal(string.clone());
        });
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops,
            vec![
                EmittedOp::with(
                    CilOpCode::Ldtoken,
                    Operand::Type(TypeRef::Tbd(Arc::from("java.lang.String")))
                ),
                EmittedOp::with(
                    CilOpCode::Call,
                    Operand::Runtime(RuntimeMethod::TypeGetTypeFromHandle)
                ),
            ]
        );

        let plain = Arc::new(JavaClass::new("com.example.Foo", &fixture.app).with_flags(ClassFlags::FINAL));
        let outcome = fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_class_literal(plain.clone());
        });
        assert_eq!(
            outcome.ops[0],
            EmittedOp::with(
                CilOpCode::Ldtoken,
                Operand::Type(TypeRef::Class(Arc::from("com.example.Foo")))
            )
        );

        let outcome = fixture.run(&target, &mut call(), &[], 0);
        assert_eq!(outcome.substitution, Substitution::Declined);
    }

    #[test]
    fn primitive_class() {
        let fixture = SiteFixture::new();
        let target = fixture.core_method(
            JAVA_LANG_CLASS,
            "getPrimitiveClass",
            "(Ljava.lang.String;)Ljava.lang.Class;",
            JavaMethodFlags::STATIC,
        );

        let outcome = fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_ldstr(Arc::from("int"));
        });
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops,
            vec![
                EmittedOp::op(CilOpCode::Ldnull),
                EmittedOp::with(
                    CilOpCode::Newobj,
                    Operand::Method(MethodRef::new(
                        JAVA_LANG_CLASS,
                        "<init>",
                        "(Lcli.System.Type;)V"
                    ))
                ),
            ]
        );
    }

    fn to_char_array(fixture: &SiteFixture, literal: &str) -> Outcome {
        let target = fixture.core_method(
            "java.lang.String",
            "toCharArray",
            "()[C",
            JavaMethodFlags::empty(),
        );
        let literal: Arc<str> = Arc::from(literal);
        fixture.run_after(&target, &mut call(), &[], 0, |buffer| {
            buffer.lazy_emit_ldstr(literal.clone());
        })
    }

    #[test]
    fn short_literal_is_restored() {
        let fixture = SiteFixture::new();
        let literal = "x".repeat(128);

        let outcome = to_char_array(&fixture, &literal);
        assert_eq!(outcome.substitution, Substitution::Declined);
        assert!(outcome.ops.is_empty());
        assert!(matches!(outcome.pending, Some(LazyValue::String(ref s)) if **s == *literal));
        assert_eq!(fixture.context.module().type_count(), 0);
    }

    #[test]
    fn long_literal_becomes_initialized_array() {
        let fixture = SiteFixture::new();
        let literal = "y".repeat(129);

        let outcome = to_char_array(&fixture, &literal);
        assert_eq!(outcome.substitution, Substitution::Handled);

        let module = fixture.context.module();
        let packed = module.find_type("$ArrayType$258").unwrap();
        assert_eq!(packed.layout, Some(StructLayout { pack: 1, size: 258 }));
        assert_eq!(
            packed.attributes,
            TypeAttributes::EXPLICIT_LAYOUT | TypeAttributes::SEALED
        );
        assert!(!packed.attributes.contains(TypeAttributes::PUBLIC));
        assert!(module.is_created("$ArrayType$258"));

        assert_eq!(outcome.ops.len(), 5);
        assert_eq!(outcome.ops[0], EmittedOp::with(CilOpCode::LdcI4, Operand::I4(129)));
        let EmittedOp::Cil(CilOpCode::Ldtoken, Operand::Field(FieldRef::InitializedData { index, .. })) =
            &outcome.ops[3]
        else {
            panic!("expected ldtoken of initialized data, got {:?}", outcome.ops[3]);
        };
        let data = &module.initialized_data(*index).unwrap().data;
        assert_eq!(data.len(), 258);
        assert_eq!(&data[..2], &[b'y', 0]);

        // A second literal of the same length reuses the packed type
        let outcome = to_char_array(&fixture, &"z".repeat(129));
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(module.type_count(), 1);
    }

    #[test]
    fn layout_mismatch_falls_back() {
        let fixture = SiteFixture::new();
        fixture
            .context
            .module()
            .define_type(GeneratedType::new(
                "$ArrayType$300",
                TypeRef::Class(Arc::from("com.example.Base")),
                TypeAttributes::PUBLIC,
            ))
            .unwrap();

        let literal = "w".repeat(150);
        let outcome = to_char_array(&fixture, &literal);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert_eq!(
            outcome.ops,
            vec![
                EmittedOp::with(CilOpCode::Ldstr, Operand::String(Arc::from(literal.as_str()))),
                EmittedOp::with(
                    CilOpCode::Call,
                    Operand::Runtime(RuntimeMethod::StringToCharArray)
                ),
            ]
        );
    }

    #[test]
    fn threshold_counts_utf16_units() {
        let fixture = SiteFixture::new();
        // 65 characters outside the BMP are 130 UTF-16 units
        let literal = "\u{1F600}".repeat(65);

        let outcome = to_char_array(&fixture, &literal);
        assert_eq!(outcome.substitution, Substitution::Handled);
        assert!(fixture.context.module().find_type("$ArrayType$260").is_some());
    }
}
