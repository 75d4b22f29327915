//! Raw bit reinterpretation between floating-point and integer values.
//!
//! `Float.floatToRawIntBits` and friends become a call on a converter value type held in
//! a temporary local; the converter overlays both representations.

use crate::{
    compiler::{
        config::IntrinsicConfig,
        emit::{CilOpCode, Operand, RuntimeMethod, RuntimeType},
        intrinsics::{CallSite, IntrinsicRule},
        Substitution,
    },
    Result,
};

/// Rule for one of the four raw conversion methods.
pub struct BitConversion {
    converter: RuntimeType,
    method: RuntimeMethod,
}

impl BitConversion {
    /// Convert through a local of `converter` by calling `method` on it.
    #[must_use]
    pub fn new(converter: RuntimeType, method: RuntimeMethod) -> Self {
        BitConversion { converter, method }
    }
}

impl IntrinsicRule for BitConversion {
    fn name(&self) -> &'static str {
        "raw bit conversion"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let local = site.emitter.alloc_temp_local(self.converter);
        site.emitter.emit(CilOpCode::Ldloca, Operand::Local(local));
        site.emitter
            .emit(CilOpCode::Call, Operand::Runtime(self.method));
        Ok(Substitution::Handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{
            emit::EmittedOp,
            instruction::{Instruction, NormalizedOpCode},
            types::JavaMethodFlags,
        },
        test::factories::SiteFixture,
    };

    #[test]
    fn converters() {
        let fixture = SiteFixture::new();
        let cases = [
            ("java.lang.Float", "floatToRawIntBits", "(F)I", RuntimeType::FloatConverter, RuntimeMethod::FloatConverterToInt),
            ("java.lang.Float", "intBitsToFloat", "(I)F", RuntimeType::FloatConverter, RuntimeMethod::FloatConverterToFloat),
            ("java.lang.Double", "doubleToRawLongBits", "(D)J", RuntimeType::DoubleConverter, RuntimeMethod::DoubleConverterToLong),
            ("java.lang.Double", "longBitsToDouble", "(J)D", RuntimeType::DoubleConverter, RuntimeMethod::DoubleConverterToDouble),
        ];

        for (class, name, signature, converter, method) in cases {
            let target = fixture.core_method(class, name, signature, JavaMethodFlags::STATIC);
            let mut code = vec![Instruction::new(0, NormalizedOpCode::Invokestatic, 1)];

            let outcome = fixture.run(&target, &mut code, &[], 0);
            assert_eq!(outcome.substitution, Substitution::Handled, "{name}");
            assert_eq!(outcome.locals, vec![converter]);
            assert_eq!(
                outcome.ops,
                vec![
                    EmittedOp::with(CilOpCode::Ldloca, Operand::Local(0)),
                    EmittedOp::with(CilOpCode::Call, Operand::Runtime(method)),
                ]
            );
        }
    }
}
