//! `System.arraycopy` specialization.
//!
//! When the verifier proves source and destination are the same array type, the generic
//! helper (which has to check types at run time) is replaced by a width-specialized one.

use crate::{
    compiler::{
        config::IntrinsicConfig,
        emit::{CilOpCode, Operand, RuntimeMethod},
        intrinsics::{CallSite, IntrinsicRule},
        Substitution,
    },
    Result,
};

/// Rule for `java.lang.System.arraycopy`.
pub struct ArrayCopy;

/// Stack depth of the destination array before the call.
const DESTINATION_DEPTH: usize = 2;
/// Stack depth of the source array before the call.
const SOURCE_DEPTH: usize = 4;

impl IntrinsicRule for ArrayCopy {
    fn name(&self) -> &'static str {
        "System.arraycopy"
    }

    fn apply(&self, _config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let (Some(destination), Some(source)) = (
            site.stack_type(0, DESTINATION_DEPTH),
            site.stack_type(0, SOURCE_DEPTH),
        ) else {
            return Ok(Substitution::Declined);
        };

        if destination.is_unloadable()
            || !destination.is_array()
            || !destination.same_class(&source)
        {
            return Ok(Substitution::Declined);
        }

        let helper = match destination.name.chars().nth(1) {
            Some('J' | 'D') => RuntimeMethod::ArrayCopyPrimitive8,
            Some('I' | 'F') => RuntimeMethod::ArrayCopyPrimitive4,
            Some('S' | 'C') => RuntimeMethod::ArrayCopyPrimitive2,
            Some('B' | 'Z') => RuntimeMethod::ArrayCopyPrimitive1,
            _ => match destination.element_type() {
                Some(element) if !element.is_array() && element.is_final() => {
                    RuntimeMethod::ArrayCopyFast
                }
                _ => RuntimeMethod::ArrayCopy,
            },
        };

        site.emitter.emit(CilOpCode::Call, Operand::Runtime(helper));
        Ok(Substitution::Handled)
    }
}
