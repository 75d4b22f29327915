//! Method parameters reconstructed from the `Param` table.

use crate::{
    metadata::{
        method::{MethodDef, ParamAttributes},
        signatures::{SignatureMethod, SignatureParameter, TypeSignature},
        tables::{ConstantValue, TableId},
        token::Token,
    },
    Result,
};

/// A parameter, or the return value, of a method.
///
/// Parameters without a `Param` row are synthesized: they have no name, no flags, no row
/// id and the nil `Param` token. Declared or not, every parameter carries its type and
/// custom modifiers from the method signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Token of the owning method
    pub method: Token,
    /// 0-based position, `-1` for the return parameter
    pub position: i32,
    /// `Param` row id, `None` when synthesized
    pub rid: Option<u32>,
    /// `Param` token, `0x08000000` when synthesized
    pub token: Token,
    /// Declared name
    pub name: Option<String>,
    /// `ParamAttributes` of the row
    pub flags: ParamAttributes,
    /// Default value, present when the row has `HAS_DEFAULT` and a `Constant` row
    pub default: Option<ConstantValue>,
    /// Type, by-ref marker and custom modifiers of this position in the signature
    pub signature: SignatureParameter,
}

impl Parameter {
    fn synthesized(method: Token, position: i32, signature: SignatureParameter) -> Self {
        Parameter {
            method,
            position,
            rid: None,
            token: Token::from_parts(TableId::Param, 0),
            name: None,
            flags: ParamAttributes::empty(),
            default: None,
            signature,
        }
    }

    /// The parameter type, without modifiers.
    #[must_use]
    pub fn parameter_type(&self) -> &TypeSignature {
        &self.signature.base
    }

    /// `modreq` type tokens, in signature order.
    #[must_use]
    pub fn required_modifiers(&self) -> &[Token] {
        &self.signature.required_modifiers
    }

    /// `modopt` type tokens, in signature order.
    #[must_use]
    pub fn optional_modifiers(&self) -> &[Token] {
        &self.signature.optional_modifiers
    }

    /// `true` when the parameter is passed by reference.
    #[must_use]
    pub fn is_by_ref(&self) -> bool {
        self.signature.by_ref
    }

    /// `true` for the return parameter.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.position == -1
    }

    /// `true` when there is no `Param` row behind this parameter.
    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        self.rid.is_none()
    }
}

/// The parameters of one method, in signature order, plus its return parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParameterSet {
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) return_parameter: Parameter,
}

/// Collect the `Param` rows owned by `method` and fill every position of `signature`.
///
/// The owned range starts at the method's `param_list` and ends at the next method's
/// `param_list`, or one past the last `Param` row for the last method.
pub(crate) fn resolve(method: &MethodDef, signature: &SignatureMethod) -> Result<ParameterSet> {
    let module = method.module();
    module.stats().record_param_scan();

    let owner = method.token();
    let count = signature.params.len();
    let mut parameters: Vec<Option<Parameter>> = vec![None; count];
    let mut return_parameter = None;

    let param_rows = module.params().map_or(0, |table| table.row_count());
    let method_rows = module.method_defs().map_or(0, |table| table.row_count());

    let start = method.raw().param_list;
    let end = if method.rid() < method_rows {
        match module.method_defs().and_then(|table| table.get(method.rid() + 1)) {
            Some(next) => next.param_list,
            None => {
                return Err(malformed_error!(
                    "Failed to read MethodDef row {}",
                    method.rid() + 1
                ))
            }
        }
    } else {
        param_rows + 1
    };

    if start == 0 || start > end || end > param_rows + 1 {
        return Err(malformed_error!(
            "Invalid Param range {}..{} for method {} ({} Param rows)",
            start,
            end,
            owner,
            param_rows
        ));
    }

    if let Some(table) = module.params() {
        for param_rid in start..end {
            let Some(row) = table.get(param_rid) else {
                return Err(malformed_error!("Failed to read Param row {}", param_rid));
            };

            let flags = ParamAttributes::from_bits_truncate(row.flags);
            let name = match row.name {
                0 => None,
                index => Some(module.strings().get(index as usize)?)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            };
            let default = if flags.contains(ParamAttributes::HAS_DEFAULT) {
                module.constant_value(TableId::Param, param_rid)?
            } else {
                None
            };

            let sequence = row.sequence as usize;
            let (slot, declared) = match sequence {
                0 => (&mut return_parameter, &signature.return_type),
                n if n <= count => (&mut parameters[n - 1], &signature.params[n - 1]),
                _ => {
                    return Err(malformed_error!(
                        "Param row {} has sequence {} but method {} takes {} parameters",
                        param_rid,
                        sequence,
                        owner,
                        count
                    ))
                }
            };
            if slot.is_some() {
                return Err(malformed_error!(
                    "Duplicate sequence {} for method {}",
                    sequence,
                    owner
                ));
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let position = sequence as i32 - 1;
            *slot = Some(Parameter {
                method: owner,
                position,
                rid: Some(param_rid),
                token: row.token,
                name,
                flags,
                default,
                signature: declared.clone(),
            });
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let parameters = parameters
        .into_iter()
        .zip(&signature.params)
        .enumerate()
        .map(|(position, (parameter, declared))| {
            parameter.unwrap_or_else(|| {
                Parameter::synthesized(owner, position as i32, declared.clone())
            })
        })
        .collect();

    let return_parameter = return_parameter
        .unwrap_or_else(|| Parameter::synthesized(owner, -1, signature.return_type.clone()));

    Ok(ParameterSet {
        parameters,
        return_parameter,
    })
}
