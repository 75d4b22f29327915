use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            ArrayDimensions, CallingConvention, SignatureArray, SignatureMethod,
            SignatureParameter, SignaturePointer, SignatureSzArray, TypeSignature, ELEMENT_TYPE,
        },
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum nesting of types inside one signature.
const MAX_RECURSION_DEPTH: usize = 50;

const SIG_GENERIC: u8 = 0x10;
const SIG_HASTHIS: u8 = 0x20;
const SIG_EXPLICITTHIS: u8 = 0x40;

/// Decoder for method signature blobs.
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a parser over one signature blob.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::PTR => {
                let (required, optional) = self.parse_custom_mods()?;
                Ok(TypeSignature::Ptr(SignaturePointer {
                    modifiers: [required, optional].concat(),
                    base: Box::new(self.parse_type()?),
                }))
            }
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.parser.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.parser.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                let mut dimensions: Vec<ArrayDimensions> =
                    Vec::with_capacity((num_sizes as usize).min(self.parser.remaining()));
                for _ in 0..num_sizes {
                    dimensions.push(ArrayDimensions {
                        size: Some(self.parser.read_compressed_uint()?),
                        lower_bound: None,
                    });
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for i in 0..num_lo_bounds {
                    let lower_bound = self.parser.read_compressed_int()?;
                    match dimensions.get_mut(i as usize) {
                        Some(dimension) => dimension.lower_bound = Some(lower_bound),
                        None => dimensions.push(ArrayDimensions {
                            size: None,
                            lower_bound: Some(lower_bound),
                        }),
                    }
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(elem_type),
                    rank,
                    dimensions,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.parser.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;

                let mut type_args =
                    Vec::with_capacity((arg_count as usize).min(self.parser.remaining()));
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::SZARRAY => {
                let (required, optional) = self.parse_custom_mods()?;
                Ok(TypeSignature::SzArray(SignatureSzArray {
                    modifiers: [required, optional].concat(),
                    base: Box::new(self.parse_type()?),
                }))
            }
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::PINNED => Ok(TypeSignature::Pinned(Box::new(self.parse_type()?))),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    /// Read a run of `modreq` / `modopt` prefixes, split by kind.
    fn parse_custom_mods(&mut self) -> Result<(Vec<Token>, Vec<Token>)> {
        let mut required = Vec::new();
        let mut optional = Vec::new();

        while self.parser.has_more_data() {
            match self.parser.peek_byte()? {
                ELEMENT_TYPE::CMOD_REQD => {
                    self.parser.advance()?;
                    required.push(self.parser.read_compressed_token()?);
                }
                ELEMENT_TYPE::CMOD_OPT => {
                    self.parser.advance()?;
                    optional.push(self.parser.read_compressed_token()?);
                }
                _ => break,
            }
        }

        Ok((required, optional))
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let (required_modifiers, optional_modifiers) = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance()?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            required_modifiers,
            optional_modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a `MethodDefSig` / `MethodRefSig`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated blobs, [`crate::Error::Malformed`]
    /// for unknown element types or calling conventions and [`crate::Error::RecursionLimit`]
    /// for pathological nesting.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let calling_convention = match convention_byte & 0x0F {
            0x0 => CallingConvention::Default,
            0x1 => CallingConvention::Cdecl,
            0x2 => CallingConvention::Stdcall,
            0x3 => CallingConvention::Thiscall,
            0x4 => CallingConvention::Fastcall,
            0x5 => CallingConvention::Vararg,
            other => {
                return Err(malformed_error!(
                    "Invalid method calling convention - {}",
                    other
                ))
            }
        };

        let param_count_generic = if convention_byte & SIG_GENERIC != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;

        let mut method = SignatureMethod {
            has_this: convention_byte & SIG_HASTHIS != 0,
            explicit_this: convention_byte & SIG_EXPLICITTHIS != 0,
            calling_convention,
            param_count_generic,
            return_type: self.parse_param()?,
            params: Vec::with_capacity((param_count as usize).min(self.parser.remaining())),
            varargs: Vec::new(),
        };

        let mut in_varargs = false;
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance()?;
                in_varargs = true;
            }

            let param = self.parse_param()?;
            if in_varargs {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }
}
