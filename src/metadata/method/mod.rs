//! Lazily resolved method definitions.
//!
//! A [`MethodDef`] is a thin handle on one `MethodDef` row of a
//! [`crate::metadata::module::MetadataModule`]. Nothing beyond the raw row is decoded when
//! the handle is created. The signature, parameters, generic parameters and native binding
//! are each computed on first request and stored in a once-cell shared by every handle on
//! the same row, so later requests from any thread see the same value without decoding
//! again.
//!
//! # Key Components
//!
//! - [`MethodDef`] - The lazy method entity
//! - [`Parameter`] - A parameter or return value, possibly synthesized
//! - [`GenericParameter`] - A method-level generic parameter
//! - [`MethodAttributes`], [`MethodImplAttributes`], [`ParamAttributes`] - Flag sets
//!
//! # Examples
//!
//! ```rust,ignore
//! let method = module.method(1)?;
//! for param in method.parameters()? {
//!     println!("{}: {:?}", param.position, param.name);
//! }
//! if let Some(binding) = method.native_binding()? {
//!     println!("{}!{}", binding.module_name, binding.entry_point);
//! }
//! # Ok::<(), jcil::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Cells are filled by computing the value outside the cell and then publishing it. Two
//! threads racing on the same cell both compute, one value is kept and the other dropped.
//! A partially built value is never observable.

mod generics;
mod parameter;
mod types;

pub use generics::GenericParameter;
pub use parameter::Parameter;
pub use types::*;

use std::sync::{Arc, OnceLock};

use crate::{
    metadata::{
        interop::{AttributeConstructor, CustomAttributeData, InteropDescriptor},
        module::MetadataModule,
        signatures::{parse_method_signature, SignatureMethod},
        tables::{CodedIndexType, MethodDefRaw, TableId},
        token::Token,
    },
    Result,
};

use parameter::ParameterSet;

/// The once-cells of one `MethodDef` row, shared by all handles on that row.
#[derive(Default)]
pub(crate) struct MethodCache {
    signature: OnceLock<SignatureMethod>,
    parameters: OnceLock<ParameterSet>,
    generic_parameters: OnceLock<Vec<GenericParameter>>,
    native_binding: OnceLock<Option<InteropDescriptor>>,
}

/// A method definition of a [`MetadataModule`].
///
/// Identity is the owning module plus the row id.
pub struct MethodDef<'a> {
    module: &'a MetadataModule<'a>,
    row: MethodDefRaw,
    cache: Arc<MethodCache>,
}

impl<'a> MethodDef<'a> {
    pub(crate) fn new(
        module: &'a MetadataModule<'a>,
        row: MethodDefRaw,
        cache: Arc<MethodCache>,
    ) -> Self {
        MethodDef { module, row, cache }
    }

    /// The owning module.
    #[must_use]
    pub fn module(&self) -> &'a MetadataModule<'a> {
        self.module
    }

    /// The undecoded row.
    #[must_use]
    pub fn raw(&self) -> &MethodDefRaw {
        &self.row
    }

    /// The 1-based row id.
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.row.rid
    }

    /// The `MethodDef` token.
    #[must_use]
    pub fn token(&self) -> Token {
        self.row.token
    }

    /// The method name.
    ///
    /// # Errors
    /// Returns an error if the name index is not in the `#Strings` heap.
    pub fn name(&self) -> Result<&'a str> {
        self.module.strings().get(self.row.name as usize)
    }

    /// Modifier flags.
    #[must_use]
    pub fn flags(&self) -> MethodAttributes {
        MethodAttributes::from_method_flags(self.row.flags)
    }

    /// Member access.
    #[must_use]
    pub fn access(&self) -> MethodAccess {
        MethodAccess::from_method_flags(self.row.flags)
    }

    /// Implementation flags.
    #[must_use]
    pub fn impl_flags(&self) -> MethodImplAttributes {
        MethodImplAttributes::from_bits_truncate(self.row.impl_flags)
    }

    /// `true` for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags().contains(MethodAttributes::STATIC)
    }

    /// The decoded signature.
    ///
    /// # Errors
    /// Returns an error if the signature blob is missing or malformed.
    pub fn signature(&self) -> Result<&SignatureMethod> {
        if let Some(signature) = self.cache.signature.get() {
            return Ok(signature);
        }

        self.module.stats().record_signature_parse();
        let blob = self.module.blob().get(self.row.signature as usize)?;
        let signature = parse_method_signature(blob)?;
        Ok(self.cache.signature.get_or_init(|| signature))
    }

    /// Number of fixed parameters in the signature.
    ///
    /// # Errors
    /// See [`MethodDef::signature`].
    pub fn parameter_count(&self) -> Result<usize> {
        Ok(self.signature()?.params.len())
    }

    fn parameter_set(&self) -> Result<&ParameterSet> {
        if let Some(set) = self.cache.parameters.get() {
            return Ok(set);
        }

        let set = parameter::resolve(self, self.signature()?)?;
        Ok(self.cache.parameters.get_or_init(|| set))
    }

    /// One parameter per signature position, in order.
    ///
    /// Positions without a `Param` row are synthesized.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the owned `Param` range is out of bounds or not
    /// monotonic, a sequence number exceeds the signature, or a sequence is repeated.
    pub fn parameters(&self) -> Result<&[Parameter]> {
        Ok(&self.parameter_set()?.parameters)
    }

    /// The return parameter (position `-1`).
    ///
    /// # Errors
    /// See [`MethodDef::parameters`].
    pub fn return_parameter(&self) -> Result<&Parameter> {
        Ok(&self.parameter_set()?.return_parameter)
    }

    /// Generic parameters declared by this method, empty if it is not generic.
    ///
    /// # Errors
    /// Returns an error if a `GenericParam` row or its name cannot be read.
    pub fn generic_parameters(&self) -> Result<&[GenericParameter]> {
        if let Some(generics) = self.cache.generic_parameters.get() {
            return Ok(generics);
        }

        let generics = generics::resolve(self)?;
        Ok(self.cache.generic_parameters.get_or_init(|| generics))
    }

    /// `true` if this method declares generic parameters.
    ///
    /// # Errors
    /// See [`MethodDef::generic_parameters`].
    pub fn is_generic_method_definition(&self) -> Result<bool> {
        Ok(!self.generic_parameters()?.is_empty())
    }

    /// The decoded `ImplMap` row of a `PINVOKE_IMPL` method.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the forwarding row or its module is unreadable.
    pub fn native_binding(&self) -> Result<Option<&InteropDescriptor>> {
        if let Some(binding) = self.cache.native_binding.get() {
            return Ok(binding.as_ref());
        }

        let binding = self.resolve_native_binding()?;
        Ok(self.cache.native_binding.get_or_init(|| binding).as_ref())
    }

    fn resolve_native_binding(&self) -> Result<Option<InteropDescriptor>> {
        if !self.flags().contains(MethodAttributes::PINVOKE_IMPL) {
            return Ok(None);
        }

        let Some(entry) = self.module.impl_map_index().get(&self.token()) else {
            log::warn!("Method {} is PInvokeImpl but has no ImplMap row", self.token());
            return Ok(None);
        };

        let row_id = *entry.value();
        let Some(row) = self.module.impl_maps().and_then(|table| table.get(row_id)) else {
            return Err(malformed_error!("Failed to read ImplMap row {}", row_id));
        };

        InteropDescriptor::from_row(
            &row,
            self.impl_flags()
                .contains(MethodImplAttributes::PRESERVE_SIG),
            self.module.strings(),
            self.module.module_refs(),
        )
        .map(Some)
    }

    /// Declared attributes followed by the `DllImport` pseudo-attribute, if any.
    ///
    /// # Errors
    /// Returns an error if a `CustomAttribute` row, its blob, or the native binding is
    /// malformed.
    pub fn custom_attributes(&self) -> Result<Vec<CustomAttributeData>> {
        self.custom_attributes_filtered(|_| true)
    }

    /// Like [`MethodDef::custom_attributes`], keeping only attributes whose constructor
    /// passes `filter`.
    ///
    /// The native binding is only consulted when `filter` admits
    /// [`AttributeConstructor::DllImport`].
    ///
    /// # Errors
    /// Returns an error if an admitted `CustomAttribute` row, its blob, or the native
    /// binding is malformed.
    pub fn custom_attributes_filtered<F>(&self, filter: F) -> Result<Vec<CustomAttributeData>>
    where
        F: Fn(&AttributeConstructor) -> bool,
    {
        let mut attributes = Vec::new();

        if let Some(table) = self.module.custom_attributes() {
            let Some(key) =
                CodedIndexType::HasCustomAttribute.encode(TableId::MethodDef, self.rid())
            else {
                return Err(malformed_error!("MethodDef is not a HasCustomAttribute target"));
            };

            for row in table.equal_range(|row| row.parent_key(), key)? {
                let constructor = AttributeConstructor::Declared(row.constructor.token);
                if !filter(&constructor) {
                    continue;
                }
                attributes.push(CustomAttributeData {
                    constructor,
                    value: Some(self.module.blob().get(row.value as usize)?.to_vec()),
                    fixed_arguments: Vec::new(),
                    named_arguments: Vec::new(),
                });
            }
        }

        if filter(&AttributeConstructor::DllImport) {
            if let Some(binding) = self.native_binding()? {
                attributes.push(binding.to_attribute());
            }
        }

        Ok(attributes)
    }
}

impl std::fmt::Debug for MethodDef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDef")
            .field("token", &self.row.token)
            .field("flags", &self.flags())
            .field("impl_flags", &self.impl_flags())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            interop::{AttributeArgument, CharSet, PInvokeCallingConvention},
            signatures::{ELEMENT_TYPE, TypeSignature},
            tables::ConstantValue,
        },
        test::ModuleBuilder,
        Error,
    };

    // static void (int32, string, bool)
    const SIG_THREE: [u8; 6] = [0x00, 0x03, 0x01, 0x08, 0x0E, 0x02];
    // static void ()
    const SIG_NONE: [u8; 3] = [0x00, 0x00, 0x01];
    // static !!0 <2> (!!1)
    const SIG_GENERIC: [u8; 7] = [0x10, 0x02, 0x01, 0x1E, 0x00, 0x1E, 0x01];

    const PUBLIC_STATIC: u16 = 0x0016;
    const PINVOKE: u16 = 0x2016;

    #[test]
    fn parameter_arity_for_every_row_count() {
        let names = ["a", "b", "c"];
        for rows in 0..=3_u16 {
            for with_return in [false, true] {
                let mut builder = ModuleBuilder::new();
                let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
                if with_return {
                    builder.param(method, 0, "", 0);
                }
                for sequence in 1..=rows {
                    builder.param(method, sequence, names[sequence as usize - 1], 0);
                }
                let image = builder.build();
                let module = image.module();
                let method = module.method(1).unwrap();

                let params = method.parameters().unwrap();
                assert_eq!(params.len(), 3);
                for (position, param) in params.iter().enumerate() {
                    assert_eq!(param.position, position as i32);
                    assert_eq!(param.method, method.token());
                    if position < rows as usize {
                        assert_eq!(param.name.as_deref(), Some(names[position]));
                        assert!(param.token.is_table(TableId::Param));
                        assert!(!param.token.is_null());
                    } else {
                        assert!(param.is_synthesized());
                        assert_eq!(param.token.value(), 0x0800_0000);
                        assert_eq!(param.name, None);
                        assert!(param.flags.is_empty());
                    }
                }

                let ret = method.return_parameter().unwrap();
                assert!(ret.is_return());
                assert_eq!(ret.is_synthesized(), !with_return);
            }
        }
    }

    #[test]
    fn parameters_between_methods() {
        let mut builder = ModuleBuilder::new();
        let first = builder.method("First", PUBLIC_STATIC, 0, &SIG_THREE);
        let second = builder.method("Second", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(second, 2, "y", 0);
        builder.param(first, 1, "a", 0);
        let image = builder.build();
        let module = image.module();

        let first = module.method(first).unwrap();
        let params = first.parameters().unwrap();
        assert_eq!(params[0].name.as_deref(), Some("a"));
        assert_eq!(params[0].rid, Some(1));
        assert!(params[1].is_synthesized());

        let second = module.method(second).unwrap();
        let params = second.parameters().unwrap();
        assert!(params[0].is_synthesized());
        assert_eq!(params[1].name.as_deref(), Some("y"));
        assert_eq!(params[1].rid, Some(2));
    }

    #[test]
    fn parameters_carry_signature_types() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(method, 2, "text", 0);
        let image = builder.build();
        let module = image.module();
        let method = module.method(method).unwrap();

        let params = method.parameters().unwrap();
        assert!(params[0].is_synthesized());
        assert_eq!(params[0].parameter_type(), &TypeSignature::I4);
        assert_eq!(params[1].parameter_type(), &TypeSignature::String);
        assert_eq!(params[2].parameter_type(), &TypeSignature::Boolean);

        let ret = method.return_parameter().unwrap();
        assert!(ret.is_synthesized());
        assert_eq!(ret.parameter_type(), &TypeSignature::Void);
    }

    #[test]
    fn parameter_modifiers_are_split() {
        // static modopt(TypeRef 2) int32 (modreq(TypeRef 1) string, bool&)
        let sig = [0x00, 0x02, 0x20, 0x09, 0x08, 0x1F, 0x05, 0x0E, 0x10, 0x02];
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &sig);
        builder.param(method, 2, "flag", 0x0002);
        let image = builder.build();
        let module = image.module();
        let method = module.method(method).unwrap();

        let params = method.parameters().unwrap();
        let first = &params[0];
        assert!(first.is_synthesized());
        assert_eq!(first.parameter_type(), &TypeSignature::String);
        assert_eq!(first.required_modifiers(), &[Token::new(0x0100_0001)]);
        assert!(first.optional_modifiers().is_empty());
        assert!(!first.is_by_ref());

        let second = &params[1];
        assert_eq!(second.name.as_deref(), Some("flag"));
        assert!(second.is_by_ref());
        assert_eq!(second.parameter_type(), &TypeSignature::Boolean);
        assert!(second.required_modifiers().is_empty());

        let ret = method.return_parameter().unwrap();
        assert!(ret.is_synthesized());
        assert_eq!(ret.parameter_type(), &TypeSignature::I4);
        assert_eq!(ret.optional_modifiers(), &[Token::new(0x0100_0002)]);
        assert!(ret.required_modifiers().is_empty());
    }

    #[test]
    fn resolution_is_cached() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(method, 1, "a", 0);
        let image = builder.build();
        let module = image.module();

        let handle = module.method(1).unwrap();
        handle.parameters().unwrap();
        handle.generic_parameters().unwrap();
        let after_first = module.stats().snapshot();
        assert_eq!(after_first.signature_parses, 1);
        assert_eq!(after_first.param_scans, 1);
        assert_eq!(after_first.generic_param_searches, 1);

        handle.parameters().unwrap();
        handle.return_parameter().unwrap();
        handle.signature().unwrap();
        handle.generic_parameters().unwrap();

        let other = module.method(1).unwrap();
        other.parameters().unwrap();
        other.generic_parameters().unwrap();

        assert_eq!(module.stats().snapshot(), after_first);
    }

    #[test]
    fn sequence_beyond_signature_is_malformed() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_NONE);
        builder.param(method, 1, "extra", 0);
        let image = builder.build();
        let module = image.module();

        let result = module.method(1).unwrap().parameters().map(<[Parameter]>::len);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn duplicate_sequence_is_malformed() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(method, 2, "a", 0);
        builder.param(method, 2, "b", 0);
        let image = builder.build();
        let module = image.module();

        assert!(matches!(
            module.method(1).unwrap().parameters(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn non_monotonic_range_is_malformed() {
        let mut builder = ModuleBuilder::new();
        let first = builder.method("First", PUBLIC_STATIC, 0, &SIG_THREE);
        let second = builder.method("Second", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(first, 1, "a", 0);
        builder.param(first, 2, "b", 0);
        builder.override_param_list(first, 2);
        builder.override_param_list(second, 1);
        let image = builder.build();
        let module = image.module();

        assert!(matches!(
            module.method(first).unwrap().parameters(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn range_past_table_is_malformed() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.override_param_list(method, 5);
        let image = builder.build();
        let module = image.module();

        assert!(matches!(
            module.method(method).unwrap().parameters(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn default_values() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param_with_default(method, 1, "count", ELEMENT_TYPE::I4, &42_i32.to_le_bytes());
        builder.param_with_default(method, 2, "label", ELEMENT_TYPE::STRING, &[0x68, 0x00, 0x69, 0x00]);
        builder.param(method, 3, "flag", 0);
        let image = builder.build();
        let module = image.module();

        let method = module.method(1).unwrap();
        let params = method.parameters().unwrap();
        assert_eq!(params[0].default, Some(ConstantValue::I4(42)));
        assert!(params[0].flags.contains(ParamAttributes::HAS_DEFAULT));
        assert_eq!(params[1].default, Some(ConstantValue::String("hi".to_string())));
        assert_eq!(params[2].default, None);
        assert_eq!(module.stats().snapshot().constant_lookups, 2);
    }

    #[test]
    fn generic_parameters_by_owner() {
        let mut builder = ModuleBuilder::new();
        let plain = builder.method("Plain", PUBLIC_STATIC, 0, &SIG_NONE);
        let generic = builder.method("Generic", PUBLIC_STATIC, 0, &SIG_GENERIC);
        let other = builder.method("Other", PUBLIC_STATIC, 0, &SIG_NONE);
        builder.generic_param(generic, 1, "U");
        builder.generic_param(generic, 0, "T");
        let image = builder.build();
        let module = image.module();

        let plain = module.method(plain).unwrap();
        assert!(plain.generic_parameters().unwrap().is_empty());
        assert!(!plain.is_generic_method_definition().unwrap());

        let generic = module.method(generic).unwrap();
        let generics = generic.generic_parameters().unwrap();
        let names: Vec<_> = generics.iter().map(|g| (g.number, g.name.as_str())).collect();
        assert_eq!(names, vec![(0, "T"), (1, "U")]);
        assert!(generics.iter().all(|g| g.owner == generic.token()));
        assert!(generic.is_generic_method_definition().unwrap());

        let signature = generic.signature().unwrap();
        assert_eq!(signature.param_count_generic, 2);
        assert_eq!(signature.return_type.base, TypeSignature::GenericParamMethod(0));

        assert!(module.method(other).unwrap().generic_parameters().unwrap().is_empty());
    }

    #[test]
    fn method_flags_and_name() {
        let mut builder = ModuleBuilder::new();
        builder.method("Run", 0x0006, 0x0020, &[0x20, 0x00, 0x01]);
        let image = builder.build();
        let module = image.module();

        let method = module.method(1).unwrap();
        assert_eq!(method.name().unwrap(), "Run");
        assert_eq!(method.token().value(), 0x0600_0001);
        assert_eq!(method.access(), MethodAccess::Public);
        assert!(!method.is_static());
        assert!(method.impl_flags().contains(MethodImplAttributes::SYNCHRONIZED));
        assert!(method.signature().unwrap().has_this);
        assert_eq!(method.parameter_count().unwrap(), 0);

        assert!(matches!(module.method(2), Err(Error::Malformed { .. })));
    }

    #[test]
    fn native_binding_with_best_fit() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("Beep", PINVOKE, 0x0080, &SIG_NONE);
        let kernel32 = builder.module_ref("kernel32.dll");
        builder.impl_map(method, 0x0001 | 0x0004 | 0x0040 | 0x0200 | 0x0010, "Beep", kernel32);
        let image = builder.build();
        let module = image.module();

        let method = module.method(1).unwrap();
        let binding = method.native_binding().unwrap().unwrap();
        assert_eq!(binding.module_name, "kernel32.dll");
        assert_eq!(binding.entry_point, "Beep");
        assert!(binding.exact_spelling);
        assert!(binding.set_last_error);
        assert!(binding.preserve_sig);
        assert_eq!(binding.calling_convention, PInvokeCallingConvention::Cdecl);
        assert_eq!(binding.char_set, Some(CharSet::Unicode));
        assert_eq!(binding.best_fit_mapping, Some(true));
        assert_eq!(binding.throw_on_unmappable_char, None);

        method.native_binding().unwrap();
        assert_eq!(module.stats().snapshot().impl_map_index_builds, 1);
    }

    #[test]
    fn native_binding_without_optional_bits() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("GetTickCount", PINVOKE, 0, &SIG_NONE);
        let kernel32 = builder.module_ref("kernel32.dll");
        builder.impl_map(method, 0, "GetTickCount", kernel32);
        let image = builder.build();
        let module = image.module();

        let binding = module.method(1).unwrap().native_binding().unwrap().cloned().unwrap();
        assert_eq!(binding.calling_convention, PInvokeCallingConvention::Winapi);
        assert_eq!(binding.char_set, None);
        assert_eq!(binding.best_fit_mapping, None);
        assert!(!binding.preserve_sig);
    }

    #[test]
    fn managed_method_has_no_binding() {
        let mut builder = ModuleBuilder::new();
        builder.method("Managed", PUBLIC_STATIC, 0, &SIG_NONE);
        let image = builder.build();
        let module = image.module();

        assert!(module.method(1).unwrap().native_binding().unwrap().is_none());
        assert!(module.method(1).unwrap().custom_attributes().unwrap().is_empty());
        assert_eq!(module.stats().snapshot().impl_map_index_builds, 0);
    }

    #[test]
    fn custom_attributes_include_dll_import() {
        let mut builder = ModuleBuilder::new();
        let managed = builder.method("Managed", PUBLIC_STATIC, 0, &SIG_NONE);
        let native = builder.method("MessageBox", PINVOKE, 0, &SIG_NONE);
        let user32 = builder.module_ref("user32.dll");
        builder.impl_map(native, 0x0020, "MessageBoxW", user32);
        builder.custom_attribute(native, 7, &[0x01, 0x00, 0x00, 0x00]);
        builder.custom_attribute(managed, 3, &[0x01, 0x00]);
        let image = builder.build();
        let module = image.module();

        let attributes = module.method(native).unwrap().custom_attributes().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(
            attributes[0].constructor,
            AttributeConstructor::Declared(Token::new(0x0A00_0007))
        );
        assert_eq!(attributes[0].value.as_deref(), Some(&[0x01, 0x00, 0x00, 0x00][..]));

        let dll_import = &attributes[1];
        assert_eq!(dll_import.constructor, AttributeConstructor::DllImport);
        assert_eq!(
            dll_import.fixed_arguments,
            vec![AttributeArgument::String("user32.dll".to_string())]
        );
        assert_eq!(
            dll_import.named("EntryPoint"),
            Some(&AttributeArgument::String("MessageBoxW".to_string()))
        );
        assert_eq!(
            dll_import.named("BestFitMapping"),
            Some(&AttributeArgument::Bool(false))
        );
        assert_eq!(dll_import.named("CharSet"), None);

        let attributes = module.method(managed).unwrap().custom_attributes().unwrap();
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn custom_attributes_by_constructor() {
        let mut builder = ModuleBuilder::new();
        let native = builder.method("MessageBox", PINVOKE, 0, &SIG_NONE);
        let user32 = builder.module_ref("user32.dll");
        builder.impl_map(native, 0x0020, "MessageBoxW", user32);
        builder.custom_attribute(native, 7, &[0x01, 0x00]);
        builder.custom_attribute(native, 9, &[0x01, 0x00, 0x00, 0x00]);
        let image = builder.build();
        let module = image.module();
        let method = module.method(native).unwrap();

        let wanted = AttributeConstructor::Declared(Token::new(0x0A00_0009));
        let declared = method.custom_attributes_filtered(|c| *c == wanted).unwrap();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].value.as_deref(), Some(&[0x01, 0x00, 0x00, 0x00][..]));
        assert_eq!(module.stats().snapshot().impl_map_index_builds, 0);

        let dll_import = method
            .custom_attributes_filtered(|c| *c == AttributeConstructor::DllImport)
            .unwrap();
        assert_eq!(dll_import.len(), 1);
        assert_eq!(dll_import[0].constructor, AttributeConstructor::DllImport);
        assert_eq!(
            dll_import[0].named("EntryPoint"),
            Some(&AttributeArgument::String("MessageBoxW".to_string()))
        );

        assert!(method.custom_attributes_filtered(|_| false).unwrap().is_empty());
        assert_eq!(method.custom_attributes().unwrap().len(), 3);
    }

    #[test]
    fn concurrent_first_use() {
        let mut builder = ModuleBuilder::new();
        let method = builder.method("M", PUBLIC_STATIC, 0, &SIG_THREE);
        builder.param(method, 1, "a", 0);
        builder.param(method, 3, "c", 0);
        let image = builder.build();
        let module = image.module();

        let results: Vec<Vec<Parameter>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let method = module.method(1).unwrap();
                        method.parameters().unwrap().to_vec()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for params in &results {
            assert_eq!(params, &results[0]);
        }
        assert_eq!(results[0][2].name.as_deref(), Some("c"));
    }
}
