//! Native binding descriptors and the synthesized `DllImport` pseudo-attribute.
//!
//! A method flagged `PINVOKE_IMPL` has one `ImplMap` row describing where its body lives in
//! native code. [`InteropDescriptor`] is the decoded form of that row. Since the runtime
//! exposes such methods as if they carried a `DllImportAttribute`, the descriptor can also
//! be rendered as a [`CustomAttributeData`] so consumers enumerate declared and synthesized
//! attributes the same way.

use crate::{
    metadata::{
        streams::Strings,
        tables::{ImplMapRaw, MetadataTable, ModuleRefRaw, PInvokeAttributes},
        token::Token,
    },
    Result,
};

/// Calling convention of a native entry point.
///
/// The discriminants are the values of `System.Runtime.InteropServices.CallingConvention`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PInvokeCallingConvention {
    /// Platform default
    Winapi = 1,
    /// C calling convention
    Cdecl = 2,
    /// Callee cleans the stack
    Stdcall = 3,
    /// `this` passed in a register
    Thiscall = 4,
    /// Arguments passed in registers
    Fastcall = 5,
}

impl PInvokeCallingConvention {
    /// Decode the calling convention bits, defaulting to [`PInvokeCallingConvention::Winapi`].
    #[must_use]
    pub fn from_mapping_flags(flags: u32) -> Self {
        match flags & PInvokeAttributes::CALL_CONV_MASK {
            PInvokeAttributes::CALL_CONV_CDECL => PInvokeCallingConvention::Cdecl,
            PInvokeAttributes::CALL_CONV_STDCALL => PInvokeCallingConvention::Stdcall,
            PInvokeAttributes::CALL_CONV_THISCALL => PInvokeCallingConvention::Thiscall,
            PInvokeAttributes::CALL_CONV_FASTCALL => PInvokeCallingConvention::Fastcall,
            _ => PInvokeCallingConvention::Winapi,
        }
    }
}

/// String marshalling character set.
///
/// The discriminants are the values of `System.Runtime.InteropServices.CharSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharSet {
    /// Single-byte strings
    Ansi = 2,
    /// UTF-16 strings
    Unicode = 3,
    /// Chosen by the platform
    Auto = 4,
}

impl CharSet {
    /// Decode the character set bits; an unspecified set yields `None`.
    #[must_use]
    pub fn from_mapping_flags(flags: u32) -> Option<Self> {
        match flags & PInvokeAttributes::CHAR_SET_MASK {
            PInvokeAttributes::CHAR_SET_ANSI => Some(CharSet::Ansi),
            PInvokeAttributes::CHAR_SET_UNICODE => Some(CharSet::Unicode),
            PInvokeAttributes::CHAR_SET_AUTO => Some(CharSet::Auto),
            _ => None,
        }
    }
}

/// Decoded native binding of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct InteropDescriptor {
    /// Name of the native module (from the `ModuleRef` import scope)
    pub module_name: String,
    /// Name of the native entry point
    pub entry_point: String,
    /// The entry point name is used without mangling
    pub exact_spelling: bool,
    /// The callee sets the last-error value
    pub set_last_error: bool,
    /// Signature is not rewritten for HRESULT returns
    pub preserve_sig: bool,
    /// Native calling convention
    pub calling_convention: PInvokeCallingConvention,
    /// String marshalling, `None` when unspecified
    pub char_set: Option<CharSet>,
    /// Best-fit mapping, `None` when neither bit is set
    pub best_fit_mapping: Option<bool>,
    /// Throw on unmappable characters, `None` when neither bit is set
    pub throw_on_unmappable_char: Option<bool>,
}

/// Report a tri-state option encoded as separate on and off bits.
fn tri_state(flags: u32, on: u32, off: u32) -> Option<bool> {
    if flags & (on | off) == 0 {
        None
    } else {
        Some(flags & on != 0)
    }
}

impl InteropDescriptor {
    /// Decode an `ImplMap` row.
    ///
    /// ## Arguments
    /// * `row` - The forwarding row of the method
    /// * `preserve_sig` - Taken from the method's own impl flags
    /// * `strings` - The `#Strings` heap
    /// * `module_refs` - The `ModuleRef` table, if present
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the import scope does not name a `ModuleRef`
    /// row, or a name is not in the `#Strings` heap.
    pub fn from_row(
        row: &ImplMapRaw,
        preserve_sig: bool,
        strings: &Strings,
        module_refs: Option<&MetadataTable<ModuleRefRaw>>,
    ) -> Result<Self> {
        let scope = row.import_scope & 0x00FF_FFFF;
        let Some(module_ref) = module_refs.and_then(|table| table.get(scope)) else {
            return Err(malformed_error!(
                "ImplMap row {} references missing ModuleRef {}",
                row.rid,
                scope
            ));
        };

        let flags = row.mapping_flags;
        Ok(InteropDescriptor {
            module_name: strings.get(module_ref.name as usize)?.to_string(),
            entry_point: strings.get(row.import_name as usize)?.to_string(),
            exact_spelling: flags & PInvokeAttributes::NO_MANGLE != 0,
            set_last_error: flags & PInvokeAttributes::SUPPORTS_LAST_ERROR != 0,
            preserve_sig,
            calling_convention: PInvokeCallingConvention::from_mapping_flags(flags),
            char_set: CharSet::from_mapping_flags(flags),
            best_fit_mapping: tri_state(
                flags,
                PInvokeAttributes::BEST_FIT_ENABLED,
                PInvokeAttributes::BEST_FIT_DISABLED,
            ),
            throw_on_unmappable_char: tri_state(
                flags,
                PInvokeAttributes::THROW_ON_UNMAPPABLE_ENABLED,
                PInvokeAttributes::THROW_ON_UNMAPPABLE_DISABLED,
            ),
        })
    }

    /// Render this descriptor as a `DllImportAttribute`.
    ///
    /// The fixed argument is the module name. `CharSet`, `BestFitMapping` and
    /// `ThrowOnUnmappableChar` are only named when they were specified.
    #[must_use]
    pub fn to_attribute(&self) -> CustomAttributeData {
        let mut named_arguments = vec![
            NamedArgument::new("EntryPoint", AttributeArgument::String(self.entry_point.clone())),
            NamedArgument::new("ExactSpelling", AttributeArgument::Bool(self.exact_spelling)),
            NamedArgument::new("SetLastError", AttributeArgument::Bool(self.set_last_error)),
            NamedArgument::new("PreserveSig", AttributeArgument::Bool(self.preserve_sig)),
            NamedArgument::new(
                "CallingConvention",
                AttributeArgument::I4(self.calling_convention as i32),
            ),
        ];

        if let Some(char_set) = self.char_set {
            named_arguments.push(NamedArgument::new(
                "CharSet",
                AttributeArgument::I4(char_set as i32),
            ));
        }
        if let Some(best_fit) = self.best_fit_mapping {
            named_arguments.push(NamedArgument::new(
                "BestFitMapping",
                AttributeArgument::Bool(best_fit),
            ));
        }
        if let Some(throw) = self.throw_on_unmappable_char {
            named_arguments.push(NamedArgument::new(
                "ThrowOnUnmappableChar",
                AttributeArgument::Bool(throw),
            ));
        }

        CustomAttributeData {
            constructor: AttributeConstructor::DllImport,
            value: None,
            fixed_arguments: vec![AttributeArgument::String(self.module_name.clone())],
            named_arguments,
        }
    }
}

/// The constructor an attribute is instantiated with.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeConstructor {
    /// A `MethodDef` or `MemberRef` token from the `CustomAttribute` table
    Declared(Token),
    /// `System.Runtime.InteropServices.DllImportAttribute`, synthesized from `ImplMap`
    DllImport,
}

/// A decoded attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArgument {
    /// `string`
    String(String),
    /// `bool`
    Bool(bool),
    /// `int32`, also used for enum values
    I4(i32),
}

/// A named (field or property) attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    /// Field or property name
    pub name: &'static str,
    /// The value assigned
    pub value: AttributeArgument,
}

impl NamedArgument {
    fn new(name: &'static str, value: AttributeArgument) -> Self {
        NamedArgument { name, value }
    }
}

/// One attribute applied to a method.
///
/// Declared attributes keep their value blob undecoded, since decoding it needs the
/// constructor's signature; the synthesized `DllImport` carries decoded arguments instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeData {
    /// Attribute constructor
    pub constructor: AttributeConstructor,
    /// Raw value blob of a declared attribute
    pub value: Option<Vec<u8>>,
    /// Positional constructor arguments
    pub fixed_arguments: Vec<AttributeArgument>,
    /// Named field and property arguments
    pub named_arguments: Vec<NamedArgument>,
}

impl CustomAttributeData {
    /// Look up a named argument.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&AttributeArgument> {
        self.named_arguments
            .iter()
            .find(|argument| argument.name == name)
            .map(|argument| &argument.value)
    }
}
