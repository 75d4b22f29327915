use strum::{EnumCount, EnumIter};

/// Identifiers of the ECMA-335 metadata tables (§II.22).
///
/// The discriminant is the table number used as the high byte of a [`crate::metadata::token::Token`].
/// Only a handful of these tables are decoded by this crate, but every table takes part in
/// coded-index sizing, so the full set is listed.
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Eq, Hash)]
pub enum TableId {
    /// `Module` (0x00)
    Module = 0x00,
    /// `TypeRef` (0x01)
    TypeRef = 0x01,
    /// `TypeDef` (0x02)
    TypeDef = 0x02,
    /// `Field` (0x04)
    Field = 0x04,
    /// `MethodDef` (0x06) - method definitions, see [`crate::metadata::tables::MethodDefRaw`]
    MethodDef = 0x06,
    /// `Param` (0x08) - parameter rows, see [`crate::metadata::tables::ParamRaw`]
    Param = 0x08,
    /// `InterfaceImpl` (0x09)
    InterfaceImpl = 0x09,
    /// `MemberRef` (0x0A)
    MemberRef = 0x0A,
    /// `Constant` (0x0B) - default values, see [`crate::metadata::tables::ConstantRaw`]
    Constant = 0x0B,
    /// `CustomAttribute` (0x0C) - see [`crate::metadata::tables::CustomAttributeRaw`]
    CustomAttribute = 0x0C,
    /// `FieldMarshal` (0x0D)
    FieldMarshal = 0x0D,
    /// `DeclSecurity` (0x0E)
    DeclSecurity = 0x0E,
    /// `ClassLayout` (0x0F)
    ClassLayout = 0x0F,
    /// `FieldLayout` (0x10)
    FieldLayout = 0x10,
    /// `StandAloneSig` (0x11)
    StandAloneSig = 0x11,
    /// `EventMap` (0x12)
    EventMap = 0x12,
    /// `Event` (0x14)
    Event = 0x14,
    /// `PropertyMap` (0x15)
    PropertyMap = 0x15,
    /// `Property` (0x17)
    Property = 0x17,
    /// `MethodSemantics` (0x18)
    MethodSemantics = 0x18,
    /// `MethodImpl` (0x19)
    MethodImpl = 0x19,
    /// `ModuleRef` (0x1A) - native import scopes, see [`crate::metadata::tables::ModuleRefRaw`]
    ModuleRef = 0x1A,
    /// `TypeSpec` (0x1B)
    TypeSpec = 0x1B,
    /// `ImplMap` (0x1C) - native forwarding map, see [`crate::metadata::tables::ImplMapRaw`]
    ImplMap = 0x1C,
    /// `FieldRVA` (0x1D)
    FieldRVA = 0x1D,
    /// `Assembly` (0x20)
    Assembly = 0x20,
    /// `AssemblyProcessor` (0x21)
    AssemblyProcessor = 0x21,
    /// `AssemblyOS` (0x22)
    AssemblyOS = 0x22,
    /// `AssemblyRef` (0x23)
    AssemblyRef = 0x23,
    /// `AssemblyRefProcessor` (0x24)
    AssemblyRefProcessor = 0x24,
    /// `AssemblyRefOS` (0x25)
    AssemblyRefOS = 0x25,
    /// `File` (0x26)
    File = 0x26,
    /// `ExportedType` (0x27)
    ExportedType = 0x27,
    /// `ManifestResource` (0x28)
    ManifestResource = 0x28,
    /// `NestedClass` (0x29)
    NestedClass = 0x29,
    /// `GenericParam` (0x2A) - see [`crate::metadata::tables::GenericParamRaw`]
    GenericParam = 0x2A,
    /// `MethodSpec` (0x2B)
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` (0x2C)
    GenericParamConstraint = 0x2C,
}
