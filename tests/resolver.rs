//! Resolver tests against a hand-assembled module.
//!
//! The image holds two methods:
//!
//! 1. `static int Add(int a, int b)`, a `PInvokeImpl` bound to `native.dll!add`
//! 2. `static !!0 Identity<T>(!!0)`, generic and without `Param` rows

use std::sync::Arc;

use jcil::{
    metadata::{
        interop::{AttributeArgument, CharSet, PInvokeCallingConvention},
        module::MetadataModule,
        signatures::TypeSignature,
        tables::{TableId, TableInfo},
        token::Token,
    },
    Error,
};

const STRINGS: &[u8] = b"\0Add\0Identity\0a\0b\0T\0native.dll\0add\0";

const BLOB: &[u8] = &[
    0x00, //
    0x05, 0x00, 0x02, 0x08, 0x08, 0x08, // int32 (int32, int32)
    0x07, 0x10, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00, // !!0 <1> (!!0)
];

#[rustfmt::skip]
const METHOD_DEF: &[u8] = &[
    // rva, impl_flags, flags (PInvokeImpl | Static | Public), name, signature, param_list
    0, 0, 0, 0,  0x80, 0x00,  0x16, 0x20,  0x01, 0x00,  0x01, 0x00,  0x01, 0x00,
    0, 0, 0, 0,  0x00, 0x00,  0x16, 0x00,  0x05, 0x00,  0x07, 0x00,  0x03, 0x00,
];

#[rustfmt::skip]
const PARAM: &[u8] = &[
    // flags, sequence, name
    0x00, 0x00,  0x01, 0x00,  0x0E, 0x00,
    0x00, 0x00,  0x02, 0x00,  0x10, 0x00,
];

#[rustfmt::skip]
const GENERIC_PARAM: &[u8] = &[
    // number, flags, owner (MethodDef 2), name
    0x00, 0x00,  0x00, 0x00,  0x05, 0x00,  0x12, 0x00,
];

const MODULE_REF: &[u8] = &[0x14, 0x00];

#[rustfmt::skip]
const IMPL_MAP: &[u8] = &[
    // flags (NoMangle | CharSetAnsi | Cdecl), member (MethodDef 1), import name, scope
    0x03, 0x02,  0x03, 0x00,  0x1F, 0x00,  0x01, 0x00,
];

fn module() -> MetadataModule<'static> {
    let info = Arc::new(TableInfo::from_row_counts(
        &[
            (TableId::MethodDef, 2),
            (TableId::Param, 2),
            (TableId::GenericParam, 1),
            (TableId::ModuleRef, 1),
            (TableId::ImplMap, 1),
        ],
        false,
        false,
        false,
    ));

    MetadataModule::new(info, STRINGS, BLOB)
        .and_then(|module| module.with_table(TableId::MethodDef, METHOD_DEF))
        .and_then(|module| module.with_table(TableId::Param, PARAM))
        .and_then(|module| module.with_table(TableId::GenericParam, GENERIC_PARAM))
        .and_then(|module| module.with_table(TableId::ModuleRef, MODULE_REF))
        .and_then(|module| module.with_table(TableId::ImplMap, IMPL_MAP))
        .unwrap()
}

#[test]
fn method_names_and_signatures() {
    let module = module();
    assert_eq!(module.method_count(), 2);

    let names: Vec<&str> = module
        .methods()
        .map(|method| method.unwrap().name().unwrap())
        .collect();
    assert_eq!(names, ["Add", "Identity"]);

    let add = module.method(1).unwrap();
    assert!(add.is_static());
    assert_eq!(add.token(), Token::new(0x0600_0001));
    assert_eq!(add.parameter_count().unwrap(), 2);
    assert_eq!(add.signature().unwrap().return_type.base, TypeSignature::I4);
}

#[test]
fn declared_and_synthesized_parameters() {
    let module = module();

    let add = module.method(1).unwrap();
    let params = add.parameters().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name.as_deref(), Some("a"));
    assert_eq!(params[1].name.as_deref(), Some("b"));
    assert_eq!(params[1].position, 1);
    assert_eq!(params[1].token, Token::new(0x0800_0002));
    assert!(params.iter().all(|p| p.parameter_type() == &TypeSignature::I4));
    let ret = add.return_parameter().unwrap();
    assert!(ret.is_synthesized());
    assert_eq!(ret.parameter_type(), &TypeSignature::I4);

    let identity = module.method(2).unwrap();
    let params = identity.parameters().unwrap();
    assert_eq!(params.len(), 1);
    assert!(params[0].is_synthesized());
    assert_eq!(params[0].token, Token::new(0x0800_0000));
    assert_eq!(params[0].method, identity.token());
    assert_eq!(params[0].parameter_type(), &TypeSignature::GenericParamMethod(0));
}

#[test]
fn generic_method_definition() {
    let module = module();

    assert!(!module.method(1).unwrap().is_generic_method_definition().unwrap());

    let identity = module.method(2).unwrap();
    assert!(identity.is_generic_method_definition().unwrap());
    let generics = identity.generic_parameters().unwrap();
    assert_eq!(generics.len(), 1);
    assert_eq!(generics[0].name, "T");
    assert_eq!(generics[0].owner, identity.token());
    assert_eq!(
        identity.parameters().unwrap()[0].position,
        0,
    );
}

#[test]
fn native_binding_and_dll_import() {
    let module = module();

    let add = module.method(1).unwrap();
    let binding = add.native_binding().unwrap().unwrap();
    assert_eq!(binding.module_name, "native.dll");
    assert_eq!(binding.entry_point, "add");
    assert!(binding.exact_spelling);
    assert!(!binding.set_last_error);
    assert!(binding.preserve_sig);
    assert_eq!(binding.calling_convention, PInvokeCallingConvention::Cdecl);
    assert_eq!(binding.char_set, Some(CharSet::Ansi));
    assert_eq!(binding.best_fit_mapping, None);

    let attributes = add.custom_attributes().unwrap();
    assert_eq!(attributes.len(), 1);
    let dll_import = &attributes[0];
    assert_eq!(
        dll_import.fixed_arguments,
        vec![AttributeArgument::String("native.dll".to_string())]
    );
    assert_eq!(
        dll_import.named("EntryPoint"),
        Some(&AttributeArgument::String("add".to_string()))
    );
    assert_eq!(dll_import.named("CharSet"), Some(&AttributeArgument::I4(2)));
    assert!(dll_import.named("BestFitMapping").is_none());

    let identity = module.method(2).unwrap();
    assert!(identity.native_binding().unwrap().is_none());
    assert!(identity.custom_attributes().unwrap().is_empty());
}

#[test]
fn results_are_computed_once() {
    let module = module();

    for _ in 0..3 {
        let method = module.method(1).unwrap();
        method.parameters().unwrap();
        method.native_binding().unwrap();
        module.method(2).unwrap().native_binding().unwrap();
    }

    let stats = module.stats().snapshot();
    assert_eq!(stats.signature_parses, 1);
    assert_eq!(stats.param_scans, 1);
    assert_eq!(stats.impl_map_index_builds, 1);
}

#[test]
fn concurrent_readers_share_one_value() {
    let module = module();

    let addresses: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let method = module.method(1).unwrap();
                    method.parameters().unwrap().as_ptr() as usize
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(module.stats().snapshot().impl_map_index_builds, 0);
}

#[test]
fn missing_row_is_malformed() {
    let module = module();
    assert!(matches!(module.method(3), Err(Error::Malformed { .. })));
    assert!(matches!(module.method(0), Err(Error::Malformed { .. })));
}
