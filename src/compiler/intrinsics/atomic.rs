//! `AtomicReferenceFieldUpdater.newUpdater` specialization.
//!
//! `newUpdater(Foo.class, Bar.class, "name")` normally locates the field reflectively. When
//! all three arguments are constants naming a volatile field of the class being compiled,
//! the translator instead generates a nested updater subclass that accesses the field
//! directly, and the call site constructs that subclass.
//!
//! Generated updaters are cached per field, where the declaring class is identified by its
//! name and defining loader. The first request defines the type and
//! registers its finalization; every later request for the same field shares the
//! constructor.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    compiler::{
        config::{IntrinsicConfig, ATOMIC_REFERENCE_FIELD_UPDATER},
        context::{FinishContext, PendingFinish},
        emit::{CilOpCode, EmittedOp, FieldRef, Operand, RuntimeMethod, RuntimeType, TypeRef},
        instruction::NormalizedOpCode,
        intrinsics::{CallSite, IntrinsicRule},
        module::{
            ConstructorRef, GeneratedConstructor, GeneratedMethod, GeneratedType, TypeAttributes,
        },
        types::{FieldFlags, FieldInfo, JavaClass},
        Substitution,
    },
    metadata::method::{MethodAccess, MethodAttributes},
    Result,
};

/// Cache key of a generated updater.
///
/// Two keys match only if their classes come from the same loader, so same-named classes
/// of different loaders get separate updaters.
#[derive(Debug, Clone)]
struct AccessorKey {
    class: Arc<JavaClass>,
    field: Arc<str>,
    signature: Arc<str>,
}

impl PartialEq for AccessorKey {
    fn eq(&self, other: &Self) -> bool {
        self.class.same_class(&other.class)
            && self.field == other.field
            && self.signature == other.signature
    }
}

impl Eq for AccessorKey {}

impl Hash for AccessorKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.name.hash(state);
        self.field.hash(state);
        self.signature.hash(state);
    }
}

/// Generates and caches field updater subclasses.
#[derive(Debug, Default)]
pub struct AtomicFieldUpdaterEmitter {
    cache: DashMap<AccessorKey, ConstructorRef>,
}

impl AtomicFieldUpdaterEmitter {
    /// Create an emitter with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        AtomicFieldUpdaterEmitter::default()
    }

    /// Number of generated updaters.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Replace the `newUpdater` call at `site` if its arguments allow it.
    ///
    /// # Errors
    /// Returns an error if the core library lacks the updater base class or the generated
    /// type collides with an existing one.
    pub fn emit(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        let Some((class, field)) = Self::match_field(site) else {
            return Ok(Substitution::Declined);
        };

        let key = AccessorKey {
            class: class.clone(),
            field: field.name.clone(),
            signature: field.signature.clone(),
        };

        let constructor = match self.cache.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let constructor = Self::define_updater(config, site.context, &class, &field)?;
                entry.insert(constructor.clone());
                constructor
            }
        };

        site.emitter.emit_op(CilOpCode::Pop);
        site.emitter.emit_op(CilOpCode::Pop);
        site.emitter.emit_op(CilOpCode::Pop);
        site.emitter
            .emit(CilOpCode::Newobj, Operand::Constructor(constructor));
        Ok(Substitution::Handled)
    }

    /// Check the three constant arguments and find the field they name.
    fn match_field(site: &CallSite<'_>) -> Option<(Arc<JavaClass>, FieldInfo)> {
        if !site.is_straight_line(-2..=0)
            || [-3, -2, -1]
                .iter()
                .any(|offset| site.opcode_at(*offset) != Some(NormalizedOpCode::Ldc))
        {
            return None;
        }

        let target_class = site.class_file.class_constant(site.instruction(-3)?.arg1)?;
        let value_class = site.class_file.class_constant(site.instruction(-2)?.arg1)?;
        let field_name = site.class_file.string_constant(site.instruction(-1)?.arg1)?;

        let compiling = &site.caller.declaring;
        if !target_class.same_class(compiling)
            || value_class.is_unloadable()
            || value_class.is_primitive()
            || value_class.is_non_primitive_value_type()
        {
            return None;
        }

        let (field, declaring) = compiling.find_field(field_name, &value_class.sig_name())?;
        if field.flags.contains(FieldFlags::STATIC)
            || !field.flags.contains(FieldFlags::VOLATILE)
            || !declaring.same_class(compiling)
            || !field.field_type.same_class(value_class)
        {
            return None;
        }

        Some((compiling.clone(), field.clone()))
    }

    fn define_updater(
        config: &IntrinsicConfig,
        context: &FinishContext,
        class: &Arc<JavaClass>,
        field: &FieldInfo,
    ) -> Result<ConstructorRef> {
        let base_constructor = config
            .core
            .method(ATOMIC_REFERENCE_FIELD_UPDATER, "<init>", "()V")?;

        let mut updater = GeneratedType::new(
            &format!("__ARFU_{}{}", field.name, field.signature.replace('.', "/")),
            TypeRef::Class(Arc::from(ATOMIC_REFERENCE_FIELD_UPDATER)),
            TypeAttributes::NESTED_PRIVATE | TypeAttributes::SEALED,
        )
        .nested_in(&class.name);
        let full_name = updater.full_name();

        let owner = TypeRef::Class(class.name.clone());
        let value = TypeRef::Class(field.field_type.name.clone());
        let target = FieldRef::Java {
            class: class.name.clone(),
            name: field.name.clone(),
            signature: field.signature.clone(),
        };

        let compare_and_set = vec![
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(1)),
            EmittedOp::with(CilOpCode::Castclass, Operand::Type(owner.clone())),
            EmittedOp::with(CilOpCode::Ldflda, Operand::Field(target.clone())),
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(3)),
            EmittedOp::with(CilOpCode::Castclass, Operand::Type(value.clone())),
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(2)),
            EmittedOp::with(CilOpCode::Castclass, Operand::Type(value.clone())),
            EmittedOp::with(
                CilOpCode::Call,
                Operand::RuntimeGeneric(RuntimeMethod::InterlockedCompareExchange, value.clone()),
            ),
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(2)),
            EmittedOp::op(CilOpCode::Ceq),
            EmittedOp::op(CilOpCode::Ret),
        ];

        let store = |volatile: bool| {
            let mut body = vec![
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(1)),
                EmittedOp::with(CilOpCode::Castclass, Operand::Type(owner.clone())),
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(2)),
                EmittedOp::with(CilOpCode::Castclass, Operand::Type(value.clone())),
            ];
            if volatile {
                body.push(EmittedOp::op(CilOpCode::Volatile));
            }
            body.push(EmittedOp::with(CilOpCode::Stfld, Operand::Field(target.clone())));
            body.push(EmittedOp::op(CilOpCode::Ret));
            body
        };

        let get = vec![
            EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(1)),
            EmittedOp::with(CilOpCode::Castclass, Operand::Type(owner.clone())),
            EmittedOp::op(CilOpCode::Volatile),
            EmittedOp::with(CilOpCode::Ldfld, Operand::Field(target.clone())),
            EmittedOp::op(CilOpCode::Ret),
        ];

        let object = TypeRef::Runtime(RuntimeType::Object);
        let method = |name: &str, return_type: RuntimeType, arity: usize, body: Vec<EmittedOp>| {
            GeneratedMethod {
                name: Arc::from(name),
                access: MethodAccess::Public,
                attributes: MethodAttributes::VIRTUAL | MethodAttributes::HIDE_BY_SIG,
                return_type: TypeRef::Runtime(return_type),
                parameters: vec![object.clone(); arity],
                body,
            }
        };

        updater.methods = vec![
            method("compareAndSet", RuntimeType::Boolean, 3, compare_and_set.clone()),
            method("weakCompareAndSet", RuntimeType::Boolean, 3, compare_and_set),
            method("get", RuntimeType::Object, 1, get),
            method("set", RuntimeType::Void, 2, store(true)),
            method("lazySet", RuntimeType::Void, 2, store(false)),
        ];

        let constructor = ConstructorRef::new(GeneratedConstructor {
            type_name: full_name.clone(),
            body: vec![
                EmittedOp::with(CilOpCode::Ldarg, Operand::Argument(0)),
                EmittedOp::with(CilOpCode::Call, Operand::Method(base_constructor)),
                EmittedOp::op(CilOpCode::Ret),
            ],
        });
        updater.constructor = Some(constructor.clone());

        context.module().define_type(updater)?;
        context.register_post_finish(PendingFinish {
            type_name: full_name,
            base: Arc::from(ATOMIC_REFERENCE_FIELD_UPDATER),
        });

        Ok(constructor)
    }
}

impl IntrinsicRule for AtomicFieldUpdaterEmitter {
    fn name(&self) -> &'static str {
        "AtomicReferenceFieldUpdater.newUpdater"
    }

    fn apply(&self, config: &IntrinsicConfig, site: &mut CallSite<'_>) -> Result<Substitution> {
        self.emit(config, site)
    }
}
