//! The immutable metadata store of one module.
//!
//! [`MetadataModule`] wraps the heaps and table slices handed over by the module loader.
//! It decodes nothing up front: rows are read on demand, method-level results are cached
//! in per-row once-cells, and the `ImplMap` forwarding table is indexed once on first use.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use jcil::metadata::{module::MetadataModule, tables::{TableId, TableInfo}};
//!
//! let info = Arc::new(TableInfo::from_row_counts(&[(TableId::MethodDef, 1)], false, false, false));
//! let module = MetadataModule::new(info, strings, blob)?
//!     .with_table(TableId::MethodDef, method_rows)?;
//!
//! let method = module.method(1)?;
//! println!("{}", method.name()?);
//! # Ok::<(), jcil::Error>(())
//! ```

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};

use crossbeam_skiplist::SkipMap;
use rayon::iter::ParallelIterator;

use crate::{
    metadata::{
        method::{MethodCache, MethodDef},
        streams::{Blob, Strings},
        tables::{
            CodedIndexType, ConstantRaw, ConstantValue, CustomAttributeRaw, GenericParamRaw,
            ImplMapRaw, MetadataTable, MethodDefRaw, ModuleRefRaw, ParamRaw, TableId,
            TableInfoRef,
        },
        token::Token,
    },
    Result,
};

/// Counters of the decoding work a module has performed.
///
/// Every counter is bumped once per actual computation, never on a cache hit.
#[derive(Debug, Default)]
pub struct ResolverStats {
    signature_parses: AtomicUsize,
    param_scans: AtomicUsize,
    generic_param_searches: AtomicUsize,
    impl_map_index_builds: AtomicUsize,
    constant_lookups: AtomicUsize,
}

/// A point-in-time copy of [`ResolverStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStatsSnapshot {
    /// Method signature blobs decoded
    pub signature_parses: usize,
    /// `Param` ranges scanned
    pub param_scans: usize,
    /// `GenericParam` owner searches
    pub generic_param_searches: usize,
    /// `ImplMap` index builds
    pub impl_map_index_builds: usize,
    /// `Constant` owner searches
    pub constant_lookups: usize,
}

impl ResolverStats {
    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            signature_parses: self.signature_parses.load(Ordering::Relaxed),
            param_scans: self.param_scans.load(Ordering::Relaxed),
            generic_param_searches: self.generic_param_searches.load(Ordering::Relaxed),
            impl_map_index_builds: self.impl_map_index_builds.load(Ordering::Relaxed),
            constant_lookups: self.constant_lookups.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_signature_parse(&self) {
        self.signature_parses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_param_scan(&self) {
        self.param_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generic_param_search(&self) {
        self.generic_param_searches.fetch_add(1, Ordering::Relaxed);
    }

    fn record_impl_map_index_build(&self) {
        self.impl_map_index_builds.fetch_add(1, Ordering::Relaxed);
    }

    fn record_constant_lookup(&self) {
        self.constant_lookups.fetch_add(1, Ordering::Relaxed);
    }
}

/// Heaps and tables of one module, with lazily filled caches.
///
/// The module is `Sync`; any number of threads may resolve methods concurrently.
pub struct MetadataModule<'a> {
    info: TableInfoRef,
    strings: Strings<'a>,
    blob: Blob<'a>,
    method_def: Option<MetadataTable<'a, MethodDefRaw>>,
    param: Option<MetadataTable<'a, ParamRaw>>,
    generic_param: Option<MetadataTable<'a, GenericParamRaw>>,
    impl_map: Option<MetadataTable<'a, ImplMapRaw>>,
    module_ref: Option<MetadataTable<'a, ModuleRefRaw>>,
    constant: Option<MetadataTable<'a, ConstantRaw>>,
    custom_attribute: Option<MetadataTable<'a, CustomAttributeRaw>>,
    methods: SkipMap<u32, Arc<MethodCache>>,
    impl_map_index: OnceLock<SkipMap<Token, u32>>,
    stats: ResolverStats,
}

impl<'a> MetadataModule<'a> {
    /// Create a module from its sizing information and heaps.
    ///
    /// ## Arguments
    /// * `info` - Row counts and index widths from the `#~` stream header
    /// * `strings` - The `#Strings` heap
    /// * `blob` - The `#Blob` heap
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a heap does not start with its empty entry.
    pub fn new(info: TableInfoRef, strings: &'a [u8], blob: &'a [u8]) -> Result<Self> {
        Ok(MetadataModule {
            info,
            strings: Strings::from(strings)?,
            blob: Blob::from(blob)?,
            method_def: None,
            param: None,
            generic_param: None,
            impl_map: None,
            module_ref: None,
            constant: None,
            custom_attribute: None,
            methods: SkipMap::new(),
            impl_map_index: OnceLock::new(),
            stats: ResolverStats::default(),
        })
    }

    /// Attach the rows of table `id`, sized by the module's [`crate::metadata::tables::TableInfo`].
    ///
    /// Tables the resolver does not read are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the declared rows.
    pub fn with_table(mut self, id: TableId, data: &'a [u8]) -> Result<Self> {
        let rows = self.info.get(id).rows;
        let info = self.info.clone();

        match id {
            TableId::MethodDef => self.method_def = Some(MetadataTable::new(data, rows, info)?),
            TableId::Param => self.param = Some(MetadataTable::new(data, rows, info)?),
            TableId::GenericParam => {
                self.generic_param = Some(MetadataTable::new(data, rows, info)?);
            }
            TableId::ImplMap => self.impl_map = Some(MetadataTable::new(data, rows, info)?),
            TableId::ModuleRef => self.module_ref = Some(MetadataTable::new(data, rows, info)?),
            TableId::Constant => self.constant = Some(MetadataTable::new(data, rows, info)?),
            TableId::CustomAttribute => {
                self.custom_attribute = Some(MetadataTable::new(data, rows, info)?);
            }
            other => log::debug!("Ignoring table {other:?}, not used by the resolver"),
        }

        Ok(self)
    }

    /// Sizing information.
    #[must_use]
    pub fn info(&self) -> &TableInfoRef {
        &self.info
    }

    /// The `#Strings` heap.
    #[must_use]
    pub fn strings(&self) -> &Strings<'a> {
        &self.strings
    }

    /// The `#Blob` heap.
    #[must_use]
    pub fn blob(&self) -> &Blob<'a> {
        &self.blob
    }

    /// The `MethodDef` table, if attached.
    #[must_use]
    pub fn method_defs(&self) -> Option<&MetadataTable<'a, MethodDefRaw>> {
        self.method_def.as_ref()
    }

    /// The `Param` table, if attached.
    #[must_use]
    pub fn params(&self) -> Option<&MetadataTable<'a, ParamRaw>> {
        self.param.as_ref()
    }

    /// The `GenericParam` table, if attached.
    #[must_use]
    pub fn generic_params(&self) -> Option<&MetadataTable<'a, GenericParamRaw>> {
        self.generic_param.as_ref()
    }

    /// The `ImplMap` table, if attached.
    #[must_use]
    pub fn impl_maps(&self) -> Option<&MetadataTable<'a, ImplMapRaw>> {
        self.impl_map.as_ref()
    }

    /// The `ModuleRef` table, if attached.
    #[must_use]
    pub fn module_refs(&self) -> Option<&MetadataTable<'a, ModuleRefRaw>> {
        self.module_ref.as_ref()
    }

    /// The `Constant` table, if attached.
    #[must_use]
    pub fn constants(&self) -> Option<&MetadataTable<'a, ConstantRaw>> {
        self.constant.as_ref()
    }

    /// The `CustomAttribute` table, if attached.
    #[must_use]
    pub fn custom_attributes(&self) -> Option<&MetadataTable<'a, CustomAttributeRaw>> {
        self.custom_attribute.as_ref()
    }

    /// Decoding counters.
    #[must_use]
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// Number of `MethodDef` rows.
    #[must_use]
    pub fn method_count(&self) -> u32 {
        self.method_def.as_ref().map_or(0, MetadataTable::row_count)
    }

    /// Get a handle on `MethodDef` row `rid`.
    ///
    /// Handles on the same row share their lazily computed state.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the row does not exist or cannot be read.
    pub fn method(&self, rid: u32) -> Result<MethodDef<'_>> {
        let Some(row) = self.method_def.as_ref().and_then(|table| table.get(rid)) else {
            return Err(malformed_error!("MethodDef row {} does not exist", rid));
        };

        let cache = self
            .methods
            .get_or_insert_with(rid, || Arc::new(MethodCache::default()))
            .value()
            .clone();

        Ok(MethodDef::new(self, row, cache))
    }

    /// Handles on every method, in row order.
    pub fn methods(&self) -> impl Iterator<Item = Result<MethodDef<'_>>> + '_ {
        (1..=self.method_count()).map(move |rid| self.method(rid))
    }

    /// `MethodDef` token to `ImplMap` row, built in parallel on first use.
    pub(crate) fn impl_map_index(&self) -> &SkipMap<Token, u32> {
        self.impl_map_index.get_or_init(|| {
            self.stats.record_impl_map_index_build();

            let index = SkipMap::new();
            if let Some(table) = &self.impl_map {
                table.par_iter().for_each(|row| {
                    if row.member_forwarded.tag == TableId::MethodDef {
                        index.insert(row.member_forwarded.token, row.rid);
                    }
                });
            }
            index
        })
    }

    /// Look up and decode the `Constant` owned by row `rid` of `parent`.
    ///
    /// # Errors
    /// Returns an error if the `Constant` row or its blob is malformed.
    pub(crate) fn constant_value(&self, parent: TableId, rid: u32) -> Result<Option<ConstantValue>> {
        let Some(table) = &self.constant else {
            return Ok(None);
        };
        self.stats.record_constant_lookup();

        let Some(key) = CodedIndexType::HasConstant.encode(parent, rid) else {
            return Err(malformed_error!("{:?} cannot own a Constant", parent));
        };

        match table.equal_range(|row| row.parent_key(), key)?.first() {
            Some(row) => Ok(Some(row.decode(self.blob.get(row.value as usize)?)?)),
            None => {
                log::warn!("{:?} row {} has HasDefault but no Constant row", parent, rid);
                Ok(None)
            }
        }
    }
}
