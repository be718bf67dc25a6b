//! Import engine for budget workbooks.
//!
//! A workbook holds one `Setup` sheet (accounts and employers) and any number
//! of monthly sheets named `YYYY-MM`. The engine checks the workbook layout
//! against the [`SchemaRegistry`] derived from the entity metadata, then
//! converts every table row into the creation records of the `records` crate.
use std::path::Path;

pub use convert::{Conversion, convert};
pub use error::{
    CellLocation, DuplicateNameError, ImportError, ImportIssue, ReferenceResolutionError,
    RowRangeError, StructuralError, ValueError,
};
pub use metadata::{EntityMetadata, PropertyDeclaration, TableDeclaration, builtin};
pub use range::{RowRange, child_range};
pub use registry::{IdSequence, NameRegistry};
pub use schema::{ColumnSchema, EntityKind, SchemaRegistry, SheetScope, TableSchema, ValueType};
pub use sheet::{SheetClass, YearMonth, classify, expand};
pub use validate::validate;
pub use workbook::{Cell, CellKind, DateSystem, Table, Workbook, Worksheet};

mod convert;
mod error;
pub mod metadata;
mod range;
mod registry;
mod schema;
mod sheet;
mod validate;
pub mod workbook;

type ResultImport<T> = Result<T, ImportError>;

/// Validates and converts workbooks against one schema.
#[derive(Debug)]
pub struct Importer {
    schema: SchemaRegistry,
    parallel: bool,
    pool: Option<rayon::ThreadPool>,
}

impl Importer {
    /// Return a builder for `Importer`. Help to build the struct.
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::default()
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    fn run<T: Send>(&self, job: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }

    /// Returns every structural violation of `workbook`.
    pub fn validate(&self, workbook: &Workbook) -> Vec<StructuralError> {
        self.run(|| validate::validate(workbook, &self.schema, self.parallel))
    }

    /// Converts `workbook` without validating it first. Ids start over for
    /// every call.
    pub fn convert(&self, workbook: &Workbook) -> Conversion {
        let ids = IdSequence::new();
        self.run(|| convert::convert(workbook, &self.schema, &ids, self.parallel))
    }

    /// Validates `workbook` and converts it when it has no structural error.
    pub fn import(&self, workbook: &Workbook) -> ResultImport<Conversion> {
        let errors = self.validate(workbook);
        if !errors.is_empty() {
            tracing::warn!("workbook failed validation with {} error(s)", errors.len());
            return Err(ImportError::Structural(errors));
        }
        let conversion = self.convert(workbook);
        tracing::info!(
            "imported {} month(s) with {} issue(s)",
            conversion.months.len(),
            conversion.issues.len()
        );
        Ok(conversion)
    }

    /// Reads the workbook at `path` and imports it.
    pub fn import_file(&self, path: impl AsRef<Path>) -> ResultImport<Conversion> {
        let workbook = Workbook::open(path)?;
        self.import(&workbook)
    }
}

#[derive(Debug)]
pub struct ImporterBuilder {
    metadata: Vec<EntityMetadata>,
    parallel: bool,
    threads: Option<usize>,
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self {
            metadata: builtin(),
            parallel: true,
            threads: None,
        }
    }
}

impl ImporterBuilder {
    /// Replace the built-in entity metadata.
    pub fn metadata(mut self, metadata: Vec<EntityMetadata>) -> ImporterBuilder {
        self.metadata = metadata;
        self
    }

    /// Check and convert sheets in parallel. Enabled by default.
    pub fn parallel(mut self, parallel: bool) -> ImporterBuilder {
        self.parallel = parallel;
        self
    }

    /// Run parallel work on a dedicated pool of `threads` threads instead of
    /// the global rayon pool.
    pub fn threads(mut self, threads: usize) -> ImporterBuilder {
        self.threads = Some(threads);
        self
    }

    /// Construct `Importer`
    pub fn build(self) -> ResultImport<Importer> {
        let schema = SchemaRegistry::build(&self.metadata)?;
        let pool = match self.threads {
            Some(threads) if self.parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|error| ImportError::ThreadPool(error.to_string()))?,
            ),
            _ => None,
        };
        tracing::debug!("schema has {} table(s)", schema.tables().count());
        Ok(Importer {
            schema,
            parallel: self.parallel,
            pool,
        })
    }
}
