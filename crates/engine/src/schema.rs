//! Required workbook layout derived from the entity metadata.
//!
//! Every entity kind declares the tables it lives in and the columns it
//! contributes to them. [`SchemaRegistry::build`] folds those declarations into
//! one [`TableSchema`] per physical table: declarations naming the same
//! `(template, scope)` are merged by column name, and a column is blank-allowed
//! as soon as one contributor allows it.
use std::{
    collections::{BTreeMap, btree_map::Entry},
    fmt,
};

use serde::Serialize;

use crate::{
    ImportError, ResultImport,
    metadata::{EntityMetadata, PropertyDeclaration},
    sheet::MONTH_PLACEHOLDER,
    workbook::CellKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntityKind {
    Account,
    Employer,
    Budget,
    AccountMapping,
    Transaction,
    TransactionApplication,
    Income,
    EmployerIncomeRate,
    IncomeInformation,
    AccountBalance,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "Account",
            Self::Employer => "Employer",
            Self::Budget => "Budget",
            Self::AccountMapping => "Account Mapping",
            Self::Transaction => "Transaction",
            Self::TransactionApplication => "Transaction Application",
            Self::Income => "Income",
            Self::EmployerIncomeRate => "Employer Income Rate",
            Self::IncomeInformation => "Income Information",
            Self::AccountBalance => "Account Balance",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sheets a table is expected on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SheetScope {
    Setup,
    Monthly,
}

/// Logical type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValueType {
    String,
    Decimal,
    DateTime,
    Boolean,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Decimal => "decimal",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
        }
    }

    /// Physical cell kind every non-blank cell of the column must have.
    ///
    /// Dates are stored as serial numbers, so they share the numeric kind with
    /// decimals.
    pub fn cell_kind(self) -> CellKind {
        match self {
            Self::String => CellKind::Text,
            Self::Decimal | Self::DateTime => CellKind::Numeric,
            Self::Boolean => CellKind::Boolean,
        }
    }
}

impl TryFrom<&str> for ValueType {
    type Error = ImportError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "decimal" => Ok(Self::Decimal),
            "datetime" => Ok(Self::DateTime),
            "boolean" => Ok(Self::Boolean),
            other => Err(ImportError::SchemaDefinition(format!(
                "value type \"{other}\" has no cell kind mapping"
            ))),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub value_type: ValueType,
    pub blank_allowed: bool,
}

/// A required table. Columns are kept sorted by name so the merge result
/// does not depend on declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name_template: String,
    pub scope: SheetScope,
    columns: BTreeMap<String, ColumnSchema>,
}

impl TableSchema {
    fn new(name_template: &str, scope: SheetScope) -> Self {
        Self {
            name_template: name_template.to_string(),
            scope,
            columns: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.values()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.get(name)
    }

    fn merge_column(&mut self, column: ColumnSchema) -> ResultImport<()> {
        match self.columns.entry(column.name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(column);
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.value_type != column.value_type {
                    return Err(ImportError::SchemaDefinition(format!(
                        "column \"{}\" of table \"{}\" is declared both as {} and {}",
                        column.name, self.name_template, existing.value_type, column.value_type
                    )));
                }
                existing.blank_allowed |= column.blank_allowed;
            }
        }
        Ok(())
    }
}

/// Key of a schema binding: the entity kind and, when the kind is hosted by
/// more than one parent table, the parent kind.
pub type SchemaKey = (EntityKind, Option<EntityKind>);

type TableKey = (String, SheetScope);

/// The merged set of required tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaRegistry {
    tables: BTreeMap<TableKey, TableSchema>,
    bindings: BTreeMap<SchemaKey, TableKey>,
    children: BTreeMap<EntityKind, Vec<(EntityKind, bool)>>,
}

impl SchemaRegistry {
    /// Builds the registry from a metadata source.
    ///
    /// Fails on the first declaration that cannot be mapped to a cell kind,
    /// on conflicting column types, on a month placeholder in a setup table,
    /// and on child declarations without a hosting table.
    pub fn build(metadata: &[EntityMetadata]) -> ResultImport<Self> {
        let mut tables = BTreeMap::new();
        let mut bindings = BTreeMap::new();
        let mut children: BTreeMap<EntityKind, Vec<(EntityKind, bool)>> = BTreeMap::new();

        for entity in metadata {
            let mut columns = Vec::new();
            for property in &entity.properties {
                match property {
                    PropertyDeclaration::Column {
                        name,
                        value_type,
                        blank_allowed,
                    } => columns.push(ColumnSchema {
                        name: name.clone(),
                        value_type: ValueType::try_from(value_type.as_str())?,
                        blank_allowed: *blank_allowed,
                    }),
                    PropertyDeclaration::Child { kind, one_to_one } => {
                        children
                            .entry(entity.kind)
                            .or_default()
                            .push((*kind, *one_to_one));
                    }
                }
            }

            for declaration in &entity.tables {
                if declaration.scope == SheetScope::Setup
                    && declaration.name_template.contains(MONTH_PLACEHOLDER)
                {
                    return Err(ImportError::SchemaDefinition(format!(
                        "setup table \"{}\" cannot contain a month placeholder",
                        declaration.name_template
                    )));
                }

                let table_key = (declaration.name_template.clone(), declaration.scope);
                let table = tables
                    .entry(table_key.clone())
                    .or_insert_with(|| TableSchema::new(&declaration.name_template, declaration.scope));
                for column in &columns {
                    table.merge_column(column.clone())?;
                }

                let binding = (entity.kind, declaration.parent);
                match bindings.entry(binding) {
                    Entry::Vacant(entry) => {
                        entry.insert(table_key);
                    }
                    Entry::Occupied(entry) if *entry.get() != table_key => {
                        return Err(ImportError::SchemaDefinition(format!(
                            "{} is declared in both \"{}\" and \"{}\"",
                            entity.kind, entry.get().0, table_key.0
                        )));
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }

        for (parent, kids) in &children {
            for (child, _) in kids {
                if !bindings.contains_key(&(*child, Some(*parent))) {
                    return Err(ImportError::SchemaDefinition(format!(
                        "{child} is declared as a child of {parent} but has no table under it"
                    )));
                }
            }
        }

        for table in tables.values() {
            tracing::debug!(
                "required table \"{}\" ({:?}) with {} column(s)",
                table.name_template,
                table.scope,
                table.columns.len()
            );
        }

        Ok(Self {
            tables,
            bindings,
            children,
        })
    }

    /// Every required table, each physical table listed once.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    pub fn tables_in_scope(&self, scope: SheetScope) -> impl Iterator<Item = &TableSchema> {
        self.tables.values().filter(move |table| table.scope == scope)
    }

    /// Table hosting `kind`, disambiguated by the parent kind when the same
    /// kind lives in several tables.
    pub fn table_for(&self, kind: EntityKind, parent: Option<EntityKind>) -> Option<&TableSchema> {
        self.bindings
            .get(&(kind, parent))
            .and_then(|key| self.tables.get(key))
    }

    /// Bindings as a map from `(kind, parent)` to the merged table.
    pub fn entries(&self) -> BTreeMap<SchemaKey, &TableSchema> {
        self.bindings
            .iter()
            .filter_map(|(binding, key)| self.tables.get(key).map(|table| (*binding, table)))
            .collect()
    }

    /// Child kinds declared on `kind`, with their one-to-one flag.
    pub fn children_of(&self, kind: EntityKind) -> &[(EntityKind, bool)] {
        self.children.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
