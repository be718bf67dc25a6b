//! Declarative description of the entity kinds found in a budget workbook.
//!
//! [`builtin`] is the catalogue the importer uses by default. Column names are
//! exported from [`columns`] so the converters read exactly what the schema
//! requires.
use crate::schema::{EntityKind, SheetScope};

/// A table an entity kind is stored in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDeclaration {
    /// Table name, possibly containing the month placeholder.
    pub name_template: String,
    pub scope: SheetScope,
    /// Set when the kind is nested under another kind in this table.
    pub parent: Option<EntityKind>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyDeclaration {
    /// A property read from a column. `value_type` is one of `string`,
    /// `decimal`, `datetime` or `boolean`.
    Column {
        name: String,
        value_type: String,
        blank_allowed: bool,
    },
    /// A property holding nested child records of another kind.
    Child { kind: EntityKind, one_to_one: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMetadata {
    pub kind: EntityKind,
    pub tables: Vec<TableDeclaration>,
    pub properties: Vec<PropertyDeclaration>,
}

pub mod columns {
    pub mod account {
        pub const NAME: &str = "Name";
        pub const TYPE: &str = "Type";
    }

    pub mod employer {
        pub const NAME: &str = "Name";
    }

    pub mod budget {
        pub const NAME: &str = "Name";
        pub const TYPE: &str = "Type";
        pub const AMOUNT: &str = "Amount";
        pub const ROLLOVER_AMOUNT: &str = "Rollover From Last Month";
        pub const OVERRIDE_ROLLOVER: &str = "Override Rollover Amount";
    }

    pub mod account_mapping {
        pub const ACCOUNT_NAME: &str = "Account Name";
        pub const STARTING_BALANCE: &str = "Starting Balance";
        pub const BUDGET_NAME: &str = "Budget Name";
        pub const BUDGET_TYPE: &str = "Budget Type";
        pub const IS_DEFAULT: &str = "Is Default";
    }

    pub mod transaction {
        pub const DATE: &str = "Date";
        pub const LOCATION: &str = "Location";
        pub const TYPE: &str = "Type";
        pub const AMOUNT: &str = "Amount";
        pub const CREDIT_CARD_ACCOUNT: &str = "Credit Card Account";
        pub const PAYOFF_DATE: &str = "Payoff Date";
    }

    pub mod transaction_application {
        pub const TYPE: &str = "Type";
        pub const DESCRIPTION: &str = "Description";
        pub const AMOUNT: &str = "Amount";
        pub const BUDGET: &str = "Budget";
        pub const OVERRIDE_ACCOUNT_MAPPING: &str = "Override Account Mapping";
    }

    pub mod income {
        pub const EMPLOYER: &str = "Employer";
        pub const DATE: &str = "Date";
        pub const AMOUNT: &str = "Amount";
        pub const DESCRIPTION: &str = "Description";
        pub const ACCOUNT: &str = "Account";
    }

    pub mod employer_income_rate {
        pub const EMPLOYER: &str = "Employer";
    }

    pub mod income_information {
        pub const SALARY_INCOME: &str = "Salary Income";
        pub const ADDITIONAL_TAXABLE_INCOME: &str = "Additional Taxable Income";
        pub const RETIREMENT_CONTRIBUTION: &str = "Retirement Contribution Amount";
        pub const PENSION_CONTRIBUTION: &str = "Pension Contribution Amount";
        pub const PRE_TAX_DEDUCTIONS: &str = "Pre-Tax Deductions";
        pub const TAX_WITHHOLDING: &str = "Tax Withholding Amount";
        pub const POST_TAX_DEDUCTIONS: &str = "Post-Tax Deductions";
    }

    pub mod account_balance {
        pub const ACCOUNT_NAME: &str = "Account Name";
        pub const DATE: &str = "Date";
        pub const AMOUNT: &str = "Amount";
    }
}

pub mod tables {
    pub const ACCOUNTS: &str = "Accounts";
    pub const EMPLOYERS: &str = "Employers";
    pub const BUDGETS: &str = "Budgets.{Month}";
    pub const ACCOUNT_MAPPINGS: &str = "AccountMappings.{Month}";
    pub const TRANSACTIONS: &str = "Transactions.{Month}";
    pub const INCOMES: &str = "Incomes.{Month}";
    pub const EMPLOYER_INCOME_RATES: &str = "EmployerIncomeRates.{Month}";
    pub const ACCOUNT_BALANCES: &str = "AccountBalances.{Month}";
}

fn table(name_template: &str, scope: SheetScope, parent: Option<EntityKind>) -> TableDeclaration {
    TableDeclaration {
        name_template: name_template.to_string(),
        scope,
        parent,
    }
}

fn required(name: &str, value_type: &str) -> PropertyDeclaration {
    PropertyDeclaration::Column {
        name: name.to_string(),
        value_type: value_type.to_string(),
        blank_allowed: false,
    }
}

fn optional(name: &str, value_type: &str) -> PropertyDeclaration {
    PropertyDeclaration::Column {
        name: name.to_string(),
        value_type: value_type.to_string(),
        blank_allowed: true,
    }
}

fn child(kind: EntityKind, one_to_one: bool) -> PropertyDeclaration {
    PropertyDeclaration::Child { kind, one_to_one }
}

/// The built-in entity catalogue.
pub fn builtin() -> Vec<EntityMetadata> {
    use EntityKind::*;
    use SheetScope::{Monthly, Setup};

    vec![
        EntityMetadata {
            kind: Account,
            tables: vec![table(tables::ACCOUNTS, Setup, None)],
            properties: vec![
                required(columns::account::NAME, "string"),
                required(columns::account::TYPE, "string"),
            ],
        },
        EntityMetadata {
            kind: Employer,
            tables: vec![table(tables::EMPLOYERS, Setup, None)],
            properties: vec![required(columns::employer::NAME, "string")],
        },
        EntityMetadata {
            kind: Budget,
            tables: vec![table(tables::BUDGETS, Monthly, None)],
            properties: vec![
                required(columns::budget::NAME, "string"),
                required(columns::budget::TYPE, "string"),
                required(columns::budget::AMOUNT, "decimal"),
                optional(columns::budget::ROLLOVER_AMOUNT, "decimal"),
                optional(columns::budget::OVERRIDE_ROLLOVER, "boolean"),
            ],
        },
        EntityMetadata {
            kind: AccountMapping,
            tables: vec![table(tables::ACCOUNT_MAPPINGS, Monthly, None)],
            properties: vec![
                required(columns::account_mapping::ACCOUNT_NAME, "string"),
                required(columns::account_mapping::STARTING_BALANCE, "decimal"),
                optional(columns::account_mapping::BUDGET_NAME, "string"),
                optional(columns::account_mapping::BUDGET_TYPE, "string"),
                required(columns::account_mapping::IS_DEFAULT, "boolean"),
            ],
        },
        EntityMetadata {
            kind: Transaction,
            tables: vec![table(tables::TRANSACTIONS, Monthly, None)],
            properties: vec![
                optional(columns::transaction::DATE, "datetime"),
                optional(columns::transaction::LOCATION, "string"),
                required(columns::transaction::TYPE, "string"),
                required(columns::transaction::AMOUNT, "decimal"),
                optional(columns::transaction::CREDIT_CARD_ACCOUNT, "string"),
                optional(columns::transaction::PAYOFF_DATE, "datetime"),
                child(TransactionApplication, false),
            ],
        },
        EntityMetadata {
            kind: TransactionApplication,
            tables: vec![table(tables::TRANSACTIONS, Monthly, Some(Transaction))],
            properties: vec![
                required(columns::transaction_application::TYPE, "string"),
                optional(columns::transaction_application::DESCRIPTION, "string"),
                required(columns::transaction_application::AMOUNT, "decimal"),
                optional(columns::transaction_application::BUDGET, "string"),
                optional(columns::transaction_application::OVERRIDE_ACCOUNT_MAPPING, "string"),
            ],
        },
        EntityMetadata {
            kind: Income,
            tables: vec![table(tables::INCOMES, Monthly, None)],
            properties: vec![
                required(columns::income::EMPLOYER, "string"),
                required(columns::income::DATE, "datetime"),
                required(columns::income::AMOUNT, "decimal"),
                required(columns::income::DESCRIPTION, "string"),
                optional(columns::income::ACCOUNT, "string"),
                child(IncomeInformation, true),
            ],
        },
        EntityMetadata {
            kind: EmployerIncomeRate,
            tables: vec![table(tables::EMPLOYER_INCOME_RATES, Monthly, None)],
            properties: vec![
                required(columns::employer_income_rate::EMPLOYER, "string"),
                child(IncomeInformation, true),
            ],
        },
        EntityMetadata {
            kind: IncomeInformation,
            tables: vec![
                table(tables::INCOMES, Monthly, Some(Income)),
                table(tables::EMPLOYER_INCOME_RATES, Monthly, Some(EmployerIncomeRate)),
            ],
            properties: vec![
                required(columns::income_information::SALARY_INCOME, "decimal"),
                required(columns::income_information::ADDITIONAL_TAXABLE_INCOME, "decimal"),
                required(columns::income_information::RETIREMENT_CONTRIBUTION, "decimal"),
                required(columns::income_information::PENSION_CONTRIBUTION, "decimal"),
                required(columns::income_information::PRE_TAX_DEDUCTIONS, "decimal"),
                required(columns::income_information::TAX_WITHHOLDING, "decimal"),
                required(columns::income_information::POST_TAX_DEDUCTIONS, "decimal"),
            ],
        },
        EntityMetadata {
            kind: AccountBalance,
            tables: vec![table(tables::ACCOUNT_BALANCES, Monthly, None)],
            properties: vec![
                required(columns::account_balance::ACCOUNT_NAME, "string"),
                required(columns::account_balance::DATE, "datetime"),
                required(columns::account_balance::AMOUNT, "decimal"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaRegistry, ValueType};

    #[test]
    fn builtin_catalogue_builds() {
        let registry = SchemaRegistry::build(&builtin()).unwrap();
        assert_eq!(registry.tables_in_scope(SheetScope::Setup).count(), 2);
        assert_eq!(registry.tables_in_scope(SheetScope::Monthly).count(), 6);
    }

    #[test]
    fn transactions_table_merges_parent_and_child_columns() {
        let registry = SchemaRegistry::build(&builtin()).unwrap();
        let table = registry.table_for(EntityKind::Transaction, None).unwrap();
        assert_eq!(table.columns().count(), 9);
        // "Type" and "Amount" come from both kinds and stay required.
        assert!(!table.column("Type").unwrap().blank_allowed);
        assert!(table.column("Date").unwrap().blank_allowed);
        assert_eq!(table.column("Payoff Date").unwrap().value_type, ValueType::DateTime);
    }

    #[test]
    fn children_are_registered() {
        let registry = SchemaRegistry::build(&builtin()).unwrap();
        assert_eq!(
            registry.children_of(EntityKind::Transaction),
            &[(EntityKind::TransactionApplication, false)]
        );
        assert!(registry.children_of(EntityKind::Account).is_empty());
    }
}
