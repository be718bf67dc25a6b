//! Creation records produced by the budget workbook import.
//!
//! Every record carries a surrogate [`RecordId`] taken from a decreasing
//! sequence, so a consumer can tell not-yet-persisted records apart from
//! stored ones (stored ids increase from 1). References between records are
//! already resolved to those ids.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use money::MoneyCents;

mod money;

/// Errors raised while interpreting a raw value as a record field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{value}\" is not a valid {kind}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Surrogate identifier of a record that has not been persisted yet.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Returns `true` for ids that come from the surrogate space.
    ///
    /// Persisted ids grow from 1 and never get close to the top of the range.
    #[must_use]
    pub const fn is_surrogate(self) -> bool {
        self.0 > i64::MAX / 2
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares a label enum that parses from workbook text.
///
/// Spaces are ignored and the comparison is case-insensitive, so
/// `"Credit Card"` and `"creditcard"` both resolve to `CreditCard`.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the canonical label.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = RecordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(&compact))
                    .ok_or_else(|| RecordError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(
    /// Kind of a money account.
    AccountType, "account type", { Regular, CreditCard, Retirement, Loan }
);
label_enum!(
    /// How a budget behaves across months.
    BudgetType, "budget type", { Fixed, Weekly, Rolling, Saving }
);
label_enum!(
    TransactionType, "transaction type", { Debit, Credit, Transfer }
);
label_enum!(
    /// Direction of a transaction line item.
    ApplicationType, "application type", { Debit, Credit }
);

pub mod account {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccountCreate {
        pub id: RecordId,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: AccountType,
    }

    /// Per-month binding of an account to its starting balance and default
    /// budget.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccountMappingCreate {
        pub id: RecordId,
        pub account_id: RecordId,
        pub starting_balance: MoneyCents,
        pub budget_id: Option<RecordId>,
        pub budget_type: Option<BudgetType>,
        pub is_default: bool,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AccountBalanceCreate {
        pub id: RecordId,
        pub account_id: RecordId,
        pub date: NaiveDate,
        pub amount: MoneyCents,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BudgetCreate {
        pub id: RecordId,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: BudgetType,
        pub amount: MoneyCents,
        pub rollover_amount: Option<MoneyCents>,
        pub is_rollover_amount_overridden: Option<bool>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionCreate {
        pub id: RecordId,
        pub date: NaiveDate,
        pub location: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub amount: MoneyCents,
        pub credit_card_account_id: Option<RecordId>,
        pub paid_off_date: Option<NaiveDate>,
        pub applications: Vec<TransactionApplicationCreate>,
    }

    /// One line item of a transaction, charged against a budget.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionApplicationCreate {
        pub id: RecordId,
        #[serde(rename = "type")]
        pub kind: ApplicationType,
        pub description: String,
        pub amount: MoneyCents,
        pub budget_id: Option<RecordId>,
        pub override_account_mapping_id: Option<RecordId>,
    }
}

pub mod income {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EmployerCreate {
        pub id: RecordId,
        pub name: String,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct IncomeCreate {
        pub id: RecordId,
        pub employer_id: RecordId,
        pub date: NaiveDate,
        pub amount: MoneyCents,
        pub description: String,
        pub override_account_id: Option<RecordId>,
        pub income_information: Option<IncomeInformationCreate>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EmployerIncomeRateCreate {
        pub id: RecordId,
        pub employer_id: RecordId,
        pub income_information: IncomeInformationCreate,
    }

    /// Gross-to-net breakdown attached to an income or to an income rate.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct IncomeInformationCreate {
        pub id: RecordId,
        pub salary_income: MoneyCents,
        pub additional_taxable_income: MoneyCents,
        pub retirement_contribution_amount: MoneyCents,
        pub pension_contribution_amount: MoneyCents,
        pub pre_tax_deductions: MoneyCents,
        pub tax_withholding_amount: MoneyCents,
        pub post_tax_deductions: MoneyCents,
    }

    impl IncomeInformationCreate {
        /// Returns `true` when every amount is zero.
        pub fn is_blank(&self) -> bool {
            [
                self.salary_income,
                self.additional_taxable_income,
                self.retirement_contribution_amount,
                self.pension_contribution_amount,
                self.pre_tax_deductions,
                self.tax_withholding_amount,
                self.post_tax_deductions,
            ]
            .iter()
            .all(|amount| amount.is_zero())
        }
    }
}

pub mod month {
    use super::*;
    use crate::{
        account::{AccountBalanceCreate, AccountMappingCreate},
        budget::BudgetCreate,
        income::{EmployerIncomeRateCreate, IncomeCreate},
        transaction::TransactionCreate,
    };

    /// Everything converted from one monthly sheet.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MonthCreate {
        pub id: RecordId,
        pub year: i32,
        pub month_number: u32,
        pub budgets: Vec<BudgetCreate>,
        pub account_mappings: Vec<AccountMappingCreate>,
        pub transactions: Vec<TransactionCreate>,
        pub incomes: Vec<IncomeCreate>,
        pub employer_income_rates: Vec<EmployerIncomeRateCreate>,
        pub account_balances: Vec<AccountBalanceCreate>,
    }
}
