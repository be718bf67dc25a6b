use records::{
    RecordId,
    account::AccountMappingCreate,
    budget::BudgetCreate,
};

use super::row::{Converted, RowConverter, RowReader};
use crate::{
    IdSequence, ImportIssue,
    metadata::columns::{account_mapping, budget},
    registry::NameRegistry,
    schema::EntityKind,
};

pub(crate) struct BudgetConverter;

impl RowConverter for BudgetConverter {
    type Record = BudgetCreate;

    const KIND: EntityKind = EntityKind::Budget;
    const KEY_COLUMN: &'static str = budget::NAME;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<BudgetCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = BudgetCreate {
            id: RecordId::default(),
            name: reader.text(budget::NAME),
            kind: reader.label(budget::TYPE),
            amount: reader.decimal(budget::AMOUNT),
            rollover_amount: reader.optional_decimal(budget::ROLLOVER_AMOUNT),
            is_rollover_amount_overridden: reader.optional_boolean(budget::OVERRIDE_ROLLOVER),
        };
        let record = reader.finish(record)?;
        let name = record.name.clone();
        Ok(Converted::single(record, row).named(&name))
    }

    fn assign_ids(&self, record: &mut BudgetCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}

/// Account mappings are referenced by the name of their account. An account
/// may have several mappings in a month; its default mapping is the one
/// referenced.
pub(crate) struct AccountMappingConverter<'a> {
    pub(crate) accounts: &'a NameRegistry,
    pub(crate) budgets: &'a NameRegistry,
}

impl RowConverter for AccountMappingConverter<'_> {
    type Record = AccountMappingCreate;

    const KIND: EntityKind = EntityKind::AccountMapping;
    const KEY_COLUMN: &'static str = account_mapping::ACCOUNT_NAME;
    const UNIQUE_NAMES: bool = false;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<AccountMappingCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let account_name = reader.text(account_mapping::ACCOUNT_NAME);
        let record = AccountMappingCreate {
            id: RecordId::default(),
            account_id: reader.resolve_name(account_mapping::ACCOUNT_NAME, &account_name, self.accounts),
            starting_balance: reader.decimal(account_mapping::STARTING_BALANCE),
            budget_id: reader.optional_reference(account_mapping::BUDGET_NAME, self.budgets),
            budget_type: reader.optional_label(account_mapping::BUDGET_TYPE),
            is_default: reader.boolean(account_mapping::IS_DEFAULT),
        };
        let record = reader.finish(record)?;
        let is_default = record.is_default;
        Ok(Converted::single(record, row)
            .named(&account_name)
            .preferred(is_default))
    }

    fn assign_ids(&self, record: &mut AccountMappingCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}
