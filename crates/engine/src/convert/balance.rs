use records::{RecordId, account::AccountBalanceCreate};

use super::row::{Converted, RowConverter, RowReader};
use crate::{
    IdSequence, ImportIssue, metadata::columns::account_balance, registry::NameRegistry,
    schema::EntityKind,
};

pub(crate) struct AccountBalanceConverter<'a> {
    pub(crate) accounts: &'a NameRegistry,
}

impl RowConverter for AccountBalanceConverter<'_> {
    type Record = AccountBalanceCreate;

    const KIND: EntityKind = EntityKind::AccountBalance;
    const KEY_COLUMN: &'static str = account_balance::ACCOUNT_NAME;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<AccountBalanceCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = AccountBalanceCreate {
            id: RecordId::default(),
            account_id: reader.reference(account_balance::ACCOUNT_NAME, self.accounts),
            date: reader.date(account_balance::DATE),
            amount: reader.decimal(account_balance::AMOUNT),
        };
        Ok(Converted::single(reader.finish(record)?, row))
    }

    fn assign_ids(&self, record: &mut AccountBalanceCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}
