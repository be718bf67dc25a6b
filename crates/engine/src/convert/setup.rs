use records::{
    RecordId,
    account::AccountCreate,
    income::EmployerCreate,
};

use super::row::{Converted, RowConverter, RowReader};
use crate::{
    IdSequence, ImportIssue,
    metadata::columns::{account, employer},
    schema::EntityKind,
};

pub(crate) struct AccountConverter;

impl RowConverter for AccountConverter {
    type Record = AccountCreate;

    const KIND: EntityKind = EntityKind::Account;
    const KEY_COLUMN: &'static str = account::NAME;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<AccountCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = AccountCreate {
            id: RecordId::default(),
            name: reader.text(account::NAME),
            kind: reader.label(account::TYPE),
        };
        let record = reader.finish(record)?;
        let name = record.name.clone();
        Ok(Converted::single(record, row).named(&name))
    }

    fn assign_ids(&self, record: &mut AccountCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}

pub(crate) struct EmployerConverter;

impl RowConverter for EmployerConverter {
    type Record = EmployerCreate;

    const KIND: EntityKind = EntityKind::Employer;
    const KEY_COLUMN: &'static str = employer::NAME;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<EmployerCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = EmployerCreate {
            id: RecordId::default(),
            name: reader.text(employer::NAME),
        };
        let record = reader.finish(record)?;
        let name = record.name.clone();
        Ok(Converted::single(record, row).named(&name))
    }

    fn assign_ids(&self, record: &mut EmployerCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}
