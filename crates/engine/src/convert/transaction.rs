use records::{
    RecordId,
    transaction::{TransactionApplicationCreate, TransactionCreate},
};

use super::row::{Converted, RowConverter, RowReader, convert_rows};
use crate::{
    IdSequence, ImportIssue,
    metadata::columns::{transaction, transaction_application},
    range::{RowRange, child_range},
    registry::NameRegistry,
    schema::EntityKind,
};

/// Transactions own a variable number of application rows.
///
/// A row carrying both a date and a description is a transaction with a
/// single application on the same row. A dated row without description is
/// followed by its application rows, which leave the date blank.
pub(crate) struct TransactionConverter<'a> {
    pub(crate) accounts: &'a NameRegistry,
    pub(crate) applications: ApplicationConverter<'a>,
    pub(crate) ids: &'a IdSequence,
}

impl RowConverter for TransactionConverter<'_> {
    type Record = TransactionCreate;

    const KIND: EntityKind = EntityKind::Transaction;
    const KEY_COLUMN: &'static str = transaction::DATE;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<TransactionCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let table = reader.table();
        let location = reader.table_location();
        let date_system = reader.date_system();

        let record = TransactionCreate {
            id: RecordId::default(),
            date: reader.date(transaction::DATE),
            location: reader.optional_text(transaction::LOCATION).unwrap_or_default(),
            kind: reader.label(transaction::TYPE),
            amount: reader.decimal(transaction::AMOUNT),
            credit_card_account_id: reader.optional_reference(transaction::CREDIT_CARD_ACCOUNT, self.accounts),
            paid_off_date: reader.optional_date(transaction::PAYOFF_DATE),
            applications: Vec::new(),
        };

        let children = child_range(
            table,
            row,
            transaction_application::DESCRIPTION,
            transaction::DATE,
        );
        let (mut record, children) = match (reader.finish(record), children) {
            (Ok(record), Ok(children)) => (record, children),
            (result, children) => {
                let mut issues = result.err().unwrap_or_default();
                if let Err(error) = children {
                    issues.push(ImportIssue::RowRange {
                        location: location.at_row(row),
                        error,
                    });
                }
                return Err(issues);
            }
        };

        let (applications, issues) = convert_rows(
            &self.applications,
            table,
            children.start()..children.end() + 1,
            &location,
            date_system,
            self.ids,
            None,
        );
        record.applications = applications;

        Ok(Converted {
            record,
            consumed: RowRange::single(row).union(children, true).unwrap_or(children),
            issues,
            name: None,
            preferred: false,
        })
    }

    fn assign_ids(&self, record: &mut TransactionCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}

pub(crate) struct ApplicationConverter<'a> {
    pub(crate) budgets: &'a NameRegistry,
    pub(crate) account_mappings: &'a NameRegistry,
}

impl RowConverter for ApplicationConverter<'_> {
    type Record = TransactionApplicationCreate;

    const KIND: EntityKind = EntityKind::TransactionApplication;
    const KEY_COLUMN: &'static str = transaction_application::TYPE;

    fn convert(
        &self,
        mut reader: RowReader<'_>,
    ) -> Result<Converted<TransactionApplicationCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = TransactionApplicationCreate {
            id: RecordId::default(),
            kind: reader.label(transaction_application::TYPE),
            description: reader
                .optional_text(transaction_application::DESCRIPTION)
                .unwrap_or_default(),
            amount: reader.decimal(transaction_application::AMOUNT),
            budget_id: reader.optional_reference(transaction_application::BUDGET, self.budgets),
            override_account_mapping_id: reader.optional_reference(
                transaction_application::OVERRIDE_ACCOUNT_MAPPING,
                self.account_mappings,
            ),
        };
        Ok(Converted::single(reader.finish(record)?, row))
    }

    fn assign_ids(&self, record: &mut TransactionApplicationCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.id
    }
}
