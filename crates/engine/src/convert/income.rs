use records::{
    MoneyCents, RecordId,
    income::{EmployerIncomeRateCreate, IncomeCreate, IncomeInformationCreate},
};

use super::row::{Converted, RowConverter, RowReader};
use crate::{
    IdSequence, ImportIssue,
    metadata::columns::{employer_income_rate, income, income_information},
    registry::NameRegistry,
    schema::EntityKind,
};

/// Reads the income breakdown columns of the current row.
///
/// Blank amounts read as zero.
fn read_income_information(reader: &mut RowReader<'_>) -> IncomeInformationCreate {
    let mut amount = |column| reader.optional_decimal(column).unwrap_or(MoneyCents::ZERO);
    IncomeInformationCreate {
        id: RecordId::default(),
        salary_income: amount(income_information::SALARY_INCOME),
        additional_taxable_income: amount(income_information::ADDITIONAL_TAXABLE_INCOME),
        retirement_contribution_amount: amount(income_information::RETIREMENT_CONTRIBUTION),
        pension_contribution_amount: amount(income_information::PENSION_CONTRIBUTION),
        pre_tax_deductions: amount(income_information::PRE_TAX_DEDUCTIONS),
        tax_withholding_amount: amount(income_information::TAX_WITHHOLDING),
        post_tax_deductions: amount(income_information::POST_TAX_DEDUCTIONS),
    }
}

pub(crate) struct IncomeConverter<'a> {
    pub(crate) employers: &'a NameRegistry,
    pub(crate) accounts: &'a NameRegistry,
}

impl RowConverter for IncomeConverter<'_> {
    type Record = IncomeCreate;

    const KIND: EntityKind = EntityKind::Income;
    const KEY_COLUMN: &'static str = income::EMPLOYER;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<IncomeCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let information = read_income_information(&mut reader);
        let record = IncomeCreate {
            id: RecordId::default(),
            employer_id: reader.reference(income::EMPLOYER, self.employers),
            date: reader.date(income::DATE),
            amount: reader.decimal(income::AMOUNT),
            description: reader.text(income::DESCRIPTION),
            override_account_id: reader.optional_reference(income::ACCOUNT, self.accounts),
            income_information: (!information.is_blank()).then_some(information),
        };
        Ok(Converted::single(reader.finish(record)?, row))
    }

    fn assign_ids(&self, record: &mut IncomeCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        if let Some(information) = record.income_information.as_mut() {
            information.id = ids.next_id();
        }
        record.id
    }
}

pub(crate) struct EmployerIncomeRateConverter<'a> {
    pub(crate) employers: &'a NameRegistry,
}

impl RowConverter for EmployerIncomeRateConverter<'_> {
    type Record = EmployerIncomeRateCreate;

    const KIND: EntityKind = EntityKind::EmployerIncomeRate;
    const KEY_COLUMN: &'static str = employer_income_rate::EMPLOYER;

    fn convert(&self, mut reader: RowReader<'_>) -> Result<Converted<EmployerIncomeRateCreate>, Vec<ImportIssue>> {
        let row = reader.row();
        let record = EmployerIncomeRateCreate {
            id: RecordId::default(),
            employer_id: reader.reference(employer_income_rate::EMPLOYER, self.employers),
            income_information: read_income_information(&mut reader),
        };
        Ok(Converted::single(reader.finish(record)?, row))
    }

    fn assign_ids(&self, record: &mut EmployerIncomeRateCreate, ids: &IdSequence) -> RecordId {
        record.id = ids.next_id();
        record.income_information.id = ids.next_id();
        record.id
    }
}
