use rust_decimal::Decimal;
use serde::Serialize;

use super::classifier::{ClassifiedTransaction, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    BalanceModification,
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn code(self) -> u8 {
        match self {
            TransactionType::BalanceModification => 1,
            TransactionType::Income => 2,
            TransactionType::Expense => 3,
            TransactionType::Transfer => 4,
        }
    }
}

impl TransactionKind {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransactionKind::BalanceModification { .. } => TransactionType::BalanceModification,
            TransactionKind::Income { .. } => TransactionType::Income,
            TransactionKind::Expense { .. } => TransactionType::Expense,
            TransactionKind::Transfer { .. } => TransactionType::Transfer,
        }
    }
}

/// One transaction in the column layout of the generic data table importer.
/// Columns that don't apply to a transaction type are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRow {
    pub transaction_time: String,
    pub transaction_type: String,
    pub sub_category: String,
    pub account_name: String,
    pub account_currency: String,
    pub amount: String,
    pub related_account_name: String,
    pub related_account_currency: String,
    pub related_amount: String,
    pub description: String,
    pub tags: String,
}

impl ClassifiedTransaction {
    pub fn to_row(&self, tag_separator: char) -> TransactionRow {
        let mut row = TransactionRow {
            transaction_time: format!("{} 00:00:00", self.date.format("%Y-%m-%d")),
            transaction_type: self.kind.transaction_type().code().to_string(),
            description: self.description.clone(),
            tags: self.tags.join(tag_separator.to_string().as_str()),
            ..TransactionRow::default()
        };
        match &self.kind {
            TransactionKind::BalanceModification {
                category,
                account,
                currency,
                amount,
            }
            | TransactionKind::Income {
                category,
                account,
                currency,
                amount,
            }
            | TransactionKind::Expense {
                category,
                account,
                currency,
                amount,
            } => {
                row.sub_category = category.clone();
                row.account_name = account.clone();
                row.account_currency = currency.clone();
                row.amount = format_amount(*amount);
            }
            TransactionKind::Transfer {
                from_account,
                to_account,
                from_currency,
                to_currency,
                from_amount,
                to_amount,
            } => {
                row.account_name = from_account.clone();
                row.account_currency = from_currency.clone();
                row.amount = format_amount(*from_amount);
                row.related_account_name = to_account.clone();
                row.related_account_currency = to_currency.clone();
                row.related_amount = format_amount(*to_amount);
            }
        }
        row
    }
}

fn format_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn classified(kind: TransactionKind, tags: &[&str]) -> ClassifiedTransaction {
        ClassifiedTransaction {
            line: 1,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            payee: None,
            description: "Description".to_string(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            kind,
        }
    }

    #[test]
    fn test_income_row() {
        let row = classified(
            TransactionKind::Income {
                category: "Income:Salary".to_string(),
                account: "Assets:Bank".to_string(),
                currency: "CNY".to_string(),
                amount: Decimal::new(12345, 2),
            },
            &["work", "2024"],
        )
        .to_row(';');
        assert_eq!(
            TransactionRow {
                transaction_time: "2024-01-02 00:00:00".to_string(),
                transaction_type: "2".to_string(),
                sub_category: "Income:Salary".to_string(),
                account_name: "Assets:Bank".to_string(),
                account_currency: "CNY".to_string(),
                amount: "123.45".to_string(),
                description: "Description".to_string(),
                tags: "work;2024".to_string(),
                ..TransactionRow::default()
            },
            row
        );
    }

    #[test]
    fn test_transfer_row() {
        let row = classified(
            TransactionKind::Transfer {
                from_account: "Assets:Checking".to_string(),
                to_account: "Assets:Wallet".to_string(),
                from_currency: "USD".to_string(),
                to_currency: "EUR".to_string(),
                from_amount: Decimal::new(10000, 2),
                to_amount: Decimal::new(92, 0),
            },
            &[],
        )
        .to_row(',');
        assert_eq!("4", row.transaction_type);
        assert_eq!("", row.sub_category);
        assert_eq!("Assets:Checking", row.account_name);
        assert_eq!("USD", row.account_currency);
        assert_eq!("100.00", row.amount);
        assert_eq!("Assets:Wallet", row.related_account_name);
        assert_eq!("EUR", row.related_account_currency);
        assert_eq!("92.00", row.related_amount);
        assert_eq!("", row.tags);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(1, TransactionType::BalanceModification.code());
        assert_eq!(2, TransactionType::Income.code());
        assert_eq!(3, TransactionType::Expense.code());
        assert_eq!(4, TransactionType::Transfer.code());
    }

    #[test]
    fn test_balance_modification_row() {
        let row = classified(
            TransactionKind::BalanceModification {
                category: "Equity:Opening-Balances".to_string(),
                account: "Liabilities:Card".to_string(),
                currency: "USD".to_string(),
                amount: Decimal::new(-5000, 2),
            },
            &["setup"],
        )
        .to_row(';');
        assert_eq!("1", row.transaction_type);
        assert_eq!("Equity:Opening-Balances", row.sub_category);
        assert_eq!("-50.00", row.amount);
        assert_eq!("setup", row.tags);
        assert_eq!("", row.related_amount);
    }
}
