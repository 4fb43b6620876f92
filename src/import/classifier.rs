use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{ImportError, Result};
use crate::ledger::{Account, AccountType, Posting, TransactionEntry};

/// A two-posting transaction with its economic meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTransaction {
    pub line: u64,
    pub date: NaiveDate,
    pub payee: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub kind: TransactionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// Initial balance of an asset or liability account, booked against the opening balance
    /// equity account
    BalanceModification {
        category: String,
        account: String,
        currency: String,
        amount: Decimal,
    },
    Income {
        category: String,
        account: String,
        currency: String,
        amount: Decimal,
    },
    /// `amount` is positive when money was spent
    Expense {
        category: String,
        account: String,
        currency: String,
        amount: Decimal,
    },
    /// `from_amount` is the positive amount that left `from_account`
    Transfer {
        from_account: String,
        to_account: String,
        from_currency: String,
        to_currency: String,
        from_amount: Decimal,
        to_amount: Decimal,
    },
}

pub struct TransactionClassifier<'a> {
    accounts: &'a HashMap<String, Account>,
    opening_balance_account: &'a str,
}

impl<'a> TransactionClassifier<'a> {
    pub fn new(accounts: &'a HashMap<String, Account>, opening_balance_account: &'a str) -> Self {
        Self {
            accounts,
            opening_balance_account,
        }
    }

    pub fn classify(&self, entry: &TransactionEntry) -> Result<ClassifiedTransaction> {
        let kind = match entry.postings.as_slice() {
            [first, second] => self.classify_postings(entry.line, first, second)?,
            [] | [_] => {
                return Err(ImportError::InvalidFile(format!(
                    "Line {}: Transaction needs two postings but has {}",
                    entry.line,
                    entry.postings.len()
                )))
            }
            postings => {
                return Err(ImportError::NotSupportedSplitTransactions(format!(
                    "Line {}: Transaction has {} postings",
                    entry.line,
                    postings.len()
                )))
            }
        };
        Ok(ClassifiedTransaction {
            line: entry.line,
            date: entry.date,
            payee: entry.payee.clone(),
            description: entry.narration.clone(),
            tags: entry.tags.clone(),
            kind,
        })
    }

    fn classify_postings(
        &self,
        line: u64,
        first: &Posting,
        second: &Posting,
    ) -> Result<TransactionKind> {
        let first_account = self.account(line, first)?;
        let second_account = self.account(line, second)?;
        let first_type = first_account.account_type;
        let second_type = second_account.account_type;

        if first_type.is_equity_or_income() && second_type.is_asset_or_liability() {
            return Ok(self.income(first_account, second));
        }
        if second_type.is_equity_or_income() && first_type.is_asset_or_liability() {
            return Ok(self.income(second_account, first));
        }
        if first_type == AccountType::Expenses && second_type.is_asset_or_liability() {
            return Ok(expense(first, second));
        }
        if second_type == AccountType::Expenses && first_type.is_asset_or_liability() {
            return Ok(expense(second, first));
        }
        if first_type.is_asset_or_liability() && second_type.is_asset_or_liability() {
            return transfer(line, first, second);
        }
        Err(ImportError::UnsupportedTransactionType(format!(
            "Line {line}: Can't book from {} ({first_type}) to {} ({second_type})",
            first.account, second.account
        )))
    }

    fn account(&self, line: u64, posting: &Posting) -> Result<&'a Account> {
        self.accounts.get(&posting.account).ok_or_else(|| {
            ImportError::MissingAccountData(format!(
                "Line {line}: Account {} is not known",
                posting.account
            ))
        })
    }

    fn is_opening_balance_account(&self, account: &Account) -> bool {
        account.account_type == AccountType::Equity
            && account.leaf_name() == self.opening_balance_account
    }

    fn income(&self, from: &Account, to: &Posting) -> TransactionKind {
        let category = from.name.clone();
        let account = to.account.clone();
        let currency = to.commodity.clone();
        let amount = to.amount;
        if self.is_opening_balance_account(from) {
            TransactionKind::BalanceModification {
                category,
                account,
                currency,
                amount,
            }
        } else {
            TransactionKind::Income {
                category,
                account,
                currency,
                amount,
            }
        }
    }
}

fn expense(expense: &Posting, asset: &Posting) -> TransactionKind {
    TransactionKind::Expense {
        category: expense.account.clone(),
        account: asset.account.clone(),
        currency: asset.commodity.clone(),
        amount: negated(asset.amount),
    }
}

fn transfer(line: u64, first: &Posting, second: &Posting) -> Result<TransactionKind> {
    let (from, to) = match (first.amount < Decimal::ZERO, second.amount < Decimal::ZERO) {
        (true, false) => (first, second),
        (false, true) => (second, first),
        _ => {
            return Err(ImportError::InvalidFile(format!(
                "Line {line}: Transfer between {} ({}) and {} ({}) needs exactly one negative amount",
                first.account, first.amount, second.account, second.amount
            )))
        }
    };
    Ok(TransactionKind::Transfer {
        from_account: from.account.clone(),
        to_account: to.account.clone(),
        from_currency: from.commodity.clone(),
        to_currency: to.commodity.clone(),
        from_amount: negated(from.amount),
        to_amount: to.amount,
    })
}

fn negated(amount: Decimal) -> Decimal {
    let mut negated = -amount;
    if negated.is_zero() {
        negated.set_sign_positive(true);
    }
    negated
}
