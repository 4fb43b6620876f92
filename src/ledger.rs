use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{hash_map::Entry, HashMap};

pub type Metadata = HashMap<String, String>;

/// Result of reading a ledger file: the account registry and all transactions in file order.
#[derive(Debug, Clone, Default)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Ledger {
    pub accounts: HashMap<String, Account>,
    pub transactions: Vec<TransactionEntry>,
}

impl Ledger {
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    pub fn accounts_sorted_by_name(&self) -> impl Iterator<Item = &Account> {
        let mut accounts: Vec<&Account> = self.accounts.values().collect();
        accounts.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        accounts.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Unknown,
    Assets,
    Liabilities,
    Equity,
    Income,
    Expenses,
}

impl AccountType {
    pub fn is_asset_or_liability(self) -> bool {
        matches!(self, AccountType::Assets | AccountType::Liabilities)
    }

    pub fn is_equity_or_income(self) -> bool {
        matches!(self, AccountType::Equity | AccountType::Income)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccountType::Unknown => "Unknown",
            AccountType::Assets => "Assets",
            AccountType::Liabilities => "Liabilities",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expenses => "Expenses",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Account {
    /// Full colon delimited name, e.g. `Assets:Checking`
    pub name: String,
    pub account_type: AccountType,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    /// Currencies the `open` directive restricts this account to. Empty means unrestricted.
    pub currencies: Vec<String>,
}

impl Account {
    pub fn new(name: String, account_type: AccountType) -> Self {
        Self {
            name,
            account_type,
            open_date: None,
            close_date: None,
            currencies: vec![],
        }
    }

    /// Last colon delimited segment of the name
    pub fn leaf_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionDirective {
    /// `txn`
    Transaction,
    /// `*`
    Completed,
    /// `!`
    Incomplete,
    /// `P`
    Padding,
}

impl TransactionDirective {
    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword {
            "txn" => Some(Self::Transaction),
            "*" => Some(Self::Completed),
            "!" => Some(Self::Incomplete),
            "P" => Some(Self::Padding),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Transaction => "txn",
            Self::Completed => "*",
            Self::Incomplete => "!",
            Self::Padding => "P",
        }
    }
}

/// A number with its commodity as written after `@` or `@@`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceAmount {
    pub amount: String,
    pub commodity: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Posting {
    /// Name of the account in [Ledger::accounts]
    pub account: String,
    /// Evaluated amount with two decimal places
    pub amount: Decimal,
    /// Amount as written in the file, possibly an arithmetic expression
    pub original_amount: String,
    pub commodity: String,
    /// `@@ total_cost commodity`
    pub total_cost: Option<PriceAmount>,
    /// `@ price commodity`
    pub price: Option<PriceAmount>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct TransactionEntry {
    /// Line in the source file the transaction header was read from
    pub line: u64,
    pub date: NaiveDate,
    pub directive: TransactionDirective,
    pub payee: Option<String>,
    pub narration: String,
    pub postings: Vec<Posting>,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    pub metadata: Metadata,
}

/// Adds a metadata entry unless the key already exists. Returns false if it was ignored.
pub fn insert_metadata(metadata: &mut Metadata, key: String, value: String) -> bool {
    match metadata.entry(key) {
        Entry::Occupied(_) => false,
        Entry::Vacant(entry) => {
            entry.insert(value);
            true
        }
    }
}
