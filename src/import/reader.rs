use chrono::NaiveDate;
use std::collections::{hash_map::Entry, HashMap};

use super::expression;
use super::tokenizer::{Field, Record};
use crate::config::AccountTypeNames;
use crate::error::{ImportError, Result};
use crate::ledger::{
    insert_metadata, Account, AccountType, Ledger, Posting, PriceAmount, TransactionDirective,
    TransactionEntry,
};

const AMOUNT_CHARS: &str = "0123456789.()*/+-";
const BOOKING_METHODS: [&str; 6] = ["STRICT", "FIFO", "LIFO", "HIFO", "AVERAGE", "NONE"];
const IGNORED_DIRECTIVES: [&str; 9] = [
    "commodity",
    "price",
    "note",
    "document",
    "event",
    "balance",
    "pad",
    "query",
    "custom",
];

/// What the reader is currently in the middle of. Postings and transactions move into
/// [Ledger::transactions] when the reader flushes.
#[derive(Debug)]
enum ReaderState {
    Idle,
    InTransaction(TransactionEntry),
    InPosting(TransactionEntry, Posting),
}

/// Reads tokenized ledger records into accounts and transactions.
///
/// Every import creates its own reader, so `option` directives and the tag stack never leak
/// between imports.
pub struct LedgerReader {
    account_type_names: AccountTypeNames,
    accounts: HashMap<String, Account>,
    transactions: Vec<TransactionEntry>,
    tag_stack: Vec<String>,
    state: ReaderState,
}

impl LedgerReader {
    pub fn new(account_type_names: AccountTypeNames) -> Self {
        Self {
            account_type_names,
            accounts: HashMap::new(),
            transactions: vec![],
            tag_stack: vec![],
            state: ReaderState::Idle,
        }
    }

    pub fn read(mut self, records: &[Record]) -> Result<Ledger> {
        log::info!("Reading ledger...");
        for record in records {
            self.read_record(record)?;
        }
        self.flush_transaction();
        log::info!(
            "Reading ledger...done ({} accounts, {} transactions)",
            self.accounts.len(),
            self.transactions.len(),
        );
        Ok(Ledger {
            accounts: self.accounts,
            transactions: self.transactions,
        })
    }

    fn read_record(&mut self, record: &Record) -> Result<()> {
        let tokens = record.tokens();
        let items: Vec<&str> = tokens.iter().map(|field| field.text.as_str()).collect();
        let Some(&first) = items.first() else {
            // Blank line or comment
            return Ok(());
        };
        let line = record.line;

        if record.is_indented() {
            return if starts_posting(first) {
                self.read_posting(line, &items)
            } else if first.starts_with(|c: char| c.is_ascii_lowercase()) {
                self.read_metadata(line, &items);
                Ok(())
            } else {
                log::warn!("Line {line}: Ignoring unrecognized indented line");
                Ok(())
            };
        }

        self.flush_transaction();

        if looks_like_date(first) {
            return self.read_dated_directive(line, &items, &tokens);
        }
        match first {
            "option" => self.read_option(line, &items),
            "pushtag" => self.read_pushtag(line, &items),
            "poptag" => self.read_poptag(line, &items),
            "plugin" => log::debug!("Line {line}: Ignoring plugin directive"),
            "include" => {
                return Err(ImportError::IncludeNotSupported(format!(
                    "Line {line}: include {}",
                    items.get(1).copied().unwrap_or_default()
                )))
            }
            _ => log::debug!("Line {line}: Ignoring line '{first}...'"),
        }
        Ok(())
    }

    fn flush_transaction(&mut self) {
        match std::mem::replace(&mut self.state, ReaderState::Idle) {
            ReaderState::Idle => {}
            ReaderState::InTransaction(entry) => self.transactions.push(entry),
            ReaderState::InPosting(mut entry, posting) => {
                entry.postings.push(posting);
                self.transactions.push(entry);
            }
        }
    }

    fn read_dated_directive(
        &mut self,
        line: u64,
        items: &[&str],
        tokens: &[&Field],
    ) -> Result<()> {
        let [date, keyword, ..] = items else {
            log::warn!("Line {line}: Ignoring date without directive");
            return Ok(());
        };
        if let Some(directive) = TransactionDirective::parse(keyword) {
            return self.read_transaction_header(
                line,
                date,
                directive,
                tokens.get(2..).unwrap_or_default(),
            );
        }
        match *keyword {
            "open" => self.read_open(line, date, items),
            "close" => self.read_close(line, date, items),
            keyword if IGNORED_DIRECTIVES.contains(&keyword) => {
                log::debug!("Line {line}: Skipping {keyword} directive");
                Ok(())
            }
            keyword => {
                log::warn!("Line {line}: Skipping unknown directive '{keyword}'");
                Ok(())
            }
        }
    }

    fn read_transaction_header(
        &mut self,
        line: u64,
        date: &str,
        directive: TransactionDirective,
        fields: &[&Field],
    ) -> Result<()> {
        let date = parse_date(date).ok_or_else(|| {
            ImportError::MissingTransactionTime(format!("Line {line}: Invalid date '{date}'"))
        })?;
        let mut tags = self.tag_stack.clone();
        let mut links = vec![];
        let mut strings = vec![];
        for field in fields {
            let item = field.text.as_str();
            if field.quoted {
                strings.push(item.to_string());
            } else if let Some(tag) = item.strip_prefix('#') {
                if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                    tags.push(tag.to_string());
                }
            } else if let Some(link) = item.strip_prefix('^') {
                if !link.is_empty() {
                    links.push(link.to_string());
                }
            } else {
                strings.push(item.to_string());
            }
        }
        let (payee, narration) = match strings.len() {
            0 => (None, String::new()),
            1 => (None, strings.remove(0)),
            count => {
                if count > 2 {
                    log::warn!("Line {line}: Ignoring extra strings after the narration");
                }
                let mut strings = strings.into_iter();
                let payee = strings.next().filter(|payee| !payee.is_empty());
                (payee, strings.next().unwrap_or_default())
            }
        };
        self.state = ReaderState::InTransaction(TransactionEntry {
            line,
            date,
            directive,
            payee,
            narration,
            postings: vec![],
            tags,
            links,
            metadata: HashMap::new(),
        });
        Ok(())
    }

    fn read_posting(&mut self, line: u64, items: &[&str]) -> Result<()> {
        let entry = match std::mem::replace(&mut self.state, ReaderState::Idle) {
            ReaderState::Idle => {
                log::warn!("Line {line}: Ignoring posting outside of a transaction");
                return Ok(());
            }
            ReaderState::InTransaction(entry) => entry,
            ReaderState::InPosting(mut entry, posting) => {
                entry.postings.push(posting);
                entry
            }
        };
        let posting = self.parse_posting(line, items)?;
        self.state = ReaderState::InPosting(entry, posting);
        Ok(())
    }

    fn parse_posting(&mut self, line: u64, items: &[&str]) -> Result<Posting> {
        let mut items = items.iter().copied().peekable();
        // Optional posting flag
        items.next_if(|item| *item == "!" || *item == "*");

        let account = items
            .next()
            .ok_or_else(|| {
                ImportError::MissingAccountData(format!("Line {line}: Posting without account"))
            })?
            .to_string();

        let mut amount_parts = vec![];
        while let Some(part) = items.next_if(|item| is_amount_expression(item)) {
            amount_parts.push(part);
        }
        let original_amount = amount_parts.join(" ");
        let amount = expression::evaluate(&original_amount)?.ok_or_else(|| {
            ImportError::AmountInvalid(format!(
                "Line {line}: Posting for {account} has no amount"
            ))
        })?;

        let commodity = items.next().ok_or_else(|| {
            ImportError::InvalidFile(format!(
                "Line {line}: Posting for {account} has no commodity"
            ))
        })?;
        let commodity = parse_commodity(line, commodity)?;

        let mut total_cost = None;
        let mut price = None;
        while let Some(item) = items.next() {
            match item {
                "@@" => total_cost = Some(parse_price_amount(line, "@@", &mut items)?),
                "@" => price = Some(parse_price_amount(line, "@", &mut items)?),
                item if item.starts_with('{') => {
                    log::warn!("Line {line}: Ignoring cost specification for {account}");
                    let mut part = item;
                    while !part.ends_with('}') {
                        match items.next() {
                            Some(next) => part = next,
                            None => break,
                        }
                    }
                }
                item => log::warn!("Line {line}: Ignoring unexpected '{item}' in posting"),
            }
        }

        self.register_posting_account(line, &account);

        Ok(Posting {
            account,
            amount,
            original_amount,
            commodity,
            total_cost,
            price,
            metadata: HashMap::new(),
        })
    }

    fn register_posting_account(&mut self, line: u64, name: &str) {
        if self.accounts.contains_key(name) {
            return;
        }
        let account_type = self.account_type_names.account_type(name);
        if account_type == AccountType::Unknown {
            log::warn!("Line {line}: Account {name} was not opened and has an unknown type");
        }
        self.accounts.insert(
            name.to_string(),
            Account::new(name.to_string(), account_type),
        );
    }

    fn read_metadata(&mut self, line: u64, items: &[&str]) {
        let Some((key, value)) = parse_metadata(items) else {
            log::warn!("Line {line}: Ignoring invalid metadata line");
            return;
        };
        let metadata = match &mut self.state {
            ReaderState::InPosting(_, posting) => &mut posting.metadata,
            ReaderState::InTransaction(entry) => &mut entry.metadata,
            ReaderState::Idle => {
                log::warn!("Line {line}: Ignoring metadata '{key}' outside of a transaction");
                return;
            }
        };
        let key_for_log = key.clone();
        if !insert_metadata(metadata, key, value) {
            log::debug!("Line {line}: Ignoring duplicate metadata '{key_for_log}'");
        }
    }

    fn read_open(&mut self, line: u64, date: &str, items: &[&str]) -> Result<()> {
        let date = parse_directive_date(line, date)?;
        let (name, account_type) = self.directive_account(line, "open", items)?;
        let currencies: Vec<String> = items
            .get(3)
            .copied()
            .filter(|currencies| !BOOKING_METHODS.contains(currencies))
            .map(|currencies| {
                currencies
                    .split(',')
                    .filter(|currency| !currency.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        match self.accounts.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                let account = entry.get_mut();
                ensure_same_type(line, account, account_type)?;
                if account.open_date.is_some() {
                    log::warn!("Line {line}: Account {name} has already been opened");
                } else {
                    account.open_date = Some(date);
                    account.currencies = currencies;
                }
            }
            Entry::Vacant(entry) => {
                let mut account = Account::new(name.to_string(), account_type);
                account.open_date = Some(date);
                account.currencies = currencies;
                entry.insert(account);
            }
        }
        Ok(())
    }

    fn read_close(&mut self, line: u64, date: &str, items: &[&str]) -> Result<()> {
        let date = parse_directive_date(line, date)?;
        let (name, account_type) = self.directive_account(line, "close", items)?;
        let account = self
            .accounts
            .entry(name.to_string())
            .or_insert_with(|| Account::new(name.to_string(), account_type));
        ensure_same_type(line, account, account_type)?;
        if account.close_date.is_some() {
            log::warn!("Line {line}: Account {name} has already been closed");
        } else {
            account.close_date = Some(date);
        }
        Ok(())
    }

    fn directive_account<'a>(
        &self,
        line: u64,
        keyword: &str,
        items: &[&'a str],
    ) -> Result<(&'a str, AccountType)> {
        let name = items.get(2).copied().ok_or_else(|| {
            ImportError::MissingAccountData(format!("Line {line}: {keyword} without account"))
        })?;
        let account_type = self.account_type_names.account_type(name);
        if account_type == AccountType::Unknown {
            return Err(ImportError::InvalidFile(format!(
                "Line {line}: Account {name} has an unknown account type"
            )));
        }
        Ok((name, account_type))
    }

    fn read_option(&mut self, line: u64, items: &[&str]) {
        let [_, name, value] = items else {
            log::warn!("Line {line}: Ignoring invalid option");
            return;
        };
        if !name.starts_with("name_") {
            log::warn!("Line {line}: Ignoring unsupported option '{name}'");
            return;
        }
        if !self.accounts.is_empty() {
            log::warn!("Line {line}: Ignoring option '{name}' after accounts were registered");
            return;
        }
        let mut account_type_names = self.account_type_names.clone();
        if !account_type_names.set_option(name, value) {
            log::warn!("Line {line}: Ignoring unsupported option '{name}'");
            return;
        }
        match account_type_names.validate() {
            Ok(()) => self.account_type_names = account_type_names,
            Err(err) => log::warn!("Line {line}: Ignoring option '{name}': {err}"),
        }
    }

    fn read_pushtag(&mut self, line: u64, items: &[&str]) {
        let Some(tag) = tag_directive_argument(items) else {
            log::warn!("Line {line}: Ignoring invalid pushtag");
            return;
        };
        if !self.tag_stack.iter().any(|existing| existing == tag) {
            self.tag_stack.push(tag.to_string());
        }
    }

    fn read_poptag(&mut self, line: u64, items: &[&str]) {
        let Some(tag) = tag_directive_argument(items) else {
            log::warn!("Line {line}: Ignoring invalid poptag");
            return;
        };
        match self.tag_stack.iter().position(|existing| existing == tag) {
            Some(index) => {
                self.tag_stack.remove(index);
            }
            None => log::warn!("Line {line}: Popping tag '{tag}' that wasn't pushed"),
        }
    }
}

fn starts_posting(item: &str) -> bool {
    item.starts_with(|c: char| c.is_ascii_uppercase() || c == '!' || c == '*')
}

fn is_amount_expression(item: &str) -> bool {
    item.chars().all(|c| AMOUNT_CHARS.contains(c))
}

fn parse_commodity(line: u64, commodity: &str) -> Result<String> {
    let valid = commodity.starts_with(|c: char| c.is_ascii_uppercase())
        && !commodity.chars().any(char::is_lowercase);
    if !valid {
        return Err(ImportError::InvalidFile(format!(
            "Line {line}: Invalid commodity '{commodity}'"
        )));
    }
    Ok(commodity.to_string())
}

fn parse_price_amount<'a>(
    line: u64,
    marker: &str,
    items: &mut impl Iterator<Item = &'a str>,
) -> Result<PriceAmount> {
    let (Some(amount), Some(commodity)) = (items.next(), items.next()) else {
        return Err(ImportError::InvalidFile(format!(
            "Line {line}: Expected amount and commodity after '{marker}'"
        )));
    };
    if !is_amount_expression(amount) {
        return Err(ImportError::AmountInvalid(format!(
            "Line {line}: Invalid amount '{amount}' after '{marker}'"
        )));
    }
    Ok(PriceAmount {
        amount: amount.to_string(),
        commodity: parse_commodity(line, commodity)?,
    })
}

/// Splits `key: value` into its parts. The value may span multiple items.
fn parse_metadata(items: &[&str]) -> Option<(String, String)> {
    let (first, rest) = items.split_first()?;
    let (key, value_start) = first.split_once(':')?;
    let value = std::iter::once(value_start)
        .chain(rest.iter().copied())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value))
}

fn tag_directive_argument<'a>(items: &[&'a str]) -> Option<&'a str> {
    let tag: &'a str = match items {
        [_, tag] => *tag,
        _ => return None,
    };
    tag.strip_prefix('#').filter(|tag| !tag.is_empty())
}

fn ensure_same_type(line: u64, account: &Account, account_type: AccountType) -> Result<()> {
    if account.account_type != account_type {
        return Err(ImportError::InvalidFile(format!(
            "Line {line}: Account {} was registered as {} and can't become {}",
            account.name, account.account_type, account_type
        )));
    }
    Ok(())
}

fn parse_directive_date(line: u64, date: &str) -> Result<NaiveDate> {
    parse_date(date)
        .ok_or_else(|| ImportError::InvalidFile(format!("Line {line}: Invalid date '{date}'")))
}

/// Parses `YYYY-MM-DD` or `YYYY/MM/DD`
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    if !looks_like_date(date) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y/%m/%d"))
        .ok()
}

/// Whether the item has the shape of a date, without checking that the date exists.
fn looks_like_date(item: &str) -> bool {
    ['-', '/'].into_iter().any(|separator| {
        let parts: Vec<&str> = item.split(separator).collect();
        match parts.as_slice() {
            [year, month, day] => {
                is_digits(year, 4, 4) && is_digits(month, 1, 2) && is_digits(day, 1, 2)
            }
            _ => false,
        }
    })
}

fn is_digits(part: &str, min_len: usize, max_len: usize) -> bool {
    (min_len..=max_len).contains(&part.len()) && part.chars().all(|c| c.is_ascii_digit())
}
