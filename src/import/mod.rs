use std::io::Read;

mod classifier;
mod expression;
mod reader;
mod row;
mod tokenizer;

pub use classifier::{ClassifiedTransaction, TransactionClassifier, TransactionKind};
pub use expression::evaluate as evaluate_amount_expression;
pub use reader::LedgerReader;
pub use row::{TransactionRow, TransactionType};
pub use tokenizer::{tokenize, Field, Record};

use crate::config::Config;
use crate::error::{ImportError, Result};
use crate::ledger::Ledger;

#[derive(Debug)]
pub struct ImportedLedger {
    pub ledger: Ledger,
    pub transactions: Vec<ClassifiedTransaction>,
}

impl ImportedLedger {
    pub fn rows(&self, tag_separator: char) -> Vec<TransactionRow> {
        self.transactions
            .iter()
            .map(|transaction| transaction.to_row(tag_separator))
            .collect()
    }
}

/// Read a beancount ledger and classify all of its transactions.
///
/// Fails on the first problem; there is no partial result.
pub fn load(mut input_stream: impl Read, config: &Config) -> Result<ImportedLedger> {
    let mut content = Vec::new();
    input_stream.read_to_end(&mut content)?;
    let content = String::from_utf8(content)
        .map_err(|err| ImportError::InvalidFile(format!("File is not valid UTF-8: {err}")))?;
    let content = maybe_remove_byte_order_mark(content);

    let records = tokenizer::tokenize(&content)?;
    let ledger = LedgerReader::new(config.account_type_names.clone()).read(&records)?;

    let classifier = TransactionClassifier::new(&ledger.accounts, &config.opening_balance_account);
    let transactions = ledger
        .transactions
        .iter()
        .map(|entry| classifier.classify(entry))
        .collect::<Result<Vec<_>>>()?;
    if transactions.is_empty() {
        return Err(ImportError::NoTransactionData);
    }
    log::info!("Classified {} transactions", transactions.len());

    Ok(ImportedLedger {
        ledger,
        transactions,
    })
}

/// Like [load], but returns the transactions in the generic data table layout.
pub fn load_rows(input_stream: impl Read, config: &Config) -> Result<Vec<TransactionRow>> {
    Ok(load(input_stream, config)?.rows(config.tag_separator))
}

fn maybe_remove_byte_order_mark(mut content: String) -> String {
    if content.starts_with('\u{FEFF}') {
        content.remove(0);
    }
    content
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    const SAMPLE: &str = r#"option "title" "Household"
; Accounts
2020-01-01 open Assets:Bank:Checking CNY
2020-01-01 open Assets:Bank:Savings CNY
2020-01-01 open Liabilities:CreditCard CNY
2020-01-01 open Equity:Opening-Balances
2020-01-01 open Income:Salary
2020-01-01 open Expenses:Food

2020-01-01 * "Opening balance"
  Assets:Bank:Checking        1000.00 CNY
  Equity:Opening-Balances    -1000.00 CNY

pushtag #2020
2020-01-31 * "ACME" "Salary" #work
  Income:Salary  -123.45 CNY
  Assets:Bank:Checking  123.45 CNY

2020-02-01 * "Groceries"
  Expenses:Food  12.30*2 CNY
  Liabilities:CreditCard  -24.60 CNY
poptag #2020

2020/02/02 txn "Save money"
  Assets:Bank:Savings  500 CNY
  Assets:Bank:Checking  -500 CNY
"#;

    fn load_str(content: &str) -> Result<ImportedLedger> {
        load(content.as_bytes(), &Config::default())
    }

    fn load_rows_str(content: &str) -> Result<Vec<TransactionRow>> {
        load_rows(content.as_bytes(), &Config::default())
    }

    #[test]
    fn test_sample_ledger() {
        let rows = load_rows_str(SAMPLE).unwrap();
        assert_eq!(
            vec![
                TransactionRow {
                    transaction_time: "2020-01-01 00:00:00".to_string(),
                    transaction_type: "1".to_string(),
                    sub_category: "Equity:Opening-Balances".to_string(),
                    account_name: "Assets:Bank:Checking".to_string(),
                    account_currency: "CNY".to_string(),
                    amount: "1000.00".to_string(),
                    description: "Opening balance".to_string(),
                    ..TransactionRow::default()
                },
                TransactionRow {
                    transaction_time: "2020-01-31 00:00:00".to_string(),
                    transaction_type: "2".to_string(),
                    sub_category: "Income:Salary".to_string(),
                    account_name: "Assets:Bank:Checking".to_string(),
                    account_currency: "CNY".to_string(),
                    amount: "123.45".to_string(),
                    description: "Salary".to_string(),
                    tags: "2020;work".to_string(),
                    ..TransactionRow::default()
                },
                TransactionRow {
                    transaction_time: "2020-02-01 00:00:00".to_string(),
                    transaction_type: "3".to_string(),
                    sub_category: "Expenses:Food".to_string(),
                    account_name: "Liabilities:CreditCard".to_string(),
                    account_currency: "CNY".to_string(),
                    amount: "24.60".to_string(),
                    description: "Groceries".to_string(),
                    tags: "2020".to_string(),
                    ..TransactionRow::default()
                },
                TransactionRow {
                    transaction_time: "2020-02-02 00:00:00".to_string(),
                    transaction_type: "4".to_string(),
                    account_name: "Assets:Bank:Checking".to_string(),
                    account_currency: "CNY".to_string(),
                    amount: "500.00".to_string(),
                    related_account_name: "Assets:Bank:Savings".to_string(),
                    related_account_currency: "CNY".to_string(),
                    related_amount: "500.00".to_string(),
                    description: "Save money".to_string(),
                    ..TransactionRow::default()
                },
            ],
            rows
        );
    }

    #[test]
    fn test_accounts_are_returned() {
        let imported = load_str(SAMPLE).unwrap();
        assert_eq!(6, imported.ledger.accounts.len());
        assert_eq!(4, imported.ledger.transactions.len());
        assert_eq!(
            Decimal::new(2460, 2),
            imported.ledger.transactions[2].postings[0].amount
        );
    }

    #[test]
    fn test_byte_order_mark() {
        let content = format!("\u{FEFF}{SAMPLE}");
        assert_eq!(4, load_rows_str(&content).unwrap().len());
    }

    #[test]
    fn test_custom_config() {
        let mut config = Config::default();
        config.tag_separator = '|';
        config.opening_balance_account = "Start".to_string();
        let rows = load_rows(SAMPLE.as_bytes(), &config).unwrap();
        // Opening-Balances is no longer special, so it's an equity income
        assert_eq!("2", rows[0].transaction_type);
        assert_eq!("2020|work", rows[1].tags);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            load_str(""),
            Err(ImportError::NoTransactionData)
        ));
        assert!(matches!(
            load_str("2020-01-01 open Assets:Cash\n; nothing else\n"),
            Err(ImportError::NoTransactionData)
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let content: &[u8] = b"2020-01-01 * \"\xff\"";
        assert!(matches!(
            load(content, &Config::default()),
            Err(ImportError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_include_anywhere_aborts() {
        let content = format!("{SAMPLE}\ninclude \"other.beancount\"\n");
        assert!(matches!(
            load_str(&content),
            Err(ImportError::IncludeNotSupported(_))
        ));
    }

    #[test]
    fn test_one_bad_transaction_fails_whole_import() {
        let content = format!(
            "{SAMPLE}\n2020-03-01 * \"Split\"\n  Expenses:Food 1 CNY\n  Expenses:Food 1 CNY\n  Assets:Bank:Checking -2 CNY\n"
        );
        assert!(matches!(
            load_str(&content),
            Err(ImportError::NotSupportedSplitTransactions(_))
        ));

        let content = format!("{SAMPLE}\n2020-03-01 * \"Lonely\"\n  Expenses:Food 1 CNY\n");
        assert!(matches!(
            load_str(&content),
            Err(ImportError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_malformed_quoting_fails_import() {
        let unterminated = "2020-01-01 * \"unterminated\n  Income:Job -1 USD\n  Assets:Cash 1 USD\n2020-01-02 * \"ok\"\n  Income:Job -2 USD\n  Assets:Cash 2 USD\n";
        for content in [
            unterminated,
            "2020-01-01 * pay\"ee \"narration\"\n  Income:Job -1 USD\n  Assets:Cash 1 USD\n",
            "2020-01-01 * \"narr\"x\n  Income:Job -1 USD\n  Assets:Cash 1 USD\n",
        ] {
            assert!(
                matches!(load_str(content), Err(ImportError::InvalidFile(_))),
                "{content}"
            );
        }
    }

    #[test]
    fn test_quote_in_comment_keeps_tab_indented_postings() {
        let rows = load_rows_str(
            "; 27\" monitor\n2020-01-01 * \"ok\"\n\tIncome:Job\t-2 USD\n\tAssets:Cash\t2 USD\n",
        )
        .unwrap();
        assert_eq!(1, rows.len());
        assert_eq!("2", rows[0].transaction_type);
        assert_eq!("2.00", rows[0].amount);
    }

    #[test]
    fn test_errors_report_source_line() {
        let content = "; header\n\n2020-01-01 * \"Lonely\"\n  Expenses:Food 1 CNY\n";
        let err = load_str(content).unwrap_err();
        assert!(err.to_string().contains("Line 3"), "{err}");
    }

    #[test]
    fn test_transfer_direction_independent_of_order() {
        let forward = "2020-01-01 * \"t\"\n  Assets:A -5.00 USD\n  Assets:B 5.00 USD\n";
        let backward = "2020-01-01 * \"t\"\n  Assets:B 5.00 USD\n  Assets:A -5.00 USD\n";
        let forward = load_rows_str(forward).unwrap();
        let backward = load_rows_str(backward).unwrap();
        assert_eq!(forward, backward);
        assert_eq!("Assets:A", forward[0].account_name);
        assert_eq!("Assets:B", forward[0].related_account_name);
    }
}
