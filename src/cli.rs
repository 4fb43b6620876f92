use anyhow::{Context as _, Result};
use console::{pad_str, style, Alignment, StyledObject};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::import::{self, ClassifiedTransaction, ImportedLedger, TransactionKind, TransactionRow};
use crate::ledger::{Account, Ledger};
use crate::terminal::{BulletPointPrinter, LineWriter};

pub fn main(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    match args.command {
        Command::Transactions { ledger } => {
            let imported = load_ledger(&ledger, &config)?;
            println!("{}", style_header("Transactions:"));
            print_transactions(&BulletPointPrinter::new_stdout(), &imported.transactions);
        }
        Command::Accounts { ledger } => {
            let imported = load_ledger(&ledger, &config)?;
            println!("{}", style_header("Accounts:"));
            print_accounts(&BulletPointPrinter::new_stdout(), &imported.ledger);
        }
        Command::Export { ledger, format } => {
            let imported = load_ledger(&ledger, &config)?;
            let rows = imported.rows(config.tag_separator);
            let stdout = std::io::stdout();
            export_rows(&rows, format, stdout.lock())?;
        }
    }
    Ok(())
}

fn load_ledger(path: &Path, config: &Config) -> Result<ImportedLedger> {
    log::info!("Importing {}...", path.display());
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let imported = import::load(BufReader::new(file), config)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    log::info!("Importing {}...done", path.display());
    Ok(imported)
}

pub fn export_rows(
    rows: &[TransactionRow],
    format: OutputFormat,
    mut output: impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(output);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut output, rows)?;
            writeln!(output)?;
        }
    }
    Ok(())
}

fn print_transactions<W: LineWriter + Clone>(
    printer: &BulletPointPrinter<W>,
    transactions: &[ClassifiedTransaction],
) {
    if transactions.is_empty() {
        printer.print_item(style("(none)").italic());
        return;
    }
    for transaction in transactions {
        print_transaction(printer, transaction);
    }
}

fn print_transaction<W: LineWriter + Clone>(
    printer: &BulletPointPrinter<W>,
    transaction: &ClassifiedTransaction,
) {
    let payee = transaction
        .payee
        .as_ref()
        .map(|payee| format!(" {payee}"))
        .unwrap_or_default();
    let description = format!(" \"{}\"", transaction.description);
    printer.print_item(format!(
        "{} {}{}{}",
        pad_str(
            &style_date(&transaction.date).to_string(),
            10,
            Alignment::Left,
            None
        ),
        style_kind(&transaction.kind),
        style_payee(&payee),
        style_description(&description),
    ));

    let printer = printer.indent();
    match &transaction.kind {
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
            printer.print_detail(format!(
                "{} {} [{}]",
                style_account(account),
                style_amount(*amount, currency),
                style_category(category),
            ));
        }
        TransactionKind::Transfer {
            from_account,
            to_account,
            from_currency,
            to_currency,
            from_amount,
            to_amount,
        } => {
            printer.print_detail(format!(
                "{} {} -> {} {}",
                style_account(from_account),
                style_amount(*from_amount, from_currency),
                style_account(to_account),
                style_amount(*to_amount, to_currency),
            ));
        }
    }
    if !transaction.tags.is_empty() {
        printer.print_detail(style_tags(&transaction.tags));
    }
}

fn print_accounts<W: LineWriter + Clone>(printer: &BulletPointPrinter<W>, ledger: &Ledger) {
    for account in ledger.accounts_sorted_by_name() {
        print_account(printer, account);
    }
}

fn print_account<W: LineWriter + Clone>(printer: &BulletPointPrinter<W>, account: &Account) {
    let open_date = account
        .open_date
        .map(|date| format!(" opened {}", date.format("%Y-%m-%d")))
        .unwrap_or_else(|| " (implicit)".to_string());
    let close_date = account
        .close_date
        .map(|date| format!(" closed {}", date.format("%Y-%m-%d")))
        .unwrap_or_default();
    let currencies = if account.currencies.is_empty() {
        String::new()
    } else {
        format!(" {}", account.currencies.join(","))
    };
    printer.print_item(format!(
        "{} [{}]{}{}{}",
        style_account(&account.name),
        account.account_type,
        open_date,
        close_date,
        currencies,
    ));
}

fn style_header(header: &str) -> StyledObject<&str> {
    style(header).bold().underlined()
}

fn style_account(account: &str) -> StyledObject<&str> {
    style(account).magenta()
}

fn style_date(date: &chrono::NaiveDate) -> StyledObject<String> {
    style(date.format("%Y-%m-%d").to_string())
}

fn style_kind(kind: &TransactionKind) -> StyledObject<&'static str> {
    match kind {
        TransactionKind::BalanceModification { .. } => style("balance").yellow(),
        TransactionKind::Income { .. } => style("income").green(),
        TransactionKind::Expense { .. } => style("expense").red(),
        TransactionKind::Transfer { .. } => style("transfer").cyan(),
    }
}

fn style_amount(amount: Decimal, currency: &str) -> StyledObject<String> {
    let result = style(format!("{amount:.2} {currency}")).bold();
    if amount < Decimal::ZERO {
        result.red()
    } else {
        result.green()
    }
}

fn style_payee(payee: &str) -> StyledObject<&str> {
    style(payee).yellow()
}

fn style_description(description: &str) -> StyledObject<&str> {
    style(description).blue()
}

fn style_category(category: &str) -> StyledObject<&str> {
    style(category).magenta()
}

fn style_tags(tags: &[String]) -> StyledObject<String> {
    let tags = tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    style(tags).italic()
}
