use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Read a beancount ledger and classify its transactions as income, expense, transfer or
/// opening balance.
#[derive(Parser, Debug)]
pub struct Args {
    /// YAML file with account type names, tag separator and opening balance account
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the classified transactions of a ledger
    Transactions {
        /// Path to the beancount file
        ledger: PathBuf,
    },

    /// Print all accounts opened or used in a ledger
    Accounts {
        /// Path to the beancount file
        ledger: PathBuf,
    },

    /// Write the transactions in the generic data table layout to stdout
    Export {
        /// Path to the beancount file
        ledger: PathBuf,

        #[clap(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_export_defaults_to_csv() {
        let args = Args::try_parse_from(["beancount-import-ledger", "export", "main.beancount"])
            .unwrap();
        let Command::Export { ledger, format } = args.command else {
            panic!("Expected export command");
        };
        assert_eq!(PathBuf::from("main.beancount"), ledger);
        assert_eq!(OutputFormat::Csv, format);
        assert_eq!(None, args.config);
    }

    #[test]
    fn test_global_config() {
        let args = Args::try_parse_from([
            "beancount-import-ledger",
            "accounts",
            "main.beancount",
            "--config",
            "config.yaml",
        ])
        .unwrap();
        assert_eq!(Some(PathBuf::from("config.yaml")), args.config);
    }
}
