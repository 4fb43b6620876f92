use anyhow::{anyhow, ensure, Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ledger::AccountType;

pub const DEFAULT_TAG_SEPARATOR: char = ';';
pub const DEFAULT_OPENING_BALANCE_ACCOUNT: &str = "Opening-Balances";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account_type_names: AccountTypeNames,
    pub tag_separator: char,
    pub opening_balance_account: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_type_names: AccountTypeNames::default(),
            tag_separator: DEFAULT_TAG_SEPARATOR,
            opening_balance_account: DEFAULT_OPENING_BALANCE_ACCOUNT.to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading config from {}...", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| anyhow!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::info!("Loading config...done");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.account_type_names.validate()?;
        ensure!(
            !self.opening_balance_account.is_empty(),
            "opening_balance_account must not be empty"
        );
        ensure!(
            !self.tag_separator.is_whitespace(),
            "tag_separator must not be whitespace"
        );
        Ok(())
    }
}

/// Maps the first segment of an account name to its [AccountType].
///
/// Ledgers may rename the top level accounts with `option "name_assets" "..."`,
/// so every import gets its own copy of this table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountTypeNames {
    pub assets: String,
    pub liabilities: String,
    pub equity: String,
    pub income: String,
    pub expenses: String,
}

impl Default for AccountTypeNames {
    fn default() -> Self {
        Self {
            assets: "Assets".to_string(),
            liabilities: "Liabilities".to_string(),
            equity: "Equity".to_string(),
            income: "Income".to_string(),
            expenses: "Expenses".to_string(),
        }
    }
}

impl AccountTypeNames {
    pub fn account_type(&self, account_name: &str) -> AccountType {
        let root = account_name.split(':').next().unwrap_or_default();
        if root == self.assets {
            AccountType::Assets
        } else if root == self.liabilities {
            AccountType::Liabilities
        } else if root == self.equity {
            AccountType::Equity
        } else if root == self.income {
            AccountType::Income
        } else if root == self.expenses {
            AccountType::Expenses
        } else {
            AccountType::Unknown
        }
    }

    /// Applies a beancount `option`. Returns false if the option doesn't rename an account type.
    pub fn set_option(&mut self, name: &str, value: &str) -> bool {
        let slot = match name {
            "name_assets" => &mut self.assets,
            "name_liabilities" => &mut self.liabilities,
            "name_equity" => &mut self.equity,
            "name_income" => &mut self.income,
            "name_expenses" => &mut self.expenses,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }

    fn names(&self) -> [&str; 5] {
        [
            &self.assets,
            &self.liabilities,
            &self.equity,
            &self.income,
            &self.expenses,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let names = self.names();
        for (index, name) in names.iter().enumerate() {
            ensure!(!name.is_empty(), "Account type names must not be empty");
            ensure!(
                !name.contains(':'),
                "Account type name '{}' must not contain ':'",
                name
            );
            ensure!(
                !names[..index].contains(name),
                "Account type name '{}' is used twice",
                name
            );
        }
        Ok(())
    }
}
