/// Errors that abort a whole ledger import.
///
/// Every variant is terminal: once one is returned, no transactions from the
/// file are handed to the caller.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("Invalid beancount file: {0}")]
    InvalidFile(String),

    #[error("Beancount file uses `include`, which is not supported: {0}")]
    IncludeNotSupported(String),

    #[error("Invalid amount: {0}")]
    AmountInvalid(String),

    #[error("Invalid amount expression: {0}")]
    InvalidAmountExpression(String),

    #[error("Missing account data: {0}")]
    MissingAccountData(String),

    #[error("Missing transaction time: {0}")]
    MissingTransactionTime(String),

    #[error("Split transactions are not supported: {0}")]
    NotSupportedSplitTransactions(String),

    #[error("Transaction type is not supported: {0}")]
    UnsupportedTransactionType(String),

    #[error("No transaction data found in file")]
    NoTransactionData,

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Stable identifier of the error kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            ImportError::InvalidFile(_) => "invalid-file",
            ImportError::IncludeNotSupported(_) => "include-not-supported",
            ImportError::AmountInvalid(_) => "amount-invalid",
            ImportError::InvalidAmountExpression(_) => "invalid-amount-expression",
            ImportError::MissingAccountData(_) => "missing-account-data",
            ImportError::MissingTransactionTime(_) => "missing-transaction-time",
            ImportError::NotSupportedSplitTransactions(_) => "not-supported-split-transactions",
            ImportError::UnsupportedTransactionType(_) => "unsupported-transaction-type",
            ImportError::NoTransactionData => "no-transaction-data-found",
            ImportError::Io(_) => "io",
        }
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
