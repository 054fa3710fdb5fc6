//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`]. Validation
//! failures carry a human-readable reason and are never auto-corrected.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Why a transaction was refused by the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRejection {
    /// Missing id, or id does not match the recomputed digest
    TamperedOrMalformed(String),
    /// Coinbase transaction that references prior outputs
    CoinbaseWithInputs,
    /// Regular transaction without inputs or without outputs
    MissingInputsOrOutputs,
    /// Input points at an unknown transaction or output index
    DanglingReference(String),
    /// Referenced output is already consumed elsewhere
    DoubleSpend(String),
    /// Outputs are worth more than the resolved inputs
    Overspend { inputs: u64, outputs: u64 },
    /// A transaction with the same id is already on chain or pending
    Duplicate(String),
}

impl fmt::Display for TransactionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionRejection::TamperedOrMalformed(msg) => {
                write!(f, "tampered or malformed transaction: {msg}")
            }
            TransactionRejection::CoinbaseWithInputs => {
                write!(f, "coinbase transaction must not have inputs")
            }
            TransactionRejection::MissingInputsOrOutputs => {
                write!(f, "transaction needs at least one input and one output")
            }
            TransactionRejection::DanglingReference(msg) => {
                write!(f, "dangling reference: {msg}")
            }
            TransactionRejection::DoubleSpend(msg) => write!(f, "double spend: {msg}"),
            TransactionRejection::Overspend { inputs, outputs } => {
                write!(f, "overspend: outputs {outputs} exceed inputs {inputs}")
            }
            TransactionRejection::Duplicate(id) => write!(f, "duplicate transaction {id}"),
        }
    }
}

/// Comprehensive error types for ledger operations
#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Bad caller input such as zero amounts
    MalformedInput(String),
    /// Invalid address format
    InvalidAddress(String),
    /// Transaction failed validation
    InvalidTransaction(TransactionRejection),
    /// Block validation errors
    InvalidBlock(String),
    /// Chain validation failed at a specific block
    InvalidChain { index: usize, reason: String },
    /// Insufficient funds for transaction
    InsufficientFunds { required: u64, available: u64 },
    /// Proof-of-work search gave up at its attempt ceiling
    ExcessiveAttempts { attempts: u64 },
    /// Mining errors
    Mining(String),
    /// Wallet operation errors
    Wallet(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Operation not allowed in the current ledger state
    InvalidState(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::InvalidTransaction(reason) => {
                write!(f, "Invalid transaction: {reason}")
            }
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidChain { index, reason } => {
                write!(f, "Invalid chain at block {index}: {reason}")
            }
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::ExcessiveAttempts { attempts } => write!(
                f,
                "Mining gave up after {attempts} attempts; difficulty is too high"
            ),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<TransactionRejection> for BlockchainError {
    fn from(rejection: TransactionRejection) -> Self {
        BlockchainError::InvalidTransaction(rejection)
    }
}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
