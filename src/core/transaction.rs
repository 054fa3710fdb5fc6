// Value transfer records. Inputs point at earlier outputs by (tx id, index);
// ownership is bookkeeping only, so there are no signatures.

use crate::core::Blockchain;
use crate::error::{BlockchainError, Result, TransactionRejection};
use crate::utils::hash_json;
use crate::wallet::{validate_address, GENESIS_ADDRESS};
use serde::{Deserialize, Serialize};

// A reference to an output of an earlier transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TXInput {
    source_tx_id: String,
    output_index: usize,
}

impl TXInput {
    pub fn new(source_tx_id: &str, output_index: usize) -> TXInput {
        TXInput {
            source_tx_id: source_tx_id.to_string(),
            output_index,
        }
    }

    pub fn get_source_tx_id(&self) -> &str {
        self.source_tx_id.as_str()
    }

    pub fn get_output_index(&self) -> usize {
        self.output_index
    }
}

// An amount payable to an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TXOutput {
    address: String,
    amount: u64,
}

impl TXOutput {
    pub fn new(amount: u64, address: &str) -> Result<TXOutput> {
        if !validate_address(address) {
            return Err(BlockchainError::InvalidAddress(address.to_string()));
        }
        Ok(TXOutput {
            address: address.to_string(),
            amount,
        })
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_value(&self) -> u64 {
        self.amount
    }

    pub fn is_locked_with(&self, address: &str) -> bool {
        self.address == address
    }
}

/// The fields covered by a transaction id, in hashing order.
#[derive(Serialize)]
struct TransactionDigest<'a> {
    inputs: &'a [TXInput],
    outputs: &'a [TXOutput],
    timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: String,
    inputs: Vec<TXInput>,
    outputs: Vec<TXOutput>,
    timestamp: i64,
    is_coinbase: bool,
}

impl Transaction {
    /// Builds a regular transaction and stamps its id.
    pub fn new(inputs: Vec<TXInput>, outputs: Vec<TXOutput>, timestamp: i64) -> Result<Transaction> {
        Self::build(inputs, outputs, timestamp, false)
    }

    /// Block reward paid to the producer of a block
    pub fn new_coinbase_tx(to: &str, reward: u64, timestamp: i64) -> Result<Transaction> {
        let txout = TXOutput::new(reward, to)?;
        Self::build(vec![], vec![txout], timestamp, true)
    }

    /// Zero-value marker carried by block 0
    pub fn new_genesis_tx(timestamp: i64) -> Result<Transaction> {
        Self::new_coinbase_tx(GENESIS_ADDRESS, 0, timestamp)
    }

    fn build(
        inputs: Vec<TXInput>,
        outputs: Vec<TXOutput>,
        timestamp: i64,
        is_coinbase: bool,
    ) -> Result<Transaction> {
        let mut tx = Transaction {
            id: String::new(),
            inputs,
            outputs,
            timestamp,
            is_coinbase,
        };
        tx.id = tx.compute_id()?;
        Ok(tx)
    }

    /// Digest of `{inputs, outputs, timestamp}`
    pub fn compute_id(&self) -> Result<String> {
        hash_json(&TransactionDigest {
            inputs: &self.inputs,
            outputs: &self.outputs,
            timestamp: self.timestamp,
        })
    }

    /// The id must be present and must match.
    pub fn verify_id(&self) -> std::result::Result<(), TransactionRejection> {
        if self.id.is_empty() {
            return Err(TransactionRejection::TamperedOrMalformed(
                "missing id".to_string(),
            ));
        }
        let recomputed = self
            .compute_id()
            .map_err(|e| TransactionRejection::TamperedOrMalformed(e.to_string()))?;
        if recomputed != self.id {
            return Err(TransactionRejection::TamperedOrMalformed(format!(
                "id {} does not match contents ({recomputed})",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_coinbase(&self) -> bool {
        self.is_coinbase
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_inputs(&self) -> &[TXInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TXOutput] {
        self.outputs.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for output in &self.outputs {
            total = total
                .checked_add(output.get_value())
                .ok_or_else(|| BlockchainError::MalformedInput("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    /// Sum of the outputs this transaction consumes, resolved against the
    /// chain and the mempool.
    pub fn get_input_value(&self, blockchain: &Blockchain) -> Result<u64> {
        let mut total = 0u64;
        for input in &self.inputs {
            let source = blockchain
                .get_transaction(input.get_source_tx_id())
                .ok_or_else(|| {
                    TransactionRejection::DanglingReference(format!(
                        "transaction {} not found",
                        input.get_source_tx_id()
                    ))
                })?;
            let output = source.outputs.get(input.get_output_index()).ok_or_else(|| {
                TransactionRejection::DanglingReference(format!(
                    "output {} out of range for {}",
                    input.get_output_index(),
                    input.get_source_tx_id()
                ))
            })?;
            total = total
                .checked_add(output.get_value())
                .ok_or_else(|| BlockchainError::MalformedInput("Input value overflow".to_string()))?;
        }
        Ok(total)
    }

    /// Input value minus output value; negative when the transaction overspends.
    pub fn implicit_fee(&self, blockchain: &Blockchain) -> Result<i128> {
        if self.is_coinbase {
            return Ok(0);
        }
        let inputs = self.get_input_value(blockchain)?;
        let outputs = self.get_output_value()?;
        Ok(inputs as i128 - outputs as i128)
    }

    #[cfg(test)]
    pub(crate) fn outputs_mut(&mut self) -> &mut Vec<TXOutput> {
        &mut self.outputs
    }

    #[cfg(test)]
    pub(crate) fn with_recomputed_id(mut self) -> Result<Transaction> {
        self.id = self.compute_id()?;
        Ok(self)
    }
}
