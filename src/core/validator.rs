//! Transaction admission rules.
//!
//! Rules run in a fixed order and stop at the first failure:
//!
//! 1. the id is present and matches the recomputed digest
//! 2. a coinbase has no inputs, and nothing else is checked for it
//! 3. a regular transaction has at least one input and one output
//! 4. every input resolves to an existing transaction and output index
//! 5. no referenced output is spent by another transaction, on chain or pending
//! 6. resolved inputs cover the outputs; any surplus is the fee

use crate::core::{Blockchain, Transaction};
use crate::error::{BlockchainError, Result, TransactionRejection};
use std::collections::HashSet;

/// Validates transactions against the state of one ledger.
pub struct TransactionValidator<'a> {
    ledger: &'a Blockchain,
}

impl<'a> TransactionValidator<'a> {
    pub fn new(ledger: &'a Blockchain) -> TransactionValidator<'a> {
        TransactionValidator { ledger }
    }

    pub fn validate(&self, tx: &Transaction) -> Result<()> {
        tx.verify_id()?;

        if tx.is_coinbase() {
            if !tx.get_inputs().is_empty() {
                return Err(TransactionRejection::CoinbaseWithInputs.into());
            }
            return Ok(());
        }

        if tx.get_inputs().is_empty() || tx.get_outputs().is_empty() {
            return Err(TransactionRejection::MissingInputsOrOutputs.into());
        }

        let input_value = tx.get_input_value(self.ledger)?;
        self.check_unspent(tx)?;

        let output_value = tx.get_output_value()?;
        if input_value < output_value {
            return Err(TransactionRejection::Overspend {
                inputs: input_value,
                outputs: output_value,
            }
            .into());
        }
        Ok(())
    }

    fn check_unspent(&self, tx: &Transaction) -> Result<()> {
        let mut seen = HashSet::new();
        for input in tx.get_inputs() {
            let outpoint = (input.get_source_tx_id(), input.get_output_index());
            if !seen.insert(outpoint) {
                return Err(double_spend(outpoint, "listed twice in the same transaction"));
            }
            if self
                .ledger
                .is_output_spent(outpoint.0, outpoint.1, Some(tx.get_id()))
            {
                return Err(double_spend(outpoint, "already spent"));
            }
        }
        Ok(())
    }
}

fn double_spend(outpoint: (&str, usize), why: &str) -> BlockchainError {
    TransactionRejection::DoubleSpend(format!("output {}:{} {why}", outpoint.0, outpoint.1)).into()
}
