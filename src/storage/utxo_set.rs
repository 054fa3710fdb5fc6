use crate::core::Blockchain;
use serde::{Deserialize, Serialize};

/// An unspent output, derived by scanning; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub source_tx_id: String,
    pub output_index: usize,
    pub amount: u64,
    pub address: String,
    pub block_index: u64,
    pub confirmations: u64,
}

/// Read-only view over the spendable outputs of a ledger.
///
/// Only mined outputs are spendable. An output counts as spent as soon as a
/// pending transaction references it.
pub struct UTXOSet<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> UTXOSet<'a> {
    pub fn new(blockchain: &'a Blockchain) -> UTXOSet<'a> {
        UTXOSet { blockchain }
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        self.blockchain
    }

    /// Unspent outputs locked to `address`, oldest block first.
    pub fn find_utxo(&self, address: &str) -> Vec<Utxo> {
        let height = self.blockchain.get_height();
        let mut utxos = vec![];

        for block in self.blockchain.get_blocks() {
            for tx in block.get_transactions() {
                for (idx, out) in tx.get_outputs().iter().enumerate() {
                    if !out.is_locked_with(address)
                        || self.blockchain.is_output_spent(tx.get_id(), idx, None)
                    {
                        continue;
                    }
                    utxos.push(Utxo {
                        source_tx_id: tx.get_id().to_string(),
                        output_index: idx,
                        amount: out.get_value(),
                        address: address.to_string(),
                        block_index: block.get_index(),
                        confirmations: height - block.get_index(),
                    });
                }
            }
        }
        utxos
    }

    /// Greedy largest-first selection until `amount` is covered. Returns the
    /// accumulated value with the chosen outputs; the value falls short of
    /// `amount` when the address cannot afford it.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> (u64, Vec<Utxo>) {
        let mut candidates = self.find_utxo(address);
        candidates.sort_by(|a, b| b.amount.cmp(&a.amount));

        let mut accumulated = 0u64;
        let mut selected = vec![];
        for utxo in candidates {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated.saturating_add(utxo.amount);
            selected.push(utxo);
        }
        (accumulated, selected)
    }

    pub fn balance(&self, address: &str) -> u64 {
        self.find_utxo(address)
            .iter()
            .fold(0u64, |total, utxo| total.saturating_add(utxo.amount))
    }
}
