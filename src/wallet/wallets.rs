use crate::core::{Blockchain, TXInput, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{UTXOSet, Utxo};
use crate::wallet::{generate_address, validate_address};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub address: String,
    pub label: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    Received,
    Sent,
    Mined,
}

/// One confirmed transaction as seen from a single address.
///
/// For `Sent`, `amount` is what left for other addresses and `fee` is the
/// implicit fee; change back to the address is netted out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tx_id: String,
    pub block_index: u64,
    pub timestamp: i64,
    pub kind: HistoryKind,
    pub amount: u64,
    pub fee: u64,
}

/// The set of addresses this wallet recognises. Purely local bookkeeping:
/// ownership of an output means its address is in this list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallets {
    addresses: Vec<WalletAddress>,
}

impl Wallets {
    pub fn new() -> Wallets {
        Wallets {
            addresses: Vec::new(),
        }
    }

    pub fn create_address(&mut self, label: &str, created_at: i64) -> String {
        let address = generate_address();
        self.addresses.push(WalletAddress {
            address: address.clone(),
            label: label.to_string(),
            created_at,
        });
        info!("Created address {address} ({label})");
        address
    }

    pub fn add_address(&mut self, entry: WalletAddress) -> Result<()> {
        if !validate_address(&entry.address) {
            return Err(BlockchainError::InvalidAddress(entry.address));
        }
        if self.contains(&entry.address) {
            return Err(BlockchainError::Wallet(format!(
                "Address {} is already in the wallet",
                entry.address
            )));
        }
        self.addresses.push(entry);
        Ok(())
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a.address == address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        self.addresses.iter().map(|a| a.address.clone()).collect()
    }

    pub fn get_entries(&self) -> &[WalletAddress] {
        self.addresses.as_slice()
    }

    pub fn get_utxos(&self, ledger: &Blockchain, address: &str) -> Vec<Utxo> {
        UTXOSet::new(ledger).find_utxo(address)
    }

    pub fn get_balance(&self, ledger: &Blockchain, address: &str) -> u64 {
        UTXOSet::new(ledger).balance(address)
    }

    pub fn total_balance(&self, ledger: &Blockchain) -> u64 {
        let utxo_set = UTXOSet::new(ledger);
        self.addresses
            .iter()
            .fold(0u64, |total, a| total.saturating_add(utxo_set.balance(&a.address)))
    }

    /// Builds, but does not submit, a payment of `amount` from `from` to `to`.
    /// A missing fee defaults to the chain's minimum fee.
    pub fn create_transaction(
        &self,
        ledger: &Blockchain,
        from: &str,
        to: &str,
        amount: u64,
        fee: Option<u64>,
    ) -> Result<Transaction> {
        if !self.contains(from) {
            return Err(BlockchainError::Wallet(format!(
                "Address {from} does not belong to this wallet"
            )));
        }
        if amount == 0 {
            return Err(BlockchainError::MalformedInput(
                "Amount must be positive".to_string(),
            ));
        }
        if !validate_address(to) {
            return Err(BlockchainError::InvalidAddress(to.to_string()));
        }

        let fee = fee.unwrap_or(ledger.get_config().min_transaction_fee);
        let required = amount.checked_add(fee).ok_or_else(|| {
            BlockchainError::MalformedInput("Amount plus fee overflows".to_string())
        })?;

        let (accumulated, selected) = UTXOSet::new(ledger).find_spendable_outputs(from, required);
        if accumulated < required {
            return Err(BlockchainError::InsufficientFunds {
                required,
                available: accumulated,
            });
        }

        let inputs = selected
            .iter()
            .map(|utxo| TXInput::new(&utxo.source_tx_id, utxo.output_index))
            .collect();
        let mut outputs = vec![TXOutput::new(amount, to)?];
        let change = accumulated - required;
        if change > 0 {
            outputs.push(TXOutput::new(change, from)?);
        }

        Transaction::new(inputs, outputs, ledger.get_clock().now_ms())
    }

    /// `create_transaction` followed by mempool admission.
    pub fn send(
        &self,
        ledger: &mut Blockchain,
        from: &str,
        to: &str,
        amount: u64,
        fee: Option<u64>,
    ) -> Result<Transaction> {
        let tx = self.create_transaction(ledger, from, to, amount, fee)?;
        ledger.add_transaction(tx.clone())?;
        info!("Sent {amount} from {from} to {to} in {}", tx.get_id());
        Ok(tx)
    }

    /// Confirmed activity of `address`, most recent block first.
    pub fn get_address_history(&self, ledger: &Blockchain, address: &str) -> Result<Vec<HistoryEntry>> {
        let mut history = vec![];

        for block in ledger.get_blocks().iter().rev() {
            for tx in block.get_transactions() {
                let received: u64 = tx
                    .get_outputs()
                    .iter()
                    .filter(|out| out.is_locked_with(address))
                    .map(|out| out.get_value())
                    .sum();

                let mut entry = HistoryEntry {
                    tx_id: tx.get_id().to_string(),
                    block_index: block.get_index(),
                    timestamp: tx.get_timestamp(),
                    kind: HistoryKind::Received,
                    amount: received,
                    fee: 0,
                };

                if tx.is_coinbase() {
                    if received == 0 {
                        continue;
                    }
                    entry.kind = HistoryKind::Mined;
                    history.push(entry);
                    continue;
                }

                let spent = Self::spent_by(ledger, tx, address)?;
                if spent > 0 {
                    let outputs = tx.get_output_value()?;
                    entry.kind = HistoryKind::Sent;
                    entry.amount = outputs - received;
                    entry.fee = tx.get_input_value(ledger)?.saturating_sub(outputs);
                    history.push(entry);
                } else if received > 0 {
                    history.push(entry);
                }
            }
        }
        Ok(history)
    }

    // Value of the inputs of `tx` that consumed outputs of `address`
    fn spent_by(ledger: &Blockchain, tx: &Transaction, address: &str) -> Result<u64> {
        let mut total = 0u64;
        for input in tx.get_inputs() {
            let source = ledger.get_transaction(input.get_source_tx_id()).ok_or_else(|| {
                BlockchainError::InvalidState(format!(
                    "History references unknown transaction {}",
                    input.get_source_tx_id()
                ))
            })?;
            if let Some(out) = source.get_outputs().get(input.get_output_index()) {
                if out.is_locked_with(address) {
                    total = total.saturating_add(out.get_value());
                }
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::test_utils::{TestChain, TEST_EPOCH_MS};

    fn funded_wallet(amount: u64) -> (TestChain, Wallets, String) {
        let net = TestChain::funded(amount);
        let mut wallets = Wallets::new();
        let owner = net.funded_address.clone();
        wallets
            .add_address(WalletAddress {
                address: owner.clone(),
                label: "funded".to_string(),
                created_at: TEST_EPOCH_MS,
            })
            .unwrap();
        (net, wallets, owner)
    }

    #[test]
    fn test_send_with_change() {
        let (mut net, wallets, owner) = funded_wallet(100);
        let recipient = generate_address();

        let tx = wallets
            .send(&mut net.ledger, &owner, &recipient, 30, Some(0))
            .unwrap();
        assert_eq!(tx.get_inputs().len(), 1);
        assert_eq!(tx.get_outputs().len(), 2);
        assert_eq!(tx.get_outputs()[0].get_value(), 30);
        assert!(tx.get_outputs()[0].is_locked_with(&recipient));
        assert_eq!(tx.get_outputs()[1].get_value(), 70);
        assert!(tx.get_outputs()[1].is_locked_with(&owner));
        assert_eq!(net.ledger.get_mempool().get_all(), &[tx]);
    }

    #[test]
    fn test_exact_spend_has_no_change() {
        let (net, wallets, owner) = funded_wallet(100);
        let tx = wallets
            .create_transaction(&net.ledger, &owner, &generate_address(), 90, Some(10))
            .unwrap();
        assert_eq!(tx.get_outputs().len(), 1);
    }

    #[test]
    fn test_default_fee_is_minimum_fee() {
        let (net, wallets, owner) = funded_wallet(50_000);
        let min_fee = net.ledger.get_config().min_transaction_fee;
        let tx = wallets
            .create_transaction(&net.ledger, &owner, &generate_address(), 10_000, None)
            .unwrap();
        assert_eq!(tx.get_outputs()[1].get_value(), 50_000 - 10_000 - min_fee);
    }

    #[test]
    fn test_rejections() {
        let (net, wallets, owner) = funded_wallet(100);
        let to = generate_address();

        assert!(matches!(
            wallets.create_transaction(&net.ledger, &to, &owner, 1, Some(0)),
            Err(BlockchainError::Wallet(_))
        ));
        assert!(matches!(
            wallets.create_transaction(&net.ledger, &owner, &to, 0, Some(0)),
            Err(BlockchainError::MalformedInput(_))
        ));
        assert!(matches!(
            wallets.create_transaction(&net.ledger, &owner, "bogus", 1, Some(0)),
            Err(BlockchainError::InvalidAddress(_))
        ));
        assert_eq!(
            wallets.create_transaction(&net.ledger, &owner, &to, 95, Some(10)),
            Err(BlockchainError::InsufficientFunds {
                required: 105,
                available: 100
            })
        );
    }

    #[test]
    fn test_add_address_checks_format_and_duplicates() {
        let mut wallets = Wallets::new();
        let address = wallets.create_address("main", 1);
        let duplicate = WalletAddress {
            address,
            label: "again".to_string(),
            created_at: 2,
        };
        assert!(matches!(
            wallets.add_address(duplicate),
            Err(BlockchainError::Wallet(_))
        ));
        let malformed = WalletAddress {
            address: "xyz".to_string(),
            label: String::new(),
            created_at: 3,
        };
        assert!(matches!(
            wallets.add_address(malformed),
            Err(BlockchainError::InvalidAddress(_))
        ));
        assert_eq!(wallets.get_entries().len(), 1);
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let (mut net, mut wallets, owner) = funded_wallet(1_000);
        let friend = wallets.create_address("friend", TEST_EPOCH_MS);

        wallets
            .send(&mut net.ledger, &owner, &friend, 300, Some(50))
            .unwrap();
        net.ledger.mine_next_block(&generate_address(), None).unwrap();

        let history = wallets.get_address_history(&net.ledger, &owner).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, HistoryKind::Sent);
        assert_eq!(history[0].block_index, 2);
        assert_eq!(history[0].amount, 300);
        assert_eq!(history[0].fee, 50);
        assert_eq!(history[1].kind, HistoryKind::Mined);
        assert_eq!(history[1].amount, 1_000);

        let friend_history = wallets.get_address_history(&net.ledger, &friend).unwrap();
        assert_eq!(friend_history.len(), 1);
        assert_eq!(friend_history[0].kind, HistoryKind::Received);
        assert_eq!(friend_history[0].amount, 300);

        assert_eq!(wallets.get_balance(&net.ledger, &owner), 650);
        assert_eq!(wallets.total_balance(&net.ledger), 950);
    }
}
