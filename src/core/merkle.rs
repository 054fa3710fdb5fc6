//! Transaction digest carried in every block header.
//!
//! This is a single hash over the concatenated transaction ids rather than a
//! tree: it detects tampering but offers no inclusion proofs.

use crate::core::Transaction;
use crate::utils::sha256_hex;

pub fn calculate_merkle_root(transactions: &[Transaction]) -> String {
    let concatenated: String = transactions.iter().map(|tx| tx.get_id()).collect();
    sha256_hex(concatenated.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::generate_address;

    #[test]
    fn test_root_depends_on_order() {
        let a = Transaction::new_coinbase_tx(&generate_address(), 1, 1).unwrap();
        let b = Transaction::new_coinbase_tx(&generate_address(), 2, 1).unwrap();

        let forward = calculate_merkle_root(&[a.clone(), b.clone()]);
        let backward = calculate_merkle_root(&[b.clone(), a.clone()]);
        assert_ne!(forward, backward);
        assert_eq!(
            forward,
            sha256_hex(format!("{}{}", a.get_id(), b.get_id()).as_bytes())
        );
    }

    #[test]
    fn test_empty_root_is_hash_of_empty_string() {
        assert_eq!(calculate_merkle_root(&[]), sha256_hex(b""));
    }
}
