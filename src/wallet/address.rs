use rand::Rng;

/// Every address starts with this character
pub const ADDRESS_PREFIX: char = '1';

/// Total address length, prefix included
pub const ADDRESS_LEN: usize = 34;

/// Owner of the zero-value marker output in block 0
pub const GENESIS_ADDRESS: &str = "1111111111111111111111111111111111";

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A fresh random address. Addresses are opaque identifiers; nothing is
/// derived from a key.
pub fn generate_address() -> String {
    let mut rng = rand::thread_rng();
    let mut address = String::with_capacity(ADDRESS_LEN);
    address.push(ADDRESS_PREFIX);
    for _ in 1..ADDRESS_LEN {
        let idx = rng.gen_range(0..BASE58_ALPHABET.len());
        address.push(BASE58_ALPHABET[idx] as char);
    }
    address
}

pub fn validate_address(address: &str) -> bool {
    if address.len() != ADDRESS_LEN {
        return false;
    }
    match address.strip_prefix(ADDRESS_PREFIX) {
        // Decoding rejects anything outside the base58 alphabet
        Some(rest) => bs58::decode(rest).into_vec().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_addresses_validate() {
        for _ in 0..100 {
            let address = generate_address();
            assert_eq!(address.len(), ADDRESS_LEN);
            assert!(address.starts_with(ADDRESS_PREFIX));
            assert!(validate_address(&address), "{address}");
        }
        assert_ne!(generate_address(), generate_address());
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        let good = generate_address();
        assert!(!validate_address(""));
        assert!(!validate_address(&good[..ADDRESS_LEN - 1]));
        assert!(!validate_address(&format!("{good}1")));
        assert!(!validate_address(&format!("2{}", &good[1..])));
        // 0, O, I and l are not base58
        assert!(!validate_address(&format!("1{}0", &good[1..ADDRESS_LEN - 1])));
        assert!(!validate_address(&format!("1{}l", &good[1..ADDRESS_LEN - 1])));
    }

    #[test]
    fn test_genesis_address_is_well_formed() {
        assert!(validate_address(GENESIS_ADDRESS));
    }
}
