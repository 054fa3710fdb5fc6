//! The ledger and wallet a command works on, backed by the snapshot file.

use crate::config::Settings;
use crate::core::Blockchain;
use crate::error::{BlockchainError, Result};
use crate::storage::Snapshot;
use crate::utils::{Clock, SystemClock};
use crate::wallet::Wallets;
use std::sync::Arc;

pub struct Workspace {
    pub settings: Settings,
    pub ledger: Blockchain,
    pub wallets: Wallets,
}

impl Workspace {
    /// Starts a fresh chain from `settings.chain`. Refuses to replace an
    /// existing snapshot unless `force` is set.
    pub fn init(settings: Settings, force: bool) -> Result<Workspace> {
        Self::init_with_clock(settings, force, Arc::new(SystemClock))
    }

    pub fn init_with_clock(
        settings: Settings,
        force: bool,
        clock: Arc<dyn Clock>,
    ) -> Result<Workspace> {
        if settings.snapshot_path.exists() && !force {
            return Err(BlockchainError::InvalidState(format!(
                "{} already exists, pass --force to overwrite it",
                settings.snapshot_path.display()
            )));
        }
        let ledger = Blockchain::create_with_clock(settings.chain.clone(), clock)?;
        let workspace = Workspace {
            settings,
            ledger,
            wallets: Wallets::new(),
        };
        workspace.save()?;
        Ok(workspace)
    }

    pub fn open(settings: Settings) -> Result<Workspace> {
        Self::open_with_clock(settings, Arc::new(SystemClock))
    }

    pub fn open_with_clock(settings: Settings, clock: Arc<dyn Clock>) -> Result<Workspace> {
        if !settings.snapshot_path.exists() {
            return Err(BlockchainError::InvalidState(format!(
                "No chain at {}, run `init` first",
                settings.snapshot_path.display()
            )));
        }
        let (ledger, wallets) = Snapshot::load(&settings.snapshot_path)?.restore(clock)?;
        Ok(Workspace {
            settings,
            ledger,
            wallets,
        })
    }

    pub fn save(&self) -> Result<()> {
        Snapshot::export(&self.ledger, &self.wallets).save(&self.settings.snapshot_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::test_utils::{create_temp_dir, test_config, TEST_EPOCH_MS};
    use crate::utils::ManualClock;

    fn settings_in(dir: &tempfile::TempDir) -> Settings {
        Settings {
            chain: test_config(),
            snapshot_path: dir.path().join("chain.json"),
            ..Settings::default()
        }
    }

    #[test]
    fn test_init_then_open() {
        let dir = create_temp_dir().unwrap();
        let clock = Arc::new(ManualClock::new(TEST_EPOCH_MS));

        let mut workspace =
            Workspace::init_with_clock(settings_in(&dir), false, clock.clone()).unwrap();
        let address = workspace.wallets.create_address("main", TEST_EPOCH_MS);
        workspace.ledger.mine_next_block(&address, None).unwrap();
        workspace.save().unwrap();

        let reopened = Workspace::open_with_clock(settings_in(&dir), clock).unwrap();
        assert_eq!(reopened.ledger.get_height(), 2);
        assert_eq!(reopened.wallets.get_addresses(), vec![address.clone()]);
        assert_eq!(
            reopened.wallets.get_balance(&reopened.ledger, &address),
            test_config().block_reward
        );
    }

    #[test]
    fn test_init_does_not_clobber() {
        let dir = create_temp_dir().unwrap();
        let clock = Arc::new(ManualClock::new(TEST_EPOCH_MS));
        Workspace::init_with_clock(settings_in(&dir), false, clock.clone()).unwrap();

        assert!(matches!(
            Workspace::init_with_clock(settings_in(&dir), false, clock.clone()),
            Err(BlockchainError::InvalidState(_))
        ));
        assert!(Workspace::init_with_clock(settings_in(&dir), true, clock).is_ok());
    }

    #[test]
    fn test_open_without_chain() {
        let dir = create_temp_dir().unwrap();
        assert!(matches!(
            Workspace::open(settings_in(&dir)),
            Err(BlockchainError::InvalidState(_))
        ));
    }
}
