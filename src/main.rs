// Entry point for the forge-chain CLI. Every command opens the snapshot,
// works on the ledger in memory and writes the snapshot back.
use clap::Parser;
use forge_chain::core::monetary::conversions::format_satoshis;
use forge_chain::utils::Clock;
use forge_chain::{Command, LogProgress, MinedBlock, Miner, MinerStatus, Opt, Settings, Workspace};
use log::{error, LevelFilter};
use std::process;

fn main() {
    // Info level shows ledger events without per-attempt noise
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &opt.config {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env()?,
    };
    run_command(settings, opt.command)
}

fn run_command(settings: Settings, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Init { force } => {
            let workspace = Workspace::init(settings, force)?;
            let genesis = workspace
                .ledger
                .get_latest_block()
                .ok_or("Chain has no genesis block")?;
            println!("Genesis block {}", genesis.get_hash());
            println!(
                "Snapshot written to {}",
                workspace.settings.snapshot_path.display()
            );
        }
        Command::NewAddress { label } => {
            let mut workspace = Workspace::open(settings)?;
            let now = workspace.ledger.get_clock().now_ms();
            let address = workspace.wallets.create_address(&label, now);
            workspace.save()?;
            println!("Your new address: {address}");
        }
        Command::ListAddresses => {
            let workspace = Workspace::open(settings)?;
            for entry in workspace.wallets.get_entries() {
                let balance = workspace
                    .wallets
                    .get_balance(&workspace.ledger, &entry.address);
                println!(
                    "{} {:>24} {}",
                    entry.address,
                    format_satoshis(balance),
                    entry.label
                );
            }
            println!(
                "Total: {}",
                format_satoshis(workspace.wallets.total_balance(&workspace.ledger))
            );
        }
        Command::GetBalance { address } => {
            let workspace = Workspace::open(settings)?;
            let balance = workspace.wallets.get_balance(&workspace.ledger, &address);
            println!("Balance of {address}: {balance} ({})", format_satoshis(balance));
        }
        Command::Send {
            from,
            to,
            amount,
            fee,
            mine,
        } => {
            let mut workspace = Workspace::open(settings)?;
            let tx = workspace
                .wallets
                .send(&mut workspace.ledger, &from, &to, amount, fee)?;
            println!("Submitted {}", tx.get_id());
            if mine {
                let mined = mine_block(&mut workspace, &from, None)?;
                println!("Mined block {} {}", mined.index, mined.hash);
            }
            workspace.save()?;
        }
        Command::Mine { address, rate } => {
            let mut workspace = Workspace::open(settings)?;
            let mined = mine_block(&mut workspace, &address, rate)?;
            println!(
                "Mined block {} {} after {} attempts ({:.0} H/s)",
                mined.index, mined.hash, mined.report.attempts, mined.report.hash_rate
            );
            workspace.save()?;
        }
        Command::Printchain => {
            let workspace = Workspace::open(settings)?;
            for block in workspace.ledger.get_blocks().iter().rev() {
                println!("Block {}", block.get_index());
                println!("  Hash:        {}", block.get_hash());
                println!("  Prev hash:   {}", block.get_previous_hash());
                println!("  Merkle root: {}", block.get_merkle_root());
                println!("  Timestamp:   {}", block.get_timestamp());
                println!(
                    "  Difficulty:  {}  Nonce: {}",
                    block.get_difficulty(),
                    block.get_nonce()
                );
                for tx in block.get_transactions() {
                    println!("  - Transaction {}", tx.get_id());
                    for input in tx.get_inputs() {
                        println!(
                            "    -- Input {}:{}",
                            input.get_source_tx_id(),
                            input.get_output_index()
                        );
                    }
                    for output in tx.get_outputs() {
                        println!(
                            "    -- Output {} to {}",
                            output.get_value(),
                            output.get_address()
                        );
                    }
                }
                println!();
            }
            println!(
                "Pending: {} transaction(s), next difficulty {}",
                workspace.ledger.get_mempool().len(),
                workspace.ledger.get_difficulty()
            );
        }
        Command::Validate => {
            let workspace = Workspace::open(settings)?;
            workspace.ledger.validate_chain()?;
            println!(
                "Chain of {} blocks is valid",
                workspace.ledger.get_height()
            );
        }
        Command::History { address } => {
            let workspace = Workspace::open(settings)?;
            let history = workspace
                .wallets
                .get_address_history(&workspace.ledger, &address)?;
            if history.is_empty() {
                println!("No confirmed activity for {address}");
            }
            for entry in history {
                println!(
                    "block {:>5} {:?} {} fee {} tx {}",
                    entry.block_index, entry.kind, entry.amount, entry.fee, entry.tx_id
                );
            }
        }
    }
    Ok(())
}

// Mines one block with the configured miner, overriding its pace when asked
fn mine_block(
    workspace: &mut Workspace,
    address: &str,
    rate: Option<u32>,
) -> Result<MinedBlock, Box<dyn std::error::Error>> {
    let mut config = workspace.settings.miner.clone();
    if let Some(rate) = rate {
        config.target_hash_rate = rate;
    }
    let mut miner = Miner::from_config(&config);
    miner.start(&workspace.ledger, address)?;
    match miner.run(&mut workspace.ledger, &mut LogProgress) {
        MinerStatus::Found(mined) => Ok(mined),
        MinerStatus::Failed(e) => Err(e.into()),
        other => Err(format!("Mining ended without a block: {other:?}").into()),
    }
}
