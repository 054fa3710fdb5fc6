use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "forge-chain", about = "Miniature proof-of-work ledger")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML settings file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "init", about = "Create a new chain with its genesis block")]
    Init {
        #[arg(long, help = "Overwrite an existing snapshot")]
        force: bool,
    },
    #[command(name = "newaddress", about = "Add a new address to the wallet")]
    NewAddress {
        #[arg(long, default_value = "", help = "Label stored with the address")]
        label: String,
    },
    #[command(name = "listaddresses", about = "Print wallet addresses with balances")]
    ListAddresses,
    #[command(
        name = "getbalance",
        about = "Get the confirmed balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The address")]
        address: String,
    },
    #[command(name = "send", about = "Submit a payment to the mempool")]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send (in satoshis)")]
        amount: u64,
        #[arg(long, help = "Fee in satoshis, defaults to the chain minimum")]
        fee: Option<u64>,
        #[arg(long, help = "Mine a block right away, rewarding the sender")]
        mine: bool,
    },
    #[command(name = "mine", about = "Mine one block from the mempool")]
    Mine {
        #[arg(help = "Address receiving the block reward")]
        address: String,
        #[arg(
            long = "rate",
            help = "Target attempts per second, 0 mines on a background thread"
        )]
        rate: Option<u32>,
    },
    #[command(name = "printchain", about = "Print all blocks in the chain")]
    Printchain,
    #[command(name = "validate", about = "Re-validate the whole chain")]
    Validate,
    #[command(name = "history", about = "Confirmed activity of an address")]
    History {
        #[arg(help = "The address")]
        address: String,
    },
}
