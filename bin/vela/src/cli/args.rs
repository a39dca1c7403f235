use crate::utils::parse_address;
use alloy_chains::Chain;
use clap::Parser;
use ethers::types::Address;
use expanded_pathbuf::ExpandedPathBuf;
use vela_entrypoint::EntryPointConfig;
use vela_primitives::constants::{dev, entry_point};

/// Entry point CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct EntryPointArgs {
    /// Address of the entry point.
    #[clap(long, value_parser=parse_address, default_value = entry_point::ADDRESS)]
    pub entry_point: Address,

    /// The chain id.
    #[clap(long, default_value_t = dev::CHAIN_ID)]
    pub chain_id: u64,
}

impl EntryPointArgs {
    pub fn to_config(&self) -> EntryPointConfig {
        EntryPointConfig { address: self.entry_point, chain: Chain::from_id(self.chain_id) }
    }
}

/// Create wallet CLI args
///
/// Without `--phrase` or `--mnemonic-file` the development mnemonic is used.
#[derive(Debug, Clone, Parser)]
pub struct CreateWalletArgs {
    /// Mnemonic phrase.
    #[clap(long, conflicts_with = "mnemonic_file")]
    pub phrase: Option<String>,

    /// Path to a file holding the mnemonic phrase.
    #[clap(long)]
    pub mnemonic_file: Option<ExpandedPathBuf>,

    /// Derivation index of the key.
    #[clap(long, default_value_t = 0)]
    pub index: u32,
}
