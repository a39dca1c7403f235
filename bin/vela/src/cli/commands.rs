use super::args::{CreateWalletArgs, EntryPointArgs};
use crate::{
    scenario::Scenario,
    utils::{parse_address, parse_u256},
};
use clap::Parser;
use ethers::types::{Address, U256};
use expanded_pathbuf::ExpandedPathBuf;
use tracing::info;
use vela_primitives::{constants::dev, UserOperationSigned, Wallet};

/// Run a scenario and print the batch outcome as JSON
#[derive(Debug, Parser)]
pub struct SimulateCommand {
    /// Path to the JSON scenario
    #[clap(long)]
    pub scenario: ExpandedPathBuf,

    /// Entry point args
    #[clap(flatten)]
    pub entry_point: EntryPointArgs,
}

impl SimulateCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let json = std::fs::read_to_string(self.scenario.to_path_buf())?;
        let scenario = Scenario::from_json(&json)?;
        let (world, outcome) = scenario.run(self.entry_point.to_config())?;

        info!(
            "Batch handled: {} operations, {} succeeded, {} collected by {:?}",
            outcome.results.len(),
            outcome.results.iter().filter(|r| r.is_success()).count(),
            outcome.collected,
            outcome.beneficiary
        );
        for account in world.accounts.iter() {
            info!(
                "Account {:?}: balance {}, deposit {}",
                account.address,
                world.entry_point.balance(&account.address),
                world.entry_point.balance_of(&account.address)
            );
        }

        println!("{}", serde_json::to_string_pretty(&outcome)?);
        Ok(())
    }
}

/// Print the counterfactual address of an account created by a factory
#[derive(Debug, Parser)]
pub struct AddressCommand {
    /// Address of the account factory
    #[clap(long, value_parser=parse_address, default_value = dev::ACCOUNT_FACTORY)]
    pub factory: Address,

    /// Sequence number passed to the factory
    #[clap(long, value_parser=parse_u256)]
    pub seq: U256,
}

impl AddressCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        println!("{:?}", vela_contracts::get_address(self.factory, self.seq));
        Ok(())
    }
}

/// Print the hash of a user operation
#[derive(Debug, Parser)]
pub struct HashCommand {
    /// Path to the JSON user operation
    #[clap(long)]
    pub op: ExpandedPathBuf,

    /// Entry point args
    #[clap(flatten)]
    pub entry_point: EntryPointArgs,
}

impl HashCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let json = std::fs::read_to_string(self.op.to_path_buf())?;
        let uo: UserOperationSigned = serde_json::from_str(&json)?;
        let hash = uo.hash(&self.entry_point.entry_point, self.entry_point.chain_id)?;
        println!("{}", serde_json::to_string(&hash)?);
        Ok(())
    }
}

/// Print the signer address derived from a mnemonic
#[derive(Debug, Parser)]
pub struct CreateWalletCommand {
    #[clap(flatten)]
    pub wallet: CreateWalletArgs,
}

impl CreateWalletCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let wallet = match (self.wallet.phrase, self.wallet.mnemonic_file) {
            (Some(phrase), _) => Wallet::from_phrase(&phrase, self.wallet.index)?,
            (None, Some(path)) => Wallet::from_file(path, self.wallet.index)?,
            (None, None) => Wallet::from_phrase(dev::MNEMONIC, self.wallet.index)?,
        };
        println!("{:?}", wallet.address());
        Ok(())
    }
}
