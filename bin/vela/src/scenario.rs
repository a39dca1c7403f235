//! JSON scenarios: a development world and one batch of user operations to run against it

use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use vela_contracts::{
    counter_api::{FailCall, IncrementCall},
    get_address,
    sample_token_api::TransferCall,
    simple_account_api::ExecuteCall,
    simple_account_factory_api::CreateAccountCall,
    utils::encode_validity,
    Counter, SampleToken, SimpleAccountFactory, SponsorPaymaster, SponsorPolicy,
};
use vela_entrypoint::{EntryPoint, EntryPointConfig, HandleOpsOutcome};
use vela_primitives::{
    constants::{dev, gas},
    BlockContext, UserOperationSigned, Wallet,
};

/// Native balance given to the deployer of the development contracts
const DEPLOYER_BALANCE: u128 = 10_000_000_000_000_000_000_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub block: BlockContext,
    pub beneficiary: Address,
    /// Sponsor paymaster deployed at the development paymaster address
    #[serde(default)]
    pub paymaster: Option<PaymasterSpec>,
    pub accounts: Vec<AccountSpec>,
    pub operations: Vec<OperationSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterSpec {
    #[serde(default)]
    pub deposit: U256,
    /// Sponsored senders (by account index) and their allowance; every sender if absent
    #[serde(default)]
    pub allowances: Option<HashMap<usize, U256>>,
    /// `(validUntil, validAfter)` of the sponsorship
    #[serde(default)]
    pub validity: Option<(u64, u64)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSpec {
    /// Index of the owner key in the development mnemonic
    pub owner_index: u32,
    /// Factory sequence number the account is (or will be) deployed with
    pub seq: U256,
    /// Deploy the account before the batch instead of through `initCode`
    #[serde(default)]
    pub deployed: bool,
    #[serde(default)]
    pub balance: U256,
    #[serde(default)]
    pub deposit: U256,
    /// Sample tokens minted to the account
    #[serde(default)]
    pub tokens: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum Call {
    /// `Counter.increment()`
    Increment,
    /// `Counter.fail()` (always reverts)
    Fail,
    /// `SampleToken.transfer(to, amount)`
    Transfer { to: Address, amount: U256 },
    /// Plain value transfer
    Send { to: Address, value: U256 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
    /// Index of the sending account in `accounts`
    pub account: usize,
    #[serde(flatten)]
    pub call: Call,
    #[serde(default)]
    pub sponsored: bool,
    /// Explicit nonce; the next one is used if absent
    #[serde(default)]
    pub nonce: Option<U256>,
}

/// Account of a built world
#[derive(Clone, Debug)]
pub struct WorldAccount {
    pub signer: Wallet,
    pub address: Address,
    pub seq: U256,
}

/// Entry point with the development contracts deployed
#[derive(Clone, Debug)]
pub struct World {
    pub entry_point: EntryPoint,
    pub deployer: Address,
    pub factory: Address,
    pub paymaster: Option<Address>,
    pub counter: Address,
    pub token: Address,
    pub accounts: Vec<WorldAccount>,
}

impl Scenario {
    pub fn from_json(json: &str) -> eyre::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Deploys the development contracts and funds the accounts
    pub fn build(&self, config: EntryPointConfig) -> eyre::Result<World> {
        let deployer = Wallet::from_phrase(dev::MNEMONIC, 0)?.address();
        let factory: Address = dev::ACCOUNT_FACTORY.parse()?;
        let counter = get_address(deployer, 3.into());
        let token = get_address(deployer, 4.into());

        let mut entry_point = EntryPoint::new(config);
        entry_point.set_block(self.block);
        entry_point.set_balance(deployer, DEPLOYER_BALANCE.into());
        entry_point.deploy(factory, Box::new(SimpleAccountFactory::new()))?;
        entry_point.deploy(counter, Box::new(Counter::new()))?;

        let mut sample_token = SampleToken::new(deployer);
        let mut accounts = Vec::with_capacity(self.accounts.len());
        for spec in self.accounts.iter() {
            let signer = Wallet::from_phrase(dev::MNEMONIC, spec.owner_index)?;
            let address = get_address(factory, spec.seq);
            if spec.deployed {
                let data = CreateAccountCall { owner: signer.address(), salt: spec.seq }.encode();
                entry_point.call(deployer, factory, U256::zero(), data.into())?;
            }
            entry_point.set_balance(address, spec.balance);
            if !spec.deposit.is_zero() {
                entry_point.deposit_to(deployer, address, spec.deposit)?;
            }
            if !spec.tokens.is_zero() {
                sample_token.mint(address, spec.tokens)?;
            }
            accounts.push(WorldAccount { signer, address, seq: spec.seq });
        }
        entry_point.deploy(token, Box::new(sample_token))?;

        let paymaster = match &self.paymaster {
            None => None,
            Some(spec) => {
                let address: Address = dev::PAYMASTER.parse()?;
                let policy = match &spec.allowances {
                    None => SponsorPolicy::Open,
                    Some(allowances) => SponsorPolicy::Allowance(
                        allowances
                            .iter()
                            .map(|(index, amount)| {
                                accounts
                                    .get(*index)
                                    .map(|account| (account.address, *amount))
                                    .ok_or_else(|| eyre::eyre!("no account with index {index}"))
                            })
                            .collect::<eyre::Result<_>>()?,
                    ),
                };
                entry_point.deploy(address, Box::new(SponsorPaymaster::new(deployer, policy)))?;
                if !spec.deposit.is_zero() {
                    entry_point.deposit_to(deployer, address, spec.deposit)?;
                }
                Some(address)
            }
        };

        info!(
            "World built: factory {:?}, counter {:?}, token {:?}, paymaster {:?}, {} accounts",
            factory,
            counter,
            token,
            paymaster,
            accounts.len()
        );
        Ok(World { entry_point, deployer, factory, paymaster, counter, token, accounts })
    }

    /// Builds and signs the user operations of the batch
    pub fn operations(&self, world: &World) -> eyre::Result<Vec<UserOperationSigned>> {
        let mut next_nonces: HashMap<Address, U256> = HashMap::new();
        let mut deploying: Vec<Address> = vec![];
        let mut ops = Vec::with_capacity(self.operations.len());

        for spec in self.operations.iter() {
            let account = world
                .accounts
                .get(spec.account)
                .ok_or_else(|| eyre::eyre!("no account with index {}", spec.account))?;
            let sender = account.address;

            let next = next_nonces
                .entry(sender)
                .or_insert_with(|| world.entry_point.get_nonce(&sender, U256::zero()));
            let nonce = spec.nonce.unwrap_or(*next);
            *next = nonce.saturating_add(U256::one());

            let (dest, value, func) = match &spec.call {
                Call::Increment => (world.counter, U256::zero(), IncrementCall.encode().into()),
                Call::Fail => (world.counter, U256::zero(), FailCall.encode().into()),
                Call::Transfer { to, amount } => (
                    world.token,
                    U256::zero(),
                    TransferCall { to: *to, amount: *amount }.encode().into(),
                ),
                Call::Send { to, value } => (*to, *value, Bytes::default()),
            };

            let mut uo = UserOperationSigned::default()
                .sender(sender)
                .nonce(nonce)
                .call_data(ExecuteCall { dest, value, func }.encode().into())
                .call_gas_limit(gas::CALL_GAS_LIMIT.into())
                .verification_gas_limit(gas::VERIFICATION_GAS_LIMIT.into())
                .pre_verification_gas(gas::PRE_VERIFICATION_GAS.into())
                .max_fee_per_gas(gas::MAX_FEE_PER_GAS.into())
                .max_priority_fee_per_gas(gas::MAX_PRIORITY_FEE_PER_GAS.into());

            if !world.entry_point.state().has_code(&sender) && !deploying.contains(&sender) {
                let data =
                    CreateAccountCall { owner: account.signer.address(), salt: account.seq }
                        .encode();
                uo = uo.factory_and_data(world.factory, data.into());
                deploying.push(sender);
            }

            if spec.sponsored {
                let paymaster = world
                    .paymaster
                    .ok_or_else(|| eyre::eyre!("sponsored operation without a paymaster"))?;
                let data = match self.paymaster.as_ref().and_then(|spec| spec.validity) {
                    Some((valid_until, valid_after)) => encode_validity(valid_until, valid_after),
                    None => Bytes::default(),
                };
                uo = uo.paymaster_and_data(
                    paymaster,
                    gas::PAYMASTER_VERIFICATION_GAS_LIMIT.into(),
                    gas::PAYMASTER_POST_OP_GAS_LIMIT.into(),
                    data,
                );
            }

            ops.push(account.signer.sign_uo(
                &uo,
                &world.entry_point.address(),
                world.entry_point.chain_id(),
            )?);
        }

        Ok(ops)
    }

    /// Builds the world, then runs the batch
    pub fn run(&self, config: EntryPointConfig) -> eyre::Result<(World, HandleOpsOutcome)> {
        let mut world = self.build(config)?;
        let ops = self.operations(&world)?;
        let outcome = world.entry_point.handle_ops(&ops, self.beneficiary)?;
        Ok((world, outcome))
    }
}
