use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use vela_contracts::{
    counter_api::IncrementCall, get_address, simple_account_api::ExecuteCall,
    simple_account_factory_api::CreateAccountCall, Counter, SimpleAccountFactory,
    SponsorPaymaster,
};
use vela_entrypoint::{EntryPoint, EntryPointConfig, Ledger};
use vela_primitives::{constants::dev, BlockContext, UserOperationSigned, Wallet};

pub mod contracts;

pub const ETHER: u128 = 1_000_000_000_000_000_000;
pub const GAS_PRICE: u64 = 10_000_000_000;
pub const VERIFICATION_GAS_LIMIT: u64 = 300_000;
pub const CALL_GAS_LIMIT: u64 = 100_000;
pub const PRE_VERIFICATION_GAS: u64 = 21_000;
pub const PAYMASTER_GAS_LIMIT: u64 = 50_000;

pub struct TestContext {
    pub entry_point: EntryPoint,
    pub deployer: Address,
    pub owner: Wallet,
    pub factory: Address,
    pub paymaster: Address,
    pub counter: Address,
    pub beneficiary: Address,
}

impl TestContext {
    /// Address of the account with sequence `seq`, deployed or not
    pub fn account(&self, seq: u64) -> Address {
        get_address(self.factory, seq.into())
    }

    /// `initCode` deploying the account of the owner with sequence `seq`
    pub fn init_code(&self, seq: u64) -> Bytes {
        CreateAccountCall { owner: self.owner.address(), salt: seq.into() }.encode().into()
    }

    /// Deploys the account of the owner with sequence `seq` and funds it with `balance`
    pub fn deploy_account(&mut self, seq: u64, balance: U256) -> eyre::Result<Address> {
        let data = self.init_code(seq);
        self.entry_point.call(self.deployer, self.factory, U256::zero(), data)?;
        let account = self.account(seq);
        self.entry_point.set_balance(account, balance);
        Ok(account)
    }

    /// Self-funded operation of `sender` incrementing the counter
    pub fn increment_op(&self, sender: Address, nonce: U256) -> UserOperationSigned {
        self.call_op(sender, nonce, self.counter, IncrementCall.encode().into())
    }

    /// Self-funded operation of `sender` calling `dest` through `execute`
    pub fn call_op(
        &self,
        sender: Address,
        nonce: U256,
        dest: Address,
        func: Bytes,
    ) -> UserOperationSigned {
        UserOperationSigned::default()
            .sender(sender)
            .nonce(nonce)
            .call_data(ExecuteCall { dest, value: U256::zero(), func }.encode().into())
            .call_gas_limit(CALL_GAS_LIMIT.into())
            .verification_gas_limit(VERIFICATION_GAS_LIMIT.into())
            .pre_verification_gas(PRE_VERIFICATION_GAS.into())
            .max_fee_per_gas(GAS_PRICE.into())
            .max_priority_fee_per_gas(GAS_PRICE.into())
    }

    /// Lets `paymaster` pay for the operation
    pub fn sponsor(
        &self,
        uo: UserOperationSigned,
        paymaster: Address,
        paymaster_data: Bytes,
    ) -> UserOperationSigned {
        uo.paymaster_and_data(
            paymaster,
            PAYMASTER_GAS_LIMIT.into(),
            PAYMASTER_GAS_LIMIT.into(),
            paymaster_data,
        )
    }

    /// Signs the operation with the owner key
    pub fn sign(&self, uo: &UserOperationSigned) -> UserOperationSigned {
        sign_with(&self.owner, &self.entry_point, uo)
    }
}

pub fn sign_with(
    wallet: &Wallet,
    entry_point: &EntryPoint,
    uo: &UserOperationSigned,
) -> UserOperationSigned {
    wallet.sign_uo(uo, &entry_point.address(), entry_point.chain_id()).unwrap()
}

/// Entry point with the development factory, an open sponsor paymaster (without deposit) and a
/// counter deployed
pub fn setup() -> eyre::Result<TestContext> {
    setup_with_ledger(Ledger::default())
}

pub fn setup_with_ledger(ledger: Ledger) -> eyre::Result<TestContext> {
    let deployer = Wallet::from_phrase(dev::MNEMONIC, 0)?.address();
    let owner = Wallet::from_phrase(dev::MNEMONIC, 1)?;
    let factory: Address = dev::ACCOUNT_FACTORY.parse()?;
    let paymaster: Address = dev::PAYMASTER.parse()?;
    let counter = get_address(deployer, 3.into());

    let mut entry_point = EntryPoint::with_ledger(EntryPointConfig::default(), ledger);
    entry_point.set_block(BlockContext {
        number: 1,
        timestamp: 1_700_000_000,
        base_fee: 1_000_000_000.into(),
    });
    entry_point.set_balance(deployer, (100 * ETHER).into());
    entry_point.deploy(factory, Box::new(SimpleAccountFactory::new()))?;
    entry_point.deploy(paymaster, Box::new(SponsorPaymaster::open(deployer)))?;
    entry_point.deploy(counter, Box::new(Counter::new()))?;

    Ok(TestContext {
        entry_point,
        deployer,
        owner,
        factory,
        paymaster,
        counter,
        beneficiary: Address::random(),
    })
}

/// Count of the development counter
pub fn count(ctx: &TestContext) -> U256 {
    ctx.entry_point.contract::<Counter>(&ctx.counter).map(Counter::count).unwrap_or_default()
}
