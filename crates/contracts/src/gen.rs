use ethers::{
    contract::{abigen, EthCall},
    types::Selector,
};
use lazy_static::lazy_static;
use std::collections::HashMap;

abigen!(
    EntryPointAPI,
    r#"[
        struct PackedUserOperation {address sender;uint256 nonce;bytes initCode;bytes callData;bytes32 accountGasLimits;uint256 preVerificationGas;bytes32 gasFees;bytes paymasterAndData;bytes signature;}
        function handleOps(PackedUserOperation[] calldata ops,address payable beneficiary) external
        function balanceOf(address account) external view returns (uint256)
        function depositTo(address account) external payable
        function withdrawTo(address payable withdrawAddress,uint256 withdrawAmount) external
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
        function getUserOpHash(PackedUserOperation calldata userOp) external view returns (bytes32)
    ]"#
);

abigen!(
    SimpleAccountAPI,
    r#"[
        function execute(address dest, uint256 value, bytes calldata func) external
        function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external
        function owner() external view returns (address)
        function addDeposit() external payable
        function getDeposit() external view returns (uint256)
    ]"#
);

abigen!(
    SimpleAccountFactoryAPI,
    r#"[
        function createAccount(address owner,uint256 salt) external returns (address ret)
        function getAddress(address owner,uint256 salt) external view returns (address)
    ]"#
);

abigen!(
    SponsorPaymasterAPI,
    r#"[
        function deposit() external payable
        function setAllowance(address sender, uint256 amount) external
        function allowance(address sender) external view returns (uint256)
        function withdrawTo(address payable withdrawAddress, uint256 amount) external
    ]"#
);

abigen!(
    CounterAPI,
    r#"[
        function increment() external
        function count() external view returns (uint256)
        function fail() external
    ]"#
);

abigen!(
    SampleTokenAPI,
    r#"[
        function transfer(address to, uint256 amount) external returns (bool)
        function balanceOf(address account) external view returns (uint256)
        function totalSupply() external view returns (uint256)
        function mint(address to, uint256 amount) external
    ]"#
);

lazy_static! {
    /// Function names by selector (used when logging calls)
    pub static ref SELECTORS_NAMES: HashMap<Selector, String> = {
        let mut map = HashMap::new();
        // entry point
        map.insert(entry_point_api::HandleOpsCall::selector(), entry_point_api::HandleOpsCall::function_name().into());
        map.insert(entry_point_api::BalanceOfCall::selector(), entry_point_api::BalanceOfCall::function_name().into());
        map.insert(entry_point_api::DepositToCall::selector(), entry_point_api::DepositToCall::function_name().into());
        map.insert(entry_point_api::WithdrawToCall::selector(), entry_point_api::WithdrawToCall::function_name().into());
        map.insert(entry_point_api::GetNonceCall::selector(), entry_point_api::GetNonceCall::function_name().into());
        map.insert(entry_point_api::GetUserOpHashCall::selector(), entry_point_api::GetUserOpHashCall::function_name().into());
        // account
        map.insert(simple_account_api::ExecuteCall::selector(), simple_account_api::ExecuteCall::function_name().into());
        map.insert(simple_account_api::ExecuteBatchCall::selector(), simple_account_api::ExecuteBatchCall::function_name().into());
        map.insert(simple_account_api::OwnerCall::selector(), simple_account_api::OwnerCall::function_name().into());
        map.insert(simple_account_api::AddDepositCall::selector(), simple_account_api::AddDepositCall::function_name().into());
        map.insert(simple_account_api::GetDepositCall::selector(), simple_account_api::GetDepositCall::function_name().into());
        // factory
        map.insert(simple_account_factory_api::CreateAccountCall::selector(), simple_account_factory_api::CreateAccountCall::function_name().into());
        map.insert(simple_account_factory_api::GetAddressCall::selector(), simple_account_factory_api::GetAddressCall::function_name().into());
        // paymaster
        map.insert(sponsor_paymaster_api::DepositCall::selector(), sponsor_paymaster_api::DepositCall::function_name().into());
        map.insert(sponsor_paymaster_api::SetAllowanceCall::selector(), sponsor_paymaster_api::SetAllowanceCall::function_name().into());
        map.insert(sponsor_paymaster_api::AllowanceCall::selector(), sponsor_paymaster_api::AllowanceCall::function_name().into());
        // targets
        map.insert(counter_api::IncrementCall::selector(), counter_api::IncrementCall::function_name().into());
        map.insert(counter_api::CountCall::selector(), counter_api::CountCall::function_name().into());
        map.insert(counter_api::FailCall::selector(), counter_api::FailCall::function_name().into());
        map.insert(sample_token_api::TransferCall::selector(), sample_token_api::TransferCall::function_name().into());
        map.insert(sample_token_api::TotalSupplyCall::selector(), sample_token_api::TotalSupplyCall::function_name().into());
        map.insert(sample_token_api::MintCall::selector(), sample_token_api::MintCall::function_name().into());

        map
    };
}
