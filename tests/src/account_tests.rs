use crate::common::{count, setup, ETHER};
use ethers::{
    abi::{AbiDecode, AbiEncode},
    types::{Address, Bytes, U256},
};
use vela_contracts::{
    counter_api::IncrementCall,
    sample_token_api::{MintCall, TransferCall},
    simple_account_api::{AddDepositCall, ExecuteBatchCall, ExecuteCall, GetDepositCall, OwnerCall},
    utils::decode_address,
    Revert, SampleToken,
};
use vela_entrypoint::{EntryPointError, UserOperationStatus};

#[test]
fn execute_batch() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let increment: Bytes = IncrementCall.encode().into();

    let batch = ExecuteBatchCall {
        dest: vec![ctx.counter, ctx.counter, ctx.counter],
        value: vec![],
        func: vec![increment.clone(), increment.clone(), increment.clone()],
    };
    let mismatch = ExecuteBatchCall {
        dest: vec![ctx.counter, ctx.counter],
        value: vec![],
        func: vec![increment],
    };
    let ops = [
        ctx.increment_op(sender, 0.into()).call_data(batch.encode().into()),
        ctx.increment_op(sender, 1.into()).call_data(mismatch.encode().into()),
    ]
    .map(|uo| ctx.sign(&uo));

    let outcome = ctx.entry_point.handle_ops(&ops, ctx.beneficiary).unwrap();
    assert!(outcome.results[0].is_success());
    assert_eq!(
        outcome.results[1].status,
        UserOperationStatus::Reverted { reason: "wrong array lengths".into() }
    );
    assert_eq!(count(&ctx), 3.into());
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), 2.into());
}

#[test]
fn execute_is_restricted() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let stranger = Address::random();
    let data: Bytes =
        ExecuteCall { dest: ctx.counter, value: U256::zero(), func: IncrementCall.encode().into() }
            .encode()
            .into();

    assert_eq!(
        ctx.entry_point.call(stranger, sender, U256::zero(), data.clone()),
        Err(EntryPointError::Revert(Revert::Unauthorized { caller: stranger }))
    );
    assert_eq!(
        ctx.entry_point.call(ctx.owner.address(), sender, U256::zero(), data),
        Err(EntryPointError::Revert(Revert::Unauthorized { caller: ctx.owner.address() }))
    );
    assert_eq!(count(&ctx), U256::zero());
}

#[test]
fn owner_and_deposit() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, U256::zero()).unwrap();
    let deployer = ctx.deployer;

    let owner = ctx.entry_point.call(deployer, sender, U256::zero(), OwnerCall.encode().into());
    assert_eq!(decode_address(&owner.unwrap()).unwrap(), ctx.owner.address());

    // plain value is accepted
    ctx.entry_point.call(deployer, sender, ETHER.into(), Bytes::default()).unwrap();
    assert_eq!(ctx.entry_point.balance(&sender), U256::from(ETHER));

    let value = U256::from(ETHER / 4);
    ctx.entry_point.call(deployer, sender, value, AddDepositCall.encode().into()).unwrap();
    assert_eq!(ctx.entry_point.balance_of(&sender), value);
    assert_eq!(ctx.entry_point.balance(&sender), U256::from(ETHER));

    let deposit = ctx
        .entry_point
        .call(deployer, sender, U256::zero(), GetDepositCall.encode().into())
        .unwrap();
    assert_eq!(U256::decode(&deposit).unwrap(), value);
}

#[test]
fn token_transfer_through_the_account() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let token = Address::random();
    let receiver = Address::random();
    ctx.entry_point.deploy(token, Box::new(SampleToken::new(ctx.deployer))).unwrap();

    let mint: Bytes = MintCall { to: sender, amount: 1_000.into() }.encode().into();
    assert!(ctx.entry_point.call(sender, token, U256::zero(), mint.clone()).is_err());
    ctx.entry_point.call(ctx.deployer, token, U256::zero(), mint).unwrap();

    let transfer = |amount: u64| TransferCall { to: receiver, amount: amount.into() }.encode();
    let ops = [
        ctx.call_op(sender, 0.into(), token, transfer(400).into()),
        ctx.call_op(sender, 1.into(), token, transfer(700).into()),
    ]
    .map(|uo| ctx.sign(&uo));
    let outcome = ctx.entry_point.handle_ops(&ops, ctx.beneficiary).unwrap();

    assert!(outcome.results[0].is_success());
    assert!(matches!(outcome.results[1].status, UserOperationStatus::Reverted { .. }));
    let token = ctx.entry_point.contract::<SampleToken>(&token).unwrap();
    assert_eq!(token.balance_of(&sender), 600.into());
    assert_eq!(token.balance_of(&receiver), 400.into());
    assert_eq!(token.total_supply(), 1_000.into());
}
