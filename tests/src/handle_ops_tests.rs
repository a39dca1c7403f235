use crate::common::{
    contracts::{ReentrantTarget, TimedAccount},
    count, setup, setup_with_ledger, sign_with, ETHER,
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use std::collections::HashMap;
use vela_contracts::{counter_api::FailCall, entry_point_api::HandleOpsCall, get_address};
use vela_entrypoint::{
    EntryPointError, EntryPointEvent, Ledger, NonceOp, UserOperationStatus, ValidationError,
};
use vela_primitives::{
    constants::dev, PackedUserOperation, UserOperationSigned, ValidationData, Wallet,
};

#[test]
fn preset_nonce_accepts_the_first_of_two_equal_operations() {
    let factory: Address = dev::ACCOUNT_FACTORY.parse().unwrap();
    let sender = get_address(factory, 1.into());
    let mut nonces = HashMap::<(Address, U256), u64>::new();
    nonces.set_sequence(&sender, &U256::zero(), 5);
    let ledger = Ledger::new(Box::<HashMap<Address, U256>>::default(), Box::new(nonces));

    let mut ctx = setup_with_ledger(ledger).unwrap();
    assert_eq!(ctx.deploy_account(1, ETHER.into()).unwrap(), sender);
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), 5.into());

    let uo = ctx.sign(&ctx.increment_op(sender, 5.into()));
    let prefund = uo.required_prefund().unwrap();
    let outcome = ctx.entry_point.handle_ops(&[uo.clone(), uo], ctx.beneficiary).unwrap();

    assert!(outcome.results[0].is_success(), "{:?}", outcome.results[0]);
    assert_eq!(
        outcome.results[1].rejection(),
        Some(&ValidationError::NonceInvalid { expected: 6.into(), actual: 5.into() })
    );
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), 6.into());
    assert_eq!(count(&ctx), U256::one());

    // nothing of the rejected operation is kept, not even its prefund
    let cost = outcome.results[0].actual_gas_cost;
    assert_eq!(outcome.collected, cost);
    assert_eq!(ctx.entry_point.balance(&sender), U256::from(ETHER) - prefund);
    assert_eq!(ctx.entry_point.balance_of(&sender), prefund - cost);
}

#[test]
fn rejected_operation_does_not_stop_the_batch() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();

    let first = ctx.sign(&ctx.increment_op(sender, 0.into()));
    let forged = sign_with(
        &Wallet::build_random(),
        &ctx.entry_point,
        &ctx.increment_op(sender, 1.into()),
    );
    let last = ctx.sign(&ctx.increment_op(sender, 1.into()));

    let outcome = ctx.entry_point.handle_ops(&[first, forged, last], ctx.beneficiary).unwrap();
    assert!(outcome.results[0].is_success());
    assert_eq!(outcome.results[1].rejection(), Some(&ValidationError::AuthorizationFailed));
    assert_eq!(outcome.results[1].actual_gas_cost, U256::zero());
    assert!(outcome.results[2].is_success());

    assert_eq!(count(&ctx), 2.into());
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), 2.into());
    assert_eq!(
        outcome.collected,
        outcome.results[0].actual_gas_cost + outcome.results[2].actual_gas_cost
    );
    assert_eq!(ctx.entry_point.balance(&ctx.beneficiary), outcome.collected);
}

#[test]
fn wrong_signature_keeps_the_nonce() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();

    let uo = sign_with(
        &Wallet::build_random(),
        &ctx.entry_point,
        &ctx.increment_op(sender, 0.into()),
    );
    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();

    let rejection = outcome.results[0].rejection().unwrap();
    assert_eq!(rejection, &ValidationError::AuthorizationFailed);
    assert_eq!(rejection.code(), "AA24");
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::zero());
    assert_eq!(ctx.entry_point.balance(&sender), U256::from(ETHER));
    assert_eq!(ctx.entry_point.balance_of(&sender), U256::zero());
}

#[test]
fn used_nonce_is_rejected_forever() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let uo = ctx.sign(&ctx.increment_op(sender, 0.into()));

    let outcome = ctx.entry_point.handle_ops(&[uo.clone()], ctx.beneficiary).unwrap();
    assert!(outcome.results[0].is_success());

    for _ in 0..2 {
        let outcome = ctx.entry_point.handle_ops(&[uo.clone()], ctx.beneficiary).unwrap();
        assert_eq!(
            outcome.results[0].rejection(),
            Some(&ValidationError::NonceInvalid { expected: 1.into(), actual: 0.into() })
        );
    }
    assert_eq!(count(&ctx), U256::one());

    // another key has its own sequence
    let key_one = U256::one() << 64;
    let uo = ctx.sign(&ctx.increment_op(sender, key_one));
    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();
    assert!(outcome.results[0].is_success());
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::one()), key_one + 1);
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::one());
}

#[test]
fn reverted_call_is_still_charged() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let uo = ctx.sign(&ctx.call_op(sender, 0.into(), ctx.counter, FailCall.encode().into()));

    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();
    let result = &outcome.results[0];
    assert_eq!(
        result.status,
        UserOperationStatus::Reverted { reason: "Counter: forced failure".into() }
    );
    assert!(!result.actual_gas_cost.is_zero());
    assert_eq!(ctx.entry_point.balance(&ctx.beneficiary), result.actual_gas_cost);
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::one());
    assert_eq!(count(&ctx), U256::zero());

    let events = ctx.entry_point.events();
    assert!(events.iter().any(|event| matches!(
        event,
        EntryPointEvent::UserOperationRevertReason { sender: s, .. } if *s == sender
    )));
    assert!(matches!(
        events.last(),
        Some(EntryPointEvent::UserOperationEvent { success: false, .. })
    ));
}

#[test]
fn verification_failures() {
    let mut ctx = setup().unwrap();
    let deployed = ctx.deploy_account(1, ETHER.into()).unwrap();
    let broke = ctx.deploy_account(2, U256::zero()).unwrap();
    let undeployed = ctx.account(3);

    let not_deployed = ctx.sign(&ctx.increment_op(undeployed, 0.into()));
    let no_funds = ctx.sign(&ctx.increment_op(broke, 0.into()));
    let no_gas =
        ctx.sign(&ctx.increment_op(deployed, 0.into()).verification_gas_limit(1_000.into()));
    let prefund = no_funds.required_prefund().unwrap();

    let outcome =
        ctx.entry_point.handle_ops(&[not_deployed, no_funds, no_gas], ctx.beneficiary).unwrap();
    assert_eq!(
        outcome.results[0].rejection(),
        Some(&ValidationError::AccountNotDeployed { sender: undeployed })
    );
    assert_eq!(
        outcome.results[1].rejection(),
        Some(&ValidationError::PrefundInsufficient { required: prefund, available: U256::zero() })
    );
    assert_eq!(
        outcome.results[2].rejection(),
        Some(&ValidationError::VerificationGasExceeded)
    );
    assert_eq!(outcome.collected, U256::zero());
    assert!(ctx.entry_point.events().is_empty());
}

#[test]
fn account_validity_window() {
    let mut ctx = setup().unwrap();
    let now = ctx.entry_point.block().timestamp;
    let (expired, current) = (Address::random(), Address::random());
    ctx.entry_point
        .deploy(
            expired,
            Box::new(TimedAccount { validation: ValidationData::new(0, now - 1) }),
        )
        .unwrap();
    ctx.entry_point
        .deploy(
            current,
            Box::new(TimedAccount { validation: ValidationData::new(now - 1, now + 1) }),
        )
        .unwrap();
    ctx.entry_point.set_balance(expired, ETHER.into());
    ctx.entry_point.set_balance(current, ETHER.into());

    let ops = [ctx.increment_op(expired, 0.into()), ctx.increment_op(current, 0.into())];
    let outcome = ctx.entry_point.handle_ops(&ops, ctx.beneficiary).unwrap();

    let rejection = outcome.results[0].rejection().unwrap();
    assert_eq!(rejection, &ValidationError::Expired { valid_after: 0, valid_until: now - 1 });
    assert_eq!(rejection.code(), "AA22");
    assert!(outcome.results[1].is_success());
    assert_eq!(ctx.entry_point.get_nonce(&expired, U256::zero()), U256::zero());
    assert_eq!(ctx.entry_point.balance(&expired), U256::from(ETHER));
}

#[test]
fn reentrant_handle_ops_aborts_the_batch() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let target = Address::random();
    ctx.entry_point.deploy(target, Box::new(ReentrantTarget)).unwrap();

    let valid = ctx.sign(&ctx.increment_op(sender, 0.into()));
    let reentrant = ctx.sign(&ctx.call_op(sender, 1.into(), target, Bytes::default()));
    let events = ctx.entry_point.events().len();

    assert_eq!(
        ctx.entry_point.handle_ops(&[valid, reentrant], ctx.beneficiary),
        Err(EntryPointError::Reentrancy)
    );
    assert_eq!(count(&ctx), U256::zero());
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::zero());
    assert_eq!(ctx.entry_point.balance(&sender), U256::from(ETHER));
    assert_eq!(ctx.entry_point.balance(&ctx.beneficiary), U256::zero());
    assert_eq!(ctx.entry_point.events().len(), events);
}

#[test]
fn handle_ops_calldata() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let uo = ctx.sign(&ctx.increment_op(sender, 0.into()));
    let hash = ctx.entry_point.get_user_op_hash(&uo).unwrap();

    let data = HandleOpsCall { ops: vec![uo.pack().unwrap().into()], beneficiary: ctx.beneficiary }
        .encode();
    let outcome = ctx.entry_point.handle_ops_calldata(&data).unwrap();
    assert!(outcome.results[0].is_success());
    assert_eq!(outcome.results[0].user_op_hash, hash);
    assert_eq!(count(&ctx), U256::one());

    // selector and the offset of the operations, nothing else
    assert!(matches!(
        ctx.entry_point.handle_ops_calldata(&data[..36]),
        Err(EntryPointError::Malformed { .. })
    ));
    assert!(matches!(
        ctx.entry_point.handle_ops_calldata(&[0x12, 0x34]),
        Err(EntryPointError::Malformed { .. })
    ));
}

#[test]
fn malformed_packed_operation_aborts_the_batch() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let valid = ctx.sign(&ctx.increment_op(sender, 0.into())).pack().unwrap();
    let truncated = PackedUserOperation {
        paymaster_and_data: vec![0xab; 30].into(),
        ..valid.clone()
    };

    assert!(matches!(
        ctx.entry_point.handle_packed_ops(&[valid, truncated], ctx.beneficiary),
        Err(EntryPointError::Malformed { .. })
    ));
    assert_eq!(count(&ctx), U256::zero());
}

#[test]
fn zero_address_prefix_is_malformed() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let valid = ctx.sign(&ctx.increment_op(sender, 0.into())).pack().unwrap();

    let (entry_point, chain_id) = (ctx.entry_point.address(), ctx.entry_point.chain_id());

    // the wire hash and the hash of the unpacked operation agree
    let wire_hash = valid.hash(&entry_point, chain_id);
    assert_eq!(ctx.entry_point.get_user_op_hash(&valid.unpack().unwrap()).unwrap(), wire_hash);

    let zero_paymaster =
        PackedUserOperation { paymaster_and_data: vec![0u8; 52].into(), ..valid.clone() };
    let zero_factory = PackedUserOperation {
        init_code: [vec![0u8; 20], vec![0xde, 0xad]].concat().into(),
        ..valid.clone()
    };
    for packed in [zero_paymaster, zero_factory] {
        assert_ne!(packed.hash(&entry_point, chain_id), wire_hash);
        match ctx.entry_point.handle_packed_ops(&[packed], ctx.beneficiary) {
            Err(EntryPointError::Malformed { inner }) => {
                assert!(inner.contains("zero address"), "{inner}")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::zero());
    assert_eq!(count(&ctx), U256::zero());
}

#[test]
fn prefund_overflow_aborts_the_batch() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();
    let valid = ctx.sign(&ctx.increment_op(sender, 0.into()));
    let overflowing = ctx.sign(
        &ctx.increment_op(sender, 1.into())
            .verification_gas_limit(u128::MAX.into())
            .call_gas_limit(u128::MAX.into())
            .max_fee_per_gas(u128::MAX.into())
            .max_priority_fee_per_gas(u128::MAX.into()),
    );

    assert_eq!(
        ctx.entry_point.handle_ops(&[valid, overflowing], ctx.beneficiary),
        Err(EntryPointError::PrefundOverflow { index: 1 })
    );
    assert_eq!(ctx.entry_point.get_nonce(&sender, U256::zero()), U256::zero());
}

#[test]
fn unknown_sender_is_rejected() {
    let mut ctx = setup().unwrap();
    let uo = UserOperationSigned::random();
    let sender = uo.sender;

    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();
    let rejection = outcome.results[0].rejection().unwrap();
    assert_eq!(rejection, &ValidationError::AccountNotDeployed { sender });
    assert_eq!(rejection.code(), "AA20");
    assert_eq!(outcome.collected, U256::zero());
    assert_eq!(ctx.entry_point.balance(&ctx.beneficiary), U256::zero());
}
