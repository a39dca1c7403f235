use crate::common::{count, setup, sign_with, ETHER};
use ethers::{
    abi::AbiEncode,
    types::{Address, U256},
};
use vela_contracts::{
    get_address, simple_account_factory_api::CreateAccountCall, utils::decode_address, Revert,
    SimpleAccountFactory,
};
use vela_entrypoint::{EntryPointError, EntryPointEvent, ValidationError};
use vela_primitives::{constants::dev, Wallet};

#[test]
fn counterfactual_address() {
    let mut ctx = setup().unwrap();
    let owner = ctx.owner.address();
    let expected = get_address(ctx.factory, 7.into());

    let before = ctx.entry_point.compute_address(ctx.factory, owner, 7.into()).unwrap();
    assert_eq!(before, expected);
    assert_eq!(ctx.entry_point.compute_address(ctx.factory, owner, 7.into()).unwrap(), before);
    assert_eq!(
        ctx.entry_point.get_sender_address(ctx.factory, ctx.init_code(7)).unwrap(),
        expected
    );
    // queries leave no trace
    assert!(!ctx.entry_point.state().has_code(&expected));
    let factory = ctx.entry_point.contract::<SimpleAccountFactory>(&ctx.factory).unwrap();
    assert_eq!(factory.next_sequence(), U256::one());

    ctx.deploy_account(7, U256::zero()).unwrap();
    assert!(ctx.entry_point.state().has_code(&expected));
    assert_eq!(ctx.entry_point.compute_address(ctx.factory, owner, 7.into()).unwrap(), before);
    assert!(ctx.entry_point.compute_address(Address::random(), owner, 7.into()).is_err());
}

#[test]
fn create_account_is_idempotent() {
    let mut ctx = setup().unwrap();
    let data = ctx.init_code(3);

    let (deployer, factory) = (ctx.deployer, ctx.factory);
    let first = ctx.entry_point.call(deployer, factory, U256::zero(), data.clone()).unwrap();
    let second = ctx.entry_point.call(deployer, factory, U256::zero(), data).unwrap();
    assert_eq!(first, second);
    assert_eq!(decode_address(&first).unwrap(), ctx.account(3));

    let factory = ctx.entry_point.contract::<SimpleAccountFactory>(&ctx.factory).unwrap();
    assert_eq!(factory.next_sequence(), 4.into());

    // a different owner cannot take the address
    let stranger = Wallet::from_phrase(dev::MNEMONIC, 5).unwrap().address();
    let data = CreateAccountCall { owner: stranger, salt: 3.into() }.encode();
    assert_eq!(
        ctx.entry_point.call(ctx.deployer, ctx.factory, U256::zero(), data.into()),
        Err(EntryPointError::Revert(Revert::AddressInUse { address: ctx.account(3) }))
    );
}

#[test]
fn init_code_of_a_deployed_account() {
    let mut ctx = setup().unwrap();
    let sender = ctx.deploy_account(1, ETHER.into()).unwrap();

    let uo = ctx.increment_op(sender, 0.into()).factory_and_data(ctx.factory, ctx.init_code(1));
    let uo = ctx.sign(&uo);
    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();
    assert!(outcome.results[0].is_success());
    assert_eq!(count(&ctx), U256::one());
    assert!(!ctx
        .entry_point
        .events()
        .iter()
        .any(|event| matches!(event, EntryPointEvent::AccountDeployed { .. })));
}

#[test]
fn init_code_failures() {
    let mut ctx = setup().unwrap();
    let sender = ctx.account(2);
    ctx.entry_point.set_balance(sender, ETHER.into());

    // deploys the account with sequence 1, not the sender
    let wrong_sender =
        ctx.increment_op(sender, 0.into()).factory_and_data(ctx.factory, ctx.init_code(1));
    let unknown_factory =
        ctx.increment_op(sender, 0.into()).factory_and_data(Address::random(), ctx.init_code(2));
    let garbage = ctx
        .increment_op(sender, 0.into())
        .factory_and_data(ctx.factory, vec![0xde, 0xad, 0xbe, 0xef].into());
    let valid = ctx.increment_op(sender, 0.into()).factory_and_data(ctx.factory, ctx.init_code(2));
    let ops = [wrong_sender, unknown_factory, garbage, valid].map(|uo| ctx.sign(&uo));

    let outcome = ctx.entry_point.handle_ops(&ops, ctx.beneficiary).unwrap();
    for result in outcome.results[..3].iter() {
        let rejection = result.rejection().unwrap();
        assert!(matches!(rejection, ValidationError::InitCodeFailed { .. }), "{rejection:?}");
        assert_eq!(rejection.code(), "AA13");
    }
    match outcome.results[0].rejection() {
        Some(ValidationError::InitCodeFailed { reason }) => assert!(reason.starts_with("AA14")),
        other => panic!("unexpected {other:?}"),
    }
    // the rejected deployment of sequence 1 was rolled back
    assert!(!ctx.entry_point.state().has_code(&ctx.account(1)));
    assert!(outcome.results[3].is_success());
    assert!(ctx.entry_point.state().has_code(&sender));
}

#[test]
fn signature_of_another_owner_does_not_deploy() {
    let mut ctx = setup().unwrap();
    let sender = ctx.account(1);
    ctx.entry_point.set_balance(sender, ETHER.into());

    let uo = ctx.increment_op(sender, 0.into()).factory_and_data(ctx.factory, ctx.init_code(1));
    let uo = sign_with(&Wallet::build_random(), &ctx.entry_point, &uo);
    let outcome = ctx.entry_point.handle_ops(&[uo], ctx.beneficiary).unwrap();

    assert_eq!(outcome.results[0].rejection(), Some(&ValidationError::AuthorizationFailed));
    assert!(!ctx.entry_point.state().has_code(&sender));
    assert!(ctx.entry_point.events().is_empty());
}
