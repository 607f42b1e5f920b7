use super::*;
use crate::{constants::LEVERAGE_SCALE, utils::leverage};

fn abs_diff(a: u128, b: u128) -> u128 {
    a.max(b) - a.min(b)
}

#[test]
fn initialize_seeds_both_sides() {
    let f = Fixture::new();
    assert_eq!(f.protocol.balance_vault(), 10 * UNIT);
    assert_eq!(f.protocol.balance_long(), 5 * UNIT);
    assert_eq!(f.protocol.total_long_positions(), 1);
    assert_eq!(f.host.custody, 15 * UNIT);
    // 10 units at 2000
    assert_eq!(f.host.stable_balance(&f.deployer), 20_000 * UNIT);
    assert_eq!(f.host.supply, 20_000 * UNIT);

    let (position, penalty) = f.protocol.long_position(&f.position).unwrap();
    assert!(position.validated);
    assert_eq!(position.owner, f.deployer);
    assert_eq!(position.amount, 5 * UNIT);
    assert_eq!(penalty, 2);
    assert_eq!(f.position.tick, 69_200);
    assert_eq!(f.protocol.tick_data(69_200).total_pos, 1);
    f.assert_conserved();
}

#[test]
fn initialize_runs_once() {
    let mut f = Fixture::new();
    let call = f.host.call(f.deployer);
    let price_data = f.host.price_data(price(2_000));
    let err = f
        .protocol
        .initialize(&mut f.host, &call, UNIT, UNIT, price(1_000), &price_data)
        .unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::Unauthorized));
}

#[test]
fn open_then_validate() {
    let mut f = Fixture::new();
    let user = f.user();
    let (initiated, pos_id) = f.open(user, UNIT, price(1_500), price(2_000)).unwrap();
    assert!(initiated);
    assert_eq!(pos_id.tick, 73_300);

    let (position, _) = f.protocol.long_position(&pos_id).unwrap();
    assert!(!position.validated);
    assert_eq!(f.protocol.balance_long(), 6 * UNIT);
    assert_eq!(f.protocol.total_long_positions(), 2);
    assert_eq!(f.host.escrowed, SECURITY_DEPOSIT as u128);
    assert!(matches!(
        f.protocol.pending_action_of(&user).map(|a| a.kind),
        Some(PendingActionKind::Open { .. })
    ));
    f.assert_conserved();

    // The validation price must be at least `validation_delay` seconds later
    f.advance(10);
    let err = f.validate_open(user, price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::PriceTooOld));

    f.advance(20);
    assert!(f.validate_open(user, price(2_000)).unwrap());
    let (position, _) = f.protocol.long_position(&pos_id).unwrap();
    assert!(position.validated);
    assert!(f.protocol.pending_action_of(&user).is_none());
    assert_eq!(f.host.escrowed, 0);
    assert_eq!(f.host.lamport_balance(&user), 1_000_000_000);
    f.assert_conserved();
}

#[test]
fn open_rejects_bad_inputs() {
    let mut f = Fixture::new();
    let user = f.user();

    let err = f.open(user, 1_000, price(1_500), price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::LongPositionTooSmall));

    let err = f.open(user, UNIT, price(1_990), price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::LeverageTooHigh));

    let call = Call {
        value: SECURITY_DEPOSIT - 1,
        ..f.host.call(user)
    };
    let price_data = f.host.price_data(price(2_000));
    let err = f
        .protocol
        .initiate_open_position(
            &mut f.host,
            &call,
            UNIT,
            price(1_500),
            user,
            user,
            START + 10,
            &price_data,
            &PreviousActionsData::default(),
        )
        .unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::SecurityDepositTooLow));

    let call = f.host.call(user);
    let err = f
        .protocol
        .initiate_open_position(
            &mut f.host,
            &call,
            UNIT,
            price(1_500),
            user,
            user,
            START - 1,
            &price_data,
            &PreviousActionsData::default(),
        )
        .unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::DeadlineExceeded));

    let err = f
        .protocol
        .initiate_open_position(
            &mut f.host,
            &call,
            UNIT,
            price(1_500),
            Pubkey::default(),
            user,
            START + 10,
            &price_data,
            &PreviousActionsData::default(),
        )
        .unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::InvalidAddressTo));

    assert_eq!(f.host.asset_balance(&user), 100 * UNIT);
    assert_eq!(f.protocol.total_long_positions(), 1);
}

#[test]
fn trigger_price_keeps_a_safety_margin() {
    let mut f = Fixture::with_config(ProtocolConfig {
        max_leverage: 1_000 * LEVERAGE_SCALE,
        ..quiet_config()
    });
    let user = f.user();
    let err = f.open(user, UNIT, price(1_990), price(2_000)).unwrap_err();
    assert_eq!(
        error_code(&err),
        u32::from(VaultLongError::LiquidationPriceSafetyMargin)
    );
    assert!(f.open(user, UNIT, price(1_900), price(2_000)).unwrap().0);
}

#[test]
fn open_is_bounded_by_the_imbalance_limit() {
    let mut f = Fixture::with_config(ProtocolConfig {
        funding_sf: 0,
        ..ProtocolConfig::default()
    });
    let user = f.user();
    let err = f.open(user, 20 * UNIT, price(1_500), price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::ImbalanceLimitReached));
    assert_eq!(f.host.asset_balance(&user), 100 * UNIT);
}

#[test]
fn validation_above_max_leverage_moves_the_position() {
    let mut f = Fixture::new();
    let user = f.user();
    let (_, pos_id) = f.open(user, UNIT, price(1_800), price(2_000)).unwrap();
    assert_eq!(pos_id.tick, 75_100);

    f.advance(30);
    assert!(f.validate_open(user, price(1_900)).unwrap());

    assert!(f.protocol.long_position(&pos_id).is_err());
    let new_tick = f.protocol.ticks.highest_populated_tick().unwrap();
    assert!(new_tick < pos_id.tick);
    let new_id = PositionId {
        tick: new_tick,
        tick_version: f.protocol.tick_version(new_tick),
        index: 0,
    };
    let (position, penalty) = f.protocol.long_position(&new_id).unwrap();
    assert!(position.validated);
    assert_eq!(position.owner, user);
    assert_eq!(position.amount, UNIT);

    let liq_price = f
        .protocol
        .liquidation_price_for_tick(new_tick, penalty)
        .unwrap();
    assert!(leverage(price(1_900), liq_price).unwrap() <= f.protocol.config.max_leverage);
    assert_eq!(f.protocol.total_long_positions(), 2);
    f.assert_conserved();
}

#[test]
fn close_pays_the_position_value() {
    let mut f = Fixture::new();
    let deployer = f.deployer;
    let before = f.host.asset_balance(&deployer);

    assert!(f.close(deployer, f.position, UNIT / 2, price(2_000)).unwrap());
    assert!(abs_diff(f.protocol.balance_long(), 5 * UNIT - UNIT / 2) <= 2);
    let (position, _) = f.protocol.long_position(&f.position).unwrap();
    assert_eq!(position.amount, 4 * UNIT + UNIT / 2);
    f.assert_conserved();

    f.advance(30);
    assert!(f.validate_close(deployer, price(2_000)).unwrap());
    let received = f.host.asset_balance(&deployer) - before;
    assert!(abs_diff(received, UNIT / 2) <= 2, "received {}", received);
    assert!(f.protocol.pending_action_of(&deployer).is_none());
    f.assert_conserved();
}

#[test]
fn close_rejects_bad_inputs() {
    let mut f = Fixture::new();
    let user = f.user();
    let pos_id = f.position;

    let err = f.close(user, pos_id, UNIT, price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::Unauthorized));

    let deployer = f.deployer;
    let err = f.close(deployer, pos_id, 6 * UNIT, price(2_000)).unwrap_err();
    assert_eq!(
        error_code(&err),
        u32::from(VaultLongError::AmountToCloseHigherThanPositionAmount)
    );

    let err = f.close(deployer, pos_id, 5 * UNIT - 1_000, price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::LongPositionTooSmall));

    let (_, unvalidated) = f.open(user, UNIT, price(1_500), price(2_000)).unwrap();
    let err = f.close(user, unvalidated, UNIT, price(2_000)).unwrap_err();
    assert_eq!(error_code(&err), u32::from(VaultLongError::PositionNotValidated));
}

#[test]
fn partial_closes_add_up_to_a_full_one() {
    let mut split = Fixture::new();
    let deployer = split.deployer;
    let before = split.host.asset_balance(&deployer);
    for _ in 0..2 {
        assert!(split.close(deployer, split.position, UNIT, price(2_000)).unwrap());
        split.advance(30);
        assert!(split.validate_close(deployer, price(2_000)).unwrap());
    }
    let split_received = split.host.asset_balance(&deployer) - before;

    let mut whole = Fixture::new();
    let deployer = whole.deployer;
    let before = whole.host.asset_balance(&deployer);
    assert!(whole.close(deployer, whole.position, 2 * UNIT, price(2_000)).unwrap());
    whole.advance(30);
    assert!(whole.validate_close(deployer, price(2_000)).unwrap());
    let whole_received = whole.host.asset_balance(&deployer) - before;

    assert!(abs_diff(split_received, whole_received) <= 4);
    assert!(abs_diff(whole_received, 2 * UNIT) <= 4);
    split.assert_conserved();
    whole.assert_conserved();
}

#[test]
fn full_close_removes_the_position() {
    let mut f = Fixture::new();
    let user = f.user();
    let (_, pos_id) = f.open(user, UNIT, price(1_500), price(2_000)).unwrap();
    f.advance(30);
    assert!(f.validate_open(user, price(2_000)).unwrap());

    assert!(f.close(user, pos_id, UNIT, price(2_000)).unwrap());
    assert_eq!(f.protocol.total_long_positions(), 1);
    assert_eq!(f.protocol.tick_data(pos_id.tick).total_pos, 0);
    assert!(f.protocol.long_position(&pos_id).is_err());

    f.advance(30);
    assert!(f.validate_close(user, price(2_100)).unwrap());
    // The price went up, so the position closed in profit
    assert!(f.host.asset_balance(&user) > 100 * UNIT);
    f.assert_conserved();
}

#[test]
fn open_then_close_restores_the_totals() {
    let mut f = Fixture::new();
    let total_expo = f.protocol.total_expo();
    let positions = f.protocol.total_long_positions();
    let user = f.user();

    let (_, pos_id) = f.open(user, UNIT, price(1_500), price(2_000)).unwrap();
    f.advance(30);
    assert!(f.validate_open(user, price(2_000)).unwrap());
    check_tick_invariant(&f.protocol);

    assert!(f.close(user, pos_id, UNIT, price(2_000)).unwrap());
    check_tick_invariant(&f.protocol);
    f.advance(30);
    assert!(f.validate_close(user, price(2_000)).unwrap());

    assert_eq!(f.protocol.total_expo(), total_expo);
    assert_eq!(f.protocol.total_long_positions(), positions);
    assert_eq!(f.protocol.tick_data(pos_id.tick), TickData::default());
    assert!(abs_diff(f.host.asset_balance(&user), 100 * UNIT) <= 2);
    f.assert_conserved();
}

#[test]
fn half_close_of_a_three_times_long() {
    let mut f = Fixture::new();
    let user = f.user();
    let (_, pos_id) = f.open(user, UNIT, price(1_333), price(2_000)).unwrap();
    f.advance(30);
    assert!(f.validate_open(user, price(2_000)).unwrap());

    let (position, penalty) = f.protocol.long_position(&pos_id).unwrap();
    let liq_price = f
        .protocol
        .liquidation_price_for_tick(pos_id.tick, penalty)
        .unwrap();
    let position_leverage = leverage(price(2_000), liq_price).unwrap();
    assert!(position_leverage <= 3 * LEVERAGE_SCALE);
    assert!(position_leverage > 29 * LEVERAGE_SCALE / 10);

    let before = f.host.asset_balance(&user);
    assert!(f.close(user, pos_id, UNIT / 2, price(2_000)).unwrap());
    let (remaining, _) = f.protocol.long_position(&pos_id).unwrap();
    assert_eq!(remaining.amount, UNIT / 2);
    assert_eq!(remaining.total_expo, position.total_expo - position.total_expo / 2);
    f.assert_conserved();

    f.advance(30);
    assert!(f.validate_close(user, price(2_000)).unwrap());
    let received = f.host.asset_balance(&user) - before;
    assert!(abs_diff(received, UNIT / 2) <= 2, "received {}", received);
    f.assert_conserved();
}

#[test]
fn rebalancer_may_leave_a_dust_position() {
    let mut f = Fixture::new();
    let deployer = f.deployer;
    f.protocol.config.rebalancer = deployer;

    assert!(f.close(deployer, f.position, 5 * UNIT - 1_000, price(2_000)).unwrap());
    let (position, _) = f.protocol.long_position(&f.position).unwrap();
    assert_eq!(position.amount, 1_000);
    f.advance(30);
    assert!(f.validate_close(deployer, price(2_000)).unwrap());
    f.assert_conserved();
}

#[test]
fn moving_a_position_repoints_the_next_pending_open() {
    let mut f = Fixture::new();
    let first = f.user();
    let second = f.user();
    let (_, first_id) = f.open(first, UNIT, price(1_800), price(2_000)).unwrap();
    let (_, second_id) = f.open(second, UNIT, price(1_800), price(2_000)).unwrap();
    assert_eq!(first_id.tick, 75_100);
    assert_eq!(second_id.tick, 75_100);
    assert_eq!((first_id.index, second_id.index), (0, 1));

    // The first position leaves the tick and the second takes its slot
    f.advance(30);
    assert!(f.validate_open(first, price(1_900)).unwrap());
    let Some(PendingActionKind::Open { tick, index, .. }) =
        f.protocol.pending_action_of(&second).map(|a| a.kind)
    else {
        panic!("second open is no longer pending");
    };
    assert_eq!((tick, index), (75_100, 0));
    let moved_id = PositionId {
        index: 0,
        ..second_id
    };
    let (position, _) = f.protocol.long_position(&moved_id).unwrap();
    assert_eq!(position.owner, second);
    assert!(!position.validated);
    assert!(f.protocol.long_position(&second_id).is_err());
    f.assert_conserved();

    assert!(f.validate_open(second, price(1_900)).unwrap());
    assert!(f.protocol.pending_action_of(&second).is_none());
    assert_eq!(f.protocol.tick_data(75_100).total_pos, 0);
    assert_eq!(f.protocol.total_long_positions(), 3);
    f.assert_conserved();
}
