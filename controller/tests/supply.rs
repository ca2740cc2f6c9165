use common_errors::LendingError;
use common_structs::AccountingToken;
use liquidity_layer::TokenLedger;

pub mod constants;
pub mod setup;
use constants::*;
use setup::*;

#[test]
fn test_basic_supply_mints_scaled_balance() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    let events = state.supply_asset(SUPPLIER, USDC, 1_000);
    assert_eq!(
        event_names(&events),
        vec!["reserve_data_updated", "reserve_used_as_collateral_enabled", "supply"]
    );

    // Index is still one RAY: scaled units are the amount at RAY precision.
    let account = state.controller.account(SUPPLIER).unwrap();
    let scaled = account.scaled_balances.get(&asset(USDC)).unwrap();
    assert_eq!(
        raw(scaled),
        ray_units(1_000)
    );
    assert!(account.is_using_as_collateral(&asset(USDC)));

    assert_eq!(state.collateral_amount(SUPPLIER, USDC), amount(USDC, 1_000));
    assert_eq!(state.reserve_underlying(USDC), amount(USDC, 1_000));
    assert_eq!(
        state.scaled_supply_on_ledger(SUPPLIER, USDC),
        raw(scaled)
    );
    assert_eq!(
        state
            .controller
            .ledger()
            .scaled_total_supply(&AccountingToken::supply(&asset(USDC))),
        raw(&state.reserve(USDC).scaled_supply_total)
    );
}

#[test]
fn test_supply_on_behalf_of_other_account() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state
        .controller
        .supply(SUPPLIER, &asset(DAI), amount(DAI, 10), OTHER_USER)
        .unwrap();

    assert_eq!(state.collateral_amount(OTHER_USER, DAI), amount(DAI, 10));
    assert_eq!(state.collateral_amount(SUPPLIER, DAI), Big::zero());
    assert_eq!(
        state.underlying_balance(SUPPLIER, DAI),
        amount(DAI, 1_000_000 - 10)
    );
}

#[test]
fn test_supply_zero_amount_error() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.supply_asset_error(SUPPLIER, USDC, 0, LendingError::InvalidAmount);
}

#[test]
fn test_basic_supply_capped_error() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.supply_asset(SUPPLIER, CAPPED, 100);
    state.supply_asset_error(SUPPLIER, CAPPED, 1, LendingError::SupplyCapExceeded);
}

#[test]
fn test_supply_unlisted_asset_error() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    let result = state
        .controller
        .supply(SUPPLIER, &asset("WBTC"), Big::from(1u64), SUPPLIER);
    assert_eq!(result.err(), Some(LendingError::AssetNotListed));
}

#[test]
fn test_supply_frozen_and_paused_reserve_errors() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.controller.set_reserve_frozen(&asset(USDC), true).unwrap();
    state.supply_asset_error(SUPPLIER, USDC, 10, LendingError::ReserveFrozen);

    state.controller.set_reserve_frozen(&asset(USDC), false).unwrap();
    state.controller.set_reserve_paused(&asset(USDC), true).unwrap();
    state.supply_asset_error(SUPPLIER, USDC, 10, LendingError::ReservePaused);
}

#[test]
fn test_supply_without_funds_is_rolled_back() {
    let mut state = LendingPoolTestState::new();
    let events_before = state.controller.events().len();

    let result = state
        .controller
        .supply(SUPPLIER, &asset(USDC), amount(USDC, 5), SUPPLIER);
    assert!(matches!(result, Err(LendingError::Ledger(_))));

    assert!(state.controller.account(SUPPLIER).is_none());
    assert_eq!(state.controller.events().len(), events_before);
    assert_eq!(
        raw(&state.reserve(USDC).available_liquidity),
        Big::zero()
    );
}

#[test]
fn test_isolated_supply_enters_isolation_only_as_sole_collateral() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.supply_asset(BORROWER, ISOLATED, 100);
    let account = state.controller.account(BORROWER).unwrap();
    assert_eq!(account.isolated_collateral_asset, Some(asset(ISOLATED)));
    assert!(account.is_using_as_collateral(&asset(ISOLATED)));

    // A regular asset joining an isolated account stays out of collateral.
    let events = state.supply_asset(BORROWER, USDC, 100);
    assert_eq!(event_names(&events), vec!["reserve_data_updated", "supply"]);
    let account = state.controller.account(BORROWER).unwrap();
    assert!(!account.is_using_as_collateral(&asset(USDC)));

    // An isolated asset joining existing collateral stays out as well.
    state.supply_asset(SUPPLIER, DAI, 100);
    state.supply_asset(SUPPLIER, ISOLATED, 100);
    let account = state.controller.account(SUPPLIER).unwrap();
    assert!(!account.is_using_as_collateral(&asset(ISOLATED)));
    assert!(!account.is_in_isolation_mode());
}

#[test]
fn test_supply_after_interest_mints_fewer_scaled_units() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.supply_asset(SUPPLIER, USDC, 10_000);
    state.supply_asset(BORROWER, DAI, 10_000);
    state.borrow_asset(BORROWER, USDC, 5_000, common_structs::InterestRateMode::Variable);

    state.advance(SECONDS_PER_YEAR);
    state.supply_asset(OTHER_USER, USDC, 1_000);

    let index = state.reserve(USDC).liquidity_index;
    assert!(raw(&index) > ray_units(1));

    let account = state.controller.account(OTHER_USER).unwrap();
    let scaled = raw(account.scaled_balances.get(&asset(USDC)).unwrap());
    assert!(scaled < ray_units(1_000));

    // Rounded down: the balance is at most what was supplied.
    assert!(state.collateral_amount(OTHER_USER, USDC) <= amount(USDC, 1_000));
    assert_close(
        &state.collateral_amount(OTHER_USER, USDC),
        &amount(USDC, 1_000),
        1,
    );
}
