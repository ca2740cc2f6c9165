use common_errors::LendingError;
use common_structs::InterestRateMode;

pub mod constants;
pub mod setup;
use constants::*;
use setup::*;

fn isolation_debt(state: &LendingPoolTestState) -> Big {
    raw(&state.reserve(ISOLATED).isolation_mode_total_debt)
}

/// Borrower holding 1000 ISOLATED ($5000) as its only collateral.
fn isolated_borrower(state: &mut LendingPoolTestState) {
    state.supply_asset(SUPPLIER, USDC, 10_000);
    state.supply_asset(SUPPLIER, DAI, 10_000);
    state.supply_asset(BORROWER, ISOLATED, 1_000);
}

#[test]
fn test_isolated_borrow_tracks_debt_ceiling() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);

    let account = state.controller.account(BORROWER).unwrap();
    assert!(account.is_in_isolation_mode());

    let events = state.borrow_asset(BORROWER, USDC, 500, InterestRateMode::Variable);
    assert_eq!(
        event_names(&events),
        vec![
            "reserve_data_updated",
            "isolation_mode_total_debt_updated",
            "borrow"
        ]
    );
    assert_eq!(isolation_debt(&state), raw(&wad_units(500)));

    // Ceiling is $1000.
    state.borrow_asset_error(
        BORROWER,
        USDC,
        600,
        InterestRateMode::Variable,
        LendingError::DebtCeilingExceeded,
    );
    state.borrow_asset(BORROWER, USDC, 500, InterestRateMode::Variable);
    assert_eq!(isolation_debt(&state), raw(&wad_units(1_000)));
}

#[test]
fn test_isolated_borrow_of_non_isolation_asset_error() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);

    state.borrow_asset_error(
        BORROWER,
        DAI,
        10,
        InterestRateMode::Variable,
        LendingError::AssetNotBorrowableInIsolation,
    );

    state
        .controller
        .set_borrowable_in_isolation(&asset(DAI), true)
        .unwrap();
    state.borrow_asset(BORROWER, DAI, 10, InterestRateMode::Variable);
}

#[test]
fn test_isolated_repay_releases_ceiling() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);
    state.borrow_asset(BORROWER, USDC, 800, InterestRateMode::Variable);

    let events = state.repay_asset(BORROWER, USDC, 300, InterestRateMode::Variable);
    assert_eq!(
        event_names(&events),
        vec![
            "reserve_data_updated",
            "isolation_mode_total_debt_updated",
            "repay"
        ]
    );
    assert_eq!(isolation_debt(&state), raw(&wad_units(500)));

    // Interest pushes the repaid value past the tracked debt: the counter floors at zero.
    state.advance(SECONDS_PER_YEAR);
    state.repay_asset_den(BORROWER, USDC, max_amount(), InterestRateMode::Variable);
    assert_eq!(isolation_debt(&state), Big::zero());
}

#[test]
fn test_isolation_debt_dust_is_erased() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);
    state.borrow_asset(BORROWER, USDC, 100, InterestRateMode::Variable);

    // Leaves $0.50 of tracked debt, under one base unit.
    state.repay_asset_den(
        BORROWER,
        USDC,
        fraction(USDC, 995, 1),
        InterestRateMode::Variable,
    );
    assert_eq!(isolation_debt(&state), Big::zero());
    assert_eq!(state.borrow_amount(BORROWER, USDC), fraction(USDC, 5, 1));
}

#[test]
fn test_isolated_collateral_rules() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);

    // A second asset never joins an isolated account's collateral.
    state.supply_asset(BORROWER, DAI, 100);
    let result = state
        .controller
        .set_user_use_reserve_as_collateral(BORROWER, &asset(DAI), true);
    assert_eq!(result.err(), Some(LendingError::UserInIsolationModeOrLtvZero));

    // Only the isolated collateral backs borrows: 1000 * $5 * 50%.
    let data = state.account_data(BORROWER);
    assert_eq!(raw(&data.total_collateral), raw(&wad_units(5_000)));
    assert_eq!(raw(&data.available_borrows), raw(&wad_units(2_500)));

    // Withdrawing everything releases isolation mode.
    state.withdraw_asset_den(BORROWER, ISOLATED, max_amount());
    let account = state.controller.account(BORROWER).unwrap();
    assert!(!account.is_in_isolation_mode());

    let events = state
        .controller
        .set_user_use_reserve_as_collateral(BORROWER, &asset(DAI), true)
        .unwrap();
    assert_eq!(
        event_names(&events),
        vec!["reserve_used_as_collateral_enabled"]
    );
}

#[test]
fn test_isolated_liquidation_releases_ceiling() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);
    state.borrow_asset(BORROWER, USDC, 500, InterestRateMode::Variable);

    // 1000 * $0.50 * 60% = 300 against 500 of debt.
    state.set_price(ISOLATED, ONE_DOLLAR / 2);
    let events = state
        .liquidate_account_den(LIQUIDATOR, ISOLATED, USDC, BORROWER, amount(USDC, 100), false)
        .unwrap();
    assert_eq!(
        event_names(&events),
        vec![
            "reserve_data_updated",
            "isolation_mode_total_debt_updated",
            "reserve_data_updated",
            "liquidation_call"
        ]
    );
    assert_eq!(isolation_debt(&state), raw(&wad_units(400)));
    // 100 / $0.50 * 1.10
    assert_eq!(
        state.collateral_amount(BORROWER, ISOLATED),
        amount(ISOLATED, 780)
    );
}

#[test]
fn test_emptied_position_drops_its_collateral_flag() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.supply_asset(BORROWER, DAI, 1_000);
    state.withdraw_asset_den(BORROWER, DAI, max_amount());
    let account = state.controller.account(BORROWER).unwrap();
    assert_eq!(account.collateral_flag(&asset(DAI)), None);

    state.supply_asset(BORROWER, ISOLATED, 1_000);
    assert!(state.controller.account(BORROWER).unwrap().is_in_isolation_mode());

    // Coming back while isolated, DAI stays out of the collateral.
    let events = state.supply_asset(BORROWER, DAI, 1_000);
    assert_eq!(event_names(&events), vec!["reserve_data_updated", "supply"]);

    let account = state.controller.account(BORROWER).unwrap();
    assert_eq!(account.collateral_flag(&asset(DAI)), Some(false));
    assert!(!account.is_using_as_collateral(&asset(DAI)));
    assert_eq!(
        raw(&state.account_data(BORROWER).total_collateral),
        raw(&wad_units(5_000))
    );

    // A later top-up keeps the refusal.
    state.supply_asset(BORROWER, DAI, 10);
    assert_eq!(
        raw(&state.account_data(BORROWER).total_collateral),
        raw(&wad_units(5_000))
    );
}

#[test]
fn test_isolation_debt_ignores_price_moves() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);
    isolated_borrower(&mut state);
    state.supply_asset(OTHER_USER, ISOLATED, 1_000);

    state.borrow_asset(BORROWER, USDC, 500, InterestRateMode::Variable);
    state.borrow_asset(OTHER_USER, USDC, 200, InterestRateMode::Variable);
    assert_eq!(isolation_debt(&state), raw(&wad_units(700)));

    // Repaying at a different price releases exactly what was charged.
    state.set_price(USDC, 2 * ONE_DOLLAR);
    state.repay_asset_den(BORROWER, USDC, max_amount(), InterestRateMode::Variable);
    assert_eq!(state.borrow_amount(BORROWER, USDC), Big::zero());
    assert_eq!(isolation_debt(&state), raw(&wad_units(200)));

    // The ceiling counts borrowed units, whatever they are worth.
    state.borrow_asset(OTHER_USER, USDC, 800, InterestRateMode::Variable);
    assert_eq!(isolation_debt(&state), raw(&wad_units(1_000)));
    state.borrow_asset_error(
        OTHER_USER,
        USDC,
        1,
        InterestRateMode::Variable,
        LendingError::DebtCeilingExceeded,
    );

    state.set_price(USDC, ONE_DOLLAR / 2);
    state.repay_asset_den(OTHER_USER, USDC, max_amount(), InterestRateMode::Variable);
    assert_eq!(isolation_debt(&state), Big::zero());
}

#[test]
fn test_isolated_collateral_refused_in_e_mode() {
    let mut state = LendingPoolTestState::new();
    setup_accounts(&mut state);

    state.controller.set_user_e_mode(BORROWER, EGLD_E_MODE).unwrap();
    state.supply_asset(BORROWER, ISOLATED, 1_000);

    let account = state.controller.account(BORROWER).unwrap();
    assert!(!account.is_in_isolation_mode());
    assert!(!account.is_using_as_collateral(&asset(ISOLATED)));

    let result = state
        .controller
        .set_user_use_reserve_as_collateral(BORROWER, &asset(ISOLATED), true);
    assert_eq!(result.err(), Some(LendingError::UserInIsolationModeOrLtvZero));
    assert_eq!(
        raw(&state.account_data(BORROWER).total_collateral),
        Big::zero()
    );
}
