use common_constants::{RAY, SECONDS_PER_YEAR};
use common_errors::LendingError;
use common_math::SharedMathModule;
use common_structs::{
    AssetId, InterestRateStrategy, ReserveConfig, ReserveData, StableDebtPosition, TokenKind,
};
use liquidity_layer::{LiquidityModule, LiquidityPool, UtilsModule, ViewModule};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

type Dec = ManagedDecimal<StaticApi, NumDecimals>;

const START: u64 = 1_000;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bps(value: u64) -> Dec {
    Dec::from_raw_units(BigUint::from(value), 4)
}

fn ray_pct(hundredths_of_percent: u128) -> Dec {
    Dec::from_raw_units(BigUint::from(RAY / 10_000 * hundredths_of_percent), 27)
}

fn units(amount: u64) -> Dec {
    Dec::from_raw_units(BigUint::from(amount) * BigUint::from(1_000_000u64), 6)
}

fn raw(value: &Dec) -> BigUint<StaticApi> {
    value.into_raw_units().clone()
}

fn usdc_reserve() -> ReserveData<StaticApi> {
    let config = ReserveConfig {
        ltv: bps(7_500),
        liquidation_threshold: bps(8_000),
        liquidation_bonus: bps(10_500),
        liquidation_protocol_fee: bps(1_000),
        reserve_factor: bps(1_000),
        decimals: 6,
        active: true,
        frozen: false,
        paused: false,
        borrowing_enabled: true,
        stable_borrowing_enabled: true,
        borrow_cap: None,
        supply_cap: None,
        debt_ceiling: Dec::from_raw_units(BigUint::zero(), 18),
        e_mode_category: 0,
        borrowable_in_isolation: false,
        siloed_borrowing: false,
        flash_loan_enabled: true,
    };
    let strategy = InterestRateStrategy {
        optimal_usage_ratio: bps(8_000),
        base_variable_borrow_rate: ray_pct(0),
        variable_rate_slope1: ray_pct(400),
        variable_rate_slope2: ray_pct(6_000),
        stable_rate_slope1: ray_pct(200),
        stable_rate_slope2: ray_pct(6_000),
        base_stable_rate_offset: ray_pct(200),
        stable_rate_excess_offset: ray_pct(800),
        optimal_stable_to_total_debt_ratio: bps(2_000),
    };
    ReserveData::new(AssetId::from("USDC"), TokenKind::Generic, config, strategy, START)
}

/// 1000 supplied, 500 borrowed at a variable rate, rates refreshed.
fn half_used_reserve(pool: &LiquidityPool<StaticApi>) -> ReserveData<StaticApi> {
    let mut reserve = usdc_reserve();

    let supplied = units(1_000);
    let scaled = pool.scaled_supply_mint(&reserve, &supplied);
    pool.add_supply(&mut reserve, &scaled, &supplied);

    let borrowed = units(500);
    let scaled_debt = pool.scaled_debt_mint(&reserve, &borrowed);
    pool.add_variable_debt(&mut reserve, &scaled_debt, &borrowed).unwrap();

    pool.update_interest_rates(&mut reserve, START);
    reserve
}

#[test]
fn accrual_rejects_past_and_skips_same_timestamp() {
    init_logger();
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = half_used_reserve(&pool);

    assert_eq!(
        pool.accrue(&mut reserve, START - 1).unwrap_err(),
        LendingError::TimestampInPast
    );

    pool.accrue(&mut reserve, START).unwrap();
    assert_eq!(raw(&reserve.liquidity_index), BigUint::from(RAY));
    assert_eq!(raw(&reserve.variable_borrow_index), BigUint::from(RAY));
    assert_eq!(raw(&reserve.accrued_to_treasury_scaled), BigUint::zero());
    assert_eq!(reserve.last_update_timestamp, START);
}

#[test]
fn rates_follow_usage_after_refresh() {
    let pool = LiquidityPool::<StaticApi>::new();
    let reserve = half_used_reserve(&pool);

    // 50% usage: 4% * 0.5 / 0.8
    assert_eq!(raw(&reserve.current_variable_borrow_rate), raw(&ray_pct(250)));
    assert_eq!(
        raw(&reserve.current_liquidity_rate),
        BigUint::from(RAY / 1_000_000 * 11_250)
    );
    assert_eq!(
        raw(&pool.utilization(&reserve, START)),
        BigUint::from(RAY / 2)
    );
}

#[test]
fn one_year_of_accrual() {
    init_logger();
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = half_used_reserve(&pool);

    let projected_income = pool.normalized_income(&reserve, START + SECONDS_PER_YEAR);
    let projected_debt = pool.normalized_debt(&reserve, START + SECONDS_PER_YEAR);

    pool.accrue(&mut reserve, START + SECONDS_PER_YEAR).unwrap();

    // linear 1.125%
    assert_eq!(
        raw(&reserve.liquidity_index),
        BigUint::from(RAY + RAY / 100_000 * 1_125)
    );
    assert_eq!(raw(&projected_income), raw(&reserve.liquidity_index));
    assert_eq!(raw(&projected_debt), raw(&reserve.variable_borrow_index));

    // compounded 2.5%, e^0.025 = 1.025315...
    let variable = reserve
        .variable_borrow_index
        .rescale(9)
        .into_raw_units()
        .to_u64()
        .unwrap();
    assert!((1_025_310_000..=1_025_316_000).contains(&variable), "{variable}");

    // 10% of ~12.66 interest
    let treasury = pool.supply_balance(&reserve, &reserve.accrued_to_treasury_scaled);
    let treasury_units = treasury.into_raw_units().to_u64().unwrap();
    assert!((1_260_000..=1_270_000).contains(&treasury_units), "{treasury_units}");
}

#[test]
fn supplier_claims_stay_backed_by_debt_and_liquidity() {
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = half_used_reserve(&pool);

    let mut now = START;
    for _ in 0..24 {
        now += SECONDS_PER_YEAR / 12;
        let liquidity_before = reserve.liquidity_index.clone();
        let variable_before = reserve.variable_borrow_index.clone();

        pool.accrue(&mut reserve, now).unwrap();

        assert!(reserve.liquidity_index >= liquidity_before);
        assert!(reserve.variable_borrow_index >= variable_before);

        let claims = pool.total_supply(&reserve);
        let backing = reserve.available_liquidity.clone()
            + pool.total_variable_debt(&reserve)
            + pool.total_stable_debt(&reserve, now);
        let dust = Dec::from_raw_units(BigUint::from(1u64), 6);
        assert!(claims <= backing + dust);
    }
}

#[test]
fn scaled_rounding_favors_the_reserve() {
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = usdc_reserve();
    // index 1.5 makes every small amount inexact
    reserve.liquidity_index = Dec::from_raw_units(BigUint::from(RAY + RAY / 2), 27);
    reserve.variable_borrow_index = reserve.liquidity_index.clone();

    let one = Dec::from_raw_units(BigUint::from(1u64), 6);
    let floor = pool.scaled_supply_mint(&reserve, &one);
    let ceil = pool.scaled_supply_burn(&reserve, &one);
    assert_eq!(raw(&ceil) - raw(&floor), BigUint::from(1u64));

    assert_eq!(raw(&pool.scaled_debt_mint(&reserve, &one)), raw(&ceil));
    assert_eq!(raw(&pool.scaled_debt_burn(&reserve, &one)), raw(&floor));

    // a supply followed by a full withdrawal never returns more than deposited
    let deposit = units(7);
    let scaled = pool.scaled_supply_mint(&reserve, &deposit);
    assert!(pool.supply_balance(&reserve, &scaled) <= deposit);
}

#[test]
fn withdrawal_needs_available_liquidity() {
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = half_used_reserve(&pool);

    let amount = units(600);
    let scaled = pool.scaled_supply_burn(&reserve, &amount);
    assert_eq!(
        pool.remove_supply(&mut reserve, &scaled, &amount).unwrap_err(),
        LendingError::InsufficientLiquidity
    );

    let amount = units(500);
    let scaled = pool.scaled_supply_burn(&reserve, &amount);
    pool.remove_supply(&mut reserve, &scaled, &amount).unwrap();
    assert_eq!(raw(&reserve.available_liquidity), BigUint::zero());
}

#[test]
fn stable_average_rate_rebalances_on_mint_and_burn() {
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = usdc_reserve();
    let supplied = units(10_000);
    let scaled = pool.scaled_supply_mint(&reserve, &supplied);
    pool.add_supply(&mut reserve, &scaled, &supplied);

    let alice = pool
        .mint_stable_debt(&mut reserve, None, &units(100), &ray_pct(1_000), START)
        .unwrap();
    let bob = pool
        .mint_stable_debt(&mut reserve, None, &units(300), &ray_pct(600), START)
        .unwrap();

    // (100 * 10% + 300 * 6%) / 400
    assert_eq!(raw(&reserve.average_stable_rate), raw(&ray_pct(700)));
    assert_eq!(raw(&reserve.total_principal_stable_debt), raw(&units(400)));
    assert_eq!(raw(&alice.rate), raw(&ray_pct(1_000)));

    let (repaid, remaining) = pool.burn_stable_debt(&mut reserve, &alice, &units(500), START);
    assert_eq!(raw(&repaid), raw(&units(100)));
    assert!(remaining.is_none());
    // (28 - 10) / 300
    assert_eq!(raw(&reserve.average_stable_rate), raw(&ray_pct(600)));

    let top_up = pool
        .mint_stable_debt(&mut reserve, Some(&bob), &units(100), &ray_pct(1_000), START)
        .unwrap();
    // (300 * 6% + 100 * 10%) / 400
    assert_eq!(raw(&top_up.rate), raw(&ray_pct(700)));
    assert_eq!(raw(&top_up.principal), raw(&units(400)));
}

#[test]
fn stable_balance_compounds_from_last_update() {
    let pool = LiquidityPool::<StaticApi>::new();
    let reserve = usdc_reserve();
    let position = StableDebtPosition {
        principal: units(1_000),
        rate: ray_pct(1_000),
        last_update: START,
    };

    assert_eq!(
        raw(&pool.stable_debt_balance(&reserve, &position, START)),
        raw(&units(1_000))
    );
    let after_year = pool.stable_debt_balance(&reserve, &position, START + SECONDS_PER_YEAR);
    let value = after_year.into_raw_units().to_u64().unwrap();
    // 1000 * 1.10516...
    assert!((1_105_160_000..=1_105_171_000).contains(&value), "{value}");
}

#[test]
fn treasury_mint_and_flash_premium() {
    let pool = LiquidityPool::<StaticApi>::new();
    let mut reserve = half_used_reserve(&pool);
    assert!(pool.mint_to_treasury(&mut reserve).is_none());

    let premium = pool.flash_loan_premium(&units(1_000), &bps(9));
    assert_eq!(raw(&premium), BigUint::from(900_000u64));

    let liquidity_before = reserve.available_liquidity.clone();
    pool.accrue_premium_to_treasury(&mut reserve, &premium);
    assert_eq!(
        raw(&reserve.available_liquidity),
        raw(&liquidity_before) + BigUint::from(900_000u64)
    );

    let scaled_before = reserve.scaled_supply_total.clone();
    let (scaled, amount) = pool.mint_to_treasury(&mut reserve).unwrap();
    assert_eq!(raw(&amount), BigUint::from(900_000u64));
    assert_eq!(raw(&reserve.accrued_to_treasury_scaled), BigUint::zero());
    assert_eq!(
        raw(&reserve.scaled_supply_total),
        raw(&scaled_before) + raw(&scaled)
    );
    assert!(pool.ray() == reserve.liquidity_index);
}
