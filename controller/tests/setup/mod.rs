#![allow(dead_code)]

use crate::constants::*;

use common_constants::{MAX_AMOUNT, RAY};
use common_errors::LendingError;
use common_events::Event;
use common_structs::{
    AccountId, AccountingToken, AssetId, EModeCategory, InterestRateMode, InterestRateStrategy,
    ReserveConfig, ReserveData, TokenKind,
};
use controller::{
    storage::ControllerConfig, Controller, FixedPriceOracle, SequencerSentinel,
    UserAccountData, UserReserveData, ViewsModule,
};
use liquidity_layer::{InMemoryLedger, Party, TokenLedger};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};
use multiversx_sc_scenario::api::StaticApi;

pub type Dec = ManagedDecimal<StaticApi, NumDecimals>;
pub type Events = Vec<Event<StaticApi>>;
pub type Big = BigUint<StaticApi>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn asset(ticker: &str) -> AssetId {
    AssetId::from(ticker)
}

/// `units` whole tokens of `ticker` in raw asset units.
pub fn amount(ticker: &str, units: u64) -> BigUint<StaticApi> {
    BigUint::from(units) * BigUint::from(10u64).pow(market(ticker).decimals as u32)
}

/// `numerator / 10^exponent` tokens of `ticker` in raw asset units.
pub fn fraction(ticker: &str, numerator: u64, exponent: u32) -> BigUint<StaticApi> {
    BigUint::from(numerator) * BigUint::from(10u64).pow(market(ticker).decimals as u32 - exponent)
}

/// `units` at RAY precision, the raw form of scaled balances at a unit index.
pub fn ray_units(units: u64) -> BigUint<StaticApi> {
    BigUint::from(units) * BigUint::from(10u64).pow(27)
}

pub fn max_amount() -> BigUint<StaticApi> {
    BigUint::from(MAX_AMOUNT)
}

pub fn bps(value: u64) -> Dec {
    Dec::from_raw_units(BigUint::from(value), 4)
}

pub fn wad_units(value: u64) -> Dec {
    Dec::from_raw_units(
        BigUint::from(value) * BigUint::from(10u64).pow(18),
        18,
    )
}

pub fn ray_pct(hundredths_of_percent: u128) -> Dec {
    Dec::from_raw_units(BigUint::from(RAY / 10_000 * hundredths_of_percent), 27)
}

pub fn ray_ratio(numerator: u128, denominator: u128) -> Dec {
    Dec::from_raw_units(BigUint::from(RAY / denominator * numerator), 27)
}

pub fn raw(value: &Dec) -> BigUint<StaticApi> {
    value.into_raw_units().clone()
}

/// Asserts `actual` lies within `tolerance` raw units of `expected`.
pub fn assert_close(actual: &BigUint<StaticApi>, expected: &BigUint<StaticApi>, tolerance: u64) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= BigUint::from(tolerance),
        "{:?} differs from {:?} by {:?}",
        actual,
        expected,
        diff
    );
}

pub fn default_strategy() -> InterestRateStrategy<StaticApi> {
    InterestRateStrategy {
        optimal_usage_ratio: bps(OPTIMAL_USAGE_BPS),
        base_variable_borrow_rate: ray_pct(BASE_VARIABLE_RATE),
        variable_rate_slope1: ray_pct(VARIABLE_SLOPE1),
        variable_rate_slope2: ray_pct(VARIABLE_SLOPE2),
        stable_rate_slope1: ray_pct(STABLE_SLOPE1),
        stable_rate_slope2: ray_pct(STABLE_SLOPE2),
        base_stable_rate_offset: ray_pct(BASE_STABLE_OFFSET),
        stable_rate_excess_offset: ray_pct(STABLE_EXCESS_OFFSET),
        optimal_stable_to_total_debt_ratio: bps(OPTIMAL_STABLE_RATIO_BPS),
    }
}

pub fn reserve_config(fixture: &MarketFixture) -> ReserveConfig<StaticApi> {
    let whole = |units: u64| {
        Dec::from_raw_units(
            BigUint::from(units) * BigUint::from(10u64).pow(fixture.decimals as u32),
            fixture.decimals,
        )
    };
    ReserveConfig {
        ltv: bps(fixture.ltv),
        liquidation_threshold: bps(fixture.liquidation_threshold),
        liquidation_bonus: bps(fixture.liquidation_bonus),
        liquidation_protocol_fee: bps(fixture.protocol_fee),
        reserve_factor: bps(fixture.reserve_factor),
        decimals: fixture.decimals,
        active: true,
        frozen: false,
        paused: false,
        borrowing_enabled: true,
        stable_borrowing_enabled: fixture.stable_borrowing,
        borrow_cap: fixture.borrow_cap.map(whole),
        supply_cap: fixture.supply_cap.map(whole),
        debt_ceiling: wad_units(fixture.debt_ceiling),
        e_mode_category: 0,
        borrowable_in_isolation: fixture.borrowable_in_isolation,
        siloed_borrowing: fixture.siloed_borrowing,
        flash_loan_enabled: true,
    }
}

pub fn egld_e_mode_category() -> EModeCategory<StaticApi> {
    EModeCategory {
        id: EGLD_E_MODE,
        ltv: bps(EGLD_E_MODE_LTV),
        liquidation_threshold: bps(EGLD_E_MODE_THRESHOLD),
        liquidation_bonus: bps(EGLD_E_MODE_BONUS),
        price_source: None,
        label: "EGLD derivatives".to_string(),
    }
}

pub struct LendingPoolTestState {
    pub controller: Controller<StaticApi>,
}

impl LendingPoolTestState {
    /// Every market listed, the EGLD e-mode category configured, the clock at
    /// `START` and the sequencer up since genesis.
    pub fn new() -> Self {
        init_logger();

        let mut oracle = FixedPriceOracle::<StaticApi>::new(PRICE_DECIMALS);
        for fixture in MARKETS {
            oracle.set_price(&asset(fixture.ticker), BigUint::from(fixture.price));
        }

        let controller = Controller::new(
            ControllerConfig {
                treasury: TREASURY,
                ..ControllerConfig::default()
            },
            oracle,
            SequencerSentinel::new(GRACE_PERIOD, 0),
            InMemoryLedger::new(),
            START,
        );
        let mut state = LendingPoolTestState { controller };

        for fixture in MARKETS {
            state
                .controller
                .init_reserve(
                    &asset(fixture.ticker),
                    TokenKind::Generic,
                    reserve_config(fixture),
                    default_strategy(),
                )
                .expect("market listing");
        }

        state
            .controller
            .configure_e_mode_category(egld_e_mode_category())
            .expect("e-mode category");
        for fixture in MARKETS.iter().filter(|fixture| fixture.e_mode_category != 0) {
            state
                .controller
                .set_asset_e_mode_category(&asset(fixture.ticker), fixture.e_mode_category)
                .expect("e-mode membership");
        }

        state
    }

    pub fn change_timestamp(&mut self, timestamp: u64) {
        self.controller
            .set_block_timestamp(timestamp)
            .expect("clock moves forward");
    }

    pub fn advance(&mut self, seconds: u64) {
        let now = self.controller.now() + seconds;
        self.change_timestamp(now);
    }

    /// Price with 8 decimals, `ONE_DOLLAR` being $1.
    pub fn set_price(&mut self, ticker: &str, price: u64) {
        self.controller
            .oracle_mut()
            .set_price(&asset(ticker), BigUint::from(price));
    }

    pub fn fund(&mut self, account: AccountId, ticker: &str, units: u64) {
        self.controller
            .ledger_mut()
            .fund(&asset(ticker), Party::Account(account), amount(ticker, units));
    }

    pub fn underlying_balance(&self, account: AccountId, ticker: &str) -> BigUint<StaticApi> {
        self.controller
            .ledger()
            .underlying_balance_of(&asset(ticker), &Party::Account(account))
    }

    pub fn reserve_underlying(&self, ticker: &str) -> BigUint<StaticApi> {
        self.controller
            .ledger()
            .underlying_balance_of(&asset(ticker), &Party::Reserve)
    }

    pub fn scaled_supply_on_ledger(&self, account: AccountId, ticker: &str) -> BigUint<StaticApi> {
        self.controller
            .ledger()
            .scaled_balance_of(&AccountingToken::supply(&asset(ticker)), &account)
    }

    pub fn supply_asset(&mut self, account: AccountId, ticker: &str, units: u64) -> Events {
        self.supply_asset_den(account, ticker, amount(ticker, units))
    }

    pub fn supply_asset_den(
        &mut self,
        account: AccountId,
        ticker: &str,
        raw_amount: BigUint<StaticApi>,
    ) -> Events {
        self.controller
            .supply(account, &asset(ticker), raw_amount, account)
            .expect("supply")
    }

    pub fn supply_asset_error(
        &mut self,
        account: AccountId,
        ticker: &str,
        units: u64,
        error: LendingError,
    ) {
        let result = self
            .controller
            .supply(account, &asset(ticker), amount(ticker, units), account);
        assert_eq!(result.err(), Some(error));
    }

    pub fn withdraw_asset(&mut self, account: AccountId, ticker: &str, units: u64) -> Events {
        self.withdraw_asset_den(account, ticker, amount(ticker, units))
    }

    pub fn withdraw_asset_den(
        &mut self,
        account: AccountId,
        ticker: &str,
        raw_amount: BigUint<StaticApi>,
    ) -> Events {
        self.controller
            .withdraw(account, &asset(ticker), raw_amount, account)
            .expect("withdraw")
    }

    pub fn withdraw_asset_error(
        &mut self,
        account: AccountId,
        ticker: &str,
        units: u64,
        error: LendingError,
    ) {
        let result = self
            .controller
            .withdraw(account, &asset(ticker), amount(ticker, units), account);
        assert_eq!(result.err(), Some(error));
    }

    pub fn borrow_asset(
        &mut self,
        account: AccountId,
        ticker: &str,
        units: u64,
        mode: InterestRateMode,
    ) -> Events {
        self.borrow_asset_den(account, ticker, amount(ticker, units), mode)
    }

    pub fn borrow_asset_den(
        &mut self,
        account: AccountId,
        ticker: &str,
        raw_amount: BigUint<StaticApi>,
        mode: InterestRateMode,
    ) -> Events {
        self.controller
            .borrow(account, &asset(ticker), raw_amount, mode)
            .expect("borrow")
    }

    pub fn borrow_asset_error(
        &mut self,
        account: AccountId,
        ticker: &str,
        units: u64,
        mode: InterestRateMode,
        error: LendingError,
    ) {
        let result = self
            .controller
            .borrow(account, &asset(ticker), amount(ticker, units), mode);
        assert_eq!(result.err(), Some(error));
    }

    pub fn repay_asset(
        &mut self,
        account: AccountId,
        ticker: &str,
        units: u64,
        mode: InterestRateMode,
    ) -> Events {
        self.repay_asset_den(account, ticker, amount(ticker, units), mode)
    }

    pub fn repay_asset_den(
        &mut self,
        account: AccountId,
        ticker: &str,
        raw_amount: BigUint<StaticApi>,
        mode: InterestRateMode,
    ) -> Events {
        self.controller
            .repay(account, &asset(ticker), raw_amount, mode, account)
            .expect("repay")
    }

    #[allow(clippy::too_many_arguments)]
    pub fn liquidate_account_den(
        &mut self,
        liquidator: AccountId,
        collateral: &str,
        debt: &str,
        user: AccountId,
        debt_to_cover: BigUint<StaticApi>,
        receive_a_token: bool,
    ) -> Result<Events, LendingError> {
        self.controller.liquidation_call(
            liquidator,
            &asset(collateral),
            &asset(debt),
            user,
            debt_to_cover,
            receive_a_token,
        )
    }

    pub fn account_data(&self, account: AccountId) -> UserAccountData<StaticApi> {
        self.controller
            .get_user_account_data(account)
            .expect("account data")
    }

    pub fn health_factor(&self, account: AccountId) -> Dec {
        self.controller.health_factor(account).expect("health factor")
    }

    pub fn user_reserve(&self, account: AccountId, ticker: &str) -> UserReserveData<StaticApi> {
        self.controller
            .get_user_reserve_data(&asset(ticker), account)
            .expect("user reserve data")
    }

    pub fn collateral_amount(&self, account: AccountId, ticker: &str) -> BigUint<StaticApi> {
        raw(&self.user_reserve(account, ticker).current_a_token_balance)
    }

    pub fn borrow_amount(&self, account: AccountId, ticker: &str) -> BigUint<StaticApi> {
        let data = self.user_reserve(account, ticker);
        raw(&data.current_variable_debt) + raw(&data.current_stable_debt)
    }

    pub fn reserve(&self, ticker: &str) -> ReserveData<StaticApi> {
        self.controller
            .get_reserve_data(&asset(ticker))
            .expect("reserve data")
    }

    pub fn sentinel_down(&mut self, timestamp: u64) {
        self.controller.sentinel_mut().set_status(false, timestamp);
    }

    pub fn sentinel_up(&mut self, timestamp: u64) {
        self.controller.sentinel_mut().set_status(true, timestamp);
    }
}

/// Funds the three main actors with plenty of every asset.
pub fn setup_accounts(state: &mut LendingPoolTestState) {
    for fixture in MARKETS {
        for account in [SUPPLIER, BORROWER, LIQUIDATOR, OTHER_USER] {
            state.fund(account, fixture.ticker, 1_000_000);
        }
    }
}

pub fn event_names(events: &Events) -> Vec<&'static str> {
    events.iter().map(|event| event.name()).collect()
}
