//! Cross-reserve risk engine of the lending protocol.
//!
//! The [`Controller`] owns the committed protocol state and the collaborators
//! around it (price oracle, sequencer sentinel, accounting-token ledger). Each
//! public operation runs on a staged [`cache::Cache`]: reserves are accrued on
//! first access, validation and bookkeeping happen on the staged copy, and the
//! result is committed only once the ledger accepted the instruction batch.
//! A rejected operation leaves state, ledger and event log untouched.

pub mod cache;
pub mod config;
pub mod helpers;
pub mod oracle;
pub mod positions;
pub mod storage;
pub mod utils;
pub mod validation;
pub mod views;

use common_errors::LendingError;
use common_events::{Event, EventLog};
use common_structs::{
    AccountId, AssetId, EModeCategory, InterestRateMode, InterestRateStrategy, ReserveConfig,
    TokenKind, UserAccount,
};
use liquidity_layer::{InMemoryLedger, LiquidityPool, TokenLedger};
use log::{info, warn};
use multiversx_sc::api::VMApi;
use multiversx_sc::contract_base::ContractBase;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use cache::{Cache, Staged};
use config::ConfigModule;
use positions::{
    account::PositionAccountModule, borrow::PositionBorrowModule, emode::EModeModule,
    flash_loan::FlashLoanModule, liquidation::PositionLiquidationModule,
    repay::PositionRepayModule, supply::PositionSupplyModule, treasury::TreasuryModule,
    withdraw::PositionWithdrawModule,
};
use storage::{ControllerConfig, ProtocolState};

pub use oracle::{FixedPriceOracle, OracleSentinel, PriceOracle, SequencerSentinel};
pub use utils::UserAccountData;
pub use views::{UserReserveData, ViewsModule};

pub type OperationResult<A> = Result<Vec<Event<A>>, LendingError>;

pub struct Controller<
    A: VMApi,
    O: PriceOracle<A> = FixedPriceOracle<A>,
    S: OracleSentinel = SequencerSentinel,
    L: TokenLedger<A> = InMemoryLedger<A>,
> {
    state: ProtocolState<A>,
    config: ControllerConfig,
    oracle: O,
    sentinel: S,
    ledger: L,
    events: EventLog<A>,
    now: u64,
    pool: LiquidityPool<A>,
}

impl<A, O, S, L> Controller<A, O, S, L>
where
    A: VMApi,
    O: PriceOracle<A>,
    S: OracleSentinel,
    L: TokenLedger<A>,
{
    pub fn new(config: ControllerConfig, oracle: O, sentinel: S, ledger: L, now: u64) -> Self {
        Controller {
            state: ProtocolState::default(),
            config,
            oracle,
            sentinel,
            ledger,
            events: EventLog::new(),
            now,
            pool: LiquidityPool::new(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog<A> {
        &self.events
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn sentinel_mut(&mut self) -> &mut S {
        &mut self.sentinel
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Committed account, without pending interest.
    pub fn account(&self, user: AccountId) -> Option<&UserAccount<A>> {
        self.state.accounts.get(&user)
    }

    /// Moves the clock forward. Time never goes backwards.
    pub fn set_block_timestamp(&mut self, now: u64) -> Result<(), LendingError> {
        if now < self.now {
            return Err(LendingError::TimestampInPast);
        }
        self.now = now;
        Ok(())
    }

    /// Runs `op` on a staged cache and commits its outcome.
    fn execute<F>(&mut self, operation: &'static str, op: F) -> OperationResult<A>
    where
        F: FnOnce(&Self, &mut Cache<Self>) -> Result<(), LendingError>,
    {
        let staged = {
            let mut cache = Cache::new(&*self);
            op(self, &mut cache)?;
            cache.into_staged()
        };
        self.commit(operation, staged)
    }

    fn commit(&mut self, operation: &'static str, staged: Staged<A>) -> OperationResult<A> {
        if !staged.batch.is_empty() {
            if let Err(err) = self.ledger.apply(&staged.batch) {
                warn!(
                    "{} rejected by the ledger ({} instructions): {}",
                    operation,
                    staged.batch.len(),
                    err
                );
                return Err(err.into());
            }
        }

        self.state.reserves.extend(staged.reserves);
        self.state.reserves_list.extend(staged.listed);
        self.state.accounts.extend(staged.accounts);
        self.state.e_mode_categories.extend(staged.e_mode_categories);
        self.events.append(&staged.events);

        info!(
            "{} committed at {}: {} events, {} ledger instructions",
            operation,
            self.now,
            staged.events.len(),
            staged.batch.len()
        );
        Ok(staged.events)
    }

    pub fn supply(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        on_behalf_of: AccountId,
    ) -> OperationResult<A> {
        self.execute("supply", |sc, cache| {
            sc.process_supply(cache, caller, asset, amount, on_behalf_of)
        })
    }

    /// `MAX_AMOUNT` withdraws the whole balance.
    pub fn withdraw(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        to: AccountId,
    ) -> OperationResult<A> {
        self.execute("withdraw", |sc, cache| {
            sc.process_withdraw(cache, caller, asset, amount, to)
        })
    }

    pub fn borrow(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        mode: InterestRateMode,
    ) -> OperationResult<A> {
        self.execute("borrow", |sc, cache| {
            sc.process_borrow(cache, caller, asset, amount, mode)
        })
    }

    /// `MAX_AMOUNT` repays the whole debt of `mode`, only for one's own debt.
    pub fn repay(
        &mut self,
        repayer: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        mode: InterestRateMode,
        on_behalf_of: AccountId,
    ) -> OperationResult<A> {
        self.execute("repay", |sc, cache| {
            sc.process_repay(cache, repayer, asset, amount, mode, on_behalf_of, false)
        })
    }

    /// Repays debt with the caller's own supply of the same asset.
    pub fn repay_with_a_tokens(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        mode: InterestRateMode,
    ) -> OperationResult<A> {
        self.execute("repay_with_a_tokens", |sc, cache| {
            sc.process_repay(cache, caller, asset, amount, mode, caller, true)
        })
    }

    pub fn swap_borrow_rate_mode(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        current_mode: InterestRateMode,
    ) -> OperationResult<A> {
        self.execute("swap_borrow_rate_mode", |sc, cache| {
            sc.process_swap_borrow_rate_mode(cache, caller, asset, current_mode)
        })
    }

    pub fn set_user_use_reserve_as_collateral(
        &mut self,
        caller: AccountId,
        asset: &AssetId,
        use_as_collateral: bool,
    ) -> OperationResult<A> {
        self.execute("set_user_use_reserve_as_collateral", |sc, cache| {
            sc.process_set_use_reserve_as_collateral(cache, caller, asset, use_as_collateral)
        })
    }

    pub fn set_user_e_mode(&mut self, caller: AccountId, category_id: u8) -> OperationResult<A> {
        self.execute("set_user_e_mode", |sc, cache| {
            sc.process_set_user_e_mode(cache, caller, category_id)
        })
    }

    /// `MAX_AMOUNT` as `debt_to_cover` liquidates as much as the close factor allows.
    #[allow(clippy::too_many_arguments)]
    pub fn liquidation_call(
        &mut self,
        liquidator: AccountId,
        collateral_asset: &AssetId,
        debt_asset: &AssetId,
        user: AccountId,
        debt_to_cover: BigUint<A>,
        receive_a_token: bool,
    ) -> OperationResult<A> {
        self.execute("liquidation_call", |sc, cache| {
            sc.process_liquidation(
                cache,
                liquidator,
                collateral_asset,
                debt_asset,
                user,
                debt_to_cover,
                receive_a_token,
            )
        })
    }

    /// Lends `amount` to `receiver`, which returns the amount it pays back.
    ///
    /// The controller stays exclusively borrowed while the receiver runs.
    pub fn flash_loan<F>(
        &mut self,
        initiator: AccountId,
        asset: &AssetId,
        amount: BigUint<A>,
        receiver: F,
    ) -> OperationResult<A>
    where
        F: FnOnce(
            &AssetId,
            &ManagedDecimal<A, NumDecimals>,
            &ManagedDecimal<A, NumDecimals>,
        ) -> BigUint<A>,
    {
        self.execute("flash_loan", |sc, cache| {
            sc.process_flash_loan(cache, initiator, asset, amount, receiver)
        })
    }

    pub fn mint_to_treasury(&mut self, assets: &[AssetId]) -> OperationResult<A> {
        self.execute("mint_to_treasury", |sc, cache| {
            sc.process_mint_to_treasury(cache, assets)
        })
    }

    pub fn delegate_underlying(
        &mut self,
        asset: &AssetId,
        delegatee: AccountId,
    ) -> OperationResult<A> {
        self.execute("delegate_underlying", |sc, cache| {
            sc.process_delegate_underlying(cache, asset, delegatee)
        })
    }

    pub fn init_reserve(
        &mut self,
        asset: &AssetId,
        token_kind: TokenKind,
        config: ReserveConfig<A>,
        strategy: InterestRateStrategy<A>,
    ) -> OperationResult<A> {
        self.execute("init_reserve", |sc, cache| {
            sc.process_init_reserve(cache, asset, token_kind, config, strategy)
        })
    }

    pub fn set_reserve_ltv_and_liquidation(
        &mut self,
        asset: &AssetId,
        ltv: ManagedDecimal<A, NumDecimals>,
        liquidation_threshold: ManagedDecimal<A, NumDecimals>,
        liquidation_bonus: ManagedDecimal<A, NumDecimals>,
    ) -> OperationResult<A> {
        self.execute("set_reserve_ltv_and_liquidation", |sc, cache| {
            sc.process_set_reserve_ltv_and_liquidation(
                cache,
                asset,
                ltv,
                liquidation_threshold,
                liquidation_bonus,
            )
        })
    }

    pub fn set_liquidation_protocol_fee(
        &mut self,
        asset: &AssetId,
        fee: ManagedDecimal<A, NumDecimals>,
    ) -> OperationResult<A> {
        self.execute("set_liquidation_protocol_fee", |sc, cache| {
            sc.process_set_liquidation_protocol_fee(cache, asset, fee)
        })
    }

    pub fn set_reserve_factor(
        &mut self,
        asset: &AssetId,
        reserve_factor: ManagedDecimal<A, NumDecimals>,
    ) -> OperationResult<A> {
        self.execute("set_reserve_factor", |sc, cache| {
            sc.process_set_reserve_factor(cache, asset, reserve_factor)
        })
    }

    pub fn set_borrow_cap(
        &mut self,
        asset: &AssetId,
        cap: Option<ManagedDecimal<A, NumDecimals>>,
    ) -> OperationResult<A> {
        self.execute("set_borrow_cap", |sc, cache| {
            sc.process_set_borrow_cap(cache, asset, cap)
        })
    }

    pub fn set_supply_cap(
        &mut self,
        asset: &AssetId,
        cap: Option<ManagedDecimal<A, NumDecimals>>,
    ) -> OperationResult<A> {
        self.execute("set_supply_cap", |sc, cache| {
            sc.process_set_supply_cap(cache, asset, cap)
        })
    }

    pub fn set_debt_ceiling(
        &mut self,
        asset: &AssetId,
        debt_ceiling: ManagedDecimal<A, NumDecimals>,
    ) -> OperationResult<A> {
        self.execute("set_debt_ceiling", |sc, cache| {
            sc.process_set_debt_ceiling(cache, asset, debt_ceiling)
        })
    }

    pub fn set_reserve_active(&mut self, asset: &AssetId, active: bool) -> OperationResult<A> {
        self.execute("set_reserve_active", |sc, cache| {
            sc.process_set_reserve_active(cache, asset, active)
        })
    }

    pub fn set_reserve_frozen(&mut self, asset: &AssetId, frozen: bool) -> OperationResult<A> {
        self.execute("set_reserve_frozen", |sc, cache| {
            sc.process_set_reserve_frozen(cache, asset, frozen)
        })
    }

    pub fn set_reserve_paused(&mut self, asset: &AssetId, paused: bool) -> OperationResult<A> {
        self.execute("set_reserve_paused", |sc, cache| {
            sc.process_set_reserve_paused(cache, asset, paused)
        })
    }

    pub fn set_borrowing_enabled(&mut self, asset: &AssetId, enabled: bool) -> OperationResult<A> {
        self.execute("set_borrowing_enabled", |sc, cache| {
            sc.process_set_borrowing_enabled(cache, asset, enabled)
        })
    }

    pub fn set_stable_borrowing_enabled(
        &mut self,
        asset: &AssetId,
        enabled: bool,
    ) -> OperationResult<A> {
        self.execute("set_stable_borrowing_enabled", |sc, cache| {
            sc.process_set_stable_borrowing_enabled(cache, asset, enabled)
        })
    }

    pub fn set_borrowable_in_isolation(
        &mut self,
        asset: &AssetId,
        borrowable: bool,
    ) -> OperationResult<A> {
        self.execute("set_borrowable_in_isolation", |sc, cache| {
            sc.process_set_borrowable_in_isolation(cache, asset, borrowable)
        })
    }

    pub fn set_siloed_borrowing(&mut self, asset: &AssetId, siloed: bool) -> OperationResult<A> {
        self.execute("set_siloed_borrowing", |sc, cache| {
            sc.process_set_siloed_borrowing(cache, asset, siloed)
        })
    }

    pub fn set_flash_loan_enabled(&mut self, asset: &AssetId, enabled: bool) -> OperationResult<A> {
        self.execute("set_flash_loan_enabled", |sc, cache| {
            sc.process_set_flash_loan_enabled(cache, asset, enabled)
        })
    }

    pub fn set_reserve_interest_rate_strategy(
        &mut self,
        asset: &AssetId,
        strategy: InterestRateStrategy<A>,
    ) -> OperationResult<A> {
        self.execute("set_reserve_interest_rate_strategy", |sc, cache| {
            sc.process_set_reserve_interest_rate_strategy(cache, asset, strategy)
        })
    }

    pub fn set_asset_e_mode_category(
        &mut self,
        asset: &AssetId,
        category_id: u8,
    ) -> OperationResult<A> {
        self.execute("set_asset_e_mode_category", |sc, cache| {
            sc.process_set_asset_e_mode_category(cache, asset, category_id)
        })
    }

    pub fn configure_e_mode_category(&mut self, category: EModeCategory<A>) -> OperationResult<A> {
        self.execute("configure_e_mode_category", |sc, cache| {
            sc.process_configure_e_mode_category(cache, category)
        })
    }
}

impl<A, O, S, L> ContractBase for Controller<A, O, S, L>
where
    A: VMApi,
    O: PriceOracle<A>,
    S: OracleSentinel,
    L: TokenLedger<A>,
{
    type Api = A;
}

impl<A, O, S, L> storage::Storage for Controller<A, O, S, L>
where
    A: VMApi,
    O: PriceOracle<A>,
    S: OracleSentinel,
    L: TokenLedger<A>,
{
    fn protocol_state(&self) -> &ProtocolState<A> {
        &self.state
    }

    fn controller_config(&self) -> &ControllerConfig {
        &self.config
    }

    fn block_timestamp(&self) -> u64 {
        self.now
    }

    fn liquidity_pool(&self) -> &LiquidityPool<A> {
        &self.pool
    }

    fn price_feed(&self) -> &dyn PriceOracle<A> {
        &self.oracle
    }

    fn sentinel(&self) -> &dyn OracleSentinel {
        &self.sentinel
    }
}

macro_rules! controller_modules {
    ($($module:path),+ $(,)?) => {
        $(
            impl<A, O, S, L> $module for Controller<A, O, S, L>
            where
                A: VMApi,
                O: PriceOracle<A>,
                S: OracleSentinel,
                L: TokenLedger<A>,
            {
            }
        )+
    };
}

controller_modules!(
    common_math::SharedMathModule,
    helpers::MathsModule,
    oracle::OracleModule,
    utils::LendingUtilsModule,
    validation::ValidationModule,
    PositionSupplyModule,
    PositionWithdrawModule,
    PositionBorrowModule,
    PositionRepayModule,
    PositionLiquidationModule,
    PositionAccountModule,
    EModeModule,
    FlashLoanModule,
    TreasuryModule,
    ConfigModule,
    ViewsModule,
);
