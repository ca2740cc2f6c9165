use common_constants::{
    BPS_PRECISION, ISOLATION_DEBT_DUST_WAD, NO_E_MODE_CATEGORY, WAD_PRECISION,
};
use common_math::Rounding;
use common_errors::LendingError;
use common_events::Event;
use common_structs::{
    AccountId, AccountingToken, AssetId, EModeCategory, ReserveConfig, ReserveData, UserAccount,
};
use liquidity_layer::{LedgerInstruction, LiquidityModule, UtilsModule};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::{cache::Cache, helpers, oracle};

/// Aggregated risk figures of an account.
///
/// Values are WAD in the base currency, `ltv` and `current_liquidation_threshold`
/// are the collateral-weighted averages in BPS, the health factor is RAY.
#[derive(Clone)]
pub struct UserAccountData<M: ManagedTypeApi> {
    pub total_collateral: ManagedDecimal<M, NumDecimals>,
    pub total_debt: ManagedDecimal<M, NumDecimals>,
    pub available_borrows: ManagedDecimal<M, NumDecimals>,
    pub current_liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub health_factor: ManagedDecimal<M, NumDecimals>,
    /// `Σ collateral_value * ltv`
    pub borrowing_power: ManagedDecimal<M, NumDecimals>,
    /// `Σ collateral_value * liquidation_threshold`
    pub liquidation_collateral: ManagedDecimal<M, NumDecimals>,
    /// At least one enabled collateral with a balance has a zero LTV.
    pub has_zero_ltv_collateral: bool,
}

/// Risk parameters of an asset once the account's e-mode category is applied.
pub struct EffectiveRiskParams<M: ManagedTypeApi> {
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub liquidation_bonus: ManagedDecimal<M, NumDecimals>,
}

/// Utility module providing position valuation and bookkeeping shared by every
/// operation.
///
/// This module contains:
/// - Account aggregation into collateral, debt and health factor
/// - E-mode parameter overrides
/// - Isolated collateral debt tracking
/// - Scaled balance updates of accounts and the matching ledger instructions
///
/// All balances are read from reserves accrued to the cache timestamp.
pub trait LendingUtilsModule: oracle::OracleModule + helpers::MathsModule {
    /// E-mode category the account is in, if any.
    fn get_account_e_mode(
        &self,
        cache: &Cache<Self>,
        account: &UserAccount<Self::Api>,
    ) -> Option<EModeCategory<Self::Api>> {
        match account.e_mode_category {
            Some(id) => cache.get_e_mode_category(id),
            None => None,
        }
    }

    /// LTV, liquidation threshold and bonus of an asset for an account.
    ///
    /// Category values replace the asset's own only when the asset belongs to
    /// the account's category.
    fn get_effective_risk_params(
        &self,
        config: &ReserveConfig<Self::Api>,
        e_mode: Option<&EModeCategory<Self::Api>>,
    ) -> EffectiveRiskParams<Self::Api> {
        match e_mode {
            Some(category) if config.e_mode_category == category.id => EffectiveRiskParams {
                ltv: category.ltv.clone(),
                liquidation_threshold: category.liquidation_threshold.clone(),
                liquidation_bonus: category.liquidation_bonus.clone(),
            },
            _ => EffectiveRiskParams {
                ltv: config.ltv.clone(),
                liquidation_threshold: config.liquidation_threshold.clone(),
                liquidation_bonus: config.liquidation_bonus.clone(),
            },
        }
    }

    /// Isolated assets only back the account that holds them as its sole
    /// isolated collateral.
    fn counts_as_collateral(
        &self,
        config: &ReserveConfig<Self::Api>,
        asset: &AssetId,
        account: &UserAccount<Self::Api>,
    ) -> bool {
        if !account.is_using_as_collateral(asset) {
            return false;
        }
        !config.is_isolated() || account.isolated_collateral_asset.as_ref() == Some(asset)
    }

    fn get_supply_balance(
        &self,
        reserve: &ReserveData<Self::Api>,
        account: &UserAccount<Self::Api>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        match account.scaled_balances.get(&reserve.asset) {
            Some(scaled) => self.liquidity_pool().supply_balance(reserve, scaled),
            None => self.zero_at(reserve.decimals()),
        }
    }

    /// Variable and stable debt of an account in one reserve.
    fn get_debt_balances(
        &self,
        reserve: &ReserveData<Self::Api>,
        account: &UserAccount<Self::Api>,
        now: u64,
    ) -> (
        ManagedDecimal<Self::Api, NumDecimals>,
        ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let pool = self.liquidity_pool();
        let variable = match account.scaled_variable_debts.get(&reserve.asset) {
            Some(scaled) => pool.variable_debt_balance(reserve, scaled),
            None => self.zero_at(reserve.decimals()),
        };
        let stable = match account.stable_debts.get(&reserve.asset) {
            Some(position) => pool.stable_debt_balance(reserve, position, now),
            None => self.zero_at(reserve.decimals()),
        };
        (variable, stable)
    }

    /// Aggregates every position of an account.
    ///
    /// **Process**:
    /// 1. Resolves the account's e-mode category.
    /// 2. For each asset with a supply or debt position, accrues its reserve and
    ///    prices it (through the category source when applicable).
    /// 3. Enabled collateral adds `value`, `value * ltv` and `value * threshold`
    ///    to the running totals; isolated collateral only counts when it is the
    ///    account's isolated asset.
    /// 4. Variable and stable debt add to the debt total.
    /// 5. Derives averages, available borrows and the health factor.
    fn calculate_user_account_data(
        &self,
        cache: &mut Cache<Self>,
        account: &UserAccount<Self::Api>,
    ) -> Result<UserAccountData<Self::Api>, LendingError> {
        let e_mode = self.get_account_e_mode(cache, account);
        let now = cache.timestamp;

        let mut total_collateral = self.wad_zero();
        let mut total_debt = self.wad_zero();
        let mut borrowing_power = self.wad_zero();
        let mut liquidation_collateral = self.wad_zero();
        let mut has_zero_ltv_collateral = false;

        for asset in account.touched_assets() {
            let reserve = cache.get_cached_reserve(&asset)?;
            let config = reserve.config.clone();
            let collateral = if self.counts_as_collateral(&config, &asset, account) {
                Some(self.get_supply_balance(reserve, account))
            } else {
                None
            };
            let (variable, stable) = self.get_debt_balances(reserve, account, now);
            let debt = variable + stable;

            let price = self.get_asset_price(&asset, &config, e_mode.as_ref())?;

            if let Some(balance) = collateral {
                let value = self.get_token_value(&balance, &price);
                let params = self.get_effective_risk_params(&config, e_mode.as_ref());

                if params.ltv == self.bps_zero() && value > self.wad_zero() {
                    has_zero_ltv_collateral = true;
                }
                borrowing_power += &self.percent_mul(&value, &params.ltv);
                liquidation_collateral += &self.percent_mul(&value, &params.liquidation_threshold);
                total_collateral += &value;
            }

            total_debt += &self.get_token_value(&debt, &price);
        }

        let (ltv, current_liquidation_threshold) = if total_collateral > self.wad_zero() {
            (
                self.rescale_half_up(
                    &self.div_half_up(&borrowing_power, &total_collateral, WAD_PRECISION),
                    BPS_PRECISION,
                ),
                self.rescale_half_up(
                    &self.div_half_up(&liquidation_collateral, &total_collateral, WAD_PRECISION),
                    BPS_PRECISION,
                ),
            )
        } else {
            (self.bps_zero(), self.bps_zero())
        };

        Ok(UserAccountData {
            available_borrows: self.saturating_sub(&borrowing_power, &total_debt),
            health_factor: self.compute_health_factor(&liquidation_collateral, &total_debt),
            total_collateral,
            total_debt,
            current_liquidation_threshold,
            ltv,
            borrowing_power,
            liquidation_collateral,
            has_zero_ltv_collateral,
        })
    }

    /// Isolation debt carried by `amount` of a borrowed asset: its nominal
    /// quantity at WAD, independent of prices.
    ///
    /// Charges round up and releases round down, so the counter never drops
    /// below what is still owed.
    fn isolation_debt_of(
        &self,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        rounding: Rounding,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.rescale_rounded(amount, WAD_PRECISION, rounding)
    }

    /// Moves the isolation debt counter of `asset` by `amount` (WAD).
    ///
    /// Decreases floor at zero and erase any remainder under one base unit.
    fn adjust_isolated_debt(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        is_increase: bool,
    ) -> Result<(), LendingError> {
        if *amount == self.wad_zero() {
            return Ok(());
        }

        let dust = self.to_decimal_wad(ISOLATION_DEBT_DUST_WAD.into());
        let reserve = cache.get_cached_reserve_mut(asset)?;
        if is_increase {
            reserve.isolation_mode_total_debt += amount;
        } else {
            let remaining = self.saturating_sub(&reserve.isolation_mode_total_debt, amount);
            reserve.isolation_mode_total_debt = if remaining < dust {
                self.wad_zero()
            } else {
                remaining
            };
        }

        let total_debt = reserve.isolation_mode_total_debt.clone();
        cache.push_event(Event::IsolationModeTotalDebtUpdated {
            asset: asset.clone(),
            total_debt,
        });
        Ok(())
    }

    /// Recomputes the rates of a reserve after its totals changed.
    fn update_reserve_rates(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
    ) -> Result<(), LendingError> {
        let now = cache.timestamp;
        let reserve = cache.get_cached_reserve_mut(asset)?;
        self.liquidity_pool().update_interest_rates(reserve, now);

        let event = Event::ReserveDataUpdated {
            asset: asset.clone(),
            liquidity_rate: reserve.current_liquidity_rate.clone(),
            stable_borrow_rate: reserve.current_stable_borrow_rate.clone(),
            variable_borrow_rate: reserve.current_variable_borrow_rate.clone(),
            liquidity_index: reserve.liquidity_index.clone(),
            variable_borrow_index: reserve.variable_borrow_index.clone(),
        };
        cache.push_event(event);
        Ok(())
    }

    /// Adds scaled supply to an account. Returns whether it held none before.
    fn credit_scaled_supply(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> bool {
        let account = cache.get_cached_account_mut(user);
        let first_supply = !account.has_supply(asset);
        account
            .scaled_balances
            .entry(asset.clone())
            .and_modify(|balance| *balance += scaled_amount)
            .or_insert_with(|| scaled_amount.clone());
        first_supply
    }

    /// Removes scaled supply from an account, dropping the entry once empty.
    ///
    /// An emptied position also drops its collateral flag, announcing it when
    /// the position was enabled. An emptied isolated collateral releases the
    /// account from isolation mode.
    fn debit_scaled_supply(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let ray_zero = self.ray_zero();
        let account = cache.get_cached_account_mut(user);
        let current = account
            .scaled_balances
            .get(asset)
            .cloned()
            .unwrap_or_else(|| ray_zero.clone());
        let remaining = self.saturating_sub(&current, scaled_amount);

        if remaining != ray_zero {
            account.scaled_balances.insert(asset.clone(), remaining);
            return;
        }

        account.scaled_balances.remove(asset);
        if account.isolated_collateral_asset.as_ref() == Some(asset) {
            account.isolated_collateral_asset = None;
        }
        if account.collateral_flags.remove(asset) == Some(true) {
            cache.push_event(Event::ReserveUsedAsCollateralDisabled {
                asset: asset.clone(),
                user,
            });
        }
    }

    fn credit_scaled_debt(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        cache
            .get_cached_account_mut(user)
            .scaled_variable_debts
            .entry(asset.clone())
            .and_modify(|debt| *debt += scaled_amount)
            .or_insert_with(|| scaled_amount.clone());
    }

    fn debit_scaled_debt(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let ray_zero = self.ray_zero();
        let account = cache.get_cached_account_mut(user);
        let current = account
            .scaled_variable_debts
            .get(asset)
            .cloned()
            .unwrap_or_else(|| ray_zero.clone());
        let remaining = self.saturating_sub(&current, scaled_amount);

        if remaining == ray_zero {
            account.scaled_variable_debts.remove(asset);
        } else {
            account.scaled_variable_debts.insert(asset.clone(), remaining);
        }
    }

    /// Mirrors a change of stable principal onto the stable-debt token.
    ///
    /// Interest folded into the principal can outgrow a partial repayment, in
    /// which case the ledger mints the difference instead of burning.
    fn sync_stable_debt_token(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        previous_principal: &ManagedDecimal<Self::Api, NumDecimals>,
        next_principal: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let token = AccountingToken::stable_debt(asset);
        if next_principal > previous_principal {
            cache.push_instruction(LedgerInstruction::MintScaled {
                token,
                account: user,
                scaled_amount: next_principal.clone() - previous_principal.clone(),
                index: self.ray(),
            });
        } else if previous_principal > next_principal {
            cache.push_instruction(LedgerInstruction::BurnScaled {
                token,
                account: user,
                scaled_amount: previous_principal.clone() - next_principal.clone(),
                index: self.ray(),
            });
        }
    }

    /// Whether `asset` may join the account's enabled collateral.
    ///
    /// Zero LTV assets never qualify, and isolated assets never join an account
    /// in e-mode. An account without collateral accepts any other asset;
    /// otherwise neither the account nor the asset may be isolated.
    fn can_enable_collateral(
        &self,
        config: &ReserveConfig<Self::Api>,
        asset: &AssetId,
        account: &UserAccount<Self::Api>,
    ) -> bool {
        if !config.is_collateralizable() {
            return false;
        }
        if config.is_isolated() && account.e_mode_category() != NO_E_MODE_CATEGORY {
            return false;
        }

        let has_other_collateral = account
            .collateral_assets()
            .iter()
            .any(|collateral| collateral != asset);
        if !has_other_collateral {
            return true;
        }

        !account.is_in_isolation_mode() && !config.is_isolated()
    }

    /// Flips the collateral flag of `asset` and emits the matching event.
    fn set_collateral_flag(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        enabled: bool,
        is_isolated: bool,
    ) {
        let account = cache.get_cached_account_mut(user);
        account.collateral_flags.insert(asset.clone(), enabled);

        if enabled {
            if is_isolated {
                account.isolated_collateral_asset = Some(asset.clone());
            }
            cache.push_event(Event::ReserveUsedAsCollateralEnabled {
                asset: asset.clone(),
                user,
            });
        } else {
            if account.isolated_collateral_asset.as_ref() == Some(asset) {
                account.isolated_collateral_asset = None;
            }
            cache.push_event(Event::ReserveUsedAsCollateralDisabled {
                asset: asset.clone(),
                user,
            });
        }
    }

    /// Enables a freshly received balance as collateral when the account allows it.
    ///
    /// A refusal is recorded as an explicit opt-out, so later top-ups of the
    /// same position leave it disabled.
    fn try_enable_collateral(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(user);
        if account.collateral_flag(asset) == Some(false) {
            return Ok(());
        }

        let config = cache.get_cached_reserve(asset)?.config.clone();
        if self.can_enable_collateral(&config, asset, &account) {
            self.set_collateral_flag(cache, user, asset, true, config.is_isolated());
        } else {
            cache
                .get_cached_account_mut(user)
                .collateral_flags
                .insert(asset.clone(), false);
        }
        Ok(())
    }
}
