use common_errors::LendingError;
use common_structs::{
    AccountId, AssetId, InterestRateMode, ReserveConfig, ReserveData, UserAccount,
};
use common_math::Rounding;
use liquidity_layer::LiquidityModule;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::{cache::Cache, utils, utils::UserAccountData};

/// Pre-conditions of every state-changing operation.
///
/// Checks are pure predicates over the staged, accrued snapshot: they never
/// mutate reserves or accounts, so they can be evaluated any number of times.
pub trait ValidationModule: utils::LendingUtilsModule {
    /// Ensures an amount is strictly positive.
    ///
    /// # Errors
    /// - `InvalidAmount`: If the amount is zero.
    fn require_amount_greater_than_zero(
        &self,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if *amount == self.zero_at(amount.scale()) {
            return Err(LendingError::InvalidAmount);
        }
        Ok(())
    }

    fn require_active_and_not_paused(
        &self,
        config: &ReserveConfig<Self::Api>,
    ) -> Result<(), LendingError> {
        if !config.active {
            return Err(LendingError::ReserveInactive);
        }
        if config.paused {
            return Err(LendingError::ReservePaused);
        }
        Ok(())
    }

    fn require_not_frozen(&self, config: &ReserveConfig<Self::Api>) -> Result<(), LendingError> {
        if config.frozen {
            return Err(LendingError::ReserveFrozen);
        }
        Ok(())
    }

    /// At least one: a position sitting exactly on the threshold is not liquidatable.
    fn require_health_factor_above_one(
        &self,
        health_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if *health_factor < self.ray() {
            return Err(LendingError::HealthFactorLowerThanLiquidationThreshold);
        }
        Ok(())
    }

    /// New debt must leave the health factor strictly above one.
    fn require_borrow_health_factor(
        &self,
        health_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if *health_factor <= self.ray() {
            return Err(LendingError::HealthFactorLowerThanLiquidationThreshold);
        }
        Ok(())
    }

    /// Supply is refused on frozen reserves and past the supply cap.
    ///
    /// The cap is checked against every supplier claim, the treasury's
    /// unminted share included.
    fn validate_supply(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        self.require_amount_greater_than_zero(amount)?;
        self.require_active_and_not_paused(&reserve.config)?;
        self.require_not_frozen(&reserve.config)?;

        if let Some(cap) = &reserve.config.supply_cap {
            let total_supply = self.liquidity_pool().total_supply(reserve) + amount.clone();
            if total_supply > *cap {
                return Err(LendingError::SupplyCapExceeded);
            }
        }
        Ok(())
    }

    /// Withdrawals stay open on frozen reserves.
    fn validate_withdraw(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        user_balance: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        self.require_amount_greater_than_zero(amount)?;
        if amount > user_balance {
            return Err(LendingError::NotEnoughAvailableUserBalance);
        }
        self.require_active_and_not_paused(&reserve.config)
    }

    /// Validates a borrow against the pre-borrow position.
    ///
    /// **Process**:
    /// 1. Reserve flags, liquidity and the oracle sentinel.
    /// 2. Borrow cap on the reserve's total debt.
    /// 3. Isolation mode: the asset must be borrowable in isolation and the
    ///    collateral's debt ceiling must absorb the new debt.
    /// 4. E-mode: the asset must belong to the account's category.
    /// 5. Collateral: non-zero, LTV non-zero, health factor at least one, the
    ///    borrowing power covers the new total debt and the resulting health
    ///    factor stays strictly above one.
    /// 6. Stable rate: enabled, not backed by the same currency, and at most the
    ///    configured share of the available liquidity.
    /// 7. Siloed borrowing: a siloed asset is the only debt of its borrower.
    fn validate_borrow(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        mode: InterestRateMode,
    ) -> Result<(), LendingError> {
        self.require_amount_greater_than_zero(amount)?;

        let account = cache.get_cached_account(user);
        let reserve = cache.get_cached_reserve(asset)?.clone();
        let config = &reserve.config;

        self.require_active_and_not_paused(config)?;
        self.require_not_frozen(config)?;
        if !config.borrowing_enabled {
            return Err(LendingError::BorrowingNotEnabled);
        }
        if *amount > reserve.available_liquidity {
            return Err(LendingError::InsufficientLiquidity);
        }

        self.require_borrow_allowed()?;

        if mode == InterestRateMode::Stable && !config.stable_borrowing_enabled {
            return Err(LendingError::StableBorrowingNotEnabled);
        }

        if let Some(cap) = &config.borrow_cap {
            let pool = self.liquidity_pool();
            let total_debt = pool.total_variable_debt(&reserve)
                + pool.total_stable_debt(&reserve, cache.timestamp)
                + amount.clone();
            if total_debt > *cap {
                return Err(LendingError::BorrowCapExceeded);
            }
        }

        if account.is_in_isolation_mode() && !config.can_borrow_in_isolation() {
            return Err(LendingError::AssetNotBorrowableInIsolation);
        }

        let account_category = account.e_mode_category();
        if account_category != 0 && config.e_mode_category != account_category {
            return Err(LendingError::InconsistentEModeCategory);
        }

        let data = self.calculate_user_account_data(cache, &account)?;
        if data.total_collateral == self.wad_zero() {
            return Err(LendingError::CollateralBalanceIsZero);
        }
        if data.ltv == self.bps_zero() {
            return Err(LendingError::LtvValidationFailed);
        }
        self.require_health_factor_above_one(&data.health_factor)?;

        let e_mode = self.get_account_e_mode(cache, &account);
        let price = self.get_asset_price(asset, config, e_mode.as_ref())?;
        let amount_value = self.get_token_value(amount, &price);
        let next_debt = data.total_debt.clone() + amount_value;

        let collateral_needed = self.percent_div(&next_debt, &data.ltv);
        if collateral_needed > data.total_collateral {
            return Err(LendingError::CollateralCannotCoverNewBorrow);
        }
        let next_health_factor = self.compute_health_factor(&data.liquidation_collateral, &next_debt);
        self.require_borrow_health_factor(&next_health_factor)?;

        if let Some(isolated_asset) = &account.isolated_collateral_asset {
            let isolated = cache.get_cached_reserve(isolated_asset)?;
            let next_isolated_debt = isolated.isolation_mode_total_debt.clone()
                + self.isolation_debt_of(amount, Rounding::Ceil);
            if next_isolated_debt > isolated.config.debt_ceiling {
                return Err(LendingError::DebtCeilingExceeded);
            }
        }

        if mode == InterestRateMode::Stable {
            let supplied = self.get_supply_balance(&reserve, &account);
            if account.is_using_as_collateral(asset)
                && config.is_collateralizable()
                && *amount <= supplied
            {
                return Err(LendingError::CollateralSameAsBorrowingCurrency);
            }

            let max_loan_size = self.percent_mul(
                &reserve.available_liquidity,
                &self.to_decimal_bps(self.controller_config().max_stable_rate_borrow_size_bps.into()),
            );
            if *amount > max_loan_size {
                return Err(LendingError::AmountBiggerThanMaxLoanSizeStable);
            }
        }

        self.validate_siloed_borrowing(cache, &account, asset, config)
    }

    /// A siloed asset can only be borrowed alone, and blocks any other borrow.
    fn validate_siloed_borrowing(
        &self,
        cache: &mut Cache<Self>,
        account: &UserAccount<Self::Api>,
        asset: &AssetId,
        config: &ReserveConfig<Self::Api>,
    ) -> Result<(), LendingError> {
        let borrowed = account.borrowed_assets();
        if borrowed.is_empty() {
            return Ok(());
        }

        for borrowed_asset in borrowed.iter() {
            let siloed = cache
                .get_cached_reserve(borrowed_asset)?
                .config
                .is_siloed_borrowing();
            if siloed && borrowed_asset != asset {
                return Err(LendingError::SiloedBorrowingViolation);
            }
        }

        if config.is_siloed_borrowing() && borrowed.iter().any(|borrowed_asset| borrowed_asset != asset) {
            return Err(LendingError::SiloedBorrowingViolation);
        }
        Ok(())
    }

    /// Repayments stay open on frozen reserves. Repaying "everything" on
    /// behalf of someone else needs an explicit amount.
    fn validate_repay(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        is_max_amount: bool,
        repayer: AccountId,
        on_behalf_of: AccountId,
        debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if !is_max_amount {
            self.require_amount_greater_than_zero(amount)?;
        }
        if is_max_amount && repayer != on_behalf_of {
            return Err(LendingError::NoExplicitAmountToRepayOnBehalf);
        }
        self.require_active_and_not_paused(&reserve.config)?;

        if *debt == self.zero_at(reserve.decimals()) {
            return Err(LendingError::NoDebtOfSelectedType);
        }
        Ok(())
    }

    /// Swapping `current_mode` debt to the other mode.
    fn validate_swap_rate_mode(
        &self,
        reserve: &ReserveData<Self::Api>,
        account: &UserAccount<Self::Api>,
        variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        stable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        current_mode: InterestRateMode,
    ) -> Result<(), LendingError> {
        let config = &reserve.config;
        self.require_active_and_not_paused(config)?;
        self.require_not_frozen(config)?;

        let zero = self.zero_at(reserve.decimals());
        match current_mode {
            InterestRateMode::Stable => {
                if *stable_debt == zero {
                    return Err(LendingError::NoDebtOfSelectedType);
                }
            },
            InterestRateMode::Variable => {
                if *variable_debt == zero {
                    return Err(LendingError::NoDebtOfSelectedType);
                }
                if !config.stable_borrowing_enabled {
                    return Err(LendingError::StableBorrowingNotEnabled);
                }

                let supplied = self.get_supply_balance(reserve, account);
                let total_debt = variable_debt.clone() + stable_debt.clone();
                if account.is_using_as_collateral(&reserve.asset)
                    && config.is_collateralizable()
                    && total_debt <= supplied
                {
                    return Err(LendingError::CollateralSameAsBorrowingCurrency);
                }
            },
        }
        Ok(())
    }

    fn validate_set_use_reserve_as_collateral(
        &self,
        reserve: &ReserveData<Self::Api>,
        balance: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if *balance == self.zero_at(reserve.decimals()) {
            return Err(LendingError::UnderlyingBalanceZero);
        }
        self.require_active_and_not_paused(&reserve.config)
    }

    /// Health factor of the account as staged, plus the zero-LTV rule for `asset`.
    ///
    /// While any enabled collateral has a zero LTV, only zero-LTV assets may be
    /// withdrawn or disabled, so the position cannot shed its usable collateral
    /// first.
    fn validate_health_factor_and_ltv(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
    ) -> Result<UserAccountData<Self::Api>, LendingError> {
        let account = cache.get_cached_account(user);
        let data = self.calculate_user_account_data(cache, &account)?;
        self.require_health_factor_above_one(&data.health_factor)?;

        let asset_ltv_is_zero = !cache.get_cached_reserve(asset)?.config.is_collateralizable();
        if data.has_zero_ltv_collateral && !asset_ltv_is_zero {
            return Err(LendingError::LtvValidationFailed);
        }
        Ok(data)
    }

    /// Switching category requires every borrowed asset to belong to it.
    fn validate_set_user_e_mode(
        &self,
        cache: &mut Cache<Self>,
        account: &UserAccount<Self::Api>,
        category_id: u8,
    ) -> Result<(), LendingError> {
        if category_id == 0 {
            return Ok(());
        }

        if cache.get_e_mode_category(category_id).is_none() {
            return Err(LendingError::EModeCategoryNotFound);
        }
        if account.is_in_isolation_mode() {
            return Err(LendingError::EModeNotAllowedWithIsolatedCollateral);
        }

        for asset in account.borrowed_assets() {
            if cache.get_cached_reserve(&asset)?.config.e_mode_category != category_id {
                return Err(LendingError::InconsistentEModeCategory);
            }
        }
        Ok(())
    }

    /// Liquidation pre-conditions.
    ///
    /// The sentinel only gates positions at or above the close-factor threshold;
    /// deeper positions remain liquidatable during an outage.
    fn validate_liquidation(
        &self,
        collateral_reserve: &ReserveData<Self::Api>,
        debt_reserve: &ReserveData<Self::Api>,
        account: &UserAccount<Self::Api>,
        data: &UserAccountData<Self::Api>,
        user_debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if !collateral_reserve.config.active || !debt_reserve.config.active {
            return Err(LendingError::ReserveInactive);
        }
        if collateral_reserve.config.paused || debt_reserve.config.paused {
            return Err(LendingError::ReservePaused);
        }

        self.require_liquidation_allowed(&data.health_factor)?;

        if data.health_factor >= self.ray() {
            return Err(LendingError::HealthFactorNotBelowThreshold);
        }

        let collateral_enabled = collateral_reserve.config.can_be_liquidated()
            && account.is_using_as_collateral(&collateral_reserve.asset);
        if !collateral_enabled {
            return Err(LendingError::CollateralCannotBeLiquidated);
        }

        if *user_debt == self.zero_at(debt_reserve.decimals()) {
            return Err(LendingError::SpecifiedCurrencyNotBorrowedByUser);
        }
        Ok(())
    }

    fn validate_flash_loan(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        self.require_amount_greater_than_zero(amount)?;
        self.require_active_and_not_paused(&reserve.config)?;
        if !reserve.config.can_flashloan() {
            return Err(LendingError::FlashLoanDisabled);
        }
        if *amount > reserve.available_liquidity {
            return Err(LendingError::InsufficientLiquidity);
        }
        Ok(())
    }
}
