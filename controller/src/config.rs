use common_constants::{BPS_PRECISION, MAX_ASSET_DECIMALS, MAX_LIQUIDATION_BONUS_BPS, WAD_PRECISION};
use common_errors::LendingError;
use common_events::Event;
use common_structs::{
    AccountId, AssetId, EModeCategory, InterestRateStrategy, ReserveConfig, ReserveData, TokenKind,
};
use log::info;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use crate::{cache::Cache, validation};

/// Configuration surface of the lending engine.
///
/// This module handles the governance side of the protocol:
/// - Reserve listing with its risk parameters and rate strategy
/// - Risk parameter, cap and flag updates on listed reserves
/// - Efficiency mode categories and their members
///
/// # Consistency Rules
/// Every change is validated against the rest of the reserve's configuration
/// before it is staged. Reserves are accrued on first access, so parameters
/// that alter accrual (reserve factor, rate strategy) only apply from the
/// current timestamp onward.
pub trait ConfigModule: validation::ValidationModule {
    /// Validates LTV, liquidation threshold and bonus against each other.
    ///
    /// **Rules**:
    /// - `ltv <= liquidation_threshold`
    /// - with a non-zero threshold: `100% < bonus <= MAX_LIQUIDATION_BONUS` and
    ///   `threshold * bonus <= 100%`, so a liquidation never pays out more
    ///   collateral than it releases
    /// - with a zero threshold: the bonus is zero and nobody may hold supply,
    ///   since existing collateral would become unliquidatable
    fn validate_risk_params(
        &self,
        ltv: &ManagedDecimal<Self::Api, NumDecimals>,
        liquidation_threshold: &ManagedDecimal<Self::Api, NumDecimals>,
        liquidation_bonus: &ManagedDecimal<Self::Api, NumDecimals>,
        has_suppliers: bool,
    ) -> Result<(), LendingError> {
        if ltv > liquidation_threshold {
            return Err(LendingError::InvalidLtv);
        }

        if *liquidation_threshold == self.bps_zero() {
            if *liquidation_bonus != self.bps_zero() {
                return Err(LendingError::InvalidLiquidationBonus);
            }
            if has_suppliers {
                return Err(LendingError::ReserveLiquidityNotZero);
            }
            return Ok(());
        }

        if *liquidation_threshold > self.bps() {
            return Err(LendingError::InvalidLiquidationThreshold);
        }

        let max_bonus = self.to_decimal_bps(BigUint::from(MAX_LIQUIDATION_BONUS_BPS as u64));
        if *liquidation_bonus <= self.bps() || *liquidation_bonus > max_bonus {
            return Err(LendingError::InvalidLiquidationBonus);
        }
        if self.percent_mul(liquidation_threshold, liquidation_bonus) > self.bps() {
            return Err(LendingError::InvalidLiquidationBonus);
        }
        Ok(())
    }

    fn validate_strategy(
        &self,
        strategy: &InterestRateStrategy<Self::Api>,
    ) -> Result<(), LendingError> {
        let zero = self.bps_zero();
        let one = self.bps();
        for ratio in [
            &strategy.optimal_usage_ratio,
            &strategy.optimal_stable_to_total_debt_ratio,
        ] {
            let ratio = ratio.rescale(BPS_PRECISION);
            if ratio == zero || ratio > one {
                return Err(LendingError::InvalidInterestRateParams);
            }
        }
        Ok(())
    }

    /// Checks the whole configuration of a reserve being listed.
    fn validate_reserve_config(
        &self,
        config: &ReserveConfig<Self::Api>,
        strategy: &InterestRateStrategy<Self::Api>,
    ) -> Result<(), LendingError> {
        if config.decimals > MAX_ASSET_DECIMALS {
            return Err(LendingError::InvalidDecimals);
        }
        self.validate_risk_params(
            &config.ltv,
            &config.liquidation_threshold,
            &config.liquidation_bonus,
            false,
        )?;
        if config.liquidation_protocol_fee > self.bps() {
            return Err(LendingError::InvalidProtocolFee);
        }
        if config.reserve_factor > self.bps() {
            return Err(LendingError::InvalidReserveFactor);
        }
        self.validate_strategy(strategy)
    }

    /// Lists a new reserve with both indexes at one RAY.
    ///
    /// # Arguments
    /// - `asset`: Underlying asset, must not be listed yet
    /// - `token_kind`: Accounting-token implementation of the reserve
    /// - `config`: Risk configuration, BPS parameters rescaled on entry
    /// - `strategy`: Two-slope rate curve
    ///
    /// # Errors
    /// - `AssetAlreadyListed`, `InvalidDecimals` and the risk parameter errors
    fn process_init_reserve(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        token_kind: TokenKind,
        config: ReserveConfig<Self::Api>,
        strategy: InterestRateStrategy<Self::Api>,
    ) -> Result<(), LendingError> {
        if cache.is_listed(asset) {
            return Err(LendingError::AssetAlreadyListed);
        }

        let config = self.normalize_config(config);
        self.validate_reserve_config(&config, &strategy)?;

        let decimals = config.decimals;
        let now = cache.timestamp;
        cache.list_reserve(ReserveData::new(asset.clone(), token_kind, config, strategy, now));
        cache.push_event(Event::ReserveInitialized {
            asset: asset.clone(),
            token_kind,
            decimals,
        });
        self.update_reserve_rates(cache, asset)?;

        info!("listed reserve {} ({:?}, {} decimals)", asset, token_kind, decimals);
        Ok(())
    }

    /// Brings every decimal of a configuration to its canonical scale.
    fn normalize_config(
        &self,
        mut config: ReserveConfig<Self::Api>,
    ) -> ReserveConfig<Self::Api> {
        config.ltv = config.ltv.rescale(BPS_PRECISION);
        config.liquidation_threshold = config.liquidation_threshold.rescale(BPS_PRECISION);
        config.liquidation_bonus = config.liquidation_bonus.rescale(BPS_PRECISION);
        config.liquidation_protocol_fee = config.liquidation_protocol_fee.rescale(BPS_PRECISION);
        config.reserve_factor = config.reserve_factor.rescale(BPS_PRECISION);
        config.debt_ceiling = config.debt_ceiling.rescale(WAD_PRECISION);
        let decimals = config.decimals;
        config.borrow_cap = config.borrow_cap.map(|cap| cap.rescale(decimals));
        config.supply_cap = config.supply_cap.map(|cap| cap.rescale(decimals));
        config
    }

    /// Applies `update` to the configuration of `asset` and records the change.
    fn update_reserve_config<F>(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        field: &'static str,
        update: F,
    ) -> Result<(), LendingError>
    where
        F: FnOnce(&mut ReserveConfig<Self::Api>),
    {
        let reserve = cache.get_cached_reserve_mut(asset)?;
        update(&mut reserve.config);

        cache.push_event(Event::ReserveConfigurationChanged {
            asset: asset.clone(),
            field,
        });
        info!("reserve {} configuration changed: {}", asset, field);
        Ok(())
    }

    fn process_set_reserve_ltv_and_liquidation(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        ltv: ManagedDecimal<Self::Api, NumDecimals>,
        liquidation_threshold: ManagedDecimal<Self::Api, NumDecimals>,
        liquidation_bonus: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let ltv = ltv.rescale(BPS_PRECISION);
        let liquidation_threshold = liquidation_threshold.rescale(BPS_PRECISION);
        let liquidation_bonus = liquidation_bonus.rescale(BPS_PRECISION);

        let reserve = cache.get_cached_reserve(asset)?;
        let has_suppliers = reserve.has_suppliers();
        let e_mode_id = reserve.config.e_mode_category;
        self.validate_risk_params(&ltv, &liquidation_threshold, &liquidation_bonus, has_suppliers)?;

        if e_mode_id != 0 {
            if let Some(category) = cache.get_e_mode_category(e_mode_id) {
                if liquidation_threshold > category.liquidation_threshold {
                    return Err(LendingError::InvalidLiquidationThreshold);
                }
            }
        }

        self.update_reserve_config(cache, asset, "ltv_and_liquidation", |config| {
            config.ltv = ltv;
            config.liquidation_threshold = liquidation_threshold;
            config.liquidation_bonus = liquidation_bonus;
        })
    }

    fn process_set_liquidation_protocol_fee(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        fee: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let fee = fee.rescale(BPS_PRECISION);
        if fee > self.bps() {
            return Err(LendingError::InvalidProtocolFee);
        }
        self.update_reserve_config(cache, asset, "liquidation_protocol_fee", |config| {
            config.liquidation_protocol_fee = fee;
        })
    }

    /// The new factor applies to interest accrued from now on; the rates are
    /// refreshed so the liquidity rate reflects it immediately.
    fn process_set_reserve_factor(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        reserve_factor: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let reserve_factor = reserve_factor.rescale(BPS_PRECISION);
        if reserve_factor > self.bps() {
            return Err(LendingError::InvalidReserveFactor);
        }
        self.update_reserve_config(cache, asset, "reserve_factor", |config| {
            config.reserve_factor = reserve_factor;
        })?;
        self.update_reserve_rates(cache, asset)
    }

    /// `None` removes the cap.
    fn process_set_borrow_cap(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        cap: Option<ManagedDecimal<Self::Api, NumDecimals>>,
    ) -> Result<(), LendingError> {
        let decimals = cache.get_cached_reserve(asset)?.decimals();
        let cap = cap.map(|cap| cap.rescale(decimals));
        self.update_reserve_config(cache, asset, "borrow_cap", |config| {
            config.borrow_cap = cap;
        })
    }

    /// `None` removes the cap.
    fn process_set_supply_cap(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        cap: Option<ManagedDecimal<Self::Api, NumDecimals>>,
    ) -> Result<(), LendingError> {
        let decimals = cache.get_cached_reserve(asset)?.decimals();
        let cap = cap.map(|cap| cap.rescale(decimals));
        self.update_reserve_config(cache, asset, "supply_cap", |config| {
            config.supply_cap = cap;
        })
    }

    /// Moves an asset in or out of isolation mode.
    ///
    /// An asset can only become isolated while nobody supplies it, otherwise
    /// existing collateral would silently change meaning. Leaving isolation
    /// resets the debt counter.
    fn process_set_debt_ceiling(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        debt_ceiling: ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let debt_ceiling = debt_ceiling.rescale(WAD_PRECISION);
        let wad_zero = self.wad_zero();

        let reserve = cache.get_cached_reserve(asset)?;
        let was_isolated = reserve.config.is_isolated();
        if !was_isolated && debt_ceiling != wad_zero && reserve.has_suppliers() {
            return Err(LendingError::ReserveLiquidityNotZero);
        }

        let resets_debt = debt_ceiling == wad_zero;
        self.update_reserve_config(cache, asset, "debt_ceiling", |config| {
            config.debt_ceiling = debt_ceiling;
        })?;

        if resets_debt {
            let reserve = cache.get_cached_reserve_mut(asset)?;
            if reserve.isolation_mode_total_debt != wad_zero {
                reserve.isolation_mode_total_debt = wad_zero.clone();
                cache.push_event(Event::IsolationModeTotalDebtUpdated {
                    asset: asset.clone(),
                    total_debt: wad_zero,
                });
            }
        }
        Ok(())
    }

    /// Deactivation requires an empty reserve.
    fn process_set_reserve_active(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        active: bool,
    ) -> Result<(), LendingError> {
        if !active && cache.get_cached_reserve(asset)?.has_suppliers() {
            return Err(LendingError::ReserveLiquidityNotZero);
        }
        self.update_reserve_config(cache, asset, "active", |config| config.active = active)
    }

    fn process_set_reserve_frozen(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        frozen: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "frozen", |config| config.frozen = frozen)
    }

    fn process_set_reserve_paused(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        paused: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "paused", |config| config.paused = paused)
    }

    fn process_set_borrowing_enabled(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        enabled: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "borrowing_enabled", |config| {
            config.borrowing_enabled = enabled;
        })
    }

    fn process_set_stable_borrowing_enabled(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        enabled: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "stable_borrowing_enabled", |config| {
            config.stable_borrowing_enabled = enabled;
        })
    }

    fn process_set_borrowable_in_isolation(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        borrowable: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "borrowable_in_isolation", |config| {
            config.borrowable_in_isolation = borrowable;
        })
    }

    fn process_set_siloed_borrowing(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        siloed: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "siloed_borrowing", |config| {
            config.siloed_borrowing = siloed;
        })
    }

    fn process_set_flash_loan_enabled(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        enabled: bool,
    ) -> Result<(), LendingError> {
        self.update_reserve_config(cache, asset, "flash_loan_enabled", |config| {
            config.flash_loan_enabled = enabled;
        })
    }

    /// Replaces the rate curve. Interest up to now was accrued with the old
    /// curve when the reserve entered the cache.
    fn process_set_reserve_interest_rate_strategy(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        strategy: InterestRateStrategy<Self::Api>,
    ) -> Result<(), LendingError> {
        self.validate_strategy(&strategy)?;

        cache.get_cached_reserve_mut(asset)?.strategy = strategy;
        cache.push_event(Event::ReserveConfigurationChanged {
            asset: asset.clone(),
            field: "interest_rate_strategy",
        });
        info!("reserve {} configuration changed: interest_rate_strategy", asset);
        self.update_reserve_rates(cache, asset)
    }

    /// Puts `asset` in e-mode category `category_id`, 0 removing it from any.
    ///
    /// The category's liquidation threshold must not be lower than the asset's
    /// own, so joining a category never weakens existing positions.
    fn process_set_asset_e_mode_category(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        category_id: u8,
    ) -> Result<(), LendingError> {
        if category_id != 0 {
            let category = cache
                .get_e_mode_category(category_id)
                .ok_or(LendingError::EModeCategoryNotFound)?;
            let reserve = cache.get_cached_reserve(asset)?;
            if category.liquidation_threshold < reserve.config.liquidation_threshold {
                return Err(LendingError::InvalidLiquidationThreshold);
            }
        }

        self.update_reserve_config(cache, asset, "e_mode_category", |config| {
            config.e_mode_category = category_id;
        })
    }

    /// Creates or replaces an e-mode category.
    ///
    /// **Rules**:
    /// - id 0 is reserved for "no category"
    /// - LTV, threshold and bonus follow the reserve rules, without the supply check
    /// - the threshold is at least that of every asset already in the category
    fn process_configure_e_mode_category(
        &self,
        cache: &mut Cache<Self>,
        category: EModeCategory<Self::Api>,
    ) -> Result<(), LendingError> {
        if category.id == 0 {
            return Err(LendingError::EModeCategoryReserved);
        }

        let category = EModeCategory {
            ltv: category.ltv.rescale(BPS_PRECISION),
            liquidation_threshold: category.liquidation_threshold.rescale(BPS_PRECISION),
            liquidation_bonus: category.liquidation_bonus.rescale(BPS_PRECISION),
            ..category
        };
        self.validate_risk_params(
            &category.ltv,
            &category.liquidation_threshold,
            &category.liquidation_bonus,
            false,
        )?;
        if category.liquidation_threshold == self.bps_zero() {
            return Err(LendingError::InvalidLiquidationThreshold);
        }

        for asset in cache.reserves_list() {
            let config = &cache.get_cached_reserve(&asset)?.config;
            if config.e_mode_category == category.id
                && config.liquidation_threshold > category.liquidation_threshold
            {
                return Err(LendingError::InvalidLiquidationThreshold);
            }
        }

        info!(
            "e-mode category {} ({}) configured, ltv {:?}, threshold {:?}",
            category.id,
            category.label,
            category.ltv.into_raw_units(),
            category.liquidation_threshold.into_raw_units()
        );
        cache.push_event(Event::EModeCategoryUpdated {
            category_id: category.id,
            ltv: category.ltv.clone(),
            liquidation_threshold: category.liquidation_threshold.clone(),
            liquidation_bonus: category.liquidation_bonus.clone(),
            price_source: category.price_source.clone(),
            label: category.label.clone(),
        });
        cache.set_e_mode_category(category);
        Ok(())
    }

    /// Records who votes with the pooled underlying of a delegation-aware reserve.
    fn process_delegate_underlying(
        &self,
        cache: &mut Cache<Self>,
        asset: &AssetId,
        delegatee: AccountId,
    ) -> Result<(), LendingError> {
        let reserve = cache.get_cached_reserve_mut(asset)?;
        if reserve.token_kind != TokenKind::DelegationAware {
            return Err(LendingError::TokenKindMismatch);
        }
        reserve.delegatee = Some(delegatee);

        cache.push_event(Event::UnderlyingDelegated {
            asset: asset.clone(),
            delegatee,
        });
        info!("reserve {} underlying delegated to {}", asset, delegatee);
        Ok(())
    }
}
