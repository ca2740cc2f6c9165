use common_constants::{CLOSE_FACTOR_HF_THRESHOLD, MAX_AMOUNT, RAY_PRECISION, WAD_PRECISION};
use common_math::Rounding;
use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountId, AccountingToken, AssetId, EModeCategory, ReserveData, UserAccount};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use log::debug;
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use super::repay;
use crate::{cache::Cache, validation};

/// Amounts a liquidation call settles.
pub struct LiquidationAmounts<M: ManagedTypeApi> {
    /// Debt cancelled, in debt asset decimals.
    pub debt_amount: ManagedDecimal<M, NumDecimals>,
    /// Collateral taken from the borrower, protocol fee included.
    pub collateral_amount: ManagedDecimal<M, NumDecimals>,
    /// Treasury share of the bonus, in collateral asset decimals.
    pub protocol_fee: ManagedDecimal<M, NumDecimals>,
}

pub trait PositionLiquidationModule:
    validation::ValidationModule + repay::PositionRepayModule
{
    /// Share of the debt one call may close: the configured close factor while
    /// the health factor sits at or above the threshold, everything below it.
    fn get_close_factor(
        &self,
        health_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let threshold = self.to_decimal(BigUint::from(CLOSE_FACTOR_HF_THRESHOLD), RAY_PRECISION);
        if *health_factor >= threshold {
            self.to_decimal_bps(BigUint::from(
                self.controller_config().liquidation_close_factor_bps,
            ))
        } else {
            self.bps()
        }
    }

    /// Sizes the collateral seized for covering `debt_to_cover`.
    ///
    /// **Mathematical Formula**:
    /// ```text
    /// base_collateral = debt_to_cover * debt_price / collateral_price
    /// collateral      = base_collateral * liquidation_bonus
    /// ```
    /// When `collateral` exceeds the borrower's balance the whole balance is
    /// seized and the debt is recomputed backwards, rounding down:
    /// ```text
    /// debt = balance * collateral_price / liquidation_bonus / debt_price
    /// ```
    /// The protocol fee is `bonus_part * liquidation_protocol_fee`, where the
    /// bonus part is `collateral - collateral / liquidation_bonus`.
    fn compute_liquidation_amounts(
        &self,
        collateral_reserve: &ReserveData<Self::Api>,
        debt_reserve: &ReserveData<Self::Api>,
        account: &UserAccount<Self::Api>,
        e_mode: Option<&EModeCategory<Self::Api>>,
        debt_to_cover: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<LiquidationAmounts<Self::Api>, LendingError> {
        let collateral_config = &collateral_reserve.config;
        let collateral_balance = self.get_supply_balance(collateral_reserve, account);
        let collateral_price =
            self.get_asset_price(&collateral_reserve.asset, collateral_config, e_mode)?;
        let debt_price = self.get_asset_price(&debt_reserve.asset, &debt_reserve.config, e_mode)?;
        let bonus = self
            .get_effective_risk_params(collateral_config, e_mode)
            .liquidation_bonus;

        let debt_value = self.get_token_value(debt_to_cover, &debt_price);
        let base_collateral = self.convert_value_to_tokens_floor(
            &debt_value,
            &collateral_price,
            collateral_reserve.decimals(),
        );
        let max_collateral = self.percent_mul_rounded(&base_collateral, &bonus, Rounding::Floor);

        let (collateral_amount, debt_amount) = if max_collateral > collateral_balance {
            // Every step rounds down so the seized balance always pays for the debt.
            let collateral_value = self.mul_rounded(
                &collateral_balance,
                &collateral_price,
                WAD_PRECISION,
                Rounding::Floor,
            );
            let covered_value = self.div_floor(&collateral_value, &bonus, WAD_PRECISION);
            let debt_amount = self.convert_value_to_tokens_floor(
                &covered_value,
                &debt_price,
                debt_reserve.decimals(),
            );
            (collateral_balance, self.get_min(debt_amount, debt_to_cover.clone()))
        } else {
            (max_collateral, debt_to_cover.clone())
        };

        let protocol_fee = if collateral_config.liquidation_protocol_fee == self.bps_zero() {
            self.zero_at(collateral_reserve.decimals())
        } else {
            let bonus_collateral = collateral_amount.clone() - self.percent_div(&collateral_amount, &bonus);
            self.percent_mul(&bonus_collateral, &collateral_config.liquidation_protocol_fee)
        };

        Ok(LiquidationAmounts {
            debt_amount,
            collateral_amount,
            protocol_fee,
        })
    }

    /// Liquidates part of an unhealthy position.
    ///
    /// **Process**:
    /// 1. Validates reserves, sentinel, health factor and the two positions.
    /// 2. Clamps `debt_to_cover` to the close factor (`MAX_AMOUNT` means the
    ///    largest allowed amount).
    /// 3. Sizes collateral, bonus and protocol fee.
    /// 4. Cancels variable debt first, then stable debt, funded by the liquidator.
    /// 5. Seizes the collateral: the fee moves to the treasury as supply, the
    ///    rest goes to the liquidator either as supply or as underlying.
    /// 6. Releases the isolated collateral's debt counter by the repaid value.
    #[allow(clippy::too_many_arguments)]
    fn process_liquidation(
        &self,
        cache: &mut Cache<Self>,
        liquidator: AccountId,
        collateral_asset: &AssetId,
        debt_asset: &AssetId,
        user: AccountId,
        debt_to_cover: BigUint<Self::Api>,
        receive_a_token: bool,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(user);
        let now = cache.timestamp;
        let collateral_reserve = cache.get_cached_reserve(collateral_asset)?.clone();
        let debt_reserve = cache.get_cached_reserve(debt_asset)?.clone();

        let data = self.calculate_user_account_data(cache, &account)?;
        let (variable_debt, stable_debt) = self.get_debt_balances(&debt_reserve, &account, now);
        let user_debt = variable_debt.clone() + stable_debt.clone();
        self.validate_liquidation(&collateral_reserve, &debt_reserve, &account, &data, &user_debt)?;

        let is_max_amount = debt_to_cover == BigUint::from(MAX_AMOUNT);
        let requested = self.to_decimal(debt_to_cover, debt_reserve.decimals());
        if !is_max_amount {
            self.require_amount_greater_than_zero(&requested)?;
        }

        let close_factor = self.get_close_factor(&data.health_factor);
        let max_liquidatable = self.percent_mul(&user_debt, &close_factor);
        let debt_to_cover = if is_max_amount || requested > max_liquidatable {
            max_liquidatable
        } else {
            requested
        };

        let e_mode = self.get_account_e_mode(cache, &account);
        let amounts = self.compute_liquidation_amounts(
            &collateral_reserve,
            &debt_reserve,
            &account,
            e_mode.as_ref(),
            &debt_to_cover,
        )?;

        debug!(
            "liquidating {} at health factor {:?}: debt {:?} {}, collateral {:?} {}, fee {:?}",
            user,
            data.health_factor.into_raw_units(),
            amounts.debt_amount.into_raw_units(),
            debt_asset,
            amounts.collateral_amount.into_raw_units(),
            collateral_asset,
            amounts.protocol_fee.into_raw_units()
        );

        self.repay_liquidated_debt(cache, user, debt_asset, &amounts.debt_amount, &variable_debt)?;
        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: debt_asset.clone(),
            from: Party::Account(liquidator),
            to: Party::Reserve,
            amount: amounts.debt_amount.clone(),
        });
        self.update_reserve_rates(cache, debt_asset)?;

        if let Some(isolated_asset) = &account.isolated_collateral_asset {
            let released = self.isolation_debt_of(&amounts.debt_amount, Rounding::Floor);
            self.adjust_isolated_debt(cache, isolated_asset, &released, false)?;
        }

        let collateral_balance = self.get_supply_balance(&collateral_reserve, &account);
        self.seize_collateral(
            cache,
            user,
            liquidator,
            collateral_asset,
            &amounts,
            &collateral_balance,
            receive_a_token,
        )?;

        cache.push_event(Event::LiquidationCall {
            collateral_asset: collateral_asset.clone(),
            debt_asset: debt_asset.clone(),
            user,
            debt_to_cover: amounts.debt_amount,
            liquidated_collateral_amount: amounts.collateral_amount,
            protocol_fee: amounts.protocol_fee,
            liquidator,
            receive_a_token,
        });
        Ok(())
    }

    /// Cancels liquidated debt, variable first and the remainder from the
    /// stable position.
    fn repay_liquidated_debt(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        debt_asset: &AssetId,
        debt_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let zero = self.zero_at(variable_debt.scale());

        if *variable_debt >= *debt_amount {
            return self.burn_variable_debt(cache, user, debt_asset, debt_amount, variable_debt);
        }

        if *variable_debt > zero {
            self.burn_variable_debt(cache, user, debt_asset, variable_debt, variable_debt)?;
        }
        let stable_part = debt_amount.clone() - variable_debt.clone();
        self.burn_stable_debt(cache, user, debt_asset, &stable_part)
    }

    /// Takes `collateral_amount` of supply from the borrower.
    ///
    /// Scaled units are burned rounded up, the whole balance when it is fully
    /// seized. The treasury's share is rounded down.
    #[allow(clippy::too_many_arguments)]
    fn seize_collateral(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        liquidator: AccountId,
        collateral_asset: &AssetId,
        amounts: &LiquidationAmounts<Self::Api>,
        collateral_balance: &ManagedDecimal<Self::Api, NumDecimals>,
        receive_a_token: bool,
    ) -> Result<(), LendingError> {
        let scaled_balance = cache
            .get_cached_account(user)
            .scaled_balances
            .get(collateral_asset)
            .cloned()
            .unwrap_or_else(|| self.ray_zero());

        let pool = self.liquidity_pool();
        let reserve = cache.get_cached_reserve(collateral_asset)?;
        let total_scaled = if amounts.collateral_amount == *collateral_balance {
            scaled_balance
        } else {
            self.get_min(
                pool.scaled_supply_burn(reserve, &amounts.collateral_amount),
                scaled_balance,
            )
        };
        let fee_scaled = self.get_min(
            pool.scaled_supply_mint(reserve, &amounts.protocol_fee),
            total_scaled.clone(),
        );
        let liquidator_scaled = total_scaled.clone() - fee_scaled.clone();
        let liquidator_amount = amounts.collateral_amount.clone() - amounts.protocol_fee.clone();
        let index = reserve.liquidity_index.clone();
        let token = AccountingToken::supply(collateral_asset);

        self.debit_scaled_supply(cache, user, collateral_asset, &total_scaled);

        if fee_scaled > self.ray_zero() {
            let treasury = self.controller_config().treasury;
            self.credit_scaled_supply(cache, treasury, collateral_asset, &fee_scaled);
            cache.push_instruction(LedgerInstruction::TransferScaled {
                token: token.clone(),
                from: user,
                to: treasury,
                scaled_amount: fee_scaled,
            });
        }

        if receive_a_token {
            let first_supply =
                self.credit_scaled_supply(cache, liquidator, collateral_asset, &liquidator_scaled);
            cache.push_instruction(LedgerInstruction::TransferScaled {
                token,
                from: user,
                to: liquidator,
                scaled_amount: liquidator_scaled,
            });
            if first_supply {
                self.try_enable_collateral(cache, liquidator, collateral_asset)?;
            }
        } else {
            let reserve = cache.get_cached_reserve_mut(collateral_asset)?;
            pool.remove_supply(reserve, &liquidator_scaled, &liquidator_amount)?;

            cache.push_instruction(LedgerInstruction::BurnScaled {
                token,
                account: user,
                scaled_amount: liquidator_scaled,
                index,
            });
            cache.push_instruction(LedgerInstruction::TransferUnderlying {
                asset: collateral_asset.clone(),
                from: Party::Reserve,
                to: Party::Account(liquidator),
                amount: liquidator_amount,
            });
            self.update_reserve_rates(cache, collateral_asset)?;
        }
        Ok(())
    }
}
