use common_constants::MAX_AMOUNT;
use common_errors::LendingError;
use common_events::Event;
use common_math::Rounding;
use common_structs::{AccountId, AccountingToken, AssetId, InterestRateMode};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use crate::{cache::Cache, validation};

pub trait PositionRepayModule: validation::ValidationModule {
    /// Repays `mode` debt of `on_behalf_of` in `asset`.
    ///
    /// The repaid amount is capped at the outstanding debt; `MAX_AMOUNT`
    /// repays all of it. With `use_a_tokens` the repayment burns the
    /// borrower's own supply of the asset instead of pulling underlying.
    ///
    /// Repaying an isolation-borrowable asset releases the matching share of
    /// the isolated collateral's debt counter.
    #[allow(clippy::too_many_arguments)]
    fn process_repay(
        &self,
        cache: &mut Cache<Self>,
        repayer: AccountId,
        asset: &AssetId,
        amount: BigUint<Self::Api>,
        mode: InterestRateMode,
        on_behalf_of: AccountId,
        use_a_tokens: bool,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(on_behalf_of);
        let now = cache.timestamp;
        let reserve = cache.get_cached_reserve(asset)?.clone();

        let (variable_debt, stable_debt) = self.get_debt_balances(&reserve, &account, now);
        let debt = match mode {
            InterestRateMode::Variable => variable_debt,
            InterestRateMode::Stable => stable_debt,
        };

        let is_max_amount = amount == BigUint::from(MAX_AMOUNT);
        let requested = if is_max_amount {
            debt.clone()
        } else {
            self.to_decimal(amount, reserve.decimals())
        };
        self.validate_repay(&reserve, &requested, is_max_amount, repayer, on_behalf_of, &debt)?;

        let supplied = self.get_supply_balance(&reserve, &account);
        let payback = self.get_min(requested, debt.clone());
        let payback = if use_a_tokens && is_max_amount {
            self.get_min(payback, supplied.clone())
        } else {
            payback
        };
        if use_a_tokens {
            self.require_amount_greater_than_zero(&payback)?;
            if payback > supplied {
                return Err(LendingError::NotEnoughAvailableUserBalance);
            }
        }

        match mode {
            InterestRateMode::Variable => {
                self.burn_variable_debt(cache, on_behalf_of, asset, &payback, &debt)?;
            },
            InterestRateMode::Stable => {
                self.burn_stable_debt(cache, on_behalf_of, asset, &payback)?;
            },
        }

        if use_a_tokens {
            self.burn_supply_for_repay(cache, on_behalf_of, asset, &payback, &supplied)?;
        } else {
            cache.push_instruction(LedgerInstruction::TransferUnderlying {
                asset: asset.clone(),
                from: Party::Account(repayer),
                to: Party::Reserve,
                amount: payback.clone(),
            });
        }

        self.update_reserve_rates(cache, asset)?;

        if let Some(isolated_asset) = &account.isolated_collateral_asset {
            if reserve.config.can_borrow_in_isolation() {
                let released = self.isolation_debt_of(&payback, Rounding::Floor);
                self.adjust_isolated_debt(cache, isolated_asset, &released, false)?;
            }
        }

        cache.push_event(Event::Repay {
            asset: asset.clone(),
            user: on_behalf_of,
            repayer,
            amount: payback,
            use_a_tokens,
        });
        Ok(())
    }

    /// Cancels `amount` of variable debt, burning every scaled unit when the
    /// whole `debt` is repaid.
    fn burn_variable_debt(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let scaled_debt = cache
            .get_cached_account(user)
            .scaled_variable_debts
            .get(asset)
            .cloned()
            .unwrap_or_else(|| self.ray_zero());

        let pool = self.liquidity_pool();
        let reserve = cache.get_cached_reserve_mut(asset)?;
        let scaled_burn = if amount == debt {
            scaled_debt
        } else {
            self.get_min(pool.scaled_debt_burn(reserve, amount), scaled_debt)
        };
        pool.remove_variable_debt(reserve, &scaled_burn, amount);
        let index = reserve.variable_borrow_index.clone();

        self.debit_scaled_debt(cache, user, asset, &scaled_burn);
        cache.push_instruction(LedgerInstruction::BurnScaled {
            token: AccountingToken::variable_debt(asset),
            account: user,
            scaled_amount: scaled_burn,
            index,
        });
        Ok(())
    }

    /// Cancels up to `amount` of stable debt, closing the position once empty.
    fn burn_stable_debt(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let now = cache.timestamp;
        let position = match cache.get_cached_account(user).stable_debts.get(asset) {
            Some(position) => position.clone(),
            None => return Err(LendingError::NoDebtOfSelectedType),
        };

        let pool = self.liquidity_pool();
        let reserve = cache.get_cached_reserve_mut(asset)?;
        let zero = self.zero_at(reserve.decimals());
        let (_, remaining) = pool.burn_stable_debt(reserve, &position, amount, now);

        let next_principal = remaining
            .as_ref()
            .map(|remaining| remaining.principal.clone())
            .unwrap_or(zero);
        let account = cache.get_cached_account_mut(user);
        match remaining {
            Some(remaining) => {
                account.stable_debts.insert(asset.clone(), remaining);
            },
            None => {
                account.stable_debts.remove(asset);
            },
        }

        self.sync_stable_debt_token(cache, user, asset, &position.principal, &next_principal);
        Ok(())
    }

    /// Pays a repayment out of the borrower's own supply of the asset.
    fn burn_supply_for_repay(
        &self,
        cache: &mut Cache<Self>,
        user: AccountId,
        asset: &AssetId,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        supplied: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let scaled_balance = cache
            .get_cached_account(user)
            .scaled_balances
            .get(asset)
            .cloned()
            .unwrap_or_else(|| self.ray_zero());

        let pool = self.liquidity_pool();
        let reserve = cache.get_cached_reserve_mut(asset)?;
        let scaled_burn = if amount == supplied {
            scaled_balance
        } else {
            self.get_min(pool.scaled_supply_burn(reserve, amount), scaled_balance)
        };
        pool.remove_supply(reserve, &scaled_burn, amount)?;
        let index = reserve.liquidity_index.clone();

        self.debit_scaled_supply(cache, user, asset, &scaled_burn);
        cache.push_instruction(LedgerInstruction::BurnScaled {
            token: AccountingToken::supply(asset),
            account: user,
            scaled_amount: scaled_burn,
            index,
        });
        Ok(())
    }

    /// Moves the whole `current_mode` debt of `caller` in `asset` to the other mode.
    fn process_swap_borrow_rate_mode(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        asset: &AssetId,
        current_mode: InterestRateMode,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(caller);
        let now = cache.timestamp;
        let reserve = cache.get_cached_reserve(asset)?.clone();
        let (variable_debt, stable_debt) = self.get_debt_balances(&reserve, &account, now);
        self.validate_swap_rate_mode(&reserve, &account, &variable_debt, &stable_debt, current_mode)?;

        let pool = self.liquidity_pool();
        let next_mode = match current_mode {
            InterestRateMode::Stable => {
                self.burn_stable_debt(cache, caller, asset, &stable_debt)?;

                let reserve = cache.get_cached_reserve_mut(asset)?;
                let scaled_amount = pool.scaled_debt_mint(reserve, &stable_debt);
                pool.add_variable_debt(reserve, &scaled_amount, &stable_debt)?;
                let index = reserve.variable_borrow_index.clone();

                self.credit_scaled_debt(cache, caller, asset, &scaled_amount);
                cache.push_instruction(LedgerInstruction::MintScaled {
                    token: AccountingToken::variable_debt(asset),
                    account: caller,
                    scaled_amount,
                    index,
                });
                InterestRateMode::Variable
            },
            InterestRateMode::Variable => {
                self.burn_variable_debt(cache, caller, asset, &variable_debt, &variable_debt)?;

                let previous = account.stable_debts.get(asset);
                let previous_principal = previous
                    .map(|position| position.principal.clone())
                    .unwrap_or_else(|| self.zero_at(reserve.decimals()));

                let reserve = cache.get_cached_reserve_mut(asset)?;
                let rate = reserve.current_stable_borrow_rate.clone();
                let position = pool.mint_stable_debt(reserve, previous, &variable_debt, &rate, now)?;
                let next_principal = position.principal.clone();

                cache
                    .get_cached_account_mut(caller)
                    .stable_debts
                    .insert(asset.clone(), position);
                self.sync_stable_debt_token(cache, caller, asset, &previous_principal, &next_principal);
                InterestRateMode::Stable
            },
        };

        self.update_reserve_rates(cache, asset)?;

        cache.push_event(Event::SwapBorrowRateMode {
            asset: asset.clone(),
            user: caller,
            interest_rate_mode: next_mode,
        });
        Ok(())
    }
}
