use common_errors::LendingError;
use common_events::Event;
use common_math::Rounding;
use common_structs::{AccountId, AccountingToken, AssetId, InterestRateMode};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use multiversx_sc::types::BigUint;

use crate::{cache::Cache, validation};

pub trait PositionBorrowModule: validation::ValidationModule {
    /// Borrows `amount` of `asset` against the collateral of `caller`.
    ///
    /// **Process**:
    /// 1. Validates the borrow on the pre-borrow position.
    /// 2. Variable mode mints scaled debt rounded up; stable mode folds the
    ///    amount into the account's stable position at the reserve's current
    ///    stable rate.
    /// 3. Refreshes the reserve rates.
    /// 4. Charges the isolated collateral's debt counter when in isolation mode.
    /// 5. Sends the underlying to `caller`.
    fn process_borrow(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<Self::Api>,
        mode: InterestRateMode,
    ) -> Result<(), LendingError> {
        let decimals = cache.get_cached_reserve(asset)?.decimals();
        let amount = self.to_decimal(amount, decimals);
        self.validate_borrow(cache, caller, asset, &amount, mode)?;

        let account = cache.get_cached_account(caller);
        let now = cache.timestamp;
        let pool = self.liquidity_pool();
        let zero = self.zero_at(decimals);

        let borrow_rate = match mode {
            InterestRateMode::Variable => {
                let reserve = cache.get_cached_reserve_mut(asset)?;
                let scaled_amount = pool.scaled_debt_mint(reserve, &amount);
                pool.add_variable_debt(reserve, &scaled_amount, &amount)?;
                let index = reserve.variable_borrow_index.clone();

                self.credit_scaled_debt(cache, caller, asset, &scaled_amount);
                cache.push_instruction(LedgerInstruction::MintScaled {
                    token: AccountingToken::variable_debt(asset),
                    account: caller,
                    scaled_amount,
                    index,
                });
                None
            },
            InterestRateMode::Stable => {
                let previous = account.stable_debts.get(asset);
                let previous_principal = previous
                    .map(|position| position.principal.clone())
                    .unwrap_or_else(|| zero.clone());

                let reserve = cache.get_cached_reserve_mut(asset)?;
                let rate = reserve.current_stable_borrow_rate.clone();
                let position = pool.mint_stable_debt(reserve, previous, &amount, &rate, now)?;
                let next_principal = position.principal.clone();

                cache
                    .get_cached_account_mut(caller)
                    .stable_debts
                    .insert(asset.clone(), position);
                self.sync_stable_debt_token(cache, caller, asset, &previous_principal, &next_principal);
                Some(rate)
            },
        };

        self.update_reserve_rates(cache, asset)?;

        if let Some(isolated_asset) = &account.isolated_collateral_asset {
            let charged = self.isolation_debt_of(&amount, Rounding::Ceil);
            self.adjust_isolated_debt(cache, isolated_asset, &charged, true)?;
        }

        let borrow_rate = match borrow_rate {
            Some(rate) => rate,
            None => cache
                .get_cached_reserve(asset)?
                .current_variable_borrow_rate
                .clone(),
        };

        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: asset.clone(),
            from: Party::Reserve,
            to: Party::Account(caller),
            amount: amount.clone(),
        });
        cache.push_event(Event::Borrow {
            asset: asset.clone(),
            user: caller,
            on_behalf_of: caller,
            amount,
            interest_rate_mode: mode,
            borrow_rate,
        });
        Ok(())
    }
}
