use common_constants::MAX_AMOUNT;
use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountId, AccountingToken, AssetId};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use multiversx_sc::types::BigUint;

use crate::{cache::Cache, validation};

pub trait PositionWithdrawModule: validation::ValidationModule {
    /// Withdraws `amount` of `asset` from the position of `caller` to `to`.
    ///
    /// `MAX_AMOUNT` withdraws the whole balance. Scaled supply is burned rounded
    /// up, or entirely when the whole balance leaves.
    ///
    /// When the asset backs open debt the resulting health factor must stay at
    /// or above one, checked on the staged post-withdrawal position.
    fn process_withdraw(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<Self::Api>,
        to: AccountId,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(caller);
        let reserve = cache.get_cached_reserve(asset)?;
        let balance = self.get_supply_balance(reserve, &account);
        let scaled_balance = account
            .scaled_balances
            .get(asset)
            .cloned()
            .unwrap_or_else(|| self.ray_zero());

        let amount = if amount == BigUint::from(MAX_AMOUNT) {
            balance.clone()
        } else {
            self.to_decimal(amount, reserve.decimals())
        };
        self.validate_withdraw(reserve, &amount, &balance)?;

        let pool = self.liquidity_pool();
        let scaled_burn = if amount == balance {
            scaled_balance
        } else {
            self.get_min(pool.scaled_supply_burn(reserve, &amount), scaled_balance)
        };

        let reserve = cache.get_cached_reserve_mut(asset)?;
        pool.remove_supply(reserve, &scaled_burn, &amount)?;
        let index = reserve.liquidity_index.clone();

        self.update_reserve_rates(cache, asset)?;

        self.debit_scaled_supply(cache, caller, asset, &scaled_burn);
        cache.push_instruction(LedgerInstruction::BurnScaled {
            token: AccountingToken::supply(asset),
            account: caller,
            scaled_amount: scaled_burn,
            index,
        });
        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: asset.clone(),
            from: Party::Reserve,
            to: Party::Account(to),
            amount: amount.clone(),
        });
        cache.push_event(Event::Withdraw {
            asset: asset.clone(),
            user: caller,
            to,
            amount,
        });

        if account.is_using_as_collateral(asset) && account.is_borrowing_any() {
            self.validate_health_factor_and_ltv(cache, caller, asset)?;
        }
        Ok(())
    }
}
