use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountId, AccountingToken, AssetId};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use multiversx_sc::types::BigUint;

use crate::{cache::Cache, validation};

pub trait PositionSupplyModule: validation::ValidationModule {
    /// Supplies `amount` of `asset` from `caller` into the position of `on_behalf_of`.
    ///
    /// **Process**:
    /// 1. Validates the reserve state and the supply cap.
    /// 2. Mints scaled supply, rounded down, at the current liquidity index.
    /// 3. Refreshes the reserve rates.
    /// 4. Pulls the underlying from `caller` and mints the accounting token.
    /// 5. A first supply of the asset is enabled as collateral when the
    ///    account's isolation state allows it.
    fn process_supply(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        asset: &AssetId,
        amount: BigUint<Self::Api>,
        on_behalf_of: AccountId,
    ) -> Result<(), LendingError> {
        let reserve = cache.get_cached_reserve(asset)?;
        let amount = self.to_decimal(amount, reserve.decimals());
        self.validate_supply(reserve, &amount)?;

        let pool = self.liquidity_pool();
        let reserve = cache.get_cached_reserve_mut(asset)?;
        let scaled_amount = pool.scaled_supply_mint(reserve, &amount);
        if scaled_amount == self.ray_zero() {
            return Err(LendingError::InvalidAmount);
        }
        pool.add_supply(reserve, &scaled_amount, &amount);
        let index = reserve.liquidity_index.clone();

        self.update_reserve_rates(cache, asset)?;

        let first_supply = self.credit_scaled_supply(cache, on_behalf_of, asset, &scaled_amount);
        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: asset.clone(),
            from: Party::Account(caller),
            to: Party::Reserve,
            amount: amount.clone(),
        });
        cache.push_instruction(LedgerInstruction::MintScaled {
            token: AccountingToken::supply(asset),
            account: on_behalf_of,
            scaled_amount,
            index,
        });

        if first_supply {
            self.try_enable_collateral(cache, on_behalf_of, asset)?;
        }

        cache.push_event(Event::Supply {
            asset: asset.clone(),
            user: caller,
            on_behalf_of,
            amount,
        });
        Ok(())
    }
}
