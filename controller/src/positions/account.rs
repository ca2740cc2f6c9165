use common_errors::LendingError;
use common_structs::{AccountId, AssetId};

use crate::{cache::Cache, validation};

pub trait PositionAccountModule: validation::ValidationModule {
    /// Opts a supplied asset in or out of the caller's collateral.
    ///
    /// **Process**:
    /// 1. Requires a non-zero balance on an active, unpaused reserve.
    /// 2. Does nothing when the flag already has the requested value.
    /// 3. Enabling follows the isolation and zero-LTV rules.
    /// 4. Disabling re-checks health factor and LTV when the account has debt.
    fn process_set_use_reserve_as_collateral(
        &self,
        cache: &mut Cache<Self>,
        caller: AccountId,
        asset: &AssetId,
        use_as_collateral: bool,
    ) -> Result<(), LendingError> {
        let account = cache.get_cached_account(caller);
        let reserve = cache.get_cached_reserve(asset)?.clone();
        let balance = self.get_supply_balance(&reserve, &account);
        self.validate_set_use_reserve_as_collateral(&reserve, &balance)?;

        if account.is_using_as_collateral(asset) == use_as_collateral {
            return Ok(());
        }

        if use_as_collateral {
            if !self.can_enable_collateral(&reserve.config, asset, &account) {
                return Err(LendingError::UserInIsolationModeOrLtvZero);
            }
            self.set_collateral_flag(cache, caller, asset, true, reserve.config.is_isolated());
            return Ok(());
        }

        self.set_collateral_flag(cache, caller, asset, false, reserve.config.is_isolated());
        if account.is_borrowing_any() {
            self.validate_health_factor_and_ltv(cache, caller, asset)?;
        }
        Ok(())
    }
}
