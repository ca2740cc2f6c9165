use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountId, AssetId};
use liquidity_layer::{LedgerInstruction, LiquidityModule, Party};
use log::debug;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use crate::{cache::Cache, validation};

pub trait FlashLoanModule: validation::ValidationModule {
    /// Lends `amount` of `asset` for the duration of `receiver`.
    ///
    /// **Process**:
    /// 1. Validates the reserve and the available liquidity.
    /// 2. Computes the premium from the configured flash-loan fee.
    /// 3. Calls `receiver(asset, amount, premium)`, which returns what it pays back.
    /// 4. Anything short of `amount + premium` aborts the whole operation.
    /// 5. The premium joins the reserve's liquidity as treasury accrual.
    ///
    /// The funds never leave the staged state, so a failed receiver leaves the
    /// reserve untouched.
    fn process_flash_loan<F>(
        &self,
        cache: &mut Cache<Self>,
        initiator: AccountId,
        asset: &AssetId,
        amount: BigUint<Self::Api>,
        receiver: F,
    ) -> Result<(), LendingError>
    where
        F: FnOnce(
            &AssetId,
            &ManagedDecimal<Self::Api, NumDecimals>,
            &ManagedDecimal<Self::Api, NumDecimals>,
        ) -> BigUint<Self::Api>,
    {
        let reserve = cache.get_cached_reserve(asset)?.clone();
        let amount = self.to_decimal(amount, reserve.decimals());
        self.validate_flash_loan(&reserve, &amount)?;

        let pool = self.liquidity_pool();
        let premium_bps = self.to_decimal_bps(BigUint::from(
            self.controller_config().flash_loan_premium_bps,
        ));
        let premium = pool.flash_loan_premium(&amount, &premium_bps);

        let repaid = self.to_decimal(receiver(asset, &amount, &premium), reserve.decimals());
        let owed = amount.clone() + premium.clone();
        if repaid < owed {
            debug!(
                "flash loan of {:?} {} repaid {:?}, owed {:?}",
                amount.into_raw_units(),
                asset,
                repaid.into_raw_units(),
                owed.into_raw_units()
            );
            return Err(LendingError::FlashLoanNotRepaid);
        }

        let reserve = cache.get_cached_reserve_mut(asset)?;
        pool.accrue_premium_to_treasury(reserve, &premium);
        self.update_reserve_rates(cache, asset)?;

        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: asset.clone(),
            from: Party::Reserve,
            to: Party::Account(initiator),
            amount: amount.clone(),
        });
        cache.push_instruction(LedgerInstruction::TransferUnderlying {
            asset: asset.clone(),
            from: Party::Account(initiator),
            to: Party::Reserve,
            amount: owed,
        });

        cache.push_event(Event::FlashLoan {
            asset: asset.clone(),
            initiator,
            amount,
            premium,
        });
        Ok(())
    }
}
