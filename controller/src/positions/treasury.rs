use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountingToken, AssetId};
use liquidity_layer::{LedgerInstruction, LiquidityModule};

use crate::{cache::Cache, validation};

pub trait TreasuryModule: validation::ValidationModule {
    /// Mints the accrued treasury share of each listed asset to the treasury
    /// account. Inactive reserves and reserves with nothing accrued are skipped.
    fn process_mint_to_treasury(
        &self,
        cache: &mut Cache<Self>,
        assets: &[AssetId],
    ) -> Result<(), LendingError> {
        let treasury = self.controller_config().treasury;
        let pool = self.liquidity_pool();

        for asset in assets {
            let reserve = cache.get_cached_reserve_mut(asset)?;
            if !reserve.config.active {
                continue;
            }

            let Some((scaled_amount, amount)) = pool.mint_to_treasury(reserve) else {
                continue;
            };
            let index = reserve.liquidity_index.clone();

            self.credit_scaled_supply(cache, treasury, asset, &scaled_amount);
            cache.push_instruction(LedgerInstruction::MintScaled {
                token: AccountingToken::supply(asset),
                account: treasury,
                scaled_amount,
                index,
            });
            cache.push_event(Event::MintedToTreasury {
                asset: asset.clone(),
                amount,
            });
        }
        Ok(())
    }
}
