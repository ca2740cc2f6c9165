use std::collections::BTreeMap;

use common_constants::{CLOSE_FACTOR_HF_THRESHOLD, DEFAULT_PRICE_DECIMALS, RAY_PRECISION, WAD_PRECISION};
use common_errors::LendingError;
use common_structs::{AssetId, EModeCategory, ReserveConfig};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

use crate::storage;

mod sentinel;

pub use sentinel::{OracleSentinel, SequencerSentinel};

/// Source of unit prices, denominated in the base currency.
pub trait PriceOracle<M: ManagedTypeApi> {
    /// Price of one whole unit of `asset`, `None` when the feed has no answer.
    fn get_asset_price(&self, asset: &AssetId) -> Option<BigUint<M>>;

    fn price_decimals(&self) -> usize {
        DEFAULT_PRICE_DECIMALS
    }
}

/// Prices set by hand, keyed by asset or e-mode price source.
#[derive(Clone)]
pub struct FixedPriceOracle<M: ManagedTypeApi> {
    prices: BTreeMap<AssetId, BigUint<M>>,
    decimals: usize,
}

impl<M: ManagedTypeApi> FixedPriceOracle<M> {
    pub fn new(decimals: usize) -> Self {
        FixedPriceOracle {
            prices: BTreeMap::new(),
            decimals,
        }
    }

    pub fn set_price(&mut self, asset: &AssetId, price: BigUint<M>) {
        self.prices.insert(asset.clone(), price);
    }

    pub fn remove_price(&mut self, asset: &AssetId) {
        self.prices.remove(asset);
    }
}

impl<M: ManagedTypeApi> Default for FixedPriceOracle<M> {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_DECIMALS)
    }
}

impl<M: ManagedTypeApi> PriceOracle<M> for FixedPriceOracle<M> {
    fn get_asset_price(&self, asset: &AssetId) -> Option<BigUint<M>> {
        self.prices.get(asset).cloned()
    }

    fn price_decimals(&self) -> usize {
        self.decimals
    }
}

pub trait OracleModule: storage::Storage + common_math::SharedMathModule {
    /// Price of `source` as a WAD decimal. Missing and zero prices are rejected.
    fn get_token_price(
        &self,
        source: &AssetId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let feed = self.price_feed();
        let price = feed
            .get_asset_price(source)
            .ok_or_else(|| LendingError::PriceNotAvailable(source.to_string()))?;
        if price == 0u64 {
            return Err(LendingError::PriceNotAvailable(source.to_string()));
        }

        let price = self.to_decimal(price, feed.price_decimals());
        Ok(self.rescale_half_up(&price, WAD_PRECISION))
    }

    /// Price used to value `asset` for an account in `e_mode`.
    ///
    /// Assets belonging to the account's category are priced through the
    /// category's source when it has one.
    fn get_asset_price(
        &self,
        asset: &AssetId,
        config: &ReserveConfig<Self::Api>,
        e_mode: Option<&EModeCategory<Self::Api>>,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let source = match e_mode {
            Some(category) if config.e_mode_category == category.id => {
                category.price_source.as_ref().unwrap_or(asset)
            },
            _ => asset,
        };
        self.get_token_price(source)
    }

    /// Borrowing is frozen until the sequencer has been up for the grace period.
    fn require_borrow_allowed(&self) -> Result<(), LendingError> {
        if !self.sentinel().is_borrow_allowed(self.block_timestamp()) {
            return Err(LendingError::PriceOracleSentinelCheckFailed);
        }
        Ok(())
    }

    /// Positions below the close-factor threshold stay liquidatable during an outage.
    fn require_liquidation_allowed(
        &self,
        health_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        let threshold = self.to_decimal(BigUint::from(CLOSE_FACTOR_HF_THRESHOLD), RAY_PRECISION);
        if *health_factor >= threshold
            && !self.sentinel().is_liquidation_allowed(self.block_timestamp())
        {
            return Err(LendingError::PriceOracleSentinelCheckFailed);
        }
        Ok(())
    }
}
