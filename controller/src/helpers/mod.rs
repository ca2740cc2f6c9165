use common_constants::{RAY_PRECISION, WAD_PRECISION};

use multiversx_sc::types::{ManagedDecimal, NumDecimals};

/// # Controller Math Helpers Module
///
/// Conversions between token amounts and base-currency values, and the health
/// factor formula every risk check relies on.
///
/// ## Precision Standards
/// - **RAY**: 10^27 precision for health factors
/// - **WAD**: 10^18 precision for base-currency values and prices
/// - **Asset decimals**: token amounts
/// - **Rounding**: half-up for valuations, floor where a conversion hands
///   collateral out of the protocol
pub trait MathsModule: common_math::SharedMathModule {
    /// Base-currency value of a token amount.
    ///
    /// **Mathematical Formula**:
    /// ```text
    /// value = amount * price
    /// ```
    /// Computed at WAD precision with half-up rounding.
    ///
    /// # Arguments
    /// - `amount`: Token amount in its native decimal precision
    /// - `price`: Unit price of the token (WAD)
    ///
    /// # Returns
    /// - Value in WAD precision
    fn get_token_value(
        &self,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        price: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.mul_half_up(amount, price, WAD_PRECISION)
    }

    /// Token amount worth `value` at `price`, rounded half-up to `decimals`.
    fn convert_value_to_tokens(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        price: &ManagedDecimal<Self::Api, NumDecimals>,
        decimals: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.rescale_half_up(&self.div_half_up(value, price, RAY_PRECISION), decimals)
    }

    /// Token amount worth `value` at `price`, rounded down to `decimals`.
    ///
    /// Used when sizing collateral handed to a liquidator, so rounding never
    /// gives away more than the repaid debt justifies.
    fn convert_value_to_tokens_floor(
        &self,
        value: &ManagedDecimal<Self::Api, NumDecimals>,
        price: &ManagedDecimal<Self::Api, NumDecimals>,
        decimals: NumDecimals,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_floor(value, price, RAY_PRECISION).rescale(decimals)
    }

    /// Computes the health factor of a position.
    ///
    /// **Mathematical Formula**:
    /// ```text
    /// health_factor = liquidation_weighted_collateral / total_debt
    /// ```
    /// where the numerator is `Σ collateral_value * liquidation_threshold`.
    ///
    /// **Special Case**: a position without debt reports the maximum health factor.
    ///
    /// # Arguments
    /// - `weighted_collateral`: Liquidation-threshold weighted collateral (WAD)
    /// - `total_debt`: Debt value (WAD)
    ///
    /// # Returns
    /// - Health factor in RAY precision, `1 RAY` being the liquidation boundary
    fn compute_health_factor(
        &self,
        weighted_collateral: &ManagedDecimal<Self::Api, NumDecimals>,
        total_debt: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if *total_debt == self.wad_zero() {
            return self.max_health_factor();
        }

        self.div_half_up(weighted_collateral, total_debt, RAY_PRECISION)
    }
}
