use common_constants::RAY_PRECISION;
use common_errors::LendingError;
use common_structs::ReserveData;
use log::debug;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::liquidity::LiquidityModule;

/// Index accrual and rate refresh for a reserve.
pub trait UtilsModule: LiquidityModule {
    /// Brings a reserve's indexes up to `now`.
    ///
    /// **Process**:
    /// 1. Rejects `now` earlier than the last update; `now == last` is a no-op.
    /// 2. Grows the liquidity index by the linear interest of the current liquidity rate.
    /// 3. Grows the variable borrow index by the compounded interest of the current
    ///    variable rate, only while variable debt is outstanding.
    /// 4. Credits the reserve factor share of the new variable and stable interest to
    ///    the treasury, in scaled supply units at the new liquidity index.
    /// 5. Recomputes the rates from the post-accrual totals.
    fn accrue(&self, reserve: &mut ReserveData<Self::Api>, now: u64) -> Result<(), LendingError> {
        if now < reserve.last_update_timestamp {
            return Err(LendingError::TimestampInPast);
        }

        let delta = now - reserve.last_update_timestamp;
        if delta == 0 {
            return Ok(());
        }

        let previous_variable_index = reserve.variable_borrow_index.clone();
        let ray_zero = self.ray_zero();

        if reserve.current_liquidity_rate > ray_zero {
            let cumulated = self.calculate_linear_interest(&reserve.current_liquidity_rate, delta);
            reserve.liquidity_index = self.ray_mul(&cumulated, &reserve.liquidity_index);
        }

        if reserve.total_scaled_variable_debt > ray_zero {
            let cumulated = self
                .calculate_compounded_interest(&reserve.current_variable_borrow_rate, delta);
            reserve.variable_borrow_index =
                self.ray_mul(&cumulated, &reserve.variable_borrow_index);
        }

        self.accrue_to_treasury(reserve, &previous_variable_index, now);
        reserve.last_update_timestamp = now;

        debug!(
            "accrued {} over {}s: liquidity index {:?}, variable index {:?}",
            reserve.asset,
            delta,
            reserve.liquidity_index.into_raw_units(),
            reserve.variable_borrow_index.into_raw_units()
        );

        self.update_interest_rates(reserve, now);
        Ok(())
    }

    /// Treasury share of the debt interest accrued since the last update.
    fn accrue_to_treasury(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        previous_variable_index: &ManagedDecimal<Self::Api, NumDecimals>,
        now: u64,
    ) {
        let previous_variable =
            self.ray_mul(&reserve.total_scaled_variable_debt, previous_variable_index);
        let current_variable = self.ray_mul(
            &reserve.total_scaled_variable_debt,
            &reserve.variable_borrow_index,
        );

        let stable_start = reserve.stable_debt_last_update_timestamp;
        let previous_stable_factor = self.calculate_compounded_interest(
            &reserve.average_stable_rate,
            reserve.last_update_timestamp.saturating_sub(stable_start),
        );
        let current_stable_factor = self.calculate_compounded_interest(
            &reserve.average_stable_rate,
            now.saturating_sub(stable_start),
        );
        let previous_stable = self.mul_half_up(
            &reserve.total_principal_stable_debt,
            &previous_stable_factor,
            RAY_PRECISION,
        );
        let current_stable = self.mul_half_up(
            &reserve.total_principal_stable_debt,
            &current_stable_factor,
            RAY_PRECISION,
        );

        let accrued_interest = self.saturating_sub(
            &(current_variable + current_stable),
            &(previous_variable + previous_stable),
        );
        let treasury_share = self.percent_mul(&accrued_interest, &reserve.config.reserve_factor);

        if treasury_share > self.ray_zero() {
            let scaled_share =
                self.div_floor(&treasury_share, &reserve.liquidity_index, RAY_PRECISION);
            reserve.accrued_to_treasury_scaled += &scaled_share;
        }
    }

    /// Refreshes the three current rates from the reserve's totals at `now`.
    fn update_interest_rates(&self, reserve: &mut ReserveData<Self::Api>, now: u64) {
        let total_variable_debt = self.total_variable_debt(reserve);
        let total_stable_debt = self.total_stable_debt(reserve, now);

        let rates = self.calculate_interest_rates(
            &reserve.strategy,
            &reserve.available_liquidity,
            &total_stable_debt,
            &total_variable_debt,
            &reserve.average_stable_rate,
            &reserve.config.reserve_factor,
        );

        debug!(
            "rates of {}: liquidity {:?}, stable {:?}, variable {:?}",
            reserve.asset,
            rates.liquidity_rate.into_raw_units(),
            rates.stable_borrow_rate.into_raw_units(),
            rates.variable_borrow_rate.into_raw_units()
        );

        reserve.current_liquidity_rate = rates.liquidity_rate;
        reserve.current_stable_borrow_rate = rates.stable_borrow_rate;
        reserve.current_variable_borrow_rate = rates.variable_borrow_rate;
    }
}
