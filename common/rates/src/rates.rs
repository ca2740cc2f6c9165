#![no_std]
use common_constants::{RAY_PRECISION, SECONDS_PER_YEAR};
use common_structs::{InterestRateStrategy, ReserveRates};

multiversx_sc::imports!();

/// Rate curve and interest accrual math.
///
/// Rates are annual RAY decimals; elapsed time is in seconds.
#[multiversx_sc::module]
pub trait InterestRates: common_math::SharedMathModule {
    /// Computes liquidity, stable and variable rates for a reserve.
    ///
    /// **Formula**:
    /// - `usage = total_debt / (available_liquidity + total_debt)`, zero without debt.
    /// - `usage <= optimal`: `variable = base + slope1 * usage / optimal`.
    /// - `usage > optimal`: `variable = base + slope1 + slope2 * (usage - optimal) / (1 - optimal)`.
    /// - The stable rate follows the same two segments starting from
    ///   `variable_slope1 + base_stable_rate_offset`, plus
    ///   `stable_rate_excess_offset * (stable_ratio - optimal_stable) / (1 - optimal_stable)`
    ///   when the stable share of the debt exceeds its target.
    /// - `liquidity = overall_borrow_rate * usage * (1 - reserve_factor)`.
    ///
    /// Amount arguments share the reserve's decimals; `reserve_factor` is BPS.
    fn calculate_interest_rates(
        &self,
        strategy: &InterestRateStrategy<Self::Api>,
        available_liquidity: &ManagedDecimal<Self::Api, NumDecimals>,
        total_stable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        total_variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        average_stable_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        reserve_factor: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ReserveRates<Self::Api> {
        let ray = self.ray();
        let total_debt = total_stable_debt.clone() + total_variable_debt.clone();

        let mut variable_rate = strategy.base_variable_borrow_rate.rescale(RAY_PRECISION);
        let mut stable_rate = self.base_stable_borrow_rate(strategy);

        if total_debt == self.zero_at(total_debt.scale()) {
            return ReserveRates {
                liquidity_rate: self.ray_zero(),
                stable_borrow_rate: stable_rate,
                variable_borrow_rate: variable_rate,
            };
        }

        let stable_to_total_debt_ratio =
            self.div_half_up(total_stable_debt, &total_debt, RAY_PRECISION);
        let liquidity_plus_debt = available_liquidity.clone() + total_debt.clone();
        let borrow_usage_ratio = self.div_half_up(&total_debt, &liquidity_plus_debt, RAY_PRECISION);

        let optimal_usage_ratio = strategy.optimal_usage_ratio.rescale(RAY_PRECISION);
        if borrow_usage_ratio > optimal_usage_ratio {
            let max_excess_usage_ratio = ray.clone() - optimal_usage_ratio.clone();
            let excess_usage_ratio = self.div_half_up(
                &(borrow_usage_ratio.clone() - optimal_usage_ratio),
                &max_excess_usage_ratio,
                RAY_PRECISION,
            );

            variable_rate += &strategy.variable_rate_slope1.rescale(RAY_PRECISION);
            variable_rate += &self.ray_mul(&strategy.variable_rate_slope2, &excess_usage_ratio);

            stable_rate += &strategy.stable_rate_slope1.rescale(RAY_PRECISION);
            stable_rate += &self.ray_mul(&strategy.stable_rate_slope2, &excess_usage_ratio);
        } else {
            variable_rate += &self.div_half_up(
                &self.ray_mul(&strategy.variable_rate_slope1, &borrow_usage_ratio),
                &optimal_usage_ratio,
                RAY_PRECISION,
            );
            stable_rate += &self.div_half_up(
                &self.ray_mul(&strategy.stable_rate_slope1, &borrow_usage_ratio),
                &optimal_usage_ratio,
                RAY_PRECISION,
            );
        }

        let optimal_stable_ratio = strategy
            .optimal_stable_to_total_debt_ratio
            .rescale(RAY_PRECISION);
        if stable_to_total_debt_ratio > optimal_stable_ratio {
            let max_excess_stable_ratio = ray - optimal_stable_ratio.clone();
            let excess_stable_ratio = self.div_half_up(
                &(stable_to_total_debt_ratio - optimal_stable_ratio),
                &max_excess_stable_ratio,
                RAY_PRECISION,
            );
            stable_rate += &self.ray_mul(&strategy.stable_rate_excess_offset, &excess_stable_ratio);
        }

        let overall_borrow_rate = self.overall_borrow_rate(
            total_stable_debt,
            total_variable_debt,
            &variable_rate,
            average_stable_rate,
        );
        let supplier_share = self.bps() - reserve_factor.rescale(common_constants::BPS_PRECISION);
        let liquidity_rate = self.percent_mul(
            &self.ray_mul(&overall_borrow_rate, &borrow_usage_ratio),
            &supplier_share,
        );

        ReserveRates {
            liquidity_rate,
            stable_borrow_rate: stable_rate,
            variable_borrow_rate: variable_rate,
        }
    }

    /// Stable rate at zero usage: `variable_slope1 + base_stable_rate_offset`.
    fn base_stable_borrow_rate(
        &self,
        strategy: &InterestRateStrategy<Self::Api>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        strategy.variable_rate_slope1.rescale(RAY_PRECISION)
            + strategy.base_stable_rate_offset.rescale(RAY_PRECISION)
    }

    /// Debt-weighted average of the variable rate and the average stable rate.
    fn overall_borrow_rate(
        &self,
        total_stable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        total_variable_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        variable_rate: &ManagedDecimal<Self::Api, NumDecimals>,
        average_stable_rate: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let total_debt = total_stable_debt.clone() + total_variable_debt.clone();
        if total_debt == self.zero_at(total_debt.scale()) {
            return self.ray_zero();
        }

        let weighted_variable = self.mul_half_up(total_variable_debt, variable_rate, RAY_PRECISION);
        let weighted_stable =
            self.mul_half_up(total_stable_debt, average_stable_rate, RAY_PRECISION);

        self.div_half_up(
            &(weighted_variable + weighted_stable),
            &total_debt,
            RAY_PRECISION,
        )
    }

    /// Calculates the interest accumulation factor using a linear interest rate formula.
    ///
    /// **Formula**:
    /// - `Interest Factor = 1 + rate * time_passed / SECONDS_PER_YEAR`
    fn calculate_linear_interest(
        &self,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        time_passed: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if time_passed == 0 {
            return self.ray();
        }

        let rate_times_elapsed = self.mul_half_up(
            rate,
            &self.to_decimal(BigUint::from(time_passed), 0),
            RAY_PRECISION,
        );
        let factor = self.div_half_up(
            &rate_times_elapsed,
            &self.to_decimal(BigUint::from(SECONDS_PER_YEAR), 0),
            RAY_PRECISION,
        );

        self.ray() + factor
    }

    /// Approximates `(1 + rate / SECONDS_PER_YEAR) ^ exp` with the binomial
    /// expansion truncated after the cubic term:
    ///
    /// `1 + x*n + n(n-1)/2 * x^2 + n(n-1)(n-2)/6 * x^3`, `x = rate / SECONDS_PER_YEAR`.
    ///
    /// The truncation slightly under-estimates true compounding; the gap grows
    /// with `rate * exp` and stays below 0.2% for five years at 10%.
    fn calculate_compounded_interest(
        &self,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        exp: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let ray = self.ray();

        if exp == 0 {
            return ray;
        }

        // The cube of a large gap overflows u128.
        let elapsed = BigUint::from(exp);
        let exp_minus_one = BigUint::from(exp - 1);
        let exp_minus_two = BigUint::from(exp.saturating_sub(2));
        let elapsed_pair = &elapsed * &exp_minus_one;
        let elapsed_triple = &elapsed_pair * &exp_minus_two;

        let seconds_per_year = self.to_decimal(BigUint::from(SECONDS_PER_YEAR), 0);
        let seconds_per_year_sq = self.to_decimal(
            BigUint::from(SECONDS_PER_YEAR as u128 * SECONDS_PER_YEAR as u128),
            0,
        );

        let base_power_two =
            self.div_half_up(&self.ray_mul(rate, rate), &seconds_per_year_sq, RAY_PRECISION);
        let base_power_three = self.div_half_up(
            &self.ray_mul(&base_power_two, rate),
            &seconds_per_year,
            RAY_PRECISION,
        );

        let first_term = self.div_half_up(
            &self.mul_half_up(
                rate,
                &self.to_decimal(elapsed, 0),
                RAY_PRECISION,
            ),
            &seconds_per_year,
            RAY_PRECISION,
        );

        let second_term = self.div_half_up(
            &self.mul_half_up(
                &base_power_two,
                &self.to_decimal(elapsed_pair, 0),
                RAY_PRECISION,
            ),
            &self.to_decimal(BigUint::from(2u64), 0),
            RAY_PRECISION,
        );

        let third_term = self.div_half_up(
            &self.mul_half_up(
                &base_power_three,
                &self.to_decimal(elapsed_triple, 0),
                RAY_PRECISION,
            ),
            &self.to_decimal(BigUint::from(6u64), 0),
            RAY_PRECISION,
        );

        ray + first_term + second_term + third_term
    }

    /// `debt / (debt + available)` in RAY, zero for an empty reserve.
    fn get_utilization(
        &self,
        total_debt: &ManagedDecimal<Self::Api, NumDecimals>,
        available_liquidity: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let total = total_debt.clone() + available_liquidity.clone();
        if total == self.zero_at(total.scale()) {
            return self.ray_zero();
        }
        self.div_half_up(total_debt, &total, RAY_PRECISION)
    }

    /// Real amount of a RAY scaled balance at `index`, rounded half-up to the asset decimals.
    fn scaled_to_original(
        &self,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        index: &ManagedDecimal<Self::Api, NumDecimals>,
        asset_decimals: usize,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let original_amount = self.mul_half_up(scaled_amount, index, RAY_PRECISION);
        self.rescale_half_up(&original_amount, asset_decimals)
    }
}
