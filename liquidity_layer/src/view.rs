use common_structs::ReserveData;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::liquidity::LiquidityModule;

/// Read-only figures of a reserve projected to a timestamp without mutating it.
pub trait ViewModule: LiquidityModule {
    /// Liquidity index the reserve would have at `now`.
    fn normalized_income(
        &self,
        reserve: &ReserveData<Self::Api>,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if now <= reserve.last_update_timestamp {
            return reserve.liquidity_index.clone();
        }

        let cumulated = self.calculate_linear_interest(
            &reserve.current_liquidity_rate,
            now - reserve.last_update_timestamp,
        );
        self.ray_mul(&cumulated, &reserve.liquidity_index)
    }

    /// Variable borrow index the reserve would have at `now`.
    fn normalized_debt(
        &self,
        reserve: &ReserveData<Self::Api>,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        if now <= reserve.last_update_timestamp {
            return reserve.variable_borrow_index.clone();
        }

        let cumulated = self.calculate_compounded_interest(
            &reserve.current_variable_borrow_rate,
            now - reserve.last_update_timestamp,
        );
        self.ray_mul(&cumulated, &reserve.variable_borrow_index)
    }

    /// Share of the reserve's funds currently lent out, RAY.
    fn utilization(
        &self,
        reserve: &ReserveData<Self::Api>,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let total_debt =
            self.total_variable_debt(reserve) + self.total_stable_debt(reserve, now);
        self.get_utilization(&total_debt, &reserve.available_liquidity)
    }
}
