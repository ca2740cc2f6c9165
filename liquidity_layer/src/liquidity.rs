use common_constants::RAY_PRECISION;
use common_errors::LendingError;
use common_structs::{ReserveData, StableDebtPosition};
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

/// Scaled-balance bookkeeping of a single reserve.
///
/// Supply and variable-debt balances are stored as `amount / index` in RAY.
/// Rounding always favors the reserve: supply mints and debt burns round down,
/// supply burns and debt mints round up. Stable debt is tracked as principal
/// compounding at a locked-in rate from its last update.
pub trait LiquidityModule: common_math::SharedMathModule + common_rates::InterestRates {
    /// Scaled supply units credited for depositing `amount`.
    fn scaled_supply_mint(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_floor(amount, &reserve.liquidity_index, RAY_PRECISION)
    }

    /// Scaled supply units debited for withdrawing `amount`.
    fn scaled_supply_burn(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_ceil(amount, &reserve.liquidity_index, RAY_PRECISION)
    }

    /// Scaled variable debt created by borrowing `amount`.
    fn scaled_debt_mint(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_ceil(amount, &reserve.variable_borrow_index, RAY_PRECISION)
    }

    /// Scaled variable debt cancelled by repaying `amount`.
    fn scaled_debt_burn(
        &self,
        reserve: &ReserveData<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.div_floor(amount, &reserve.variable_borrow_index, RAY_PRECISION)
    }

    fn supply_balance(
        &self,
        reserve: &ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.scaled_to_original(scaled_amount, &reserve.liquidity_index, reserve.decimals())
    }

    fn variable_debt_balance(
        &self,
        reserve: &ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.scaled_to_original(
            scaled_amount,
            &reserve.variable_borrow_index,
            reserve.decimals(),
        )
    }

    /// Principal plus interest compounded at the position's rate since its last update.
    fn stable_debt_balance(
        &self,
        reserve: &ReserveData<Self::Api>,
        position: &StableDebtPosition<Self::Api>,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let factor = self.calculate_compounded_interest(
            &position.rate,
            now.saturating_sub(position.last_update),
        );
        let balance = self.mul_half_up(&position.principal, &factor, RAY_PRECISION);
        self.rescale_half_up(&balance, reserve.decimals())
    }

    /// Reserve-wide stable debt, compounded at the average stable rate.
    fn total_stable_debt(
        &self,
        reserve: &ReserveData<Self::Api>,
        now: u64,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        let factor = self.calculate_compounded_interest(
            &reserve.average_stable_rate,
            now.saturating_sub(reserve.stable_debt_last_update_timestamp),
        );
        let total = self.mul_half_up(
            &reserve.total_principal_stable_debt,
            &factor,
            RAY_PRECISION,
        );
        self.rescale_half_up(&total, reserve.decimals())
    }

    fn total_variable_debt(
        &self,
        reserve: &ReserveData<Self::Api>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.variable_debt_balance(reserve, &reserve.total_scaled_variable_debt)
    }

    /// Supplier claims including the treasury's not yet minted share.
    fn total_supply(&self, reserve: &ReserveData<Self::Api>) -> ManagedDecimal<Self::Api, NumDecimals> {
        let scaled =
            reserve.scaled_supply_total.clone() + reserve.accrued_to_treasury_scaled.clone();
        self.supply_balance(reserve, &scaled)
    }

    /// Books a deposit: scaled supply grows by `scaled_amount`, liquidity by `amount`.
    fn add_supply(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        reserve.scaled_supply_total += scaled_amount;
        reserve.available_liquidity += amount;
    }

    /// Books a withdrawal of `amount` underlying backed by `scaled_amount` supply units.
    fn remove_supply(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if reserve.available_liquidity < *amount {
            return Err(LendingError::InsufficientLiquidity);
        }
        if reserve.scaled_supply_total < *scaled_amount {
            return Err(LendingError::NotEnoughAvailableUserBalance);
        }

        reserve.scaled_supply_total =
            reserve.scaled_supply_total.clone() - scaled_amount.clone();
        reserve.available_liquidity = reserve.available_liquidity.clone() - amount.clone();
        Ok(())
    }

    /// Books a variable borrow, taking `amount` out of the available liquidity.
    fn add_variable_debt(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> Result<(), LendingError> {
        if reserve.available_liquidity < *amount {
            return Err(LendingError::InsufficientLiquidity);
        }

        reserve.total_scaled_variable_debt += scaled_amount;
        reserve.available_liquidity = reserve.available_liquidity.clone() - amount.clone();
        Ok(())
    }

    /// Books a variable repayment of `amount`, cancelling `scaled_amount` debt units.
    fn remove_variable_debt(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        scaled_amount: &ManagedDecimal<Self::Api, NumDecimals>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        reserve.total_scaled_variable_debt =
            self.saturating_sub(&reserve.total_scaled_variable_debt, scaled_amount);
        reserve.available_liquidity += amount;
    }

    /// Adds `amount` of stable debt to `position` at `rate`.
    ///
    /// The account's rate becomes the balance-weighted average of its previous rate
    /// and `rate`; the reserve's average stable rate is rebalanced the same way
    /// against the compounded reserve total. Accrued interest is folded into the
    /// principal and both clocks restart at `now`.
    fn mint_stable_debt(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        position: Option<&StableDebtPosition<Self::Api>>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        rate: &ManagedDecimal<Self::Api, NumDecimals>,
        now: u64,
    ) -> Result<StableDebtPosition<Self::Api>, LendingError> {
        if reserve.available_liquidity < *amount {
            return Err(LendingError::InsufficientLiquidity);
        }

        let (current_balance, current_rate) = match position {
            Some(position) => (
                self.stable_debt_balance(reserve, position, now),
                position.rate.clone(),
            ),
            None => (self.zero_at(reserve.decimals()), self.ray_zero()),
        };

        let next_balance = current_balance.clone() + amount.clone();
        let weighted_rate = self.mul_half_up(&current_rate, &current_balance, RAY_PRECISION)
            + self.mul_half_up(rate, amount, RAY_PRECISION);
        let account_rate = self.div_half_up(&weighted_rate, &next_balance, RAY_PRECISION);

        let previous_total = self.total_stable_debt(reserve, now);
        let next_total = previous_total.clone() + amount.clone();
        let weighted_average = self.mul_half_up(
            &reserve.average_stable_rate,
            &previous_total,
            RAY_PRECISION,
        ) + self.mul_half_up(rate, amount, RAY_PRECISION);

        reserve.average_stable_rate =
            self.div_half_up(&weighted_average, &next_total, RAY_PRECISION);
        reserve.total_principal_stable_debt = next_total;
        reserve.stable_debt_last_update_timestamp = now;
        reserve.available_liquidity = reserve.available_liquidity.clone() - amount.clone();

        Ok(StableDebtPosition {
            principal: next_balance,
            rate: account_rate,
            last_update: now,
        })
    }

    /// Repays up to `amount` of a stable position.
    ///
    /// Returns the repaid amount and the remaining position, `None` once the
    /// position is fully closed. When the rebalanced reserve average would turn
    /// negative the reserve total and average are reset to zero.
    fn burn_stable_debt(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        position: &StableDebtPosition<Self::Api>,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        now: u64,
    ) -> (
        ManagedDecimal<Self::Api, NumDecimals>,
        Option<StableDebtPosition<Self::Api>>,
    ) {
        let current_balance = self.stable_debt_balance(reserve, position, now);
        let repaid = self.get_min(amount.clone(), current_balance.clone());

        let previous_total = self.total_stable_debt(reserve, now);
        if previous_total <= repaid {
            reserve.total_principal_stable_debt = self.zero_at(reserve.decimals());
            reserve.average_stable_rate = self.ray_zero();
        } else {
            let next_total = previous_total.clone() - repaid.clone();
            let first_term = self.mul_half_up(
                &reserve.average_stable_rate,
                &previous_total,
                RAY_PRECISION,
            );
            let second_term = self.mul_half_up(&position.rate, &repaid, RAY_PRECISION);

            if second_term >= first_term {
                reserve.total_principal_stable_debt = self.zero_at(reserve.decimals());
                reserve.average_stable_rate = self.ray_zero();
            } else {
                reserve.average_stable_rate =
                    self.div_half_up(&(first_term - second_term), &next_total, RAY_PRECISION);
                reserve.total_principal_stable_debt = next_total;
            }
        }
        reserve.stable_debt_last_update_timestamp = now;
        reserve.available_liquidity += &repaid;

        let remaining = if repaid == current_balance {
            None
        } else {
            Some(StableDebtPosition {
                principal: current_balance - repaid.clone(),
                rate: position.rate.clone(),
                last_update: now,
            })
        };

        (repaid, remaining)
    }

    /// `amount * premium_bps`, rounded half-up in asset decimals.
    fn flash_loan_premium(
        &self,
        amount: &ManagedDecimal<Self::Api, NumDecimals>,
        premium_bps: &ManagedDecimal<Self::Api, NumDecimals>,
    ) -> ManagedDecimal<Self::Api, NumDecimals> {
        self.percent_mul(amount, premium_bps)
    }

    /// Credits a flash-loan premium to the treasury and to the reserve's liquidity.
    fn accrue_premium_to_treasury(
        &self,
        reserve: &mut ReserveData<Self::Api>,
        premium: &ManagedDecimal<Self::Api, NumDecimals>,
    ) {
        let scaled_premium = self.scaled_supply_mint(reserve, premium);
        reserve.accrued_to_treasury_scaled += &scaled_premium;
        reserve.available_liquidity += premium;
    }

    /// Turns the accrued treasury share into scaled supply.
    ///
    /// Returns the minted scaled units and their current value, or `None` when
    /// nothing has accrued.
    fn mint_to_treasury(
        &self,
        reserve: &mut ReserveData<Self::Api>,
    ) -> Option<(
        ManagedDecimal<Self::Api, NumDecimals>,
        ManagedDecimal<Self::Api, NumDecimals>,
    )> {
        if reserve.accrued_to_treasury_scaled == self.ray_zero() {
            return None;
        }

        let scaled = core::mem::replace(&mut reserve.accrued_to_treasury_scaled, self.ray_zero());
        let amount = self.supply_balance(reserve, &scaled);
        reserve.scaled_supply_total += &scaled;

        Some((scaled, amount))
    }
}
