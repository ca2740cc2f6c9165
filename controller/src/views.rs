use common_errors::LendingError;
use common_structs::{AccountId, AssetId, EModeCategory, ReserveData};
use liquidity_layer::{LiquidityModule, ViewModule};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

use crate::{cache::Cache, utils::UserAccountData, validation};

/// Position of one account in one reserve, at the current timestamp.
#[derive(Clone)]
pub struct UserReserveData<M: ManagedTypeApi> {
    pub current_a_token_balance: ManagedDecimal<M, NumDecimals>,
    pub current_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub current_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub principal_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub scaled_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub liquidity_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_rate_last_updated: u64,
    pub usage_as_collateral_enabled: bool,
}

/// Read-only queries.
///
/// Every view runs on a throw-away cache: reserves are accrued to the current
/// timestamp in that copy only, so results include pending interest while the
/// committed state is left untouched.
pub trait ViewsModule: validation::ValidationModule {
    fn get_user_account_data(
        &self,
        user: AccountId,
    ) -> Result<UserAccountData<Self::Api>, LendingError> {
        let mut cache = Cache::new(self);
        let account = cache.get_cached_account(user);
        self.calculate_user_account_data(&mut cache, &account)
    }

    fn health_factor(
        &self,
        user: AccountId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        Ok(self.get_user_account_data(user)?.health_factor)
    }

    fn get_user_reserve_data(
        &self,
        asset: &AssetId,
        user: AccountId,
    ) -> Result<UserReserveData<Self::Api>, LendingError> {
        let mut cache = Cache::new(self);
        let now = cache.timestamp;
        let account = cache.get_cached_account(user);
        let reserve = cache.get_cached_reserve(asset)?;

        let (current_variable_debt, current_stable_debt) =
            self.get_debt_balances(reserve, &account, now);
        let stable = account.stable_debts.get(asset);

        Ok(UserReserveData {
            current_a_token_balance: self.get_supply_balance(reserve, &account),
            current_stable_debt,
            current_variable_debt,
            principal_stable_debt: stable
                .map(|position| position.principal.clone())
                .unwrap_or_else(|| self.zero_at(reserve.decimals())),
            scaled_variable_debt: account
                .scaled_variable_debts
                .get(asset)
                .cloned()
                .unwrap_or_else(|| self.ray_zero()),
            stable_borrow_rate: stable
                .map(|position| position.rate.clone())
                .unwrap_or_else(|| self.ray_zero()),
            liquidity_rate: reserve.current_liquidity_rate.clone(),
            stable_rate_last_updated: stable.map(|position| position.last_update).unwrap_or(0),
            usage_as_collateral_enabled: account.is_using_as_collateral(asset),
        })
    }

    /// Reserve accrued to the current timestamp.
    fn get_reserve_data(&self, asset: &AssetId) -> Result<ReserveData<Self::Api>, LendingError> {
        let mut cache = Cache::new(self);
        Ok(cache.get_cached_reserve(asset)?.clone())
    }

    /// Value of one scaled supply unit at the current timestamp, RAY.
    fn get_reserve_normalized_income(
        &self,
        asset: &AssetId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let reserve = self.committed_reserve(asset)?;
        Ok(self
            .liquidity_pool()
            .normalized_income(reserve, self.block_timestamp()))
    }

    /// Value of one scaled variable debt unit at the current timestamp, RAY.
    fn get_reserve_normalized_debt(
        &self,
        asset: &AssetId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let reserve = self.committed_reserve(asset)?;
        Ok(self
            .liquidity_pool()
            .normalized_debt(reserve, self.block_timestamp()))
    }

    fn get_reserve_utilization(
        &self,
        asset: &AssetId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let reserve = self.get_reserve_data(asset)?;
        Ok(self
            .liquidity_pool()
            .utilization(&reserve, self.block_timestamp()))
    }

    /// Total supply of a reserve, pending interest included.
    fn get_reserve_total_supply(
        &self,
        asset: &AssetId,
    ) -> Result<ManagedDecimal<Self::Api, NumDecimals>, LendingError> {
        let reserve = self.get_reserve_data(asset)?;
        Ok(self.liquidity_pool().total_supply(&reserve))
    }

    fn get_reserves_list(&self) -> Vec<AssetId> {
        self.protocol_state().reserves_list.clone()
    }

    fn get_e_mode_category(&self, category_id: u8) -> Option<EModeCategory<Self::Api>> {
        self.protocol_state()
            .e_mode_categories
            .get(&category_id)
            .cloned()
    }

    fn get_user_e_mode(&self, user: AccountId) -> u8 {
        self.protocol_state()
            .accounts
            .get(&user)
            .map(|account| account.e_mode_category())
            .unwrap_or(0)
    }

    fn committed_reserve(&self, asset: &AssetId) -> Result<&ReserveData<Self::Api>, LendingError> {
        self.protocol_state()
            .reserves
            .get(asset)
            .ok_or(LendingError::AssetNotListed)
    }
}
