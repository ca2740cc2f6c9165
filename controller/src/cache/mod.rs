use std::collections::BTreeMap;

use common_errors::LendingError;
use common_events::Event;
use common_structs::{AccountId, AssetId, EModeCategory, ReserveData, UserAccount};
use liquidity_layer::{LedgerInstruction, UtilsModule};
use multiversx_sc::api::ManagedTypeApi;

use crate::storage::Storage;

/// Staged copy of everything an operation touches.
///
/// Reserves and accounts are pulled from the committed state on first access;
/// reserves are accrued to the cache timestamp at that moment, so every read
/// during the operation sees post-accrual values. Nothing reaches the committed
/// state until the staged result is handed back to the controller.
pub struct Cache<'a, C>
where
    C: Storage,
{
    sc_ref: &'a C,

    reserves: BTreeMap<AssetId, ReserveData<C::Api>>,
    accounts: BTreeMap<AccountId, UserAccount<C::Api>>,
    e_mode_categories: BTreeMap<u8, EModeCategory<C::Api>>,
    listed: Vec<AssetId>,
    events: Vec<Event<C::Api>>,
    batch: Vec<LedgerInstruction<C::Api>>,
    pub timestamp: u64,
}

/// Owned result of an operation, ready to be committed.
pub struct Staged<M: ManagedTypeApi> {
    pub reserves: BTreeMap<AssetId, ReserveData<M>>,
    pub accounts: BTreeMap<AccountId, UserAccount<M>>,
    pub e_mode_categories: BTreeMap<u8, EModeCategory<M>>,
    pub listed: Vec<AssetId>,
    pub events: Vec<Event<M>>,
    pub batch: Vec<LedgerInstruction<M>>,
}

impl<'a, C> Cache<'a, C>
where
    C: Storage,
{
    pub fn new(sc_ref: &'a C) -> Self {
        Cache {
            sc_ref,
            reserves: BTreeMap::new(),
            accounts: BTreeMap::new(),
            e_mode_categories: BTreeMap::new(),
            listed: Vec::new(),
            events: Vec::new(),
            batch: Vec::new(),
            timestamp: sc_ref.block_timestamp(),
        }
    }

    fn load_reserve(&mut self, asset: &AssetId) -> Result<(), LendingError> {
        if self.reserves.contains_key(asset) {
            return Ok(());
        }

        let mut reserve = self
            .sc_ref
            .protocol_state()
            .reserves
            .get(asset)
            .cloned()
            .ok_or(LendingError::AssetNotListed)?;
        self.sc_ref
            .liquidity_pool()
            .accrue(&mut reserve, self.timestamp)?;
        self.reserves.insert(asset.clone(), reserve);
        Ok(())
    }

    /// Reserve of `asset`, accrued to the cache timestamp.
    pub fn get_cached_reserve(
        &mut self,
        asset: &AssetId,
    ) -> Result<&ReserveData<C::Api>, LendingError> {
        self.load_reserve(asset)?;
        self.reserves.get(asset).ok_or(LendingError::AssetNotListed)
    }

    pub fn get_cached_reserve_mut(
        &mut self,
        asset: &AssetId,
    ) -> Result<&mut ReserveData<C::Api>, LendingError> {
        self.load_reserve(asset)?;
        self.reserves
            .get_mut(asset)
            .ok_or(LendingError::AssetNotListed)
    }

    pub fn is_listed(&self, asset: &AssetId) -> bool {
        self.reserves.contains_key(asset) || self.sc_ref.protocol_state().reserves.contains_key(asset)
    }

    /// Stages a newly listed reserve.
    pub fn list_reserve(&mut self, reserve: ReserveData<C::Api>) {
        self.listed.push(reserve.asset.clone());
        self.reserves.insert(reserve.asset.clone(), reserve);
    }

    /// Every listed asset, including the ones listed by this operation.
    pub fn reserves_list(&self) -> Vec<AssetId> {
        let mut list = self.sc_ref.protocol_state().reserves_list.clone();
        list.extend(self.listed.iter().cloned());
        list
    }

    /// Snapshot of an account; unknown accounts are empty.
    pub fn get_cached_account(&mut self, account: AccountId) -> UserAccount<C::Api> {
        self.get_cached_account_mut(account).clone()
    }

    pub fn get_cached_account_mut(&mut self, account: AccountId) -> &mut UserAccount<C::Api> {
        let sc_ref = self.sc_ref;
        let state = sc_ref.protocol_state();
        self.accounts
            .entry(account)
            .or_insert_with(|| state.accounts.get(&account).cloned().unwrap_or_default())
    }

    pub fn get_e_mode_category(&self, id: u8) -> Option<EModeCategory<C::Api>> {
        self.e_mode_categories
            .get(&id)
            .or_else(|| self.sc_ref.protocol_state().e_mode_categories.get(&id))
            .cloned()
    }

    pub fn set_e_mode_category(&mut self, category: EModeCategory<C::Api>) {
        self.e_mode_categories.insert(category.id, category);
    }

    pub fn push_event(&mut self, event: Event<C::Api>) {
        self.events.push(event);
    }

    pub fn push_instruction(&mut self, instruction: LedgerInstruction<C::Api>) {
        self.batch.push(instruction);
    }

    pub fn events(&self) -> &[Event<C::Api>] {
        &self.events
    }

    pub fn into_staged(self) -> Staged<C::Api> {
        Staged {
            reserves: self.reserves,
            accounts: self.accounts,
            e_mode_categories: self.e_mode_categories,
            listed: self.listed,
            events: self.events,
            batch: self.batch,
        }
    }
}
