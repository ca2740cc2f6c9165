use std::collections::BTreeMap;

use common_constants::{
    DEFAULT_FLASH_LOAN_PREMIUM_BPS, DEFAULT_LIQUIDATION_CLOSE_FACTOR_BPS, MAX_STABLE_RATE_BORROW_SIZE_BPS,
};
use common_structs::{AccountId, AssetId, EModeCategory, ReserveData, UserAccount};
use liquidity_layer::LiquidityPool;
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::contract_base::ContractBase;

use crate::oracle::{OracleSentinel, PriceOracle};

/// Every reserve, account and e-mode category the engine knows about.
#[derive(Clone)]
pub struct ProtocolState<M: ManagedTypeApi> {
    pub reserves: BTreeMap<AssetId, ReserveData<M>>,
    /// Listing order, used by the reserves list view.
    pub reserves_list: Vec<AssetId>,
    pub accounts: BTreeMap<AccountId, UserAccount<M>>,
    pub e_mode_categories: BTreeMap<u8, EModeCategory<M>>,
}

impl<M: ManagedTypeApi> Default for ProtocolState<M> {
    fn default() -> Self {
        ProtocolState {
            reserves: BTreeMap::new(),
            reserves_list: Vec::new(),
            accounts: BTreeMap::new(),
            e_mode_categories: BTreeMap::new(),
        }
    }
}

/// Protocol-wide knobs. Percentages are plain basis points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Receives liquidation fees, flash-loan premiums and the reserve factor share.
    pub treasury: AccountId,
    pub flash_loan_premium_bps: u64,
    pub max_stable_rate_borrow_size_bps: u64,
    /// Share of a debt position that can be closed while the health factor is
    /// above the close-factor threshold.
    pub liquidation_close_factor_bps: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            treasury: AccountId(0),
            flash_loan_premium_bps: DEFAULT_FLASH_LOAN_PREMIUM_BPS as u64,
            max_stable_rate_borrow_size_bps: MAX_STABLE_RATE_BORROW_SIZE_BPS as u64,
            liquidation_close_factor_bps: DEFAULT_LIQUIDATION_CLOSE_FACTOR_BPS as u64,
        }
    }
}

/// Read access to the committed state and the collaborators around it.
pub trait Storage: ContractBase + Sized {
    fn protocol_state(&self) -> &ProtocolState<Self::Api>;

    fn controller_config(&self) -> &ControllerConfig;

    /// Current block timestamp, in seconds.
    fn block_timestamp(&self) -> u64;

    fn liquidity_pool(&self) -> &LiquidityPool<Self::Api>;

    fn price_feed(&self) -> &dyn PriceOracle<Self::Api>;

    fn sentinel(&self) -> &dyn OracleSentinel;
}
