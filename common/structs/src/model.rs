use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use common_constants::{NO_E_MODE_CATEGORY, RAY, RAY_PRECISION, WAD_PRECISION};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

/// Stable identifier of a listed asset (its ticker).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(ticker: impl Into<String>) -> Self {
        AssetId(ticker.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(ticker: &str) -> Self {
        AssetId::new(ticker)
    }
}

/// Stable identifier of an account (position nonce).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Accounting-token implementation chosen when a reserve is listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Generic,
    /// Pooled underlying voting power can be delegated to a single account.
    DelegationAware,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterestRateMode {
    Variable,
    Stable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenSide {
    Supply,
    VariableDebt,
    StableDebt,
}

/// One of the three accounting tokens every reserve owns on the external ledger.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountingToken {
    pub asset: AssetId,
    pub side: TokenSide,
}

impl AccountingToken {
    pub fn supply(asset: &AssetId) -> Self {
        AccountingToken {
            asset: asset.clone(),
            side: TokenSide::Supply,
        }
    }

    pub fn variable_debt(asset: &AssetId) -> Self {
        AccountingToken {
            asset: asset.clone(),
            side: TokenSide::VariableDebt,
        }
    }

    pub fn stable_debt(asset: &AssetId) -> Self {
        AccountingToken {
            asset: asset.clone(),
            side: TokenSide::StableDebt,
        }
    }
}

impl fmt::Display for AccountingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.side {
            TokenSide::Supply => "supply",
            TokenSide::VariableDebt => "variable-debt",
            TokenSide::StableDebt => "stable-debt",
        };
        write!(f, "{}-{}", prefix, self.asset)
    }
}

/// Risk configuration of a reserve.
///
/// Percentages are BPS decimals (scale 4, 10 000 = 100%). `liquidation_bonus`
/// includes the repaid principal, so 10 500 means a 5% bonus. Caps are in
/// asset units, `debt_ceiling` in base-currency WAD; a non-zero ceiling puts
/// the asset in isolation mode.
#[derive(Clone)]
pub struct ReserveConfig<M: ManagedTypeApi> {
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub liquidation_bonus: ManagedDecimal<M, NumDecimals>,
    pub liquidation_protocol_fee: ManagedDecimal<M, NumDecimals>,
    pub reserve_factor: ManagedDecimal<M, NumDecimals>,
    pub decimals: usize,
    pub active: bool,
    pub frozen: bool,
    pub paused: bool,
    pub borrowing_enabled: bool,
    pub stable_borrowing_enabled: bool,
    pub borrow_cap: Option<ManagedDecimal<M, NumDecimals>>,
    pub supply_cap: Option<ManagedDecimal<M, NumDecimals>>,
    pub debt_ceiling: ManagedDecimal<M, NumDecimals>,
    pub e_mode_category: u8,
    pub borrowable_in_isolation: bool,
    pub siloed_borrowing: bool,
    pub flash_loan_enabled: bool,
}

impl<M: ManagedTypeApi> ReserveConfig<M> {
    pub fn is_isolated(&self) -> bool {
        self.debt_ceiling.into_raw_units() != &BigUint::zero()
    }

    pub fn can_supply(&self) -> bool {
        self.active && !self.paused && !self.frozen
    }

    pub fn can_borrow(&self) -> bool {
        self.can_supply() && self.borrowing_enabled
    }

    pub fn can_borrow_in_isolation(&self) -> bool {
        self.borrowable_in_isolation
    }

    pub fn is_siloed_borrowing(&self) -> bool {
        self.siloed_borrowing
    }

    pub fn can_flashloan(&self) -> bool {
        self.active && !self.paused && self.flash_loan_enabled
    }

    pub fn has_emode(&self) -> bool {
        self.e_mode_category != NO_E_MODE_CATEGORY
    }

    /// Zero LTV assets never back new borrows.
    pub fn is_collateralizable(&self) -> bool {
        self.ltv.into_raw_units() != &BigUint::zero()
    }

    pub fn can_be_liquidated(&self) -> bool {
        self.liquidation_threshold.into_raw_units() != &BigUint::zero()
    }
}

/// Parameters of the two-slope rate curve. Rates are annual RAY decimals,
/// the two optimal ratios are BPS decimals.
#[derive(Clone)]
pub struct InterestRateStrategy<M: ManagedTypeApi> {
    pub optimal_usage_ratio: ManagedDecimal<M, NumDecimals>,
    pub base_variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub variable_rate_slope1: ManagedDecimal<M, NumDecimals>,
    pub variable_rate_slope2: ManagedDecimal<M, NumDecimals>,
    pub stable_rate_slope1: ManagedDecimal<M, NumDecimals>,
    pub stable_rate_slope2: ManagedDecimal<M, NumDecimals>,
    pub base_stable_rate_offset: ManagedDecimal<M, NumDecimals>,
    pub stable_rate_excess_offset: ManagedDecimal<M, NumDecimals>,
    pub optimal_stable_to_total_debt_ratio: ManagedDecimal<M, NumDecimals>,
}

/// Output of the rate strategy, all annual RAY decimals.
#[derive(Clone)]
pub struct ReserveRates<M: ManagedTypeApi> {
    pub liquidity_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
}

/// Per-asset ledger: indexes, scaled totals, rates and configuration.
///
/// Scaled totals are RAY decimals; `total_principal_stable_debt` and
/// `available_liquidity` are in asset units; `isolation_mode_total_debt` is WAD.
#[derive(Clone)]
pub struct ReserveData<M: ManagedTypeApi> {
    pub asset: AssetId,
    pub token_kind: TokenKind,
    pub config: ReserveConfig<M>,
    pub strategy: InterestRateStrategy<M>,
    pub liquidity_index: ManagedDecimal<M, NumDecimals>,
    pub variable_borrow_index: ManagedDecimal<M, NumDecimals>,
    pub current_liquidity_rate: ManagedDecimal<M, NumDecimals>,
    pub current_variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub current_stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
    pub last_update_timestamp: u64,
    pub total_scaled_variable_debt: ManagedDecimal<M, NumDecimals>,
    pub total_principal_stable_debt: ManagedDecimal<M, NumDecimals>,
    pub average_stable_rate: ManagedDecimal<M, NumDecimals>,
    pub stable_debt_last_update_timestamp: u64,
    pub scaled_supply_total: ManagedDecimal<M, NumDecimals>,
    pub accrued_to_treasury_scaled: ManagedDecimal<M, NumDecimals>,
    pub isolation_mode_total_debt: ManagedDecimal<M, NumDecimals>,
    pub available_liquidity: ManagedDecimal<M, NumDecimals>,
    pub delegatee: Option<AccountId>,
}

impl<M: ManagedTypeApi> ReserveData<M> {
    /// A freshly listed reserve: both indexes at one RAY, every total at zero.
    pub fn new(
        asset: AssetId,
        token_kind: TokenKind,
        config: ReserveConfig<M>,
        strategy: InterestRateStrategy<M>,
        timestamp: u64,
    ) -> Self {
        let ray = ManagedDecimal::from_raw_units(BigUint::from(RAY), RAY_PRECISION);
        let ray_zero = ManagedDecimal::from_raw_units(BigUint::zero(), RAY_PRECISION);
        let asset_zero = ManagedDecimal::from_raw_units(BigUint::zero(), config.decimals);

        ReserveData {
            asset,
            token_kind,
            liquidity_index: ray.clone(),
            variable_borrow_index: ray,
            current_liquidity_rate: ray_zero.clone(),
            current_variable_borrow_rate: ray_zero.clone(),
            current_stable_borrow_rate: ray_zero.clone(),
            last_update_timestamp: timestamp,
            total_scaled_variable_debt: ray_zero.clone(),
            total_principal_stable_debt: asset_zero.clone(),
            average_stable_rate: ray_zero.clone(),
            stable_debt_last_update_timestamp: timestamp,
            scaled_supply_total: ray_zero.clone(),
            accrued_to_treasury_scaled: ray_zero,
            isolation_mode_total_debt: ManagedDecimal::from_raw_units(
                BigUint::zero(),
                WAD_PRECISION,
            ),
            available_liquidity: asset_zero,
            delegatee: None,
            config,
            strategy,
        }
    }

    pub fn decimals(&self) -> usize {
        self.config.decimals
    }

    pub fn has_suppliers(&self) -> bool {
        self.scaled_supply_total.into_raw_units() != &BigUint::zero()
            || self.accrued_to_treasury_scaled.into_raw_units() != &BigUint::zero()
    }
}

/// Efficiency-mode category shared by correlated assets.
#[derive(Clone)]
pub struct EModeCategory<M: ManagedTypeApi> {
    pub id: u8,
    pub ltv: ManagedDecimal<M, NumDecimals>,
    pub liquidation_threshold: ManagedDecimal<M, NumDecimals>,
    pub liquidation_bonus: ManagedDecimal<M, NumDecimals>,
    /// Oracle key priced instead of the asset's own feed.
    pub price_source: Option<AssetId>,
    pub label: String,
}

/// Stable-rate debt locked in per account.
#[derive(Clone)]
pub struct StableDebtPosition<M: ManagedTypeApi> {
    pub principal: ManagedDecimal<M, NumDecimals>,
    pub rate: ManagedDecimal<M, NumDecimals>,
    pub last_update: u64,
}

/// Every position an account holds, keyed by asset.
#[derive(Clone)]
pub struct UserAccount<M: ManagedTypeApi> {
    pub scaled_balances: BTreeMap<AssetId, ManagedDecimal<M, NumDecimals>>,
    pub scaled_variable_debts: BTreeMap<AssetId, ManagedDecimal<M, NumDecimals>>,
    pub stable_debts: BTreeMap<AssetId, StableDebtPosition<M>>,
    pub collateral_flags: BTreeMap<AssetId, bool>,
    pub e_mode_category: Option<u8>,
    pub isolated_collateral_asset: Option<AssetId>,
}

impl<M: ManagedTypeApi> Default for UserAccount<M> {
    fn default() -> Self {
        UserAccount {
            scaled_balances: BTreeMap::new(),
            scaled_variable_debts: BTreeMap::new(),
            stable_debts: BTreeMap::new(),
            collateral_flags: BTreeMap::new(),
            e_mode_category: None,
            isolated_collateral_asset: None,
        }
    }
}

impl<M: ManagedTypeApi> UserAccount<M> {
    pub fn is_in_isolation_mode(&self) -> bool {
        self.isolated_collateral_asset.is_some()
    }

    pub fn e_mode_category(&self) -> u8 {
        self.e_mode_category.unwrap_or(NO_E_MODE_CATEGORY)
    }

    pub fn collateral_flag(&self, asset: &AssetId) -> Option<bool> {
        self.collateral_flags.get(asset).copied()
    }

    pub fn has_supply(&self, asset: &AssetId) -> bool {
        self.scaled_balances.contains_key(asset)
    }

    /// Enabled as collateral and backed by a balance.
    pub fn is_using_as_collateral(&self, asset: &AssetId) -> bool {
        self.collateral_flag(asset).unwrap_or(false) && self.has_supply(asset)
    }

    pub fn collateral_assets(&self) -> Vec<AssetId> {
        self.scaled_balances
            .keys()
            .filter(|asset| self.collateral_flag(asset).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn is_borrowing(&self, asset: &AssetId) -> bool {
        self.scaled_variable_debts.contains_key(asset) || self.stable_debts.contains_key(asset)
    }

    pub fn borrowed_assets(&self) -> BTreeSet<AssetId> {
        self.scaled_variable_debts
            .keys()
            .chain(self.stable_debts.keys())
            .cloned()
            .collect()
    }

    pub fn is_borrowing_any(&self) -> bool {
        !self.scaled_variable_debts.is_empty() || !self.stable_debts.is_empty()
    }

    /// Every asset with a supply or debt position.
    pub fn touched_assets(&self) -> BTreeSet<AssetId> {
        self.scaled_balances
            .keys()
            .cloned()
            .chain(self.borrowed_assets())
            .collect()
    }
}
