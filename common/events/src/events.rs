use common_structs::{AccountId, AssetId, InterestRateMode, TokenKind};
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{ManagedDecimal, NumDecimals};

/// Indexer-facing record of a committed state change.
///
/// Amounts carry the decimals of their asset, rates and indexes are RAY,
/// isolation debt is WAD.
#[derive(Clone)]
pub enum Event<M: ManagedTypeApi> {
    ReserveInitialized {
        asset: AssetId,
        token_kind: TokenKind,
        decimals: usize,
    },
    ReserveDataUpdated {
        asset: AssetId,
        liquidity_rate: ManagedDecimal<M, NumDecimals>,
        stable_borrow_rate: ManagedDecimal<M, NumDecimals>,
        variable_borrow_rate: ManagedDecimal<M, NumDecimals>,
        liquidity_index: ManagedDecimal<M, NumDecimals>,
        variable_borrow_index: ManagedDecimal<M, NumDecimals>,
    },
    Supply {
        asset: AssetId,
        user: AccountId,
        on_behalf_of: AccountId,
        amount: ManagedDecimal<M, NumDecimals>,
    },
    Withdraw {
        asset: AssetId,
        user: AccountId,
        to: AccountId,
        amount: ManagedDecimal<M, NumDecimals>,
    },
    Borrow {
        asset: AssetId,
        user: AccountId,
        on_behalf_of: AccountId,
        amount: ManagedDecimal<M, NumDecimals>,
        interest_rate_mode: InterestRateMode,
        borrow_rate: ManagedDecimal<M, NumDecimals>,
    },
    Repay {
        asset: AssetId,
        user: AccountId,
        repayer: AccountId,
        amount: ManagedDecimal<M, NumDecimals>,
        use_a_tokens: bool,
    },
    SwapBorrowRateMode {
        asset: AssetId,
        user: AccountId,
        interest_rate_mode: InterestRateMode,
    },
    LiquidationCall {
        collateral_asset: AssetId,
        debt_asset: AssetId,
        user: AccountId,
        debt_to_cover: ManagedDecimal<M, NumDecimals>,
        liquidated_collateral_amount: ManagedDecimal<M, NumDecimals>,
        protocol_fee: ManagedDecimal<M, NumDecimals>,
        liquidator: AccountId,
        receive_a_token: bool,
    },
    ReserveUsedAsCollateralEnabled {
        asset: AssetId,
        user: AccountId,
    },
    ReserveUsedAsCollateralDisabled {
        asset: AssetId,
        user: AccountId,
    },
    UserEModeSet {
        user: AccountId,
        category_id: u8,
    },
    IsolationModeTotalDebtUpdated {
        asset: AssetId,
        total_debt: ManagedDecimal<M, NumDecimals>,
    },
    FlashLoan {
        asset: AssetId,
        initiator: AccountId,
        amount: ManagedDecimal<M, NumDecimals>,
        premium: ManagedDecimal<M, NumDecimals>,
    },
    MintedToTreasury {
        asset: AssetId,
        amount: ManagedDecimal<M, NumDecimals>,
    },
    ReserveConfigurationChanged {
        asset: AssetId,
        field: &'static str,
    },
    EModeCategoryUpdated {
        category_id: u8,
        ltv: ManagedDecimal<M, NumDecimals>,
        liquidation_threshold: ManagedDecimal<M, NumDecimals>,
        liquidation_bonus: ManagedDecimal<M, NumDecimals>,
        price_source: Option<AssetId>,
        label: String,
    },
    UnderlyingDelegated {
        asset: AssetId,
        delegatee: AccountId,
    },
}

impl<M: ManagedTypeApi> Event<M> {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ReserveInitialized { .. } => "reserve_initialized",
            Event::ReserveDataUpdated { .. } => "reserve_data_updated",
            Event::Supply { .. } => "supply",
            Event::Withdraw { .. } => "withdraw",
            Event::Borrow { .. } => "borrow",
            Event::Repay { .. } => "repay",
            Event::SwapBorrowRateMode { .. } => "swap_borrow_rate_mode",
            Event::LiquidationCall { .. } => "liquidation_call",
            Event::ReserveUsedAsCollateralEnabled { .. } => "reserve_used_as_collateral_enabled",
            Event::ReserveUsedAsCollateralDisabled { .. } => "reserve_used_as_collateral_disabled",
            Event::UserEModeSet { .. } => "user_e_mode_set",
            Event::IsolationModeTotalDebtUpdated { .. } => "isolation_mode_total_debt_updated",
            Event::FlashLoan { .. } => "flash_loan",
            Event::MintedToTreasury { .. } => "minted_to_treasury",
            Event::ReserveConfigurationChanged { .. } => "reserve_configuration_changed",
            Event::EModeCategoryUpdated { .. } => "e_mode_category_updated",
            Event::UnderlyingDelegated { .. } => "underlying_delegated",
        }
    }
}

/// Append-only journal of every committed event, in commit order.
#[derive(Clone)]
pub struct EventLog<M: ManagedTypeApi> {
    records: Vec<Event<M>>,
}

impl<M: ManagedTypeApi> Default for EventLog<M> {
    fn default() -> Self {
        EventLog {
            records: Vec::new(),
        }
    }
}

impl<M: ManagedTypeApi> EventLog<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, events: &[Event<M>]) {
        self.records.extend_from_slice(events);
    }

    pub fn records(&self) -> &[Event<M>] {
        &self.records
    }

    /// Records appended after the first `offset` ones.
    pub fn since(&self, offset: usize) -> &[Event<M>] {
        &self.records[offset.min(self.records.len())..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, name: &str) -> usize {
        self.records.iter().filter(|event| event.name() == name).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiversx_sc::types::BigUint;
    use multiversx_sc_scenario::api::StaticApi;

    #[test]
    fn log_is_append_only_and_ordered() {
        let mut log = EventLog::<StaticApi>::new();
        assert!(log.is_empty());

        let asset = AssetId::from("USDC");
        log.append(&[
            Event::ReserveInitialized {
                asset: asset.clone(),
                token_kind: TokenKind::Generic,
                decimals: 6,
            },
            Event::Supply {
                asset: asset.clone(),
                user: AccountId(1),
                on_behalf_of: AccountId(1),
                amount: ManagedDecimal::from_raw_units(BigUint::from(10u64), 6),
            },
        ]);
        log.append(&[Event::MintedToTreasury {
            asset,
            amount: ManagedDecimal::from_raw_units(BigUint::from(1u64), 6),
        }]);

        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[0].name(), "reserve_initialized");
        assert_eq!(log.since(2)[0].name(), "minted_to_treasury");
        assert!(log.since(10).is_empty());
        assert_eq!(log.count("supply"), 1);
    }
}
