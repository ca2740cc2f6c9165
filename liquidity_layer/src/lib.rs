//! Per-reserve accounting: interest accrual, rate refresh, scaled-balance
//! arithmetic, stable debt and treasury bookkeeping, plus the accounting-token
//! ledger the engine instructs.

use core::marker::PhantomData;

use multiversx_sc::api::VMApi;
use multiversx_sc::contract_base::ContractBase;

pub mod ledger;
pub mod liquidity;
pub mod utils;
pub mod view;

pub use ledger::{InMemoryLedger, LedgerInstruction, Party, TokenLedger};
pub use liquidity::LiquidityModule;
pub use utils::UtilsModule;
pub use view::ViewModule;

/// Stateless engine over `ReserveData`: every operation takes the reserve it
/// works on, so one instance serves every listed asset.
pub struct LiquidityPool<A: VMApi> {
    _api: PhantomData<A>,
}

impl<A: VMApi> LiquidityPool<A> {
    pub fn new() -> Self {
        LiquidityPool { _api: PhantomData }
    }
}

impl<A: VMApi> Default for LiquidityPool<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: VMApi> Clone for LiquidityPool<A> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<A: VMApi> ContractBase for LiquidityPool<A> {
    type Api = A;
}

impl<A: VMApi> common_math::SharedMathModule for LiquidityPool<A> {}
impl<A: VMApi> common_rates::InterestRates for LiquidityPool<A> {}
impl<A: VMApi> LiquidityModule for LiquidityPool<A> {}
impl<A: VMApi> UtilsModule for LiquidityPool<A> {}
impl<A: VMApi> ViewModule for LiquidityPool<A> {}
