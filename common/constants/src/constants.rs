#![no_std]

pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;
pub const RAY_PRECISION: usize = 27;

/// Base currency unit, every collateral and debt value is expressed in WAD.
pub const WAD: u128 = 1_000_000_000_000_000_000;
pub const WAD_PRECISION: usize = 18;

pub const BPS: usize = 10_000; // 100%
pub const BPS_PRECISION: usize = 4;

pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Prices handed over by the oracle carry this many decimals unless it says otherwise.
pub const DEFAULT_PRICE_DECIMALS: usize = 8;

/// Health factor below which a position becomes liquidatable (1.0 in RAY).
pub const HEALTH_FACTOR_LIQUIDATION_THRESHOLD: u128 = RAY;

/// Below this health factor the whole debt can be closed in one call and the
/// sentinel no longer blocks liquidations (0.95 in RAY).
pub const CLOSE_FACTOR_HF_THRESHOLD: u128 = 950_000_000_000_000_000_000_000_000;

/// Reported when an account has no debt at all.
pub const MAX_HEALTH_FACTOR: u128 = u128::MAX;

pub const DEFAULT_LIQUIDATION_CLOSE_FACTOR_BPS: usize = 5_000; // 50%

/// A single stable borrow may take at most this share of the available liquidity.
pub const MAX_STABLE_RATE_BORROW_SIZE_BPS: usize = 2_500; // 25%

/// Liquidation bonus is expressed including the repaid principal.
pub const MAX_LIQUIDATION_BONUS_BPS: usize = 11_500; // 115%

pub const DEFAULT_FLASH_LOAN_PREMIUM_BPS: usize = 9; // 0.09%

pub const MAX_ASSET_DECIMALS: usize = 27;

/// Isolation debt left over below one base unit is erased.
pub const ISOLATION_DEBT_DUST_WAD: u128 = WAD;

/// E-mode category 0 means "no category".
pub const NO_E_MODE_CATEGORY: u8 = 0;

/// Amount argument meaning "everything the account holds or owes".
pub const MAX_AMOUNT: u128 = u128::MAX;
