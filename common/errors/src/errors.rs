use thiserror::Error;

/// Failures reported by the accounting-token ledger while applying a batch.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("scaled balance of {token} for account {account} is too low")]
    InsufficientScaledBalance { token: String, account: u64 },
    #[error("scaled total supply of {token} is too low")]
    InsufficientScaledSupply { token: String },
    #[error("underlying {asset} balance of {holder} is too low")]
    InsufficientUnderlying { asset: String, holder: String },
}

/// Every way a lending operation can be rejected.
///
/// Variants are deterministic outcomes of the pre-mutation snapshot; nothing is
/// retried internally and no state is touched when one is returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LendingError {
    #[error("Reserve is not active.")]
    ReserveInactive,
    #[error("Reserve is frozen.")]
    ReserveFrozen,
    #[error("Reserve is paused.")]
    ReservePaused,
    #[error("Borrowing is not enabled for this reserve.")]
    BorrowingNotEnabled,
    #[error("Stable borrowing is not enabled for this reserve.")]
    StableBorrowingNotEnabled,
    #[error("Not enough collateral available for this loan.")]
    CollateralCannotCoverNewBorrow,
    #[error("Health factor is lower than the liquidation threshold.")]
    HealthFactorLowerThanLiquidationThreshold,
    #[error("Health factor is not below the liquidation threshold.")]
    HealthFactorNotBelowThreshold,
    #[error("Debt ceiling reached for the isolated collateral.")]
    DebtCeilingExceeded,
    #[error("Borrow cap reached.")]
    BorrowCapExceeded,
    #[error("Supply cap reached.")]
    SupplyCapExceeded,
    #[error("Asset is not borrowable in isolation mode.")]
    AssetNotBorrowableInIsolation,
    #[error("Price oracle sentinel check failed.")]
    PriceOracleSentinelCheckFailed,
    #[error("Collateral cannot be liquidated.")]
    CollateralCannotBeLiquidated,
    #[error("Specified currency is not borrowed by the user.")]
    SpecifiedCurrencyNotBorrowedByUser,

    #[error("Amount must be greater than zero.")]
    InvalidAmount,
    #[error("Asset is not listed.")]
    AssetNotListed,
    #[error("Asset already listed.")]
    AssetAlreadyListed,
    #[error("Not enough tokens supplied for this account.")]
    NotEnoughAvailableUserBalance,
    #[error("Insufficient liquidity in the reserve.")]
    InsufficientLiquidity,
    #[error("Collateral balance is zero.")]
    CollateralBalanceIsZero,
    #[error("Loan to value validation failed.")]
    LtvValidationFailed,
    #[error("Collateral is the same as the borrowing currency.")]
    CollateralSameAsBorrowingCurrency,
    #[error("Amount is bigger than the maximum stable loan size.")]
    AmountBiggerThanMaxLoanSizeStable,
    #[error("No debt of the selected type.")]
    NoDebtOfSelectedType,
    #[error("An explicit amount is required to repay on behalf of another account.")]
    NoExplicitAmountToRepayOnBehalf,
    #[error("Underlying balance is zero.")]
    UnderlyingBalanceZero,
    #[error("Account is in isolation mode or the asset has zero loan to value.")]
    UserInIsolationModeOrLtvZero,
    #[error("Asset is not part of the account's e-mode category.")]
    InconsistentEModeCategory,
    #[error("E-mode category not found.")]
    EModeCategoryNotFound,
    #[error("E-mode category 0 is reserved.")]
    EModeCategoryReserved,
    #[error("E-mode is not allowed with isolated collateral.")]
    EModeNotAllowedWithIsolatedCollateral,
    #[error("Siloed borrowing violation.")]
    SiloedBorrowingViolation,
    #[error("Flash loans are disabled for this reserve.")]
    FlashLoanDisabled,
    #[error("Flash loan was not repaid in full.")]
    FlashLoanNotRepaid,
    #[error("Invalid loan to value.")]
    InvalidLtv,
    #[error("Invalid liquidation threshold.")]
    InvalidLiquidationThreshold,
    #[error("Invalid liquidation bonus.")]
    InvalidLiquidationBonus,
    #[error("Invalid liquidation protocol fee.")]
    InvalidProtocolFee,
    #[error("Invalid reserve factor.")]
    InvalidReserveFactor,
    #[error("Invalid interest rate parameters.")]
    InvalidInterestRateParams,
    #[error("Invalid asset decimals.")]
    InvalidDecimals,
    #[error("Reserve liquidity is not zero.")]
    ReserveLiquidityNotZero,
    #[error("Price not available for {0}.")]
    PriceNotAvailable(String),
    #[error("Timestamp is earlier than the last update.")]
    TimestampInPast,
    #[error("Operation not supported by this token kind.")]
    TokenKindMismatch,
    #[error("Ledger rejected the batch: {0}")]
    Ledger(#[from] LedgerError),
}
