pub mod account;
pub mod borrow;
pub mod emode;
pub mod flash_loan;
pub mod liquidation;
pub mod repay;
pub mod supply;
pub mod treasury;
pub mod withdraw;
