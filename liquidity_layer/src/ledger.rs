use std::collections::BTreeMap;
use std::fmt;

use common_errors::LedgerError;
use common_structs::{AccountId, AccountingToken, AssetId};
use log::warn;
use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

/// Holder of underlying asset units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Party {
    Account(AccountId),
    /// The reserve's own liquidity account.
    Reserve,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Account(account) => account.fmt(f),
            Party::Reserve => f.write_str("reserve"),
        }
    }
}

/// One change the engine asks the external ledger to apply.
///
/// Scaled amounts are RAY decimals for supply and variable-debt tokens and
/// principal in asset decimals for stable-debt tokens.
#[derive(Clone)]
pub enum LedgerInstruction<M: ManagedTypeApi> {
    MintScaled {
        token: AccountingToken,
        account: AccountId,
        scaled_amount: ManagedDecimal<M, NumDecimals>,
        index: ManagedDecimal<M, NumDecimals>,
    },
    BurnScaled {
        token: AccountingToken,
        account: AccountId,
        scaled_amount: ManagedDecimal<M, NumDecimals>,
        index: ManagedDecimal<M, NumDecimals>,
    },
    TransferScaled {
        token: AccountingToken,
        from: AccountId,
        to: AccountId,
        scaled_amount: ManagedDecimal<M, NumDecimals>,
    },
    TransferUnderlying {
        asset: AssetId,
        from: Party,
        to: Party,
        amount: ManagedDecimal<M, NumDecimals>,
    },
}

/// Authoritative store of accounting-token and underlying balances.
///
/// `apply` is atomic: either every instruction of the batch lands or none does.
pub trait TokenLedger<M: ManagedTypeApi> {
    fn apply(&mut self, batch: &[LedgerInstruction<M>]) -> Result<(), LedgerError>;

    fn scaled_balance_of(&self, token: &AccountingToken, account: &AccountId) -> BigUint<M>;

    fn scaled_total_supply(&self, token: &AccountingToken) -> BigUint<M>;

    fn underlying_balance_of(&self, asset: &AssetId, holder: &Party) -> BigUint<M>;
}

#[derive(Clone)]
struct Balances<M: ManagedTypeApi> {
    scaled: BTreeMap<(AccountingToken, AccountId), BigUint<M>>,
    supplies: BTreeMap<AccountingToken, BigUint<M>>,
    underlying: BTreeMap<(AssetId, Party), BigUint<M>>,
}

impl<M: ManagedTypeApi> Balances<M> {
    fn credit_scaled(&mut self, token: &AccountingToken, account: AccountId, amount: &BigUint<M>) {
        let balance = self
            .scaled
            .entry((token.clone(), account))
            .or_insert_with(BigUint::zero);
        *balance += amount;
    }

    fn debit_scaled(
        &mut self,
        token: &AccountingToken,
        account: AccountId,
        amount: &BigUint<M>,
    ) -> Result<(), LedgerError> {
        let key = (token.clone(), account);
        let balance = self.scaled.get(&key).cloned().unwrap_or_else(BigUint::zero);
        if &balance < amount {
            return Err(LedgerError::InsufficientScaledBalance {
                token: token.to_string(),
                account: account.0,
            });
        }

        let remaining = balance - amount;
        if remaining == 0u64 {
            self.scaled.remove(&key);
        } else {
            self.scaled.insert(key, remaining);
        }
        Ok(())
    }

    fn apply_one(&mut self, instruction: &LedgerInstruction<M>) -> Result<(), LedgerError> {
        match instruction {
            LedgerInstruction::MintScaled {
                token,
                account,
                scaled_amount,
                ..
            } => {
                let amount = scaled_amount.into_raw_units();
                self.credit_scaled(token, *account, amount);
                let supply = self
                    .supplies
                    .entry(token.clone())
                    .or_insert_with(BigUint::zero);
                *supply += amount;
            },
            LedgerInstruction::BurnScaled {
                token,
                account,
                scaled_amount,
                ..
            } => {
                let amount = scaled_amount.into_raw_units();
                self.debit_scaled(token, *account, amount)?;
                let supply = self
                    .supplies
                    .get(token)
                    .cloned()
                    .unwrap_or_else(BigUint::zero);
                if &supply < amount {
                    return Err(LedgerError::InsufficientScaledSupply {
                        token: token.to_string(),
                    });
                }
                self.supplies.insert(token.clone(), supply - amount);
            },
            LedgerInstruction::TransferScaled {
                token,
                from,
                to,
                scaled_amount,
            } => {
                let amount = scaled_amount.into_raw_units();
                self.debit_scaled(token, *from, amount)?;
                self.credit_scaled(token, *to, amount);
            },
            LedgerInstruction::TransferUnderlying {
                asset,
                from,
                to,
                amount,
            } => {
                let amount = amount.into_raw_units();
                let from_key = (asset.clone(), *from);
                let balance = self
                    .underlying
                    .get(&from_key)
                    .cloned()
                    .unwrap_or_else(BigUint::zero);
                if &balance < amount {
                    return Err(LedgerError::InsufficientUnderlying {
                        asset: asset.to_string(),
                        holder: from.to_string(),
                    });
                }
                self.underlying.insert(from_key, balance - amount);

                let receiver = self
                    .underlying
                    .entry((asset.clone(), *to))
                    .or_insert_with(BigUint::zero);
                *receiver += amount;
            },
        }
        Ok(())
    }
}

/// Ledger kept in memory, used by embedders without an external token registry
/// and by the test suites.
#[derive(Clone)]
pub struct InMemoryLedger<M: ManagedTypeApi> {
    balances: Balances<M>,
    applied_batches: usize,
}

impl<M: ManagedTypeApi> Default for InMemoryLedger<M> {
    fn default() -> Self {
        InMemoryLedger {
            balances: Balances {
                scaled: BTreeMap::new(),
                supplies: BTreeMap::new(),
                underlying: BTreeMap::new(),
            },
            applied_batches: 0,
        }
    }
}

impl<M: ManagedTypeApi> InMemoryLedger<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits underlying units (raw, asset decimals) to a holder out of thin air.
    pub fn fund(&mut self, asset: &AssetId, holder: Party, amount: BigUint<M>) {
        let balance = self
            .balances
            .underlying
            .entry((asset.clone(), holder))
            .or_insert_with(BigUint::zero);
        *balance += &amount;
    }

    pub fn applied_batches(&self) -> usize {
        self.applied_batches
    }

    /// Every account holding a non-zero scaled balance of `token`.
    pub fn holders(&self, token: &AccountingToken) -> Vec<AccountId> {
        self.balances
            .scaled
            .keys()
            .filter(|(held, _)| held == token)
            .map(|(_, account)| *account)
            .collect()
    }
}

impl<M: ManagedTypeApi> TokenLedger<M> for InMemoryLedger<M> {
    fn apply(&mut self, batch: &[LedgerInstruction<M>]) -> Result<(), LedgerError> {
        let mut staged = self.balances.clone();
        for instruction in batch {
            if let Err(err) = staged.apply_one(instruction) {
                warn!("ledger batch of {} instructions rejected: {}", batch.len(), err);
                return Err(err);
            }
        }

        self.balances = staged;
        self.applied_batches += 1;
        Ok(())
    }

    fn scaled_balance_of(&self, token: &AccountingToken, account: &AccountId) -> BigUint<M> {
        self.balances
            .scaled
            .get(&(token.clone(), *account))
            .cloned()
            .unwrap_or_else(BigUint::zero)
    }

    fn scaled_total_supply(&self, token: &AccountingToken) -> BigUint<M> {
        self.balances
            .supplies
            .get(token)
            .cloned()
            .unwrap_or_else(BigUint::zero)
    }

    fn underlying_balance_of(&self, asset: &AssetId, holder: &Party) -> BigUint<M> {
        self.balances
            .underlying
            .get(&(asset.clone(), *holder))
            .cloned()
            .unwrap_or_else(BigUint::zero)
    }
}
