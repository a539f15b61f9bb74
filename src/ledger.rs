//! Ledger
//!
//! Balance bookkeeping layered on a store by key convention:
//! `"{namespace}.{identity}"` → number. An identity that was never written
//! has the starting balance.
//!
//! ## Transfers are not atomic across keys
//! `transfer` debits the sender, then credits the receiver, as two separate
//! single-key operations. If the process dies between the two steps the
//! debited amount is gone; after a restart the sender shows the debit and
//! the receiver never saw the credit. There is no rollback.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::Result;
use crate::ranking::{self, Ranked};
use crate::store::{current_number, overflow, Store};
use crate::value::{Number, Value};

/// Balance ledger under one namespace
#[derive(Clone)]
pub struct Ledger {
    store: Arc<Store>,
    namespace: String,
    starting_balance: Number,
}

impl Ledger {
    pub fn new(
        store: Arc<Store>,
        namespace: impl Into<String>,
        starting_balance: impl Into<Number>,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            starting_balance: starting_balance.into(),
        }
    }

    /// Key holding `identity`'s balance
    pub fn key(&self, identity: &str) -> String {
        format!("{}.{}", self.namespace, identity)
    }

    pub fn starting_balance(&self) -> Number {
        self.starting_balance
    }

    /// Current balance (starting balance if never written)
    pub fn balance(&self, identity: &str) -> Result<Number> {
        self.store
            .get_number(&self.key(identity), self.starting_balance)
    }

    /// Create the account with the starting balance
    ///
    /// Returns true if it did not exist yet.
    pub fn open_account(&self, identity: &str) -> Result<bool> {
        let starting = self.starting_balance;
        self.store.update(&self.key(identity), |slot| {
            if slot.is_some() {
                return Ok(false);
            }
            *slot = Some(Value::Number(starting));
            Ok(true)
        })
    }

    /// Overwrite a balance; negative amounts are clamped to zero
    pub fn set_balance(&self, identity: &str, amount: impl Into<Number>) -> Result<Number> {
        let amount = amount.into();
        let amount = if amount.is_negative() {
            amount.zero_like()
        } else {
            amount
        };
        self.store.set(&self.key(identity), amount)?;
        Ok(amount)
    }

    /// Credit `amount`; false (and no change) if `amount` is not positive
    pub fn give(&self, identity: &str, amount: impl Into<Number>) -> Result<bool> {
        let amount = amount.into();
        if !amount.is_positive() {
            return Ok(false);
        }

        let key = self.key(identity);
        let starting = self.starting_balance;
        self.store.update(&key, |slot| {
            let current = current_number(&key, slot.as_ref(), starting)?;
            let next = current.checked_add(amount).ok_or_else(|| overflow(&key))?;
            *slot = Some(Value::Number(next));
            Ok(true)
        })
    }

    /// Debit `amount` if the balance covers it
    ///
    /// The check and the debit happen under one lock, so two concurrent
    /// takes can never overdraw the account.
    pub fn take(&self, identity: &str, amount: impl Into<Number>) -> Result<bool> {
        let amount = amount.into();
        if !amount.is_positive() {
            return Ok(false);
        }

        let key = self.key(identity);
        let starting = self.starting_balance;
        self.store.update(&key, |slot| {
            let current = current_number(&key, slot.as_ref(), starting)?;
            if current.total_cmp(&amount) == Ordering::Less {
                return Ok(false);
            }
            let next = current.checked_sub(amount).ok_or_else(|| overflow(&key))?;
            *slot = Some(Value::Number(next));
            Ok(true)
        })
    }

    /// Move `amount` from `from` to `to`
    ///
    /// Returns false if `from` can't cover it. See the module docs for the
    /// crash window between debit and credit.
    pub fn transfer(&self, from: &str, to: &str, amount: impl Into<Number>) -> Result<bool> {
        let amount = amount.into();
        if !self.take(from, amount)? {
            return Ok(false);
        }
        self.give(to, amount)?;
        tracing::debug!("Transferred {} from {} to {}", amount, from, to);
        Ok(true)
    }

    /// Richest `n` identities
    pub fn top(&self, n: usize) -> Vec<Ranked> {
        ranking::top_n(&self.store, &format!("{}.", self.namespace), n)
    }

    /// Identities with an account, in key order
    pub fn accounts(&self) -> Vec<String> {
        let prefix = format!("{}.", self.namespace);
        self.store
            .keys(&prefix)
            .into_iter()
            .map(|key| key[prefix.len()..].to_string())
            .collect()
    }
}
