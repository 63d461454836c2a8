// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Account management.
//!
//! An [`Account`] holds two balances (TON as a decimal, Stars as an integer)
//! behind a single mutex, so every balance check-then-mutate sequence is one
//! critical section. Two concurrent debits racing the same balance can never
//! both pass the check.
//!
//! # Example
//!
//! ```
//! use gift_market_rs::{Account, UserId};
//! use rust_decimal::Decimal;
//!
//! let account = Account::new(UserId(1));
//! assert_eq!(account.balance_ton(), Decimal::ZERO);
//! assert_eq!(account.balance_stars(), 0);
//! ```

use crate::MarketError;
use crate::base::{Currency, UserId};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Profile fields carried by an upsert.
///
/// `None` fields leave the stored value untouched; `Some` fields overwrite.
/// Balances are never part of a profile upsert.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: Option<bool>,
    pub wallet_address: Option<String>,
}

/// Read-only snapshot of an account, safe to hold across operations.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccountView {
    pub user_id: UserId,
    pub balance_ton: Decimal,
    pub balance_stars: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: bool,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct AccountData {
    user_id: UserId,
    balance_ton: Decimal,
    balance_stars: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    is_premium: bool,
    wallet_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl AccountData {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance_ton: Decimal::ZERO,
            balance_stars: 0,
            username: None,
            first_name: None,
            last_name: None,
            is_premium: false,
            wallet_address: None,
            created_at: Utc::now(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance_ton >= Decimal::ZERO,
            "Invariant violated: TON balance went negative: {}",
            self.balance_ton
        );
        debug_assert!(
            self.balance_stars >= 0,
            "Invariant violated: Stars balance went negative: {}",
            self.balance_stars
        );
    }

    pub(crate) fn balance_ton(&self) -> Decimal {
        self.balance_ton
    }

    /// Adds `amount` to the balance matching `currency`.
    pub(crate) fn credit(&mut self, amount: Decimal, currency: Currency) -> Result<(), MarketError> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }
        match currency {
            Currency::Ton => {
                self.balance_ton = self
                    .balance_ton
                    .checked_add(amount)
                    .ok_or(MarketError::BalanceOverflow)?;
            }
            Currency::Stars => {
                let stars = stars_amount(amount)?;
                self.balance_stars = self
                    .balance_stars
                    .checked_add(stars)
                    .ok_or(MarketError::BalanceOverflow)?;
            }
        }
        self.assert_invariants();
        Ok(())
    }

    /// Subtracts `amount` from the balance matching `currency`.
    ///
    /// The balance check and the subtraction happen under the same account
    /// lock, held by the caller through [`Account::lock`].
    pub(crate) fn debit(&mut self, amount: Decimal, currency: Currency) -> Result<(), MarketError> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }
        match currency {
            Currency::Ton => {
                if self.balance_ton < amount {
                    return Err(MarketError::InsufficientBalance);
                }
                self.balance_ton -= amount;
            }
            Currency::Stars => {
                let stars = stars_amount(amount)?;
                if self.balance_stars < stars {
                    return Err(MarketError::InsufficientBalance);
                }
                self.balance_stars -= stars;
            }
        }
        self.assert_invariants();
        Ok(())
    }

    /// Overwrites profile fields present in the update, leaving balances alone.
    pub(crate) fn apply_profile(&mut self, update: &ProfileUpdate) {
        if let Some(username) = &update.username {
            self.username = Some(username.clone());
        }
        if let Some(first_name) = &update.first_name {
            self.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            self.last_name = Some(last_name.clone());
        }
        if let Some(is_premium) = update.is_premium {
            self.is_premium = is_premium;
        }
        if let Some(wallet_address) = &update.wallet_address {
            self.wallet_address = Some(wallet_address.clone());
        }
    }

    pub(crate) fn view(&self) -> AccountView {
        AccountView {
            user_id: self.user_id,
            balance_ton: self.balance_ton,
            balance_stars: self.balance_stars,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_premium: self.is_premium,
            wallet_address: self.wallet_address.clone(),
            created_at: self.created_at,
        }
    }
}

/// Stars balances are whole numbers; fractional Stars amounts are rejected
/// rather than silently truncated.
fn stars_amount(amount: Decimal) -> Result<i64, MarketError> {
    if !amount.fract().is_zero() {
        return Err(MarketError::InvalidAmount);
    }
    amount.to_i64().ok_or(MarketError::InvalidAmount)
}

/// A balance-holding user account.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    const DECIMAL_PRECISION: u32 = 4;

    pub fn new(user_id: UserId) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(user_id)),
        }
    }

    /// Acquires the account critical section.
    ///
    /// Every mutating operation and every check-then-mutate sequence runs
    /// under this lock.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }

    pub fn balance_ton(&self) -> Decimal {
        self.inner.lock().balance_ton
    }

    pub fn balance_stars(&self) -> i64 {
        self.inner.lock().balance_stars
    }

    /// Returns `(balance_ton, balance_stars)` from one lock acquisition.
    pub fn balances(&self) -> (Decimal, i64) {
        let data = self.inner.lock();
        (data.balance_ton, data.balance_stars)
    }

    pub fn view(&self) -> AccountView {
        self.inner.lock().view()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 4)?;
        state.serialize_field("user_id", &data.user_id)?;
        state.serialize_field(
            "balance_ton",
            &data.balance_ton.round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.serialize_field("balance_stars", &data.balance_stars)?;
        state.serialize_field("is_premium", &data.is_premium)?;
        state.end()
    }
}
