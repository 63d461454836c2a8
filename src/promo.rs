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

//! Single-use promo codes.
//!
//! A code is issued unused after an external payment is confirmed, and
//! transitions `used = false` → `used = true` exactly once at redemption.
//! Each stored code sits behind its own mutex; redemption holds that mutex
//! across the mark-used + credit + record sequence, so a second redeemer
//! always observes `used = true`.

use crate::MarketError;
use crate::base::{TransactionId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::Ref;
use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Random uppercase letters prefixed to every code.
const CODE_PREFIX_LEN: usize = 8;

/// Exchange rate for converting a confirmed Stars payment into a TON
/// credit: 50 Stars buy 0.46 TON.
const TON_PER_50_STARS: Decimal = dec!(0.46);

/// A single-use credit voucher. The amount is fixed at issuance.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PromoCode {
    pub code: String,
    pub amount: Decimal,
    pub used: bool,
    pub issued_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<UserId>,
    /// The deposit row created at redemption.
    pub transaction_id: Option<TransactionId>,
}

impl PromoCode {
    fn new(code: String, amount: Decimal) -> Self {
        Self {
            code,
            amount,
            used: false,
            issued_at: Utc::now(),
            redeemed_at: None,
            redeemed_by: None,
            transaction_id: None,
        }
    }

    /// Marks the code redeemed. Callers hold the code mutex.
    pub(crate) fn mark_used(&mut self, user_id: UserId, transaction_id: TransactionId) {
        self.used = true;
        self.redeemed_at = Some(Utc::now());
        self.redeemed_by = Some(user_id);
        self.transaction_id = Some(transaction_id);
    }
}

/// Concurrent store of promo codes keyed by code string.
#[derive(Debug)]
pub struct PromoVault {
    codes: DashMap<String, Mutex<PromoCode>>,
    /// Bounded generation attempts before giving up on collisions.
    attempts: usize,
}

impl PromoVault {
    pub fn new(attempts: usize) -> Self {
        Self {
            codes: DashMap::new(),
            attempts: attempts.max(1),
        }
    }

    /// Issues a new unused code worth `amount` TON.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidAmount`] - Non-positive amount.
    /// - [`MarketError::CodeGenerationExhausted`] - Every generation attempt
    ///   collided with an existing code.
    pub fn issue(&self, amount: Decimal) -> Result<PromoCode, MarketError> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }

        for _ in 0..self.attempts {
            let code = generate_code(amount);
            // Entry API gives atomic check-and-insert under collision.
            match self.codes.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let promo = PromoCode::new(code, amount);
                    entry.insert(Mutex::new(promo.clone()));
                    return Ok(promo);
                }
            }
        }

        Err(MarketError::CodeGenerationExhausted)
    }

    /// Borrows the locked cell for a code; redemption locks it.
    pub(crate) fn cell(&self, code: &str) -> Option<Ref<'_, String, Mutex<PromoCode>>> {
        self.codes.get(code)
    }

    /// Snapshot of one code's current state.
    pub fn get(&self, code: &str) -> Option<PromoCode> {
        self.codes.get(code).map(|cell| cell.lock().clone())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Converts a confirmed Stars payment into its TON credit value.
pub fn stars_to_ton(stars: i64) -> Decimal {
    Decimal::from(stars) * TON_PER_50_STARS / dec!(50)
}

/// Generates a candidate code: fixed-length random uppercase prefix plus the
/// stringified rounded amount (minimum 1).
fn generate_code(amount: Decimal) -> String {
    let mut rng = rand::rng();
    let prefix: String = (0..CODE_PREFIX_LEN)
        .map(|_| rng.random_range(b'A'..=b'Z') as char)
        .collect();
    let rounded = amount.round().to_i64().unwrap_or(1).max(1);
    format!("{prefix}{rounded}")
}
