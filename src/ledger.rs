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

//! Append-only transaction ledger.
//!
//! Combines a [`DashMap`] for O(1) row lookup with a [`SegQueue`] preserving
//! global insertion order and a per-user index for history queries. Row ids
//! come from an atomic counter, so every record call mints a distinct row.

use crate::base::{TransactionId, UserId};
use crate::transaction::{Transaction, TransactionDraft, TransactionStatus};
use crate::MarketError;
use chrono::Utc;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe append-only transaction log.
#[derive(Debug)]
pub struct Ledger {
    /// Rows indexed by id.
    transactions: DashMap<TransactionId, Transaction>,

    /// Row ids in global insertion order.
    order: SegQueue<TransactionId>,

    /// Per-user row ids in insertion order, for history queries.
    by_user: DashMap<UserId, Vec<TransactionId>>,

    /// Next row id.
    next_id: AtomicU64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            order: SegQueue::new(),
            by_user: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Mints a new row from the draft and appends it.
    ///
    /// Returns a clone of the stored row; the ledger keeps exclusive
    /// ownership of the original.
    pub fn record(&self, draft: TransactionDraft) -> Transaction {
        let id = TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let transaction = Transaction {
            id,
            user_id: draft.user_id,
            kind: draft.kind,
            amount: draft.amount,
            currency: draft.currency,
            gift_id: draft.gift_id,
            tx_hash: draft.tx_hash,
            status: draft.status,
            created_at: Utc::now(),
        };

        self.transactions.insert(id, transaction.clone());
        self.order.push(id);
        self.by_user.entry(draft.user_id).or_default().push(id);

        transaction
    }

    /// Looks up one row by id.
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.transactions.get(&id).map(|row| row.clone())
    }

    /// Transitions a row's status.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] - No row with this id.
    /// - [`MarketError::TransactionSettled`] - The row already settled.
    pub fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Transaction, MarketError> {
        let mut row = self.transactions.get_mut(&id).ok_or(MarketError::NotFound)?;
        if !row.status.can_transition_to(status) {
            return Err(MarketError::TransactionSettled);
        }
        row.status = status;
        Ok(row.clone())
    }

    /// Returns up to `limit` of the user's rows, most recent first.
    ///
    /// Unknown users get an empty list, not an error.
    pub fn transactions_for(&self, user_id: UserId, limit: usize) -> Vec<Transaction> {
        let Some(ids) = self.by_user.get(&user_id) else {
            return Vec::new();
        };
        ids.iter()
            .rev()
            .take(limit)
            .filter_map(|id| self.transactions.get(id).map(|row| row.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
