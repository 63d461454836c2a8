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

//! Ledger transaction rows.
//!
//! A [`Transaction`] documents exactly one balance-affecting event. Rows are
//! append-only: after creation the only permitted mutation is the status
//! transition `Pending` → `Completed` or `Pending` → `Failed`.

use crate::base::{Currency, GiftId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What kind of balance-affecting event a row documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Purchase,
    Withdraw,
}

/// Settlement status of a ledger row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Only `Pending` rows may settle; settled rows are frozen.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }
}

/// One append-only ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    /// Set when the row documents a gift purchase or grant.
    pub gift_id: Option<GiftId>,
    /// External reference: a chain hash, a promo code marker, or an
    /// administrative audit token.
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Everything the ledger needs to mint a row; the ledger assigns the id and
/// the timestamp.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub gift_id: Option<GiftId>,
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_settles_to_completed_or_failed() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Completed));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Failed));
    }

    #[test]
    fn settled_rows_are_frozen() {
        assert!(!TransactionStatus::Completed.can_transition_to(TransactionStatus::Failed));
        assert!(!TransactionStatus::Completed.can_transition_to(TransactionStatus::Pending));
        assert!(!TransactionStatus::Failed.can_transition_to(TransactionStatus::Completed));
        assert!(!TransactionStatus::Pending.can_transition_to(TransactionStatus::Pending));
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Deposit).unwrap(),
            "\"deposit\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
