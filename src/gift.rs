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

//! Gift ownership registry.
//!
//! Ownership is unique per `(user, gift)` pair; the registry's entry API is
//! the single atomic check-and-insert that enforces it.

use crate::MarketError;
use crate::base::{GiftId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::Serialize;

/// Purchase parameters for one catalog gift.
#[derive(Debug, Clone)]
pub struct GiftOrder {
    pub gift_id: GiftId,
    pub name: String,
    pub preview: Option<String>,
    pub price: Decimal,
}

/// One unit of a catalog item owned by one account. Immutable once created.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OwnedGift {
    pub user_id: UserId,
    pub gift_id: GiftId,
    pub name: String,
    pub preview: Option<String>,
    /// Price paid at purchase time; not the current catalog price.
    pub price: Decimal,
    pub purchased_at: DateTime<Utc>,
}

impl OwnedGift {
    pub(crate) fn new(user_id: UserId, order: &GiftOrder) -> Self {
        Self {
            user_id,
            gift_id: order.gift_id.clone(),
            name: order.name.clone(),
            preview: order.preview.clone(),
            price: order.price,
            purchased_at: Utc::now(),
        }
    }
}

/// Concurrent registry of owned gifts.
#[derive(Debug)]
pub struct GiftShelf {
    /// Owned gifts keyed by the unique `(user, gift)` pair.
    owned: DashMap<(UserId, GiftId), OwnedGift>,

    /// Per-user gift ids in acquisition order, for listing.
    by_user: DashMap<UserId, Vec<GiftId>>,
}

impl GiftShelf {
    pub fn new() -> Self {
        Self {
            owned: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Atomically checks the `(user, gift)` pair is vacant and inserts.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::AlreadyOwned`] if the pair is taken.
    pub(crate) fn grant(&self, gift: OwnedGift) -> Result<OwnedGift, MarketError> {
        let key = (gift.user_id, gift.gift_id.clone());
        match self.owned.entry(key) {
            Entry::Occupied(_) => return Err(MarketError::AlreadyOwned),
            Entry::Vacant(entry) => {
                entry.insert(gift.clone());
            }
        }
        // The ownership guard is released before the index is touched;
        // the two maps are never locked at once.
        self.by_user
            .entry(gift.user_id)
            .or_default()
            .push(gift.gift_id.clone());
        Ok(gift)
    }

    /// Removes a grant that could not complete its purchase.
    pub(crate) fn revoke(&self, user_id: UserId, gift_id: &GiftId) {
        self.owned.remove(&(user_id, gift_id.clone()));
        if let Some(mut ids) = self.by_user.get_mut(&user_id) {
            ids.retain(|id| id != gift_id);
        }
    }

    pub fn owns(&self, user_id: UserId, gift_id: &GiftId) -> bool {
        self.owned.contains_key(&(user_id, gift_id.clone()))
    }

    /// The user's gifts in acquisition order; empty for unknown users.
    pub fn gifts_for(&self, user_id: UserId) -> Vec<OwnedGift> {
        let Some(ids) = self.by_user.get(&user_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|gift_id| {
                self.owned
                    .get(&(user_id, gift_id.clone()))
                    .map(|gift| gift.clone())
            })
            .collect()
    }

    pub fn count_for(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map_or(0, |ids| ids.len())
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

impl Default for GiftShelf {
    fn default() -> Self {
        Self::new()
    }
}
