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

//! Explicit configuration for the marketplace.
//!
//! Everything that used to be ambient (allow-lists, batch sizes, retry
//! bounds) is carried here and handed to [`crate::Market`] at construction.

use crate::base::UserId;
use std::collections::HashSet;
use std::time::Duration;

/// Construction-time configuration for [`crate::Market`] and
/// [`crate::AdminConsole`].
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Administrator allow-list. An empty set leaves administrative
    /// commands open to every caller.
    pub admin_ids: HashSet<UserId>,

    /// Durability boundary for mass credits: progress is committed every
    /// this many accounts.
    pub mass_credit_batch_size: usize,

    /// Bounded promo-code generation attempts before
    /// `CodeGenerationExhausted`.
    pub promo_attempts: usize,

    /// How long a pending administrative confirmation stays valid.
    pub session_ttl: Duration,
}

impl MarketConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_PROMO_ATTEMPTS: usize = 10;
    pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(120);
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            admin_ids: HashSet::new(),
            mass_credit_batch_size: Self::DEFAULT_BATCH_SIZE,
            promo_attempts: Self::DEFAULT_PROMO_ATTEMPTS,
            session_ttl: Self::DEFAULT_SESSION_TTL,
        }
    }
}
