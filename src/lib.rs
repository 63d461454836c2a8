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

//! # Gift Market
//!
//! This library provides a marketplace ledger engine managing dual-currency
//! account balances, gift purchases, an append-only transaction history, and
//! single-use promo codes.
//!
//! ## Core Components
//!
//! - [`Market`]: Central engine owning accounts, gifts, ledger, and codes
//! - [`Account`]: Balance-holding user account with atomic credit/debit
//! - [`Ledger`]: Append-only transaction history
//! - [`AdminConsole`]: Operator command surface with two-step confirmation
//! - [`MarketError`]: Error types for business-rule violations
//!
//! ## Example
//!
//! ```
//! use gift_market_rs::{Currency, Market, MarketConfig, UserId};
//! use rust_decimal_macros::dec;
//!
//! let market = Market::new(MarketConfig::default());
//!
//! // Credit a fresh account; the account is created on first reference.
//! market
//!     .deposit(UserId(1), dec!(10.0), Currency::Ton, None)
//!     .unwrap();
//!
//! let (ton, stars) = market.balance(UserId(1));
//! assert_eq!(ton, dec!(10.0));
//! assert_eq!(stars, 0);
//! ```
//!
//! ## Thread Safety
//!
//! Operations on different users run in parallel; every balance
//! check-then-mutate sequence on one account is a single critical section,
//! so concurrent debits can never drive a balance negative.

pub mod account;
pub mod admin;
pub mod api;
mod base;
mod config;
mod engine;
pub mod error;
mod gift;
mod ledger;
mod promo;
pub mod session;
mod transaction;

pub use account::{Account, AccountView, ProfileUpdate};
pub use admin::{AdminConsole, BroadcastPlan, ConfirmOutcome, UserDetail};
pub use base::{Currency, GiftId, TransactionId, UserId};
pub use config::MarketConfig;
pub use engine::{Market, MassCreditReport};
pub use error::MarketError;
pub use gift::{GiftOrder, GiftShelf, OwnedGift};
pub use ledger::Ledger;
pub use promo::{PromoCode, PromoVault, stars_to_ton};
pub use session::{ActionKind, PendingAction, SessionState, SessionStore};
pub use transaction::{Transaction, TransactionDraft, TransactionKind, TransactionStatus};
