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

//! Administrative console.
//!
//! Wraps a [`Market`] with the command surface a chat front-end exposes to
//! operators: balance grants, listings, manual gift grants, and the
//! destructive two-step commands (broadcast, mass credit) that require an
//! explicit propose → confirm round trip.
//!
//! Authorization is a static allow-list from [`MarketConfig`]; an empty
//! list leaves the console open to every caller. Message rendering and
//! delivery belong to the transport, not here: a confirmed broadcast
//! resolves to a [`BroadcastPlan`] for the transport to carry out.
//!
//! [`MarketConfig`]: crate::MarketConfig

use crate::account::AccountView;
use crate::base::{Currency, UserId};
use crate::engine::{Market, MassCreditReport};
use crate::gift::{GiftOrder, OwnedGift};
use crate::session::{ActionKind, PendingAction, SessionState, SessionStore};
use crate::transaction::Transaction;
use crate::MarketError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// Everything a transport needs to deliver a confirmed broadcast.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BroadcastPlan {
    pub message: String,
    pub recipients: Vec<UserId>,
}

/// Result of confirming a pending two-step command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    MassCredit(MassCreditReport),
    Broadcast(BroadcastPlan),
}

/// Per-user detail for the operator view.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserDetail {
    pub account: AccountView,
    pub gift_count: usize,
    pub transaction_count: usize,
}

/// Operator command surface over a shared [`Market`].
pub struct AdminConsole {
    market: Arc<Market>,
    sessions: SessionStore,
}

impl AdminConsole {
    pub fn new(market: Arc<Market>) -> Self {
        let sessions = SessionStore::new(market.config().session_ttl);
        AdminConsole { market, sessions }
    }

    /// Checks the caller against the allow-list. Empty list means open.
    fn authorize(&self, caller: UserId) -> Result<(), MarketError> {
        let admin_ids = &self.market.config().admin_ids;
        if admin_ids.is_empty() || admin_ids.contains(&caller) {
            Ok(())
        } else {
            Err(MarketError::Unauthorized)
        }
    }

    /// Whether the caller would pass [`authorize`](Self::authorize).
    pub fn is_admin(&self, caller: UserId) -> bool {
        self.authorize(caller).is_ok()
    }

    // === Direct Commands ===

    /// Grants `amount` TON to a user, creating the account if absent.
    pub fn grant_balance(
        &self,
        caller: UserId,
        user_id: UserId,
        amount: Decimal,
    ) -> Result<(Transaction, AccountView), MarketError> {
        self.authorize(caller)?;
        let transaction = self.market.deposit(
            user_id,
            amount,
            Currency::Ton,
            Some(format!("admin_{caller}")),
        )?;
        let account = self
            .market
            .get_account(user_id)
            .ok_or(MarketError::NotFound)?;
        tracing::info!(%caller, %user_id, %amount, "balance granted");
        Ok((transaction, account))
    }

    /// Up to `limit` accounts, newest first.
    pub fn list_users(&self, caller: UserId, limit: usize) -> Result<Vec<AccountView>, MarketError> {
        self.authorize(caller)?;
        Ok(self.market.list_accounts(limit))
    }

    /// One user's account plus gift and transaction counts.
    pub fn user_detail(&self, caller: UserId, user_id: UserId) -> Result<UserDetail, MarketError> {
        self.authorize(caller)?;
        let account = self
            .market
            .get_account(user_id)
            .ok_or(MarketError::NotFound)?;
        Ok(UserDetail {
            gift_count: self.market.gifts_for(user_id).len(),
            transaction_count: self.market.transaction_count_for(user_id),
            account,
        })
    }

    pub fn user_gifts(&self, caller: UserId, user_id: UserId) -> Result<Vec<OwnedGift>, MarketError> {
        self.authorize(caller)?;
        Ok(self.market.gifts_for(user_id))
    }

    pub fn user_transactions(
        &self,
        caller: UserId,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Transaction>, MarketError> {
        self.authorize(caller)?;
        Ok(self.market.transactions_for(user_id, limit))
    }

    /// Manually grants a gift without charging the user.
    pub fn grant_gift(
        &self,
        caller: UserId,
        user_id: UserId,
        order: &GiftOrder,
    ) -> Result<OwnedGift, MarketError> {
        self.authorize(caller)?;
        let gift = self
            .market
            .grant_gift(user_id, order, Some(format!("admin_gift_{caller}")))?;
        tracing::info!(%caller, %user_id, gift_id = %gift.gift_id, "gift granted");
        Ok(gift)
    }

    // === Two-Step Commands ===

    /// Starts a mass-credit flow; the next [`submit_input`](Self::submit_input)
    /// call supplies the amount.
    pub fn begin_mass_credit(&self, caller: UserId) -> Result<(), MarketError> {
        self.authorize(caller)?;
        self.sessions
            .set(caller, SessionState::AwaitingInput(ActionKind::MassCredit));
        Ok(())
    }

    /// Starts a broadcast flow; the next [`submit_input`](Self::submit_input)
    /// call supplies the message.
    pub fn begin_broadcast(&self, caller: UserId) -> Result<(), MarketError> {
        self.authorize(caller)?;
        self.sessions
            .set(caller, SessionState::AwaitingInput(ActionKind::Broadcast));
        Ok(())
    }

    /// Supplies the input a started flow is waiting for and moves the
    /// session to the confirmation step. Returns the action that will run
    /// on confirm.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NoPendingAction`] - No flow is collecting input.
    /// - [`MarketError::InvalidInput`] - Unparseable amount or empty message.
    /// - [`MarketError::InvalidAmount`] - Amount parsed but is not positive.
    pub fn submit_input(&self, caller: UserId, input: &str) -> Result<PendingAction, MarketError> {
        self.authorize(caller)?;
        let SessionState::AwaitingInput(kind) = self.sessions.state(caller) else {
            return Err(MarketError::NoPendingAction);
        };

        let action = match kind {
            ActionKind::MassCredit => {
                let amount =
                    Decimal::from_str(input.trim()).map_err(|_| MarketError::InvalidInput)?;
                if amount <= Decimal::ZERO {
                    return Err(MarketError::InvalidAmount);
                }
                PendingAction::MassCredit {
                    amount,
                    currency: Currency::Ton,
                }
            }
            ActionKind::Broadcast => {
                let message = input.trim();
                if message.is_empty() {
                    return Err(MarketError::InvalidInput);
                }
                PendingAction::Broadcast {
                    message: message.to_string(),
                }
            }
        };

        self.sessions
            .set(caller, SessionState::AwaitingConfirmation(action.clone()));
        Ok(action)
    }

    /// Executes the caller's pending action.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NoPendingAction`] when nothing is pending or
    /// the session expired.
    pub fn confirm(&self, caller: UserId) -> Result<ConfirmOutcome, MarketError> {
        self.authorize(caller)?;
        match self.sessions.take_pending(caller)? {
            PendingAction::MassCredit { amount, currency } => {
                tracing::info!(%caller, %amount, %currency, "mass credit confirmed");
                Ok(ConfirmOutcome::MassCredit(
                    self.market.mass_credit(amount, currency),
                ))
            }
            PendingAction::Broadcast { message } => {
                let mut recipients = self.market.user_ids();
                recipients.sort_unstable();
                tracing::info!(%caller, recipients = recipients.len(), "broadcast confirmed");
                Ok(ConfirmOutcome::Broadcast(BroadcastPlan {
                    message,
                    recipients,
                }))
            }
        }
    }

    /// Abandons any in-progress flow.
    pub fn cancel(&self, caller: UserId) -> Result<(), MarketError> {
        self.authorize(caller)?;
        self.sessions.clear(caller);
        Ok(())
    }

    /// Current session state for the caller.
    pub fn session_state(&self, caller: UserId) -> SessionState {
        self.sessions.state(caller)
    }
}
