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

//! Short-lived administrative sessions.
//!
//! Multi-step console commands (broadcast, mass credit) walk an explicit
//! state machine per admin: `Idle → AwaitingInput → AwaitingConfirmation →
//! Idle`. Sessions expire after a configured TTL; an expired session behaves
//! exactly like an idle one.

use crate::MarketError;
use crate::base::{Currency, UserId};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::time::{Duration, Instant};

/// Which multi-step command a session is collecting input for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    MassCredit,
    Broadcast,
}

/// A fully specified action awaiting its confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    MassCredit { amount: Decimal, currency: Currency },
    Broadcast { message: String },
}

/// Session FSM states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingInput(ActionKind),
    AwaitingConfirmation(PendingAction),
}

#[derive(Debug)]
struct SessionEntry {
    state: SessionState,
    touched: Instant,
}

/// Per-admin session store with TTL expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<UserId, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Current state; expired sessions read as `Idle` and are dropped.
    pub fn state(&self, user_id: UserId) -> SessionState {
        // The read guard must be released before the expired entry can be
        // removed from the same shard.
        let expired = match self.sessions.get(&user_id) {
            Some(entry) if entry.touched.elapsed() < self.ttl => return entry.state.clone(),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(&user_id);
        }
        SessionState::Idle
    }

    /// Replaces the state and refreshes the TTL clock.
    pub fn set(&self, user_id: UserId, state: SessionState) {
        self.sessions.insert(
            user_id,
            SessionEntry {
                state,
                touched: Instant::now(),
            },
        );
    }

    pub fn clear(&self, user_id: UserId) {
        self.sessions.remove(&user_id);
    }

    /// Consumes a pending confirmation, resetting the session to idle.
    ///
    /// A session that is still collecting input survives a stray confirm.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NoPendingAction`] when the session is idle,
    /// expired, or still collecting input.
    pub fn take_pending(&self, user_id: UserId) -> Result<PendingAction, MarketError> {
        let mut entry = self
            .sessions
            .get_mut(&user_id)
            .ok_or(MarketError::NoPendingAction)?;
        if entry.touched.elapsed() >= self.ttl {
            drop(entry);
            self.sessions.remove(&user_id);
            return Err(MarketError::NoPendingAction);
        }
        if !matches!(entry.state, SessionState::AwaitingConfirmation(_)) {
            return Err(MarketError::NoPendingAction);
        }
        let state = std::mem::replace(&mut entry.state, SessionState::Idle);
        drop(entry);
        self.sessions.remove(&user_id);
        match state {
            SessionState::AwaitingConfirmation(action) => Ok(action),
            _ => Err(MarketError::NoPendingAction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::thread;

    #[test]
    fn fresh_session_is_idle() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.state(UserId(1)), SessionState::Idle);
    }

    #[test]
    fn walk_the_full_state_machine() {
        let store = SessionStore::new(Duration::from_secs(60));
        let admin = UserId(1);

        store.set(admin, SessionState::AwaitingInput(ActionKind::MassCredit));
        assert_eq!(
            store.state(admin),
            SessionState::AwaitingInput(ActionKind::MassCredit)
        );

        let action = PendingAction::MassCredit {
            amount: dec!(5.0),
            currency: Currency::Ton,
        };
        store.set(admin, SessionState::AwaitingConfirmation(action.clone()));

        assert_eq!(store.take_pending(admin).unwrap(), action);
        // Consumed: back to idle.
        assert_eq!(store.state(admin), SessionState::Idle);
        assert_eq!(store.take_pending(admin), Err(MarketError::NoPendingAction));
    }

    #[test]
    fn awaiting_input_is_not_confirmable() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set(UserId(1), SessionState::AwaitingInput(ActionKind::Broadcast));
        assert_eq!(
            store.take_pending(UserId(1)),
            Err(MarketError::NoPendingAction)
        );
    }

    #[test]
    fn expired_session_reads_idle_and_rejects_confirm() {
        let store = SessionStore::new(Duration::from_millis(20));
        let admin = UserId(1);
        store.set(
            admin,
            SessionState::AwaitingConfirmation(PendingAction::Broadcast {
                message: "hello".to_string(),
            }),
        );

        thread::sleep(Duration::from_millis(40));

        assert_eq!(store.state(admin), SessionState::Idle);
        assert_eq!(store.take_pending(admin), Err(MarketError::NoPendingAction));
    }

    #[test]
    fn clear_resets_to_idle() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set(UserId(1), SessionState::AwaitingInput(ActionKind::Broadcast));
        store.clear(UserId(1));
        assert_eq!(store.state(UserId(1)), SessionState::Idle);
    }
}
