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

//! Marketplace engine.
//!
//! The [`Market`] is the central component owning accounts, the transaction
//! ledger, gift ownership, and promo codes. External surfaces (HTTP
//! handlers, the admin console) call through it; nothing holds a reference
//! to a stored row across operations.
//!
//! # Consistency
//!
//! - Every balance mutation runs under the owning account's mutex and is
//!   paired with its ledger row inside that critical section.
//! - A purchase's three effects (debit, ownership grant, ledger row) commit
//!   together: all fallible checks precede the first write.
//! - Mass credit deliberately relaxes this to per-batch durability (see
//!   [`Market::mass_credit`]).
//!
//! # Thread Safety
//!
//! Accounts live in a [`DashMap`], so operations on different users run in
//! parallel; operations on one user serialize on that account's mutex.

use crate::account::{Account, AccountView, ProfileUpdate};
use crate::base::{Currency, GiftId, UserId};
use crate::config::MarketConfig;
use crate::gift::{GiftOrder, GiftShelf, OwnedGift};
use crate::ledger::Ledger;
use crate::promo::{PromoCode, PromoVault};
use crate::transaction::{Transaction, TransactionDraft, TransactionKind, TransactionStatus};
use crate::MarketError;
use dashmap::DashMap;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

/// Outcome of one mass-credit run.
///
/// `succeeded + failed == total`; the run is not atomic as a whole, so a
/// nonzero `failed` does not imply any rollback of the successes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MassCreditReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Audit token stamped into every ledger row the run created.
    pub run_reference: String,
}

/// Central marketplace engine managing accounts, gifts, the ledger, and
/// promo codes.
pub struct Market {
    config: MarketConfig,
    /// Accounts indexed by external user id.
    accounts: DashMap<UserId, Account>,
    /// Append-only transaction history.
    ledger: Ledger,
    /// Gift ownership registry.
    gifts: GiftShelf,
    /// Promo code store.
    promos: PromoVault,
}

impl Market {
    pub fn new(config: MarketConfig) -> Self {
        let promos = PromoVault::new(config.promo_attempts);
        Market {
            config,
            accounts: DashMap::new(),
            ledger: Ledger::new(),
            gifts: GiftShelf::new(),
            promos,
        }
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    // === Account Balance Manager ===

    /// Returns the existing account or creates one with zero balances.
    ///
    /// Idempotent and safe under concurrent first access: the map's entry
    /// API supplies the uniqueness guarantee, so N racing callers produce
    /// exactly one account.
    pub fn ensure_account(&self, user_id: UserId) -> AccountView {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id))
            .view()
    }

    /// Creates or updates profile fields, never touching balances.
    pub fn upsert_profile(&self, user_id: UserId, update: &ProfileUpdate) -> AccountView {
        let account = self
            .accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id));
        let mut data = account.lock();
        data.apply_profile(update);
        data.view()
    }

    /// Snapshot of an account, if it exists.
    pub fn get_account(&self, user_id: UserId) -> Option<AccountView> {
        self.accounts.get(&user_id).map(|account| account.view())
    }

    /// `(balance_ton, balance_stars)`, creating the account if absent.
    ///
    /// Upsert-on-read is deliberate: the first balance query a client makes
    /// must not 404.
    pub fn balance(&self, user_id: UserId) -> (Decimal, i64) {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id))
            .balances()
    }

    /// Credits `amount` and records the matching deposit row.
    ///
    /// The credit and its ledger row are created inside the same
    /// account-mutex hold, so no reader observes one without the other.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InvalidAmount`] - Non-positive or fractional-Stars amount.
    /// - [`MarketError::BalanceOverflow`] - Credit would overflow the field.
    pub fn deposit(
        &self,
        user_id: UserId,
        amount: Decimal,
        currency: Currency,
        tx_hash: Option<String>,
    ) -> Result<Transaction, MarketError> {
        let account = self
            .accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id));
        let mut data = account.lock();
        data.credit(amount, currency)?;
        let transaction = self.ledger.record(TransactionDraft {
            user_id,
            kind: TransactionKind::Deposit,
            amount,
            currency,
            gift_id: None,
            tx_hash,
            status: TransactionStatus::Completed,
        });
        Ok(transaction)
    }

    /// Debits `amount` and records the matching withdraw row.
    ///
    /// # Errors
    ///
    /// - [`MarketError::InsufficientBalance`] - Pre-debit balance is short.
    /// - [`MarketError::InvalidAmount`] - Non-positive or fractional-Stars amount.
    pub fn withdraw(
        &self,
        user_id: UserId,
        amount: Decimal,
        currency: Currency,
        tx_hash: Option<String>,
    ) -> Result<Transaction, MarketError> {
        let account = self
            .accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id));
        let mut data = account.lock();
        data.debit(amount, currency)?;
        let transaction = self.ledger.record(TransactionDraft {
            user_id,
            kind: TransactionKind::Withdraw,
            amount,
            currency,
            gift_id: None,
            tx_hash,
            status: TransactionStatus::Completed,
        });
        Ok(transaction)
    }

    // === Gift Purchase Workflow ===

    /// Buys one catalog gift: debit TON by the price, grant ownership,
    /// record the purchase row. All three effects commit or none do.
    ///
    /// Preconditions, in order: the account exists, the balance covers the
    /// price, the `(user, gift)` pair is not already owned.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] - No such account.
    /// - [`MarketError::InvalidAmount`] - Non-positive price.
    /// - [`MarketError::InsufficientBalance`] - TON balance below the price.
    /// - [`MarketError::AlreadyOwned`] - Gift already owned by this user.
    pub fn purchase(&self, user_id: UserId, order: &GiftOrder) -> Result<OwnedGift, MarketError> {
        let account = self.accounts.get(&user_id).ok_or(MarketError::NotFound)?;
        let mut data = account.lock();

        if order.price <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }
        if data.balance_ton() < order.price {
            return Err(MarketError::InsufficientBalance);
        }

        // Last fallible step before the writes: atomically reserve the
        // (user, gift) pair.
        let gift = self.gifts.grant(OwnedGift::new(user_id, order))?;

        if let Err(error) = data.debit(order.price, Currency::Ton) {
            // A failed debit must not leave ownership behind.
            self.gifts.revoke(user_id, &order.gift_id);
            return Err(error);
        }

        self.ledger.record(TransactionDraft {
            user_id,
            kind: TransactionKind::Purchase,
            amount: order.price,
            currency: Currency::Ton,
            gift_id: Some(order.gift_id.clone()),
            tx_hash: None,
            status: TransactionStatus::Completed,
        });

        Ok(gift)
    }

    /// Grants a gift without debiting (administrative path).
    ///
    /// The ledger row carries `reference` so the grant stays auditable.
    ///
    /// # Errors
    ///
    /// - [`MarketError::NotFound`] - No such account.
    /// - [`MarketError::InvalidAmount`] - Negative price.
    /// - [`MarketError::AlreadyOwned`] - Gift already owned by this user.
    pub fn grant_gift(
        &self,
        user_id: UserId,
        order: &GiftOrder,
        reference: Option<String>,
    ) -> Result<OwnedGift, MarketError> {
        let account = self.accounts.get(&user_id).ok_or(MarketError::NotFound)?;
        // Serialize with purchases on the same account so ownership and
        // ledger stay consistent.
        let _data = account.lock();

        if order.price < Decimal::ZERO {
            return Err(MarketError::InvalidAmount);
        }

        let gift = self.gifts.grant(OwnedGift::new(user_id, order))?;

        self.ledger.record(TransactionDraft {
            user_id,
            kind: TransactionKind::Purchase,
            amount: order.price,
            currency: Currency::Ton,
            gift_id: Some(order.gift_id.clone()),
            tx_hash: reference,
            status: TransactionStatus::Completed,
        });

        Ok(gift)
    }

    /// The user's gifts in acquisition order; empty for unknown users.
    pub fn gifts_for(&self, user_id: UserId) -> Vec<OwnedGift> {
        self.gifts.gifts_for(user_id)
    }

    pub fn owns_gift(&self, user_id: UserId, gift_id: &GiftId) -> bool {
        self.gifts.owns(user_id, gift_id)
    }

    // === Ledger Queries ===

    /// Up to `limit` of the user's rows, most recent first; empty for
    /// unknown users.
    pub fn transactions_for(&self, user_id: UserId, limit: usize) -> Vec<Transaction> {
        self.ledger.transactions_for(user_id, limit)
    }

    pub fn transaction_count_for(&self, user_id: UserId) -> usize {
        self.ledger.transactions_for(user_id, usize::MAX).len()
    }

    // === Promo Codes ===

    /// Issues a single-use code worth `amount` TON.
    pub fn issue_code(&self, amount: Decimal) -> Result<PromoCode, MarketError> {
        self.promos.issue(amount)
    }

    /// Redeems a code for the calling user.
    ///
    /// Holding the code's mutex across mark-used + credit + record makes
    /// redeem-without-credit and credit-without-mark-used impossible; a
    /// concurrent second redeemer blocks on the mutex and then observes
    /// `used = true`.
    ///
    /// # Errors
    ///
    /// - [`MarketError::CodeNotFound`] - No such code.
    /// - [`MarketError::CodeAlreadyUsed`] - Code was already redeemed.
    pub fn redeem_code(&self, code: &str, user_id: UserId) -> Result<Transaction, MarketError> {
        let cell = self.promos.cell(code).ok_or(MarketError::CodeNotFound)?;
        let mut promo = cell.lock();
        if promo.used {
            return Err(MarketError::CodeAlreadyUsed);
        }

        let transaction = self.deposit(
            user_id,
            promo.amount,
            Currency::Ton,
            Some(format!("promo_{code}")),
        )?;
        promo.mark_used(user_id, transaction.id);

        Ok(transaction)
    }

    /// Snapshot of one code's current state.
    pub fn promo(&self, code: &str) -> Option<PromoCode> {
        self.promos.get(code)
    }

    // === Bulk Operation Coordinator ===

    /// Credits `amount` to every account, committing progress per batch.
    ///
    /// A per-item failure is logged and counted, not propagated, and does
    /// not abort the remaining items; batches already committed stay
    /// committed if a later item fails. The whole run is deliberately not
    /// atomic. Every row the run creates carries the returned
    /// `run_reference`, so an operator can audit how far an interrupted run
    /// got before re-running it.
    pub fn mass_credit(&self, amount: Decimal, currency: Currency) -> MassCreditReport {
        let run_reference = run_reference();
        let mut user_ids = self.user_ids();
        // Stable sweep order, so batch boundaries are reproducible.
        user_ids.sort_unstable();
        let total = user_ids.len();
        let batch_size = self.config.mass_credit_batch_size.max(1);
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for (batch_index, batch) in user_ids.chunks(batch_size).enumerate() {
            for &user_id in batch {
                match self.deposit(
                    user_id,
                    amount,
                    currency,
                    Some(format!("bulk_{run_reference}")),
                ) {
                    Ok(_) => succeeded += 1,
                    Err(error) => {
                        failed += 1;
                        tracing::warn!(%user_id, %error, "mass credit item failed");
                    }
                }
            }
            tracing::info!(
                batch = batch_index + 1,
                processed = succeeded + failed,
                total,
                "mass credit batch committed"
            );
        }

        MassCreditReport {
            total,
            succeeded,
            failed,
            run_reference,
        }
    }

    // === Listings ===

    /// Snapshot of all account ids.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.accounts.iter().map(|entry| *entry.key()).collect()
    }

    /// Up to `limit` account snapshots, newest first.
    pub fn list_accounts(&self, limit: usize) -> Vec<AccountView> {
        let mut views: Vec<AccountView> = self
            .accounts
            .iter()
            .map(|entry| entry.value().view())
            .collect();
        views.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.user_id.cmp(&a.user_id))
        });
        views.truncate(limit);
        views
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

/// Short random token identifying one bulk run in the audit trail.
fn run_reference() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| rng.random_range(b'a'..=b'z') as char)
        .collect()
}
