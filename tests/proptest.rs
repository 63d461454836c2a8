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

//! Property-based tests for the marketplace engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid operations.

use gift_market_rs::{Currency, GiftOrder, Market, MarketConfig, MarketError, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive TON amount (0.0001 to 1000 with 4 decimal places).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000i64).prop_map(|cents| Decimal::new(cents, 4))
}

/// Generate an operation: credit (true) or debit (false) with an amount.
fn arb_operation() -> impl Strategy<Value = (bool, Decimal)> {
    (any::<bool>(), arb_amount())
}

fn market() -> Market {
    Market::new(MarketConfig::default())
}

// =============================================================================
// Balance Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The TON balance is never negative after any operation sequence.
    #[test]
    fn balance_never_negative(
        operations in prop::collection::vec(arb_operation(), 1..40),
    ) {
        let market = market();
        let user = UserId(1);

        for (is_credit, amount) in operations {
            if is_credit {
                let _ = market.deposit(user, amount, Currency::Ton, None);
            } else {
                // May fail with InsufficientBalance; that's the point.
                let _ = market.withdraw(user, amount, Currency::Ton, None);
            }
        }

        prop_assert!(market.balance(user).0 >= Decimal::ZERO);
    }

    /// Successful credits minus successful debits equals the balance.
    #[test]
    fn ledger_conserves_balance(
        operations in prop::collection::vec(arb_operation(), 1..40),
    ) {
        let market = market();
        let user = UserId(1);
        let mut expected = Decimal::ZERO;

        for (is_credit, amount) in operations {
            if is_credit {
                if market.deposit(user, amount, Currency::Ton, None).is_ok() {
                    expected += amount;
                }
            } else if market.withdraw(user, amount, Currency::Ton, None).is_ok() {
                expected -= amount;
            }
        }

        prop_assert_eq!(market.balance(user).0, expected);
    }

    /// Every successful mutation leaves exactly one ledger row.
    #[test]
    fn every_mutation_has_one_row(
        operations in prop::collection::vec(arb_operation(), 1..40),
    ) {
        let market = market();
        let user = UserId(1);
        let mut successes = 0usize;

        for (is_credit, amount) in operations {
            let result = if is_credit {
                market.deposit(user, amount, Currency::Ton, None)
            } else {
                market.withdraw(user, amount, Currency::Ton, None)
            };
            if result.is_ok() {
                successes += 1;
            }
        }

        prop_assert_eq!(market.transactions_for(user, usize::MAX).len(), successes);
    }
}

// =============================================================================
// Purchase Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Funds are conserved across purchases: remaining balance plus the sum
    /// of prices paid equals the amount deposited.
    #[test]
    fn purchases_conserve_funds(
        deposit in arb_amount(),
        prices in prop::collection::vec(arb_amount(), 1..10),
    ) {
        let market = market();
        let user = UserId(1);
        market.deposit(user, deposit, Currency::Ton, None).unwrap();

        for (i, price) in prices.iter().enumerate() {
            let order = GiftOrder {
                gift_id: format!("g-{i}").as_str().into(),
                name: format!("Gift {i}"),
                preview: None,
                price: *price,
            };
            let _ = market.purchase(user, &order);
        }

        let spent: Decimal = market
            .gifts_for(user)
            .iter()
            .map(|gift| gift.price)
            .sum();
        prop_assert_eq!(market.balance(user).0 + spent, deposit);
    }

    /// A purchase failure leaves no ownership behind.
    #[test]
    fn failed_purchase_grants_nothing(
        balance in arb_amount(),
        price in arb_amount(),
    ) {
        prop_assume!(price > balance);

        let market = market();
        let user = UserId(1);
        market.deposit(user, balance, Currency::Ton, None).unwrap();

        let order = GiftOrder {
            gift_id: "g-expensive".into(),
            name: "Expensive".to_string(),
            preview: None,
            price,
        };
        let result = market.purchase(user, &order);

        prop_assert_eq!(result.unwrap_err(), MarketError::InsufficientBalance);
        prop_assert!(market.gifts_for(user).is_empty());
        prop_assert_eq!(market.balance(user).0, balance);
    }
}

// =============================================================================
// Promo Code Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Redeeming an issued code credits exactly the issued amount, once.
    #[test]
    fn redeem_credits_issued_amount(amount in arb_amount()) {
        let market = market();
        let promo = market.issue_code(amount).unwrap();

        market.redeem_code(&promo.code, UserId(1)).unwrap();
        prop_assert_eq!(market.balance(UserId(1)).0, amount);

        let again = market.redeem_code(&promo.code, UserId(1));
        prop_assert_eq!(again.unwrap_err(), MarketError::CodeAlreadyUsed);
        prop_assert_eq!(market.balance(UserId(1)).0, amount);
    }
}
