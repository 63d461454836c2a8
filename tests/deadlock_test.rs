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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! The engine layers several locks: account mutexes inside a DashMap,
//! ownership and ledger shard locks, and per-code promo mutexes. These
//! tests drive mixed workloads across all of them and verify the lock
//! graph never cycles.

use gift_market_rs::{Currency, GiftOrder, Market, MarketConfig, UserId};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> (Arc<AtomicBool>, Arc<AtomicBool>) {
    let running = Arc::new(AtomicBool::new(true));
    let detected = Arc::new(AtomicBool::new(false));
    let running_clone = running.clone();
    let detected_clone = detected.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                detected_clone.store(true, Ordering::SeqCst);
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("Deadlock #{} involves {} threads", i + 1, threads.len());
                }
            }
        }
    });

    (running, detected)
}

fn stop_deadlock_detector(running: Arc<AtomicBool>, detected: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    assert!(
        !detected.load(Ordering::SeqCst),
        "deadlock detector fired during the test"
    );
}

fn order(gift_id: &str, price: Decimal) -> GiftOrder {
    GiftOrder {
        gift_id: gift_id.into(),
        name: format!("Gift {gift_id}"),
        preview: None,
        price,
    }
}

// === Tests ===

#[test]
fn no_deadlock_high_contention_single_account() {
    let (running, detected) = start_deadlock_detector();
    let market = Arc::new(Market::new(MarketConfig::default()));

    market
        .deposit(UserId(1), dec!(10000.00), Currency::Ton, None)
        .unwrap();

    let mut handles = vec![];
    for i in 0..8u32 {
        let market = Arc::clone(&market);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                if i % 2 == 0 {
                    let _ = market.deposit(UserId(1), dec!(1.00), Currency::Ton, None);
                } else {
                    let _ = market.withdraw(UserId(1), dec!(1.00), Currency::Ton, None);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(market.balance(UserId(1)).0 >= Decimal::ZERO);
    stop_deadlock_detector(running, detected);
}

#[test]
fn no_deadlock_cross_account_operations() {
    let (running, detected) = start_deadlock_detector();
    let market = Arc::new(Market::new(MarketConfig::default()));

    for id in 1..=16u64 {
        market
            .deposit(UserId(id), dec!(100.00), Currency::Ton, None)
            .unwrap();
    }

    let mut handles = vec![];
    for t in 0..8u64 {
        let market = Arc::clone(&market);
        handles.push(thread::spawn(move || {
            for i in 0..200u64 {
                let user = UserId((t * 31 + i) % 16 + 1);
                match i % 3 {
                    0 => {
                        let _ = market.deposit(user, dec!(0.50), Currency::Ton, None);
                    }
                    1 => {
                        let _ = market.withdraw(user, dec!(0.25), Currency::Ton, None);
                    }
                    _ => {
                        let _ = market.balance(user);
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for id in 1..=16u64 {
        assert!(market.balance(UserId(id)).0 >= Decimal::ZERO);
    }
    stop_deadlock_detector(running, detected);
}

#[test]
fn no_deadlock_purchases_against_mass_credit() {
    let (running, detected) = start_deadlock_detector();
    let market = Arc::new(Market::new(MarketConfig::default()));

    for id in 1..=12u64 {
        market
            .deposit(UserId(id), dec!(50.00), Currency::Ton, None)
            .unwrap();
    }

    let mut handles = vec![];

    // Buyers hammer the ownership registry and account locks.
    for t in 0..4u64 {
        let market = Arc::clone(&market);
        handles.push(thread::spawn(move || {
            for i in 0..50u64 {
                let user = UserId(i % 12 + 1);
                let _ = market.purchase(user, &order(&format!("g-{t}-{i}"), dec!(0.10)));
            }
        }));
    }

    // The bulk coordinator sweeps all accounts concurrently.
    for _ in 0..2 {
        let market = Arc::clone(&market);
        handles.push(thread::spawn(move || {
            for _ in 0..5 {
                let report = market.mass_credit(dec!(1.00), Currency::Ton);
                assert_eq!(report.failed, 0);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for id in 1..=12u64 {
        assert!(market.balance(UserId(id)).0 >= Decimal::ZERO);
    }
    stop_deadlock_detector(running, detected);
}

#[test]
fn no_deadlock_redeems_interleaved_with_deposits() {
    let (running, detected) = start_deadlock_detector();
    let market = Arc::new(Market::new(MarketConfig::default()));

    let codes: Vec<String> = (0..32)
        .map(|_| market.issue_code(dec!(1.00)).unwrap().code)
        .collect();

    let mut handles = vec![];

    for t in 0..4u64 {
        let market = Arc::clone(&market);
        let codes = codes.clone();
        handles.push(thread::spawn(move || {
            for code in &codes {
                let _ = market.redeem_code(code, UserId(t + 1));
            }
        }));
    }

    for t in 0..4u64 {
        let market = Arc::clone(&market);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let _ = market.deposit(UserId(t + 1), dec!(0.10), Currency::Ton, None);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Every code redeemed exactly once across all racers.
    let redeemed: Decimal = (1..=4u64)
        .map(|id| market.balance(UserId(id)).0)
        .sum::<Decimal>()
        - dec!(0.10) * dec!(400);
    assert_eq!(redeemed, dec!(32.00));

    stop_deadlock_detector(running, detected);
}

#[test]
fn no_deadlock_listing_during_mutation() {
    let (running, detected) = start_deadlock_detector();
    let market = Arc::new(Market::new(MarketConfig::default()));

    let stop = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    // Writers create accounts and move balances.
    for t in 0..4u64 {
        let market = Arc::clone(&market);
        let stop = stop.clone();
        handles.push(thread::spawn(move || {
            let mut i = 0u64;
            while !stop.load(Ordering::SeqCst) {
                let _ = market.deposit(UserId(t * 1000 + i % 50), dec!(1.0), Currency::Ton, None);
                i += 1;
            }
        }));
    }

    // Readers iterate listings while writers run.
    for _ in 0..2 {
        let market = Arc::clone(&market);
        let stop = stop.clone();
        handles.push(thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                let _ = market.list_accounts(100);
                let _ = market.user_ids();
            }
        }));
    }

    thread::sleep(Duration::from_millis(500));
    stop.store(true, Ordering::SeqCst);
    for handle in handles {
        handle.join().unwrap();
    }

    stop_deadlock_detector(running, detected);
}
