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

use clap::Parser;
use gift_market_rs::api::{AppState, create_router};
use gift_market_rs::{Market, MarketConfig, UserId};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Gift Market API - marketplace ledger over HTTP
///
/// Serves the account, balance, gift, transaction, and promo-code endpoints
/// backed by the in-process marketplace engine.
#[derive(Parser, Debug)]
#[command(name = "gift-market-rs")]
#[command(about = "A marketplace ledger server", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    listen: SocketAddr,

    /// Administrator user ids; may be given multiple times.
    ///
    /// An empty list leaves administrative commands open (useful for local
    /// testing only).
    #[arg(long = "admin", value_name = "USER_ID")]
    admins: Vec<u64>,

    /// Mass-credit batch size (progress commits every N accounts)
    #[arg(long, default_value_t = MarketConfig::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Seconds a pending admin confirmation stays valid
    #[arg(long, default_value_t = 120)]
    session_ttl: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = MarketConfig {
        admin_ids: args.admins.iter().copied().map(UserId).collect(),
        mass_credit_batch_size: args.batch_size,
        session_ttl: Duration::from_secs(args.session_ttl),
        ..MarketConfig::default()
    };

    let state = AppState {
        market: Arc::new(Market::new(config)),
    };
    let app = create_router(state);

    let listener = match TcpListener::bind(args.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", args.listen, e);
            process::exit(1);
        }
    };

    tracing::info!("Gift Market API listening on http://{}", args.listen);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
        process::exit(1);
    }
}
