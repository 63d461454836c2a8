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

//! Core identifier and currency types.

use crate::MarketError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a marketplace user.
///
/// Wraps a `u64` holding the numeric id assigned by the upstream identity
/// provider. Ids are stable and never generated by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog identifier for a gift.
///
/// Catalog ids are opaque strings issued by the gift catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GiftId(pub String);

impl fmt::Display for GiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GiftId {
    fn from(value: &str) -> Self {
        GiftId(value.to_string())
    }
}

/// Unique identifier for a ledger transaction.
///
/// Wraps a `u64` generated by the ledger at record time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two supported balance currencies.
///
/// Any other currency code is rejected at the boundary with
/// [`MarketError::InvalidCurrency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ton,
    Stars,
}

impl Currency {
    /// Wire representation, matching the codes clients send.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Ton => "TON",
            Currency::Stars => "STARS",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TON" => Ok(Currency::Ton),
            "STARS" => Ok(Currency::Stars),
            _ => Err(MarketError::InvalidCurrency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_parses_supported_codes() {
        assert_eq!("TON".parse::<Currency>().unwrap(), Currency::Ton);
        assert_eq!("STARS".parse::<Currency>().unwrap(), Currency::Stars);
    }

    #[test]
    fn currency_rejects_unknown_codes() {
        assert_eq!("EUR".parse::<Currency>(), Err(MarketError::InvalidCurrency));
        // Codes are exact; lowercase is not accepted at the boundary.
        assert_eq!("ton".parse::<Currency>(), Err(MarketError::InvalidCurrency));
    }

    #[test]
    fn currency_round_trips_display() {
        assert_eq!(Currency::Ton.to_string(), "TON");
        assert_eq!(Currency::Stars.to_string(), "STARS");
    }
}
