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

//! Error types for marketplace operations.

use thiserror::Error;

/// Marketplace operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// The referenced user does not exist where one is required
    #[error("user not found")]
    NotFound,

    /// Currency code is not one of the two supported codes
    #[error("invalid currency")]
    InvalidCurrency,

    /// Amount is zero, negative, or not representable in the currency
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Free-form input could not be parsed
    #[error("malformed input")]
    InvalidInput,

    /// Debit would exceed the current balance
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Credit would overflow the balance field
    #[error("balance overflow")]
    BalanceOverflow,

    /// The user already owns this catalog gift
    #[error("gift already owned")]
    AlreadyOwned,

    /// Promo code does not exist
    #[error("promo code not found")]
    CodeNotFound,

    /// Promo code has already been redeemed
    #[error("promo code already used")]
    CodeAlreadyUsed,

    /// All code generation attempts collided with existing codes
    #[error("promo code generation exhausted")]
    CodeGenerationExhausted,

    /// Status transition attempted on a settled transaction row
    #[error("transaction already settled")]
    TransactionSettled,

    /// Caller is not on the administrator allow-list
    #[error("caller is not an administrator")]
    Unauthorized,

    /// No pending administrative action to confirm or the session expired
    #[error("no pending action to confirm")]
    NoPendingAction,
}

#[cfg(test)]
mod tests {
    use super::MarketError;

    #[test]
    fn error_display_messages() {
        assert_eq!(MarketError::NotFound.to_string(), "user not found");
        assert_eq!(MarketError::InvalidCurrency.to_string(), "invalid currency");
        assert_eq!(
            MarketError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(MarketError::InvalidInput.to_string(), "malformed input");
        assert_eq!(
            MarketError::InsufficientBalance.to_string(),
            "insufficient balance"
        );
        assert_eq!(MarketError::BalanceOverflow.to_string(), "balance overflow");
        assert_eq!(MarketError::AlreadyOwned.to_string(), "gift already owned");
        assert_eq!(MarketError::CodeNotFound.to_string(), "promo code not found");
        assert_eq!(
            MarketError::CodeAlreadyUsed.to_string(),
            "promo code already used"
        );
        assert_eq!(
            MarketError::CodeGenerationExhausted.to_string(),
            "promo code generation exhausted"
        );
        assert_eq!(
            MarketError::TransactionSettled.to_string(),
            "transaction already settled"
        );
        assert_eq!(
            MarketError::Unauthorized.to_string(),
            "caller is not an administrator"
        );
        assert_eq!(
            MarketError::NoPendingAction.to_string(),
            "no pending action to confirm"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = MarketError::InsufficientBalance;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
