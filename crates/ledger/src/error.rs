//! The module contains the errors the ledger can raise.
//!
//! The local, caller-correctable conditions are:
//!
//! - [`InvalidAmount`] and [`InvalidTitle`], rejected before any store
//!   access.
//! - [`InsufficientBalance`], rejected after the atomic balance check with
//!   no write performed.
//! - [`InvalidPeriod`], rejected before any store access.
//! - [`NotFound`], surfaced from the store layer unchanged.
//!
//! [`Unavailable`] reports a transient store failure that persisted across
//! the single admission retry. Everything else passes through as
//! [`Database`].
//!
//! [`InvalidAmount`]: LedgerError::InvalidAmount
//! [`InvalidTitle`]: LedgerError::InvalidTitle
//! [`InsufficientBalance`]: LedgerError::InsufficientBalance
//! [`InvalidPeriod`]: LedgerError::InvalidPeriod
//! [`NotFound`]: LedgerError::NotFound
//! [`Unavailable`]: LedgerError::Unavailable
//! [`Database`]: LedgerError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid title: {0}")]
    InvalidTitle(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTitle(a), Self::InvalidTitle(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::InvalidPeriod(a), Self::InvalidPeriod(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unavailable(a), Self::Unavailable(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
