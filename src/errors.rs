use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ClientId, CreditId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("unknown collection type code: {code}")]
    UnknownCollectionCode {
        code: u16,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("credit not found: {id}")]
    CreditNotFound {
        id: CreditId,
    },

    #[error("no credits disbursed on or before {date} for client {client_id}")]
    NoEligibleCredits {
        client_id: ClientId,
        date: NaiveDate,
    },

    #[error("multiple installments numbered {seq} stored for credit {credit_id}")]
    DuplicateInstallment {
        credit_id: CreditId,
        seq: u32,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
