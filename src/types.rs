use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// numeric identifiers: ordered, assigned by the store in insertion order
pub type CreditId = u64;
pub type InstallmentId = u64;
pub type ClientId = u64;
pub type OrganismId = u64;

/// opaque identifier for an append-only collection entry
pub type CollectionId = Uuid;

/// amortization method for a credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// fixed periodic payment, declining interest component
    French,
    /// constant principal, declining interest
    German,
    /// pure interest+tax charge with no principal, single installment
    Penalty,
}

/// every ledger entry carries one of these tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    Ordinary,
    Advance,
    Penalty,
    Bonus,
    Rounding,
}

/// the caller-selectable payment semantics; the other collection kinds
/// are only ever synthesized by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    Ordinary,
    Advance,
}

impl PaymentKind {
    pub fn collection_kind(self) -> CollectionKind {
        match self {
            PaymentKind::Ordinary => CollectionKind::Ordinary,
            PaymentKind::Advance => CollectionKind::Advance,
        }
    }
}

/// a disbursed credit; immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: CreditId,
    pub origin_id: Option<u64>,
    pub method: AmortizationMethod,
    pub capital_requested: Money,
    /// disbursed capital, the base of the schedule
    pub capital: Money,
    /// annual nominal rate, inclusive of tax
    pub annual_rate: Rate,
    pub term: u32,
    pub disbursement_date: NaiveDate,
    /// month of the first installment; due days always land on the 28th
    pub first_due: NaiveDate,
    pub client_id: ClientId,
    pub organism_id: OrganismId,
}

/// credit parameters before the store assigns an identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCredit {
    pub origin_id: Option<u64>,
    pub method: AmortizationMethod,
    pub capital_requested: Money,
    pub capital: Money,
    pub annual_rate: Rate,
    pub term: u32,
    pub disbursement_date: NaiveDate,
    pub first_due: NaiveDate,
    pub client_id: ClientId,
    pub organism_id: OrganismId,
}

impl NewCredit {
    pub fn with_id(self, id: CreditId) -> Credit {
        Credit {
            id,
            origin_id: self.origin_id,
            method: self.method,
            capital_requested: self.capital_requested,
            capital: self.capital,
            annual_rate: self.annual_rate,
            term: self.term,
            disbursement_date: self.disbursement_date,
            first_due: self.first_due,
            client_id: self.client_id,
            organism_id: self.organism_id,
        }
    }
}

/// one scheduled installment; never mutated after creation, its remaining
/// balance is always derived from the collection history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub credit_id: CreditId,
    /// 1-based sequence number within the credit
    pub seq: u32,
    pub owner_id: u64,
    pub due_date: NaiveDate,
    pub capital: Money,
    /// net of tax
    pub interest: Money,
    pub tax: Money,
    pub total: Money,
}

/// installment row before the store assigns an identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstallment {
    pub credit_id: CreditId,
    pub seq: u32,
    pub owner_id: u64,
    pub due_date: NaiveDate,
    pub capital: Money,
    pub interest: Money,
    pub tax: Money,
    pub total: Money,
}

impl NewInstallment {
    pub fn with_id(self, id: InstallmentId) -> Installment {
        Installment {
            id,
            credit_id: self.credit_id,
            seq: self.seq,
            owner_id: self.owner_id,
            due_date: self.due_date,
            capital: self.capital,
            interest: self.interest,
            tax: self.tax,
            total: self.total,
        }
    }
}

/// append-only ledger entry applying money against one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub installment_id: InstallmentId,
    pub date: NaiveDate,
    pub kind: CollectionKind,
    /// stable numeric code from the configured catalog
    pub type_code: u16,
    pub capital: Money,
    pub interest: Money,
    pub tax: Money,
    pub total: Money,
}

/// derived view: remaining balance of one installment as of a cutoff date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub installment_id: InstallmentId,
    pub credit_id: CreditId,
    pub seq: u32,
    pub due_date: NaiveDate,
    pub capital: Money,
    pub interest: Money,
    pub tax: Money,
    pub total: Money,
}

impl BalanceRow {
    /// recompute the total from the three components
    pub fn retotal(&mut self) {
        self.total = self.capital + self.interest + self.tax;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_kind_maps_to_collection_kind() {
        assert_eq!(
            PaymentKind::Ordinary.collection_kind(),
            CollectionKind::Ordinary
        );
        assert_eq!(
            PaymentKind::Advance.collection_kind(),
            CollectionKind::Advance
        );
    }

    #[test]
    fn test_retotal() {
        let mut row = BalanceRow {
            installment_id: 1,
            credit_id: 1,
            seq: 1,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 28).unwrap(),
            capital: Money::from_major(100),
            interest: Money::from_major(10),
            tax: Money::from_major(2),
            total: Money::ZERO,
        };
        row.retotal();
        assert_eq!(row.total, Money::from_major(112));
    }
}
