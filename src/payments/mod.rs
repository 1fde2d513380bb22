pub mod document;
pub mod policy;
pub mod rounding;
pub mod waterfall;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::CollectionTypeCatalog;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::types::Collection;

pub use document::collect_document;
pub use policy::collect_credit;
pub use rounding::reconcile;
pub use waterfall::{allocate_next, split, Allocation, SplitOutcome};

/// result of applying one payment
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOutcome {
    /// the ledger entries produced (persisted when requested, otherwise
    /// projected)
    pub rows: Vec<Collection>,
    /// payment money that could not be attributed to any installment;
    /// zero unless penalty synthesis was skipped
    pub unallocated: Money,
}

impl CollectionOutcome {
    /// sum of the applied totals
    pub fn allocated(&self) -> Money {
        self.rows.iter().map(|r| r.total).sum()
    }
}

pub(crate) fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidPaymentAmount { amount });
    }
    Ok(())
}

pub(crate) fn to_collection(
    allocation: &Allocation,
    date: NaiveDate,
    catalog: &CollectionTypeCatalog,
) -> Collection {
    Collection {
        id: Uuid::new_v4(),
        installment_id: allocation.installment_id,
        date,
        kind: allocation.kind,
        type_code: catalog.code(allocation.kind),
        capital: allocation.capital,
        interest: allocation.interest,
        tax: allocation.tax,
        total: allocation.total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::types::CollectionKind;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Money::from_major(1)).is_ok());
        assert!(validate_amount(Money::ZERO).is_err());
        assert!(validate_amount(-Money::from_major(1)).is_err());
    }

    #[test]
    fn test_to_collection_stamps_catalog_code() {
        let allocation = Allocation {
            installment_id: 7,
            credit_id: 3,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 28).unwrap(),
            kind: CollectionKind::Bonus,
            capital: Money::ZERO,
            interest: Money::from_major(10),
            tax: Money::from_major(2),
            total: Money::from_major(12),
        };
        let catalog = CollectionTypeCatalog::default();
        let row = to_collection(&allocation, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), &catalog);
        assert_eq!(row.kind, CollectionKind::Bonus);
        assert_eq!(row.type_code, catalog.bonus);
        assert_eq!(row.total, Money::from_major(12));
    }
}
