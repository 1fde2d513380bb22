use chrono::NaiveDate;

use crate::decimal::{Money, Rate};
use crate::types::{BalanceRow, CollectionKind, CreditId, InstallmentId};

/// money applied against one installment, pending a date and type code
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub installment_id: InstallmentId,
    pub credit_id: CreditId,
    pub due_date: NaiveDate,
    pub kind: CollectionKind,
    pub capital: Money,
    pub interest: Money,
    pub tax: Money,
    pub total: Money,
}

impl Allocation {
    fn covering(row: &BalanceRow, kind: CollectionKind) -> Self {
        Self {
            installment_id: row.installment_id,
            credit_id: row.credit_id,
            due_date: row.due_date,
            kind,
            capital: row.capital,
            interest: row.interest,
            tax: row.tax,
            total: row.total,
        }
    }
}

/// result of partitioning a scope against a payment amount
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    /// installments fully covered by the payment, tagged with the kind
    pub covered: Vec<Allocation>,
    /// remaining installments, untouched, in scope order
    pub pending: Vec<BalanceRow>,
    /// payment amount minus the covered totals; never negative
    pub surplus: Money,
}

/// partition an ordered installment scope into fully-covered rows, pending
/// rows and a surplus.
///
/// The scope is sorted by due date (stable, so finer pre-sorted keys
/// survive ties); an installment is covered iff its running cumulative
/// total stays within the payment amount. Amounts are never modified,
/// only partitioned.
pub fn split(mut rows: Vec<BalanceRow>, amount: Money, kind: CollectionKind) -> SplitOutcome {
    rows.sort_by_key(|row| row.due_date);

    let mut covered = Vec::new();
    let mut pending = Vec::new();
    let mut cumulative = Money::ZERO;
    for row in rows {
        cumulative += row.total;
        if cumulative <= amount {
            covered.push(Allocation::covering(&row, kind));
        } else {
            pending.push(row);
        }
    }

    let surplus = amount - covered.iter().map(|a| a.total).sum::<Money>();
    SplitOutcome {
        covered,
        pending,
        surplus,
    }
}

/// allocate a surplus against the earliest pending installment.
///
/// Principal-only while the surplus does not reach the scheduled capital;
/// otherwise the capital is cleared and the remainder splits into net
/// interest and tax. The resulting total always equals the surplus
/// exactly. Zero-total results are dropped.
pub fn allocate_next(
    pending: &[BalanceRow],
    surplus: Money,
    kind: CollectionKind,
    tax_rate: Rate,
) -> Option<Allocation> {
    let row = pending.first()?;
    if surplus.is_zero() {
        return None;
    }

    let mut allocation = Allocation::covering(row, kind);
    if row.capital > surplus {
        allocation.capital = surplus;
        allocation.interest = Money::ZERO;
        allocation.tax = Money::ZERO;
    } else {
        let (interest, tax) = (surplus - row.capital).split_gross(tax_rate);
        allocation.interest = interest;
        allocation.tax = tax;
    }
    allocation.total = surplus;

    if allocation.total.is_zero() {
        return None;
    }
    Some(allocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(id: InstallmentId, due: (i32, u32, u32), capital: i64, interest: i64, tax: i64) -> BalanceRow {
        let capital = Money::from_major(capital);
        let interest = Money::from_major(interest);
        let tax = Money::from_major(tax);
        BalanceRow {
            installment_id: id,
            credit_id: 1,
            seq: id as u32,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            capital,
            interest,
            tax,
            total: capital + interest + tax,
        }
    }

    fn scope() -> Vec<BalanceRow> {
        vec![
            row(1, (2024, 2, 28), 100, 20, 4),
            row(2, (2024, 3, 28), 100, 15, 3),
            row(3, (2024, 4, 28), 100, 10, 2),
        ]
    }

    #[test]
    fn test_covered_plus_surplus_equals_amount() {
        let amount = Money::from_major(300);
        let outcome = split(scope(), amount, CollectionKind::Ordinary);
        let covered: Money = outcome.covered.iter().map(|a| a.total).sum();
        assert_eq!(covered + outcome.surplus, amount);

        assert_eq!(outcome.covered.len(), 2);
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.surplus, Money::from_major(300 - 124 - 118));
    }

    #[test]
    fn test_covered_is_a_prefix_in_due_date_order() {
        let mut rows = scope();
        rows.reverse();
        let outcome = split(rows, Money::from_major(130), CollectionKind::Ordinary);
        assert_eq!(outcome.covered.len(), 1);
        assert_eq!(outcome.covered[0].installment_id, 1);
        assert_eq!(
            outcome.pending.iter().map(|r| r.installment_id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_zero_amount_or_empty_scope() {
        let outcome = split(scope(), Money::ZERO, CollectionKind::Ordinary);
        assert!(outcome.covered.is_empty());
        assert_eq!(outcome.surplus, Money::ZERO);

        let amount = Money::from_major(50);
        let outcome = split(Vec::new(), amount, CollectionKind::Ordinary);
        assert!(outcome.covered.is_empty());
        assert!(outcome.pending.is_empty());
        assert_eq!(outcome.surplus, amount);
    }

    #[test]
    fn test_exact_amount_leaves_no_surplus() {
        let outcome = split(scope(), Money::from_major(124 + 118), CollectionKind::Advance);
        assert_eq!(outcome.covered.len(), 2);
        assert_eq!(outcome.surplus, Money::ZERO);
        assert!(outcome.covered.iter().all(|a| a.kind == CollectionKind::Advance));
    }

    #[test]
    fn test_partial_below_capital_is_principal_only() {
        let pending = vec![row(3, (2024, 4, 28), 200, 10, 2)];
        let allocation = allocate_next(
            &pending,
            Money::from_major(50),
            CollectionKind::Ordinary,
            Rate::from_percentage(21),
        )
        .unwrap();

        assert_eq!(allocation.capital, Money::from_major(50));
        assert_eq!(allocation.interest, Money::ZERO);
        assert_eq!(allocation.tax, Money::ZERO);
        assert_eq!(allocation.total, Money::from_major(50));
    }

    #[test]
    fn test_partial_above_capital_splits_net_of_tax() {
        let pending = vec![row(3, (2024, 4, 28), 200, 10, 2)];
        let allocation = allocate_next(
            &pending,
            Money::from_major(300),
            CollectionKind::Ordinary,
            Rate::from_percentage(21),
        )
        .unwrap();

        assert_eq!(allocation.capital, Money::from_major(200));
        assert_eq!(allocation.interest, Money::from_decimal(dec!(82.644628)));
        assert_eq!(allocation.tax, Money::from_decimal(dec!(17.355372)));
        assert_eq!(allocation.total, Money::from_major(300));
        assert_eq!(
            allocation.total,
            allocation.capital + allocation.interest + allocation.tax
        );
    }

    #[test]
    fn test_partial_only_touches_earliest_row() {
        let pending = scope();
        let allocation = allocate_next(
            &pending,
            Money::from_major(10),
            CollectionKind::Ordinary,
            Rate::from_percentage(21),
        )
        .unwrap();
        assert_eq!(allocation.installment_id, pending[0].installment_id);
    }

    #[test]
    fn test_zero_surplus_allocates_nothing() {
        assert!(allocate_next(
            &scope(),
            Money::ZERO,
            CollectionKind::Ordinary,
            Rate::from_percentage(21),
        )
        .is_none());
        assert!(allocate_next(
            &[],
            Money::from_major(10),
            CollectionKind::Ordinary,
            Rate::from_percentage(21),
        )
        .is_none());
    }
}
