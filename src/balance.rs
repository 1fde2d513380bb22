use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::decimal::Money;
use crate::errors::Result;
use crate::store::LedgerStore;
use crate::types::{BalanceRow, InstallmentId};

#[derive(Debug, Clone, Copy, Default)]
struct Collected {
    capital: Money,
    interest: Money,
    tax: Money,
    total: Money,
}

/// project the remaining balance of every eligible installment as of a
/// cutoff date.
///
/// Eligible: the credit was disbursed on or before `cutoff`. Each money
/// field is the scheduled amount minus the sum of collections dated on or
/// before `cutoff`, rounded to 6 decimals. Pure function of the stored
/// schedule and collection history; neither is mutated. Rows come back in
/// installment-id order.
pub fn snapshot<S: LedgerStore>(store: &S, cutoff: NaiveDate) -> Result<Vec<BalanceRow>> {
    let disbursement: BTreeMap<_, _> = store
        .credits()?
        .into_iter()
        .map(|c| (c.id, c.disbursement_date))
        .collect();

    let mut collected: BTreeMap<InstallmentId, Collected> = BTreeMap::new();
    for coll in store.collections()? {
        if coll.date > cutoff {
            continue;
        }
        let entry = collected.entry(coll.installment_id).or_default();
        entry.capital += coll.capital;
        entry.interest += coll.interest;
        entry.tax += coll.tax;
        entry.total += coll.total;
    }

    let mut rows = Vec::new();
    for inst in store.installments()? {
        let eligible = disbursement
            .get(&inst.credit_id)
            .is_some_and(|disbursed| *disbursed <= cutoff);
        if !eligible {
            continue;
        }
        let paid = collected.get(&inst.id).copied().unwrap_or_default();
        rows.push(BalanceRow {
            installment_id: inst.id,
            credit_id: inst.credit_id,
            seq: inst.seq,
            due_date: inst.due_date,
            capital: inst.capital - paid.capital,
            interest: inst.interest - paid.interest,
            tax: inst.tax - paid.tax,
            total: inst.total - paid.total,
        });
    }
    Ok(rows)
}
