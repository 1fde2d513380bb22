use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::balance;
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{BalanceRow, ClientId, CreditId, PaymentKind};

use super::policy::{collect_credit, forgive_future};
use super::waterfall::{allocate_next, split};
use super::{validate_amount, CollectionOutcome};

/// spread one payment across all credits of a payer.
///
/// Eligible credits are the payer's credits disbursed on or before the
/// reference date. The combined scope is ordered globally by due date,
/// then credit disbursement date, then credit id; the document-level
/// waterfall decides how much lands on each credit, and the credit-level
/// policy then applies each per-credit amount. Residual surplus goes to
/// the eligible credit with the highest identifier. Rows whose total is
/// exactly zero are dropped from the combined result.
pub fn collect_document<S: LedgerStore>(
    store: &mut S,
    config: &EngineConfig,
    events: &mut EventStore,
    client_id: ClientId,
    kind: PaymentKind,
    amount: Money,
    date: NaiveDate,
    persist: bool,
) -> Result<CollectionOutcome> {
    validate_amount(amount)?;

    let disbursement: BTreeMap<CreditId, NaiveDate> = store
        .credits()?
        .into_iter()
        .filter(|c| c.client_id == client_id && c.disbursement_date <= date)
        .map(|c| (c.id, c.disbursement_date))
        .collect();
    if disbursement.is_empty() {
        return Err(EngineError::NoEligibleCredits { client_id, date });
    }

    let mut scope: Vec<BalanceRow> = balance::snapshot(store, date)?
        .into_iter()
        .filter(|row| disbursement.contains_key(&row.credit_id))
        .collect();

    if kind == PaymentKind::Advance {
        forgive_future(&mut scope, date, true);
    }

    // global ordering across credits; the stable due-date sort inside
    // split() preserves the finer keys on ties
    scope.sort_by_key(|row| {
        (
            row.due_date,
            disbursement[&row.credit_id],
            row.credit_id,
        )
    });

    let tag = kind.collection_kind();
    let outcome = split(scope, amount, tag);
    let mut allocations = outcome.covered;
    if let Some(partial) = allocate_next(&outcome.pending, outcome.surplus, tag, config.tax_rate) {
        allocations.push(partial);
    }

    // how much of the document lands on each credit
    let mut per_credit: BTreeMap<CreditId, Money> = BTreeMap::new();
    for allocation in &allocations {
        *per_credit.entry(allocation.credit_id).or_insert(Money::ZERO) += allocation.total;
    }
    let surplus = amount - per_credit.values().copied().sum::<Money>();

    let mut rows = Vec::new();
    let mut unallocated = Money::ZERO;
    let mut credits_touched = 0usize;
    for (&credit_id, &credit_amount) in &per_credit {
        if credit_amount.is_zero() {
            continue;
        }
        let outcome = collect_credit(
            store, config, events, credit_id, kind, credit_amount, date, persist,
        )?;
        rows.extend(outcome.rows);
        unallocated += outcome.unallocated;
        credits_touched += 1;
    }

    if surplus > Money::ZERO {
        let last = disbursement
            .keys()
            .next_back()
            .copied()
            .ok_or(EngineError::NoEligibleCredits { client_id, date })?;
        let outcome = collect_credit(store, config, events, last, kind, surplus, date, persist)?;
        rows.extend(outcome.rows);
        unallocated += outcome.unallocated;
        credits_touched += 1;
    }

    rows.retain(|row| !row.total.is_zero());

    info!(
        client_id,
        amount = %amount,
        credits = credits_touched,
        rows = rows.len(),
        "document collection applied"
    );
    events.emit(Event::DocumentCollectionApplied {
        client_id,
        kind,
        amount,
        date,
        credits: credits_touched,
    });

    Ok(CollectionOutcome { rows, unallocated })
}
