use chrono::NaiveDate;
use tracing::{info, warn};

use crate::balance;
use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::schedule;
use crate::store::LedgerStore;
use crate::types::{
    AmortizationMethod, BalanceRow, CollectionKind, Credit, CreditId, NewCredit, PaymentKind,
};

use super::waterfall::{allocate_next, split, Allocation};
use super::{to_collection, validate_amount, CollectionOutcome};

/// zero out interest and tax on installments that are not yet due, then
/// recompute every total.
///
/// Credit-level advances forgive rows due on or after the reference date;
/// document-level advances only rows due strictly later.
pub(crate) fn forgive_future(rows: &mut [BalanceRow], date: NaiveDate, strictly_after: bool) {
    for row in rows.iter_mut() {
        let future = if strictly_after {
            row.due_date > date
        } else {
            row.due_date >= date
        };
        if future {
            row.interest = Money::ZERO;
            row.tax = Money::ZERO;
        }
        row.retotal();
    }
}

/// apply one payment to a single credit.
///
/// Ordinary payments allocate against the as-is balance in due-date
/// order. Advance payments first forgive future interest/tax, and
/// afterwards recognize a bonus for every advance-collected installment
/// whose capital reached zero while interest remained. Surplus beyond
/// the last pending installment becomes a synthesized penalty credit
/// when persistence is enabled, otherwise it is reported back unspent.
pub fn collect_credit<S: LedgerStore>(
    store: &mut S,
    config: &EngineConfig,
    events: &mut EventStore,
    credit_id: CreditId,
    kind: PaymentKind,
    amount: Money,
    date: NaiveDate,
    persist: bool,
) -> Result<CollectionOutcome> {
    validate_amount(amount)?;
    let credit = store.credit(credit_id)?;

    let all_rows: Vec<BalanceRow> = balance::snapshot(store, date)?
        .into_iter()
        .filter(|row| row.credit_id == credit_id)
        .collect();

    // pre-forgiveness balances, kept for the bonus comparison
    let original = all_rows.clone();

    let scope: Vec<BalanceRow> = match kind {
        PaymentKind::Ordinary => all_rows
            .into_iter()
            .filter(|row| row.total > Money::ZERO)
            .collect(),
        PaymentKind::Advance => {
            let mut rows = all_rows;
            forgive_future(&mut rows, date, false);
            rows
        }
    };

    let tag = kind.collection_kind();
    let outcome = split(scope, amount, tag);
    let mut allocations = outcome.covered;
    let mut unallocated = Money::ZERO;

    if outcome.surplus > Money::ZERO {
        if !outcome.pending.is_empty() {
            if let Some(partial) =
                allocate_next(&outcome.pending, outcome.surplus, tag, config.tax_rate)
            {
                allocations.push(partial);
            }
            // the allocator may not consume everything in degenerate cases
            unallocated = amount - allocations.iter().map(|a| a.total).sum::<Money>();
        } else if persist {
            let penalty =
                synthesize_penalty(store, config, events, &credit, outcome.surplus, date)?;
            allocations.extend(penalty);
        } else {
            warn!(
                credit_id,
                surplus = %outcome.surplus,
                "a penalty for $ {} would be required; persistence is disabled",
                outcome.surplus
            );
            events.emit(Event::SurplusUnallocated {
                credit_id,
                amount: outcome.surplus,
                date,
            });
            unallocated = outcome.surplus;
        }
    }

    if kind == PaymentKind::Advance {
        let bonus = bonus_rows(&original, &allocations);
        for row in &bonus {
            events.emit(Event::BonusRecognized {
                installment_id: row.installment_id,
                amount: row.total,
                date,
            });
        }
        allocations.extend(bonus);
    }

    let rows: Vec<_> = allocations
        .iter()
        .map(|a| to_collection(a, date, &config.type_catalog))
        .collect();

    if persist {
        store.append_collections(rows.clone())?;
        super::rounding::reconcile(store, config, events, date, true)?;
    }

    info!(
        credit_id,
        amount = %amount,
        rows = rows.len(),
        persisted = persist,
        "collection applied"
    );
    events.emit(Event::CollectionApplied {
        credit_id,
        kind,
        amount,
        date,
        rows: rows.len(),
        persisted: persist,
    });

    Ok(CollectionOutcome { rows, unallocated })
}

/// bonus synthesis: an advance that cleared an installment's capital while
/// interest remained forgives that interest (and its scheduled tax) as a
/// dedicated ledger entry
fn bonus_rows(original: &[BalanceRow], allocations: &[Allocation]) -> Vec<Allocation> {
    let mut rows = Vec::new();
    for allocation in allocations {
        if allocation.kind != CollectionKind::Advance {
            continue;
        }
        let Some(before) = original
            .iter()
            .find(|row| row.installment_id == allocation.installment_id)
        else {
            continue;
        };
        let remaining_capital = before.capital - allocation.capital;
        let remaining_interest = before.interest - allocation.interest;
        if remaining_capital.is_zero() && !remaining_interest.is_zero() {
            rows.push(Allocation {
                installment_id: allocation.installment_id,
                credit_id: allocation.credit_id,
                due_date: allocation.due_date,
                kind: CollectionKind::Bonus,
                capital: remaining_capital,
                interest: remaining_interest,
                tax: before.tax,
                total: remaining_capital + remaining_interest + before.tax,
            });
        }
    }
    rows
}

/// create a penalty credit absorbing an unattributable surplus, owned by
/// the same client/organism as the originating credit, and collect its
/// single installment in full
fn synthesize_penalty<S: LedgerStore>(
    store: &mut S,
    config: &EngineConfig,
    events: &mut EventStore,
    source: &Credit,
    surplus: Money,
    date: NaiveDate,
) -> Result<Vec<Allocation>> {
    let (penalty_credit, schedule) = schedule::originate(
        store,
        config,
        events,
        NewCredit {
            origin_id: None,
            method: AmortizationMethod::Penalty,
            capital_requested: Money::ZERO,
            capital: surplus,
            annual_rate: Rate::ZERO,
            term: 1,
            disbursement_date: date,
            first_due: date,
            client_id: source.client_id,
            organism_id: source.organism_id,
        },
    )?;

    events.emit(Event::PenaltySynthesized {
        credit_id: penalty_credit.id,
        source_credit_id: source.id,
        amount: surplus,
        date,
    });

    Ok(schedule
        .iter()
        .map(|inst| Allocation {
            installment_id: inst.id,
            credit_id: inst.credit_id,
            due_date: inst.due_date,
            kind: CollectionKind::Penalty,
            capital: inst.capital,
            interest: inst.interest,
            tax: inst.tax,
            total: inst.total,
        })
        .collect())
}
