use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::balance;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{Collection, CollectionKind};

/// clear rounding dust: residual balances whose magnitude is nonzero but
/// below the configured threshold become dedicated rounding entries that
/// settle the installment.
pub fn reconcile<S: LedgerStore>(
    store: &mut S,
    config: &EngineConfig,
    events: &mut EventStore,
    date: NaiveDate,
    persist: bool,
) -> Result<Vec<Collection>> {
    let rows: Vec<Collection> = balance::snapshot(store, date)?
        .into_iter()
        .filter(|row| !row.total.is_zero() && row.total.abs() < config.dust_threshold)
        .map(|row| Collection {
            id: Uuid::new_v4(),
            installment_id: row.installment_id,
            date,
            kind: CollectionKind::Rounding,
            type_code: config.type_catalog.code(CollectionKind::Rounding),
            capital: row.capital,
            interest: row.interest,
            tax: row.tax,
            total: row.total,
        })
        .collect();

    for row in &rows {
        debug!(
            installment_id = row.installment_id,
            total = %row.total,
            "rounding dust cleared"
        );
        events.emit(Event::RoundingCleared {
            installment_id: row.installment_id,
            amount: row.total,
            date,
        });
    }

    if persist && !rows.is_empty() {
        store.append_collections(rows.clone())?;
    }
    Ok(rows)
}
