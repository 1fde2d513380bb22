use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::types::{
    Collection, Credit, CreditId, Installment, InstallmentId, NewCredit, NewInstallment,
};

/// narrow persistence contract consumed by the engine.
///
/// Row sets come back sorted by identifier; callers filter and sort
/// further. Appends never update or delete existing rows: installments
/// and collections are append-only from the engine's perspective.
///
/// The engine does not serialize concurrent writers. Two payments applied
/// concurrently against the same credit can both see an installment as
/// uncollected and double-allocate; the integration layer must serialize
/// writes per credit at this boundary.
pub trait LedgerStore {
    fn credits(&self) -> Result<Vec<Credit>>;
    fn credit(&self, id: CreditId) -> Result<Credit>;
    fn installments(&self) -> Result<Vec<Installment>>;
    fn collections(&self) -> Result<Vec<Collection>>;

    /// append a credit row, assigning the next identifier
    fn append_credit(&mut self, credit: NewCredit) -> Result<Credit>;
    /// append installment rows, assigning consecutive identifiers
    fn append_installments(&mut self, rows: Vec<NewInstallment>) -> Result<Vec<Installment>>;
    fn append_collections(&mut self, rows: Vec<Collection>) -> Result<()>;
}

/// serializable view of a full ledger
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerSnapshot {
    pub credits: Vec<Credit>,
    pub installments: Vec<Installment>,
    pub collections: Vec<Collection>,
}

/// in-memory reference store used by tests and embedders
#[derive(Debug, Default)]
pub struct MemoryStore {
    credits: BTreeMap<CreditId, Credit>,
    installments: BTreeMap<InstallmentId, Installment>,
    collections: Vec<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_credit_id(&self) -> CreditId {
        self.credits.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_installment_id(&self) -> InstallmentId {
        self.installments.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            credits: self.credits.values().cloned().collect(),
            installments: self.installments.values().cloned().collect(),
            collections: self.collections.clone(),
        }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            credits: snapshot.credits.into_iter().map(|c| (c.id, c)).collect(),
            installments: snapshot
                .installments
                .into_iter()
                .map(|i| (i.id, i))
                .collect(),
            collections: snapshot.collections,
        }
    }

    /// export the full ledger as pretty-printed json
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|e| {
            EngineError::CalculationError {
                message: format!("ledger serialization failed: {e}"),
            }
        })
    }

    /// rebuild a store from a json export
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: LedgerSnapshot =
            serde_json::from_str(json).map_err(|e| EngineError::CalculationError {
                message: format!("ledger deserialization failed: {e}"),
            })?;
        Ok(Self::from_snapshot(snapshot))
    }
}

impl LedgerStore for MemoryStore {
    fn credits(&self) -> Result<Vec<Credit>> {
        Ok(self.credits.values().cloned().collect())
    }

    fn credit(&self, id: CreditId) -> Result<Credit> {
        self.credits
            .get(&id)
            .cloned()
            .ok_or(EngineError::CreditNotFound { id })
    }

    fn installments(&self) -> Result<Vec<Installment>> {
        Ok(self.installments.values().cloned().collect())
    }

    fn collections(&self) -> Result<Vec<Collection>> {
        Ok(self.collections.clone())
    }

    fn append_credit(&mut self, credit: NewCredit) -> Result<Credit> {
        let row = credit.with_id(self.next_credit_id());
        self.credits.insert(row.id, row.clone());
        Ok(row)
    }

    fn append_installments(&mut self, rows: Vec<NewInstallment>) -> Result<Vec<Installment>> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let row = row.with_id(self.next_installment_id());
            self.installments.insert(row.id, row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    fn append_collections(&mut self, rows: Vec<Collection>) -> Result<()> {
        self.collections.extend(rows);
        Ok(())
    }
}
