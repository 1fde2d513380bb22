use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    AmortizationMethod, ClientId, CreditId, InstallmentId, PaymentKind,
};

/// all events that can be emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // schedule events
    CreditOriginated {
        credit_id: CreditId,
        method: AmortizationMethod,
        capital: Money,
        disbursement_date: NaiveDate,
    },
    InstallmentScheduled {
        credit_id: CreditId,
        seq: u32,
        installment_id: InstallmentId,
        due_date: NaiveDate,
        total: Money,
    },

    // collection events
    CollectionApplied {
        credit_id: CreditId,
        kind: PaymentKind,
        amount: Money,
        date: NaiveDate,
        rows: usize,
        persisted: bool,
    },
    DocumentCollectionApplied {
        client_id: ClientId,
        kind: PaymentKind,
        amount: Money,
        date: NaiveDate,
        credits: usize,
    },
    BonusRecognized {
        installment_id: InstallmentId,
        amount: Money,
        date: NaiveDate,
    },
    PenaltySynthesized {
        credit_id: CreditId,
        source_credit_id: CreditId,
        amount: Money,
        date: NaiveDate,
    },
    SurplusUnallocated {
        credit_id: CreditId,
        amount: Money,
        date: NaiveDate,
    },
    RoundingCleared {
        installment_id: InstallmentId,
        amount: Money,
        date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
