use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;

use crate::balance;
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::payments::{self, CollectionOutcome};
use crate::schedule::{self, ScheduleCalculator};
use crate::store::{LedgerStore, MemoryStore};
use crate::types::{
    BalanceRow, ClientId, Collection, Credit, CreditId, Installment, NewCredit, PaymentKind,
};

/// facade wiring the store, configuration, clock and event sink into the
/// three callable operations: balance, collect, collect-for-payer
pub struct Engine<S: LedgerStore> {
    store: S,
    config: EngineConfig,
    time: SafeTimeProvider,
    events: EventStore,
}

impl Engine<MemoryStore> {
    /// engine over a fresh in-memory ledger
    pub fn in_memory(config: EngineConfig, time: SafeTimeProvider) -> Result<Self> {
        Engine::new(MemoryStore::new(), config, time)
    }
}

impl<S: LedgerStore> Engine<S> {
    pub fn new(store: S, config: EngineConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            time,
            events: EventStore::new(),
        })
    }

    /// append a credit and generate its full schedule
    pub fn originate(&mut self, credit: NewCredit) -> Result<(Credit, Vec<Installment>)> {
        schedule::originate(&mut self.store, &self.config, &mut self.events, credit)
    }

    /// generate (or fetch) the schedule of an existing credit; safe to
    /// call repeatedly
    pub fn schedule(&mut self, credit_id: CreditId) -> Result<Vec<Installment>> {
        let credit = self.store.credit(credit_id)?;
        let calc = ScheduleCalculator::new(&self.config);
        schedule::ensure_schedule(&mut self.store, &calc, &mut self.events, &credit)
    }

    /// single installment lookup-or-generate for `(credit, seq)`
    pub fn installment(&mut self, credit_id: CreditId, seq: u32) -> Result<Installment> {
        let credit = self.store.credit(credit_id)?;
        let calc = ScheduleCalculator::new(&self.config);
        schedule::ensure_installment(&mut self.store, &calc, &mut self.events, &credit, seq)
    }

    /// outstanding balance per installment as of `cutoff` (default today)
    pub fn balance(&self, cutoff: Option<NaiveDate>) -> Result<Vec<BalanceRow>> {
        balance::snapshot(&self.store, cutoff.unwrap_or_else(|| self.today()))
    }

    /// apply one payment to a single credit
    pub fn collect(
        &mut self,
        credit_id: CreditId,
        kind: PaymentKind,
        amount: Money,
        date: Option<NaiveDate>,
        persist: bool,
    ) -> Result<CollectionOutcome> {
        let date = date.unwrap_or_else(|| self.today());
        payments::collect_credit(
            &mut self.store,
            &self.config,
            &mut self.events,
            credit_id,
            kind,
            amount,
            date,
            persist,
        )
    }

    /// spread one payment across all credits of a payer
    pub fn collect_for_payer(
        &mut self,
        client_id: ClientId,
        kind: PaymentKind,
        amount: Money,
        date: Option<NaiveDate>,
        persist: bool,
    ) -> Result<CollectionOutcome> {
        let date = date.unwrap_or_else(|| self.today());
        payments::collect_document(
            &mut self.store,
            &self.config,
            &mut self.events,
            client_id,
            kind,
            amount,
            date,
            persist,
        )
    }

    /// clear residual balances below the dust threshold
    pub fn reconcile_rounding(
        &mut self,
        date: Option<NaiveDate>,
        persist: bool,
    ) -> Result<Vec<Collection>> {
        let date = date.unwrap_or_else(|| self.today());
        payments::reconcile(&mut self.store, &self.config, &mut self.events, date, persist)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }
}
