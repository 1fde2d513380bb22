pub mod balance;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod payments;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use config::{CollectionTypeCatalog, EngineConfig};
pub use decimal::{Money, Rate};
pub use engine::Engine;
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use payments::{
    allocate_next, collect_credit, collect_document, reconcile, split, Allocation,
    CollectionOutcome, SplitOutcome,
};
pub use schedule::ScheduleCalculator;
pub use store::{LedgerStore, LedgerSnapshot, MemoryStore};
pub use types::{
    AmortizationMethod, BalanceRow, ClientId, Collection, CollectionId, CollectionKind,
    Credit, CreditId, Installment, InstallmentId, NewCredit, NewInstallment, OrganismId,
    PaymentKind,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
