use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::store::LedgerStore;
use crate::types::{AmortizationMethod, Credit, Installment, NewCredit, NewInstallment};

/// per-installment schedule math for the three amortization methods
pub struct ScheduleCalculator {
    tax_rate: Rate,
    company_id: u64,
}

impl ScheduleCalculator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tax_rate: config.tax_rate,
            company_id: config.company_id,
        }
    }

    /// compute the row for installment `seq` (1-based) of a credit
    pub fn build_row(&self, credit: &Credit, seq: u32) -> Result<NewInstallment> {
        if seq == 0 || seq > credit.term {
            return Err(EngineError::CalculationError {
                message: format!(
                    "installment {seq} out of range for credit {} with term {}",
                    credit.id, credit.term
                ),
            });
        }
        match credit.method {
            AmortizationMethod::French => self.french(credit, seq),
            AmortizationMethod::German => self.german(credit, seq),
            AmortizationMethod::Penalty => self.penalty(credit, seq),
        }
    }

    /// compute the full schedule of a credit
    pub fn build_schedule(&self, credit: &Credit) -> Result<Vec<NewInstallment>> {
        (1..=credit.term).map(|i| self.build_row(credit, i)).collect()
    }

    /// fixed periodic payment; capital and interest are the annuity
    /// components of that payment, interest stored net of tax
    fn french(&self, credit: &Credit, seq: u32) -> Result<NewInstallment> {
        let r = credit.annual_rate.periodic().as_decimal();
        let payment = annuity_payment(credit.capital, r, credit.term);

        let mut balance = credit.capital.as_decimal();
        let mut raw_interest = Decimal::ZERO;
        let mut raw_capital = Decimal::ZERO;
        for _ in 0..seq {
            raw_interest = balance * r;
            raw_capital = payment.as_decimal() - raw_interest;
            balance -= raw_capital;
        }

        let capital = Money::from_decimal(raw_capital);
        let interest = Money::from_decimal(raw_interest / self.gross_up());
        let tax = payment - capital - interest;

        self.row(credit, seq, capital, interest, tax, payment)
    }

    /// constant capital; interest on the outstanding principal at period
    /// start, net of tax; tax recomputed from the net interest
    fn german(&self, credit: &Credit, seq: u32) -> Result<NewInstallment> {
        let r = credit.annual_rate.periodic().as_decimal();
        let capital = credit.capital / Decimal::from(credit.term);
        let outstanding = credit.capital - capital * Decimal::from(seq - 1);
        let interest = Money::from_decimal(outstanding.as_decimal() * r / self.gross_up());
        let tax = interest * self.tax_rate.as_decimal();
        let total = capital + interest + tax;

        self.row(credit, seq, capital, interest, tax, total)
    }

    /// a pure interest+tax charge with no principal
    fn penalty(&self, credit: &Credit, seq: u32) -> Result<NewInstallment> {
        let (interest, tax) = credit.capital.split_gross(self.tax_rate);
        self.row(credit, seq, Money::ZERO, interest, tax, credit.capital)
    }

    fn row(
        &self,
        credit: &Credit,
        seq: u32,
        capital: Money,
        interest: Money,
        tax: Money,
        total: Money,
    ) -> Result<NewInstallment> {
        Ok(NewInstallment {
            credit_id: credit.id,
            seq,
            owner_id: self.company_id,
            due_date: due_date(credit.first_due, seq)?,
            capital,
            interest,
            tax,
            total,
        })
    }

    fn gross_up(&self) -> Decimal {
        Decimal::ONE + self.tax_rate.as_decimal()
    }
}

/// day 28 of the month `seq - 1` periods after the first due month; the
/// fixed day sidesteps month-length edge cases
pub fn due_date(first_due: NaiveDate, seq: u32) -> Result<NaiveDate> {
    let months = first_due.year() * 12 + first_due.month0() as i32 + (seq as i32 - 1);
    let (year, month0) = (months.div_euclid(12), months.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 28).ok_or_else(|| EngineError::InvalidDate {
        message: format!("no due date for {first_due} + {} months", seq - 1),
    })
}

/// standard annuity payment for a tax-inclusive periodic rate
fn annuity_payment(capital: Money, periodic: Decimal, term: u32) -> Money {
    if term == 0 {
        return capital;
    }
    if periodic.is_zero() {
        return capital / Decimal::from(term);
    }

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + periodic;
    for _ in 0..term {
        compound *= base;
    }

    Money::from_decimal(capital.as_decimal() * periodic * compound / (compound - Decimal::ONE))
}

/// return the stored row for `(credit, seq)`, generating it when absent.
///
/// Safe to call repeatedly: an existing row is returned unchanged, never
/// duplicated. Finding more than one stored row for the pair indicates
/// upstream corruption and fails immediately.
pub fn ensure_installment<S: LedgerStore>(
    store: &mut S,
    calc: &ScheduleCalculator,
    events: &mut EventStore,
    credit: &Credit,
    seq: u32,
) -> Result<Installment> {
    let existing: Vec<Installment> = store
        .installments()?
        .into_iter()
        .filter(|row| row.credit_id == credit.id && row.seq == seq)
        .collect();

    if existing.len() > 1 {
        return Err(EngineError::DuplicateInstallment {
            credit_id: credit.id,
            seq,
        });
    }
    if let Some(row) = existing.into_iter().next() {
        return Ok(row);
    }

    let row = calc.build_row(credit, seq)?;
    let row = store
        .append_installments(vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::CalculationError {
            message: format!(
                "store returned no row appending installment {seq} of credit {}",
                credit.id
            ),
        })?;
    info!(
        credit_id = credit.id,
        seq,
        installment_id = row.id,
        "installment {:02} of {:02} for credit {:08} created",
        seq,
        credit.term,
        credit.id
    );
    events.emit(Event::InstallmentScheduled {
        credit_id: credit.id,
        seq,
        installment_id: row.id,
        due_date: row.due_date,
        total: row.total,
    });
    Ok(row)
}

/// generate (or fetch) the full schedule of a credit, in sequence order
pub fn ensure_schedule<S: LedgerStore>(
    store: &mut S,
    calc: &ScheduleCalculator,
    events: &mut EventStore,
    credit: &Credit,
) -> Result<Vec<Installment>> {
    (1..=credit.term)
        .map(|seq| ensure_installment(store, calc, events, credit, seq))
        .collect()
}

/// append a credit row and generate its full schedule in one call
pub fn originate<S: LedgerStore>(
    store: &mut S,
    config: &EngineConfig,
    events: &mut EventStore,
    credit: NewCredit,
) -> Result<(Credit, Vec<Installment>)> {
    if credit.term == 0 {
        return Err(EngineError::InvalidConfiguration {
            message: "credit term must be at least 1".to_string(),
        });
    }
    if credit.capital.is_negative() {
        return Err(EngineError::InvalidConfiguration {
            message: format!("negative disbursed capital: {}", credit.capital),
        });
    }

    let credit = store.append_credit(credit)?;
    info!(
        credit_id = credit.id,
        "credit {:08} created",
        credit.id
    );
    events.emit(Event::CreditOriginated {
        credit_id: credit.id,
        method: credit.method,
        capital: credit.capital,
        disbursement_date: credit.disbursement_date,
    });

    let calc = ScheduleCalculator::new(config);
    let schedule = ensure_schedule(store, &calc, events, &credit)?;
    Ok((credit, schedule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::store::MemoryStore;
    use crate::types::AmortizationMethod;

    fn credit(method: AmortizationMethod, capital: i64, rate_pct: u32, term: u32) -> Credit {
        Credit {
            id: 1,
            origin_id: None,
            method,
            capital_requested: Money::from_major(capital),
            capital: Money::from_major(capital),
            annual_rate: Rate::from_percentage(rate_pct),
            term,
            disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            first_due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            client_id: 1,
            organism_id: 1,
        }
    }

    fn assert_close(a: Money, b: Money, eps: &str) {
        let eps = Money::from_str_exact(eps).unwrap();
        assert!(
            (a - b).abs() <= eps,
            "expected {a} within {eps} of {b}"
        );
    }

    #[test]
    fn test_due_dates_land_on_day_28() {
        let first = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(
            due_date(first, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 28).unwrap()
        );
        assert_eq!(
            due_date(first, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 28).unwrap()
        );
        // february never overflows: the schedule always uses day 28
        assert_eq!(
            due_date(first, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_french_capital_sums_to_disbursed() {
        let credit = credit(AmortizationMethod::French, 95_000, 73, 12);
        let calc = ScheduleCalculator::new(&EngineConfig::default());
        let schedule = calc.build_schedule(&credit).unwrap();

        assert_eq!(schedule.len(), 12);
        let total_capital: Money = schedule.iter().map(|r| r.capital).sum();
        assert_close(total_capital, credit.capital, "0.0001");

        // fixed periodic payment across the whole schedule
        let payment = schedule[0].total;
        for row in &schedule {
            assert_eq!(row.total, payment);
            assert_eq!(row.total, row.capital + row.interest + row.tax);
        }

        // interest declines as the balance amortizes
        for pair in schedule.windows(2) {
            assert!(pair[1].interest < pair[0].interest);
            assert!(pair[1].capital > pair[0].capital);
        }
    }

    #[test]
    fn test_french_zero_rate_splits_capital_evenly() {
        let credit = credit(AmortizationMethod::French, 1200, 0, 12);
        let calc = ScheduleCalculator::new(&EngineConfig::default());
        let schedule = calc.build_schedule(&credit).unwrap();
        for row in &schedule {
            assert_eq!(row.capital, Money::from_major(100));
            assert_eq!(row.interest, Money::ZERO);
            assert_eq!(row.tax, Money::ZERO);
        }
    }

    #[test]
    fn test_german_constant_capital_and_tax_on_interest() {
        let credit = credit(AmortizationMethod::German, 90_000, 73, 9);
        let calc = ScheduleCalculator::new(&EngineConfig::default());
        let schedule = calc.build_schedule(&credit).unwrap();

        let share = Money::from_major(10_000);
        for row in &schedule {
            assert_eq!(row.capital, share);
            assert_close(row.tax, row.interest * dec!(0.21), "0.000001");
            assert_eq!(row.total, row.capital + row.interest + row.tax);
        }

        let total_capital: Money = schedule.iter().map(|r| r.capital).sum();
        assert_close(total_capital, credit.capital, "0.0001");

        // first installment: 90000 * 0.06 / 1.21 net interest
        assert_close(
            schedule[0].interest,
            Money::from_decimal(dec!(4462.809917)),
            "0.000001",
        );
    }

    #[test]
    fn test_penalty_is_pure_interest_and_tax() {
        let credit = credit(AmortizationMethod::Penalty, 121, 0, 1);
        let calc = ScheduleCalculator::new(&EngineConfig::default());
        let row = calc.build_row(&credit, 1).unwrap();

        assert_eq!(row.capital, Money::ZERO);
        assert_eq!(row.interest, Money::from_major(100));
        assert_eq!(row.tax, Money::from_major(21));
        assert_eq!(row.total, Money::from_major(121));
    }

    #[test]
    fn test_out_of_range_seq_is_rejected() {
        let credit = credit(AmortizationMethod::French, 1000, 73, 6);
        let calc = ScheduleCalculator::new(&EngineConfig::default());
        assert!(calc.build_row(&credit, 0).is_err());
        assert!(calc.build_row(&credit, 7).is_err());
    }

    #[test]
    fn test_ensure_installment_is_idempotent() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new();
        let config = EngineConfig::default();
        let (credit, schedule) = originate(
            &mut store,
            &config,
            &mut events,
            NewCredit {
                origin_id: None,
                method: AmortizationMethod::German,
                capital_requested: Money::from_major(1200),
                capital: Money::from_major(1200),
                annual_rate: Rate::from_percentage(73),
                term: 3,
                disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                first_due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                client_id: 1,
                organism_id: 1,
            },
        )
        .unwrap();

        let calc = ScheduleCalculator::new(&config);
        let again = ensure_installment(&mut store, &calc, &mut events, &credit, 2).unwrap();
        assert_eq!(again, schedule[1]);
        assert_eq!(store.installments().unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_stored_rows_are_fatal() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new();
        let config = EngineConfig::default();
        let (credit, schedule) = originate(
            &mut store,
            &config,
            &mut events,
            NewCredit {
                origin_id: None,
                method: AmortizationMethod::German,
                capital_requested: Money::from_major(1200),
                capital: Money::from_major(1200),
                annual_rate: Rate::from_percentage(73),
                term: 2,
                disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                first_due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                client_id: 1,
                organism_id: 1,
            },
        )
        .unwrap();

        // simulate upstream corruption: a second row for (credit, 1)
        let corrupt = NewInstallment {
            credit_id: credit.id,
            seq: 1,
            owner_id: 1,
            due_date: schedule[0].due_date,
            capital: schedule[0].capital,
            interest: schedule[0].interest,
            tax: schedule[0].tax,
            total: schedule[0].total,
        };
        store.append_installments(vec![corrupt]).unwrap();

        let calc = ScheduleCalculator::new(&config);
        let result = ensure_installment(&mut store, &calc, &mut events, &credit, 1);
        assert!(matches!(
            result,
            Err(EngineError::DuplicateInstallment { seq: 1, .. })
        ));
    }

    #[test]
    fn test_zero_term_credit_is_rejected() {
        let mut store = MemoryStore::new();
        let mut events = EventStore::new();
        let result = originate(
            &mut store,
            &EngineConfig::default(),
            &mut events,
            NewCredit {
                origin_id: None,
                method: AmortizationMethod::French,
                capital_requested: Money::from_major(1000),
                capital: Money::from_major(1000),
                annual_rate: Rate::from_percentage(73),
                term: 0,
                disbursement_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                first_due: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                client_id: 1,
                organism_id: 1,
            },
        );
        assert!(result.is_err());
    }
}
