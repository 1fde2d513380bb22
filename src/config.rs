use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::types::CollectionKind;

/// maps every collection kind to the stable numeric code used by the
/// persistence layer; injected at engine construction so tests can
/// supply fixtures instead of reading a process-wide catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTypeCatalog {
    pub ordinary: u16,
    pub advance: u16,
    pub penalty: u16,
    pub bonus: u16,
    pub rounding: u16,
}

impl CollectionTypeCatalog {
    pub fn code(&self, kind: CollectionKind) -> u16 {
        match kind {
            CollectionKind::Ordinary => self.ordinary,
            CollectionKind::Advance => self.advance,
            CollectionKind::Penalty => self.penalty,
            CollectionKind::Bonus => self.bonus,
            CollectionKind::Rounding => self.rounding,
        }
    }

    pub fn kind(&self, code: u16) -> Result<CollectionKind> {
        let pairs = [
            (self.ordinary, CollectionKind::Ordinary),
            (self.advance, CollectionKind::Advance),
            (self.penalty, CollectionKind::Penalty),
            (self.bonus, CollectionKind::Bonus),
            (self.rounding, CollectionKind::Rounding),
        ];
        pairs
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, k)| *k)
            .ok_or(EngineError::UnknownCollectionCode { code })
    }

    pub fn validate(&self) -> Result<()> {
        let mut codes = [
            self.ordinary,
            self.advance,
            self.penalty,
            self.bonus,
            self.rounding,
        ];
        codes.sort_unstable();
        if codes.windows(2).any(|w| w[0] == w[1]) {
            return Err(EngineError::InvalidConfiguration {
                message: "collection type catalog contains duplicate codes".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CollectionTypeCatalog {
    fn default() -> Self {
        Self {
            ordinary: 1,
            advance: 2,
            penalty: 3,
            bonus: 4,
            rounding: 5,
        }
    }
}

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// value-added tax applied on interest
    pub tax_rate: Rate,
    /// residual totals strictly below this magnitude are treated as settled
    pub dust_threshold: Money,
    /// owner stamped on generated installments
    pub company_id: u64,
    pub type_catalog: CollectionTypeCatalog,
}

impl EngineConfig {
    /// gross-up divisor, `1 + tax_rate`
    pub fn gross_up(&self) -> Decimal {
        Decimal::ONE + self.tax_rate.as_decimal()
    }

    pub fn validate(&self) -> Result<()> {
        if self.tax_rate.as_decimal() < Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration {
                message: format!("negative tax rate: {}", self.tax_rate),
            });
        }
        if self.dust_threshold.is_negative() {
            return Err(EngineError::InvalidConfiguration {
                message: format!("negative dust threshold: {}", self.dust_threshold),
            });
        }
        self.type_catalog.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_rate: Rate::from_decimal(dec!(0.21)),
            dust_threshold: Money::from_decimal(dec!(0.1)),
            company_id: 1,
            type_catalog: CollectionTypeCatalog::default(),
        }
    }
}
