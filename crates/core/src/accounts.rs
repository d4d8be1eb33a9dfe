//! Financial account directory.
//!
//! An account holds the payment instruments a tenant pays or receives with.
//! Credit instruments carry a billing cycle; every other kind carries
//! receiving rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{FinancialAccountId, InstrumentId};

use crate::billing::BillingCycle;
use crate::error::EngineError;

/// A tenant's financial account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialAccount {
    /// Account id.
    pub id: FinancialAccountId,
    /// Display name.
    pub name: String,
    /// Instruments of the account.
    pub instruments: Vec<PaymentInstrument>,
}

impl FinancialAccount {
    /// Finds an instrument of this account.
    pub fn instrument(&self, id: InstrumentId) -> Result<&PaymentInstrument, EngineError> {
        self.instruments
            .iter()
            .find(|instrument| instrument.id == id)
            .ok_or(EngineError::InstrumentNotFound {
                account: self.id,
                instrument: id,
            })
    }
}

/// A payment instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstrument {
    /// Instrument id.
    pub id: InstrumentId,
    /// Display name, used for invoice descriptions.
    pub name: String,
    /// Kind and kind-specific parameters.
    pub kind: InstrumentKind,
}

impl PaymentInstrument {
    /// Billing cycle when this is a credit instrument.
    #[must_use]
    pub fn billing_cycle(&self) -> Option<BillingCycle> {
        match &self.kind {
            InstrumentKind::Credit(cycle) => Some(*cycle),
            _ => None,
        }
    }

    /// Receiving rules when this is not a credit instrument.
    #[must_use]
    pub fn receiving_rules(&self) -> Option<&ReceivingRules> {
        match &self.kind {
            InstrumentKind::Pix(rules) | InstrumentKind::Debit(rules) | InstrumentKind::Boleto(rules) => {
                Some(rules)
            }
            InstrumentKind::Credit(_) => None,
        }
    }
}

/// Instrument kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Instant transfer.
    Pix(ReceivingRules),
    /// Debit card.
    Debit(ReceivingRules),
    /// Bank slip.
    Boleto(ReceivingRules),
    /// Credit card with a monthly billing cycle.
    Credit(BillingCycle),
}

impl InstrumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pix(_) => "pix",
            Self::Debit(_) => "debit",
            Self::Boleto(_) => "boleto",
            Self::Credit(_) => "credit",
        }
    }
}

/// Rules applied when money is received through a non-credit instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingRules {
    /// Fee charged by the instrument, in percent of the gross amount.
    pub tax_rate: Decimal,
    /// Days between the sale and the money reaching the account.
    pub days_to_receive: u32,
    /// Smallest installment count the rules apply to.
    pub min_installments: u32,
    /// Largest installment count the rules apply to.
    pub max_installments: u32,
}

impl Default for ReceivingRules {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            days_to_receive: 0,
            min_installments: 1,
            max_installments: 1,
        }
    }
}

impl ReceivingRules {
    /// Whether the rules cover a payment split in `installments`.
    #[must_use]
    pub fn applies_to(&self, installments: u32) -> bool {
        (self.min_installments..=self.max_installments).contains(&installments)
    }

    /// Gross amount minus the instrument fee.
    #[must_use]
    pub fn net_amount(&self, gross: Decimal) -> Decimal {
        gross - gross * self.tax_rate / Decimal::ONE_HUNDRED
    }

    /// Validates the rule parameters.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE_HUNDRED {
            return Err(EngineError::Validation(format!(
                "tax rate must be between 0 and 100, got {}",
                self.tax_rate
            )));
        }
        if self.min_installments == 0 || self.min_installments > self.max_installments {
            return Err(EngineError::Validation(format!(
                "invalid installment range {}..={}",
                self.min_installments, self.max_installments
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account() -> FinancialAccount {
        FinancialAccount {
            id: FinancialAccountId::new(),
            name: "Main".to_string(),
            instruments: vec![
                PaymentInstrument {
                    id: InstrumentId::new(),
                    name: "Visa".to_string(),
                    kind: InstrumentKind::Credit(BillingCycle::new(10, 20).unwrap()),
                },
                PaymentInstrument {
                    id: InstrumentId::new(),
                    name: "Pix".to_string(),
                    kind: InstrumentKind::Pix(ReceivingRules::default()),
                },
            ],
        }
    }

    #[test]
    fn test_instrument_lookup() {
        let account = account();
        let visa = account.instrument(account.instruments[0].id).unwrap();
        assert_eq!(visa.name, "Visa");
        assert!(visa.billing_cycle().is_some());
        assert!(visa.receiving_rules().is_none());

        let pix = account.instrument(account.instruments[1].id).unwrap();
        assert!(pix.billing_cycle().is_none());
        assert_eq!(pix.kind.as_str(), "pix");
    }

    #[test]
    fn test_unknown_instrument_is_not_found() {
        let account = account();
        let err = account.instrument(InstrumentId::new()).unwrap_err();
        assert_eq!(err.error_code(), "INSTRUMENT_NOT_FOUND");
    }

    #[test]
    fn test_net_amount_deducts_fee() {
        let rules = ReceivingRules {
            tax_rate: dec!(2.5),
            days_to_receive: 30,
            min_installments: 1,
            max_installments: 6,
        };
        assert_eq!(rules.net_amount(dec!(200)), dec!(195));
        assert!(rules.applies_to(1));
        assert!(rules.applies_to(6));
        assert!(!rules.applies_to(7));
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let rules = ReceivingRules {
            tax_rate: dec!(120),
            ..ReceivingRules::default()
        };
        assert!(rules.validate().is_err());

        let rules = ReceivingRules {
            min_installments: 3,
            max_installments: 2,
            ..ReceivingRules::default()
        };
        assert!(rules.validate().is_err());
    }
}
