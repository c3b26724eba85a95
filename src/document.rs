use crate::error::ExportError;
use crate::money::{Money, Percent};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Drives the artifact file-name prefix and whether payment fields are
/// permitted on the totals block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Quote,
    Invoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub unit: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl LineItem {
    /// Builds an item with the line total derived from price and quantity.
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            unit: unit.into(),
            unit_price,
            quantity,
            line_total: unit_price.mul_quantity(quantity),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub amount_paid: Money,
    pub balance_due: Money,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax_rate: Percent,
    pub tax_amount: Money,
    pub total: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentSummary>,
}

impl Totals {
    /// Derives the totals block from line items and a tax rate.
    pub fn compute(items: &[LineItem], tax_rate: Percent) -> Self {
        let subtotal: Money = items.iter().map(|item| item.line_total).sum();
        let tax_amount = subtotal.mul_percent(tax_rate);
        Self {
            subtotal,
            tax_rate,
            tax_amount,
            total: subtotal + tax_amount,
            payment: None,
        }
    }

    /// Attaches a payment summary, deriving balance and status.
    pub fn with_payment(mut self, amount_paid: Money) -> Self {
        let balance_due = self.total - amount_paid;
        let status = if amount_paid.is_zero() {
            PaymentStatus::Unpaid
        } else if balance_due > Money::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        };
        self.payment = Some(PaymentSummary {
            amount_paid,
            balance_due,
            status,
        });
        self
    }
}

/// The party the document is addressed to, resolved from a lead or
/// client lookup by the caller. May be absent entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FooterContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_terms: Option<String>,
    #[serde(default)]
    pub active_services: Vec<String>,
}

/// Company branding and legal configuration, supplied already fetched.
/// The engine only ever goes to the network for the logo bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub address_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_terms: Option<String>,
    #[serde(default)]
    pub active_services: Vec<String>,
}

/// One exportable document. Read-only for the duration of an export;
/// constructed fresh per call from already-persisted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentModel {
    pub kind: DocumentKind,
    pub number: String,
    pub issue_date: NaiveDate,
    /// Due date for invoices, valid-until date for quotes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Recipient>,
    pub line_items: Vec<LineItem>,
    pub totals: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub footer: FooterContent,
}

impl DocumentModel {
    /// Checks every arithmetic and structural invariant before any page
    /// is rendered. A document that fails here produces no artifact.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.number.trim().is_empty() {
            return Err(invalid("document number is empty"));
        }
        for (index, item) in self.line_items.iter().enumerate() {
            if item.quantity < 1 {
                return Err(invalid(&format!(
                    "line item {} has zero quantity",
                    index + 1
                )));
            }
            let expected = item.unit_price.mul_quantity(item.quantity);
            if item.line_total != expected {
                return Err(invalid(&format!(
                    "line item {} total {} does not equal {} x {}",
                    index + 1,
                    item.line_total,
                    item.unit_price,
                    item.quantity
                )));
            }
        }
        let subtotal: Money = self.line_items.iter().map(|item| item.line_total).sum();
        if self.totals.subtotal != subtotal {
            return Err(invalid(&format!(
                "subtotal {} does not equal line-item sum {}",
                self.totals.subtotal, subtotal
            )));
        }
        let tax = self.totals.subtotal.mul_percent(self.totals.tax_rate);
        if self.totals.tax_amount != tax {
            return Err(invalid(&format!(
                "tax amount {} does not equal {}% of subtotal",
                self.totals.tax_amount, self.totals.tax_rate
            )));
        }
        if self.totals.total != self.totals.subtotal + self.totals.tax_amount {
            return Err(invalid("total does not equal subtotal plus tax"));
        }
        match (self.kind, &self.totals.payment) {
            (DocumentKind::Quote, Some(_)) => {
                return Err(invalid("quotes cannot carry payment fields"));
            }
            (DocumentKind::Invoice, Some(payment)) => {
                if payment.balance_due != self.totals.total - payment.amount_paid {
                    return Err(invalid("balance due does not equal total minus amount paid"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ExportError {
    ExportError::InvalidDocument(message.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn quote_q2024() -> DocumentModel {
        let items = vec![
            LineItem::new("On-site guard service", "hour", Money::parse("50.00").unwrap(), 3),
            LineItem::new("Alarm system audit", "job", Money::parse("200.00").unwrap(), 1),
        ];
        let totals = Totals::compute(&items, Percent::from_bp(800));
        DocumentModel {
            kind: DocumentKind::Quote,
            number: "Q-2024".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 4, 18),
            recipient: Some(Recipient {
                name: "Dana Whitfield".to_string(),
                company: Some("Harborview Logistics".to_string()),
                email: Some("dana@harborview.example".to_string()),
                phone: None,
                address: Some("44 Pier Road, Gate 3".to_string()),
            }),
            line_items: items,
            totals,
            notes: None,
            footer: FooterContent::default(),
        }
    }

    #[test]
    fn computed_totals_match_the_quote_scenario() {
        let doc = quote_q2024();
        assert_eq!(doc.totals.subtotal, Money::parse("350.00").unwrap());
        assert_eq!(doc.totals.tax_amount, Money::parse("28.00").unwrap());
        assert_eq!(doc.totals.total, Money::parse("378.00").unwrap());
        doc.validate().unwrap();
    }

    #[test]
    fn partial_payment_derives_balance_and_status() {
        let mut doc = quote_q2024();
        doc.kind = DocumentKind::Invoice;
        doc.totals = doc.totals.with_payment(Money::parse("100.00").unwrap());
        let payment = doc.totals.payment.unwrap();
        assert_eq!(payment.balance_due, Money::parse("278.00").unwrap());
        assert_eq!(payment.status, PaymentStatus::Partial);
        doc.validate().unwrap();
    }

    #[test]
    fn full_payment_is_paid_and_zero_payment_is_unpaid() {
        let totals = Totals::compute(
            &[LineItem::new("Patrol", "month", Money::from_major(378), 1)],
            Percent::ZERO,
        );
        let paid = totals.clone().with_payment(Money::from_major(378));
        assert_eq!(paid.payment.unwrap().status, PaymentStatus::Paid);
        let unpaid = totals.with_payment(Money::ZERO);
        assert_eq!(unpaid.payment.unwrap().status, PaymentStatus::Unpaid);
    }

    #[test]
    fn validation_rejects_a_tampered_line_total() {
        let mut doc = quote_q2024();
        doc.line_items[0].line_total = Money::from_major(999);
        assert!(matches!(
            doc.validate(),
            Err(ExportError::InvalidDocument(_))
        ));
    }

    #[test]
    fn validation_rejects_payment_on_a_quote() {
        let mut doc = quote_q2024();
        doc.totals = doc.totals.with_payment(Money::from_major(10));
        assert!(matches!(
            doc.validate(),
            Err(ExportError::InvalidDocument(_))
        ));
    }

    #[test]
    fn validation_rejects_a_mismatched_balance() {
        let mut doc = quote_q2024();
        doc.kind = DocumentKind::Invoice;
        doc.totals = doc.totals.with_payment(Money::from_major(100));
        if let Some(payment) = doc.totals.payment.as_mut() {
            payment.balance_due = Money::from_major(1);
        }
        assert!(matches!(
            doc.validate(),
            Err(ExportError::InvalidDocument(_))
        ));
    }

    #[test]
    fn deserializes_a_document_from_api_json() {
        let raw = r#"{
            "kind": "invoice",
            "number": "INV-1041",
            "issue_date": "2024-06-02",
            "line_items": [
                {
                    "name": "CCTV monitoring",
                    "unit": "month",
                    "unit_price": "120.00",
                    "quantity": 2,
                    "line_total": "240.00",
                    "description": "Two camera banks, 24/7 monitoring"
                }
            ],
            "totals": {
                "subtotal": "240.00",
                "tax_rate": 0,
                "tax_amount": "0.00",
                "total": "240.00",
                "payment": {
                    "amount_paid": "240.00",
                    "balance_due": "0.00",
                    "status": "paid"
                }
            }
        }"#;
        let doc: DocumentModel = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.kind, DocumentKind::Invoice);
        assert_eq!(doc.line_items[0].line_total, Money::from_major(240));
        assert!(doc.recipient.is_none());
        doc.validate().unwrap();
    }
}
