//! Receipt documents for payment records.

use crate::domain::models::PaymentRecord;

/// Turns a payment record, with its member snapshot, into a document
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, record: &PaymentRecord) -> String;

    fn content_type(&self) -> &'static str;

    /// Suggested download name
    fn file_name(&self, record: &PaymentRecord) -> String;
}

/// Plain-text receipt
#[derive(Debug, Clone)]
pub struct TextReceiptRenderer {
    society_name: String,
    currency: String,
}

impl TextReceiptRenderer {
    pub fn new(society_name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            society_name: society_name.into(),
            currency: currency.into(),
        }
    }
}

impl ReceiptRenderer for TextReceiptRenderer {
    fn render(&self, record: &PaymentRecord) -> String {
        let email = if record.member.email.trim().is_empty() {
            "N/A"
        } else {
            record.member.email.as_str()
        };
        let mut lines = vec![
            format!("{} Maintenance Receipt", self.society_name),
            String::new(),
            format!("Receipt No: {}", record.receipt_id),
            format!("Date: {}", record.date.format("%Y-%m-%d")),
            format!("Member: {}", record.member.name),
            format!("Flat No: {}", record.member.flat_number),
            format!("Email: {}", email),
            format!("Method: {}", record.method),
            format!("Amount Paid: {}{:.2}", self.currency, record.amount),
        ];
        if record.late_fee_added_to_dues > rust_decimal::Decimal::ZERO {
            lines.push(format!(
                "Late Fee Assessed: {}{:.2}",
                self.currency, record.late_fee_added_to_dues
            ));
        }
        lines.push(String::new());
        lines.push("Thank you for your payment!".to_string());
        lines.join("\n") + "\n"
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn file_name(&self, record: &PaymentRecord) -> String {
        format!("receipt-{}.txt", record.receipt_id)
    }
}
