//! Item-level tax rollups and portfolio revenue metrics.
//!
//! Sums accumulate as `f64` exactly as the line items carry them; rounding
//! to 2 decimal places happens once, at report time, via `rust_decimal` —
//! never at intermediate steps.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;

use super::types::{Invoice, OperationRole};

/// Unrounded per-tax sums.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxTotals {
    pub icms: f64,
    pub ipi: f64,
    pub pis: f64,
    pub cofins: f64,
}

impl TaxTotals {
    /// Accumulate another set of totals into this one.
    pub fn absorb(&mut self, other: TaxTotals) {
        self.icms += other.icms;
        self.ipi += other.ipi;
        self.pis += other.pis;
        self.cofins += other.cofins;
    }

    /// Output form: each sum rounded to 2 decimal places, once.
    pub fn report(&self) -> TaxReport {
        TaxReport {
            icms: round2(self.icms),
            ipi: round2(self.ipi),
            pis: round2(self.pis),
            cofins: round2(self.cofins),
        }
    }
}

/// Rounded, presentation-ready tax totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxReport {
    #[serde(rename = "ICMS")]
    pub icms: Decimal,
    #[serde(rename = "IPI")]
    pub ipi: Decimal,
    #[serde(rename = "PIS")]
    pub pis: Decimal,
    #[serde(rename = "COFINS")]
    pub cofins: Decimal,
}

/// Sum the four tax amounts across one invoice's line items.
pub fn invoice_tax_totals(invoice: &Invoice) -> TaxTotals {
    let mut totals = TaxTotals::default();
    for item in &invoice.items {
        totals.icms += item.icms_value;
        totals.ipi += item.ipi_value;
        totals.pis += item.pis_value;
        totals.cofins += item.cofins_value;
    }
    totals
}

/// Consolidated totals across a portfolio: the sum of each invoice's own
/// (unrounded) sums.
pub fn portfolio_tax_totals<'a, I>(invoices: I) -> TaxTotals
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut totals = TaxTotals::default();
    for invoice in invoices {
        totals.absorb(invoice_tax_totals(invoice));
    }
    totals
}

/// Per-invoice rounded reports, in input order: `(document number, report)`.
pub fn per_invoice_reports<'a, I>(invoices: I) -> Vec<(String, TaxReport)>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    invoices
        .into_iter()
        .map(|inv| (inv.number.clone(), invoice_tax_totals(inv).report()))
        .collect()
}

/// Revenue metrics over the outbound (sales) slice of a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueMetrics {
    /// Sum of declared total values, rounded at output.
    pub total_revenue: Decimal,
    /// Count of distinct document numbers.
    pub invoice_count: usize,
    /// `total_revenue / invoice_count`, 0 when there are no invoices.
    pub average_ticket: Decimal,
    /// Count of distinct non-empty recipient tax IDs.
    pub distinct_recipients: usize,
}

/// Compute revenue metrics over the `Outbound` invoices of `invoices`.
///
/// Inbound and unknown-role documents never count toward revenue; the
/// average ticket divides by distinct document numbers and is 0 for an
/// empty slice rather than a division fault.
pub fn revenue_metrics<'a, I>(invoices: I) -> RevenueMetrics
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut total = Decimal::ZERO;
    let mut numbers: HashSet<&str> = HashSet::new();
    let mut recipients: HashSet<&str> = HashSet::new();

    for invoice in invoices {
        if invoice.operation_role != OperationRole::Outbound {
            continue;
        }
        total += decimal_from_money(&invoice.declared_total);
        numbers.insert(invoice.number.as_str());
        if !invoice.recipient_tax_id.is_empty() {
            recipients.insert(invoice.recipient_tax_id.as_str());
        }
    }

    let count = numbers.len();
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    };

    RevenueMetrics {
        total_revenue: total.round_dp(2),
        invoice_count: count,
        average_ticket: average,
        distinct_recipients: recipients.len(),
    }
}

fn round2(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(2)
}

fn decimal_from_money(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim()).unwrap_or(Decimal::ZERO)
}
