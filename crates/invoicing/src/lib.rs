//! Invoicing domain module (event-sourced).
//!
//! This crate contains business rules for customer invoices and their
//! payments, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod invoice;
pub mod totals;

pub use invoice::{
    Invoice, InvoiceCommand, InvoiceEvent, InvoiceId, InvoiceIssued, InvoiceStatus, InvoiceVoided,
    IssueInvoice, PaymentRegistered, RegisterPayment, VoidInvoice,
};
pub use totals::{Discount, InvoiceLine, InvoiceTotals, LineTotals, compute_totals, line_totals};
