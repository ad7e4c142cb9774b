//! Invoicing domain: quotations, invoices, pricing and document numbering.
//!
//! Pure, deterministic domain logic (no IO, no storage). Stock reservation and
//! persistence live in `billbook-infra`.

pub mod document;
pub mod invoice;
pub mod line;
pub mod numbering;
pub mod pricing;
pub mod quotation;

pub use document::PricedDocument;
pub use invoice::{
    Invoice, InvoiceChanges, InvoiceDraft, InvoiceStatus, Payment, PaymentMethod, PaymentReceipt,
    PaymentStatus,
};
pub use line::LineItem;
pub use numbering::{DocumentKind, DocumentNumber};
pub use pricing::{compute_totals, LineBreakdown, Totals};
pub use quotation::{Quotation, QuotationChanges, QuotationDraft, QuotationStatus};
