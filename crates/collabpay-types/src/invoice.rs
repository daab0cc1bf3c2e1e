//! Invoice types
//!
//! Invoices are independent billing records; they reference collaborations
//! and parties but never move funds themselves.

use crate::{BrandId, CollaborationId, Currency, InfluencerId, InvoiceId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the invoice bills for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Brand funding its side of a collaboration
    BrandDeposit,
    /// Influencer billing for completed work
    InfluencerPayout,
    /// Platform billing its commission
    PlatformFee,
}

/// One-directional billing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

/// A billable line on an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: u32,
    /// Line total
    pub amount: Decimal,
}

/// A billing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing sequential number, e.g. `INV-000042`
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub collaboration_id: Option<CollaborationId>,
    pub brand_id: Option<BrandId>,
    pub influencer_id: Option<InfluencerId>,
    /// User on the brand side, for list filtering
    pub brand_user_id: Option<UserId>,
    /// User on the influencer side, for list filtering
    pub influencer_user_id: Option<UserId>,
    pub line_items: Vec<InvoiceLineItem>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub platform_fee: Decimal,
    /// subtotal + tax + fee unless explicitly overridden at creation
    pub total: Decimal,
    pub currency: Currency,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
