//! CollabPay Invoicing - Billing records over collaborations
//!
//! Invoices are independent record-keeping of billable events; they
//! reference collaborations and parties but never move funds. Status flows
//! one direction only: Draft, then Sent, then Paid.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::info;

use collabpay_types::{
    BrandId, CollabPayError, CollaborationId, Currency, InfluencerId, Invoice, InvoiceId,
    InvoiceLineItem, InvoiceStatus, InvoiceType, PartyRole, Result, UserId,
};

/// Parameters for creating an invoice
#[derive(Debug, Clone)]
pub struct CreateInvoiceParams {
    pub invoice_type: InvoiceType,
    pub collaboration_id: Option<CollaborationId>,
    pub brand_id: Option<BrandId>,
    pub influencer_id: Option<InfluencerId>,
    pub brand_user_id: Option<UserId>,
    pub influencer_user_id: Option<UserId>,
    pub line_items: Vec<InvoiceLineItem>,
    /// Treated as zero when absent
    pub tax_amount: Option<Decimal>,
    /// Treated as zero when absent
    pub platform_fee: Option<Decimal>,
    /// Overrides the computed total when present
    pub total_override: Option<Decimal>,
    pub currency: Currency,
    pub due_date: DateTime<Utc>,
}

/// Invoice store
#[derive(Clone, Default)]
pub struct InvoiceService {
    invoices: Arc<RwLock<HashMap<InvoiceId, Invoice>>>,
    counter: Arc<AtomicU64>,
}

impl InvoiceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a draft invoice from line items
    ///
    /// `subtotal` is the sum of line amounts; `total` is subtotal plus tax
    /// plus platform fee unless explicitly overridden.
    pub async fn create(&self, params: CreateInvoiceParams) -> Result<Invoice> {
        if params.line_items.is_empty() {
            return Err(CollabPayError::invalid_state(
                "Invoice requires at least one line item",
            ));
        }

        let subtotal: Decimal = params.line_items.iter().map(|i| i.amount).sum();
        let tax_amount = params.tax_amount.unwrap_or(Decimal::ZERO);
        let platform_fee = params.platform_fee.unwrap_or(Decimal::ZERO);
        let total = params
            .total_override
            .unwrap_or(subtotal + tax_amount + platform_fee);

        let number = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let invoice = Invoice {
            id: InvoiceId::new(),
            invoice_number: format!("INV-{number:06}"),
            invoice_type: params.invoice_type,
            collaboration_id: params.collaboration_id,
            brand_id: params.brand_id,
            influencer_id: params.influencer_id,
            brand_user_id: params.brand_user_id,
            influencer_user_id: params.influencer_user_id,
            line_items: params.line_items,
            subtotal,
            tax_amount,
            platform_fee,
            total,
            currency: params.currency,
            status: InvoiceStatus::Draft,
            issue_date: now,
            due_date: params.due_date,
            paid_at: None,
            created_at: now,
        };

        self.invoices
            .write()
            .await
            .insert(invoice.id, invoice.clone());
        info!(invoice = %invoice.invoice_number, total = %invoice.total, "invoice created");
        Ok(invoice)
    }

    /// Mark an invoice as sent
    pub async fn send(&self, id: InvoiceId) -> Result<Invoice> {
        self.set_status(id, InvoiceStatus::Sent).await
    }

    /// Mark an invoice as paid, stamping `paid_at`
    pub async fn mark_paid(&self, id: InvoiceId) -> Result<Invoice> {
        self.set_status(id, InvoiceStatus::Paid).await
    }

    async fn set_status(&self, id: InvoiceId, status: InvoiceStatus) -> Result<Invoice> {
        let mut invoices = self.invoices.write().await;
        let invoice = invoices
            .get_mut(&id)
            .ok_or_else(|| CollabPayError::InvoiceNotFound { id: id.to_string() })?;

        invoice.status = status;
        if status == InvoiceStatus::Paid {
            invoice.paid_at = Some(Utc::now());
        }
        Ok(invoice.clone())
    }

    /// Read an invoice
    pub async fn get(&self, id: InvoiceId) -> Result<Invoice> {
        self.invoices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CollabPayError::InvoiceNotFound { id: id.to_string() })
    }

    /// Invoices visible to a user on one side of the platform
    pub async fn list(&self, user_id: UserId, side: PartyRole) -> Vec<Invoice> {
        let invoices = self.invoices.read().await;
        let mut rows: Vec<Invoice> = invoices
            .values()
            .filter(|i| match side {
                PartyRole::Brand => i.brand_user_id == Some(user_id),
                PartyRole::Influencer => i.influencer_user_id == Some(user_id),
            })
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.created_at);
        rows
    }
}
