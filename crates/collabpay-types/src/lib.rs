//! CollabPay Types - Canonical domain types for the collaboration engine
//!
//! This crate contains all foundational types for CollabPay with zero
//! dependencies on other collabpay crates. It defines the complete type
//! system for:
//!
//! - Identity types (CollaborationId, WalletId, EscrowId, etc.)
//! - Currency and decimal money helpers
//! - Collaboration lifecycle states, actions and history
//! - Contract, milestone and deliverable types
//! - Wallet, transaction, escrow and payout types
//! - Invoice and messaging types
//!
//! # Architectural Invariants
//!
//! These types support the core CollabPay invariants:
//!
//! 1. `platform_fee + influencer_payout == agreed_amount` for every collaboration
//! 2. Wallet balances never go negative
//! 3. `held_amount + released_amount <= total_amount` for every escrow
//! 4. Transaction, history, release and version records are append-only

pub mod identity;
pub mod currency;
pub mod money;
pub mod collaboration;
pub mod contract;
pub mod milestone;
pub mod deliverable;
pub mod wallet;
pub mod escrow;
pub mod invoice;
pub mod message;
pub mod error;

pub use identity::*;
pub use currency::*;
pub use money::*;
pub use collaboration::*;
pub use contract::*;
pub use milestone::*;
pub use deliverable::*;
pub use wallet::*;
pub use escrow::*;
pub use invoice::*;
pub use message::*;
pub use error::*;

/// Version of the CollabPay types schema
pub const TYPES_VERSION: &str = "0.1.0";
