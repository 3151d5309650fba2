//! Typed ID aliases for the persisted entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for User entities.
pub struct User;

/// Marker type for CreditCard entities.
pub struct CreditCard;

/// Marker type for Subscription entities.
pub struct Subscription;

/// Marker type for Invoice entities.
pub struct Invoice;

// ============================================================================
// ID aliases
// ============================================================================

pub type UserId = Id<User>;
pub type CreditCardId = Id<CreditCard>;
pub type SubscriptionId = Id<Subscription>;
pub type InvoiceId = Id<Invoice>;
