pub mod credit_card;
pub mod invoice;
pub mod subscription;

pub use credit_card::{is_expiring_soon, CardDetails, CreditCard};
pub use invoice::{Invoice, ParsedInvoice, UpcomingInvoice};
pub use subscription::Subscription;
