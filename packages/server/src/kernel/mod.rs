//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod jobs;
pub mod mailer;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, StripeAdapter};
pub use mailer::LogMailer;
pub use scheduled_tasks::start_scheduler;
pub use test_dependencies::{MockMailer, MockPaymentGateway, TestDependencies};
pub use traits::*;
