pub mod access;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use access::AccessGate;
pub use domain::scenario::{BillingMode, PaymentOffer, Profile, Scenario};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::export::ProposalExport;
pub use pricing::rate_card::RateCard;
pub use pricing::{QuoteResults, QuoteRuntime, StandardQuoteRuntime};
