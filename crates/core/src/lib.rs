//! `ordergate-core`: shared building blocks.
//!
//! Identifiers, pagination types, the clock seam and the domain validation
//! error. No IO lives here.

pub mod clock;
pub mod error;
pub mod id;
pub mod page;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::DomainError;
pub use id::{ProductId, PurchaseId, UserId};
pub use page::{Page, PageRequest, SortDirection};
