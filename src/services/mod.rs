//! Cached data-access façades.
//!
//! Each service reads through the shared [`CacheManager`](crate::cache::CacheManager)
//! and drops every key family its writes can make stale.

pub mod events;
pub mod homepage;
pub mod registrations;
pub mod static_data;
pub mod tickets;

pub use events::{EventListQuery, EventService};
pub use homepage::HomepageService;
pub use registrations::RegistrationService;
pub use static_data::StaticDataService;
pub use tickets::{AssetGenerator, QrCodeResult, TicketService, DEFAULT_QR_BATCH_SIZE};
