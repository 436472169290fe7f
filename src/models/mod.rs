//! Domain records and the DTOs of the cache administration API.

pub mod records;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use records::{
    Attendee, CompleteRegistration, Country, Event, EventTicket, GrandLodge, HomepageData, Lodge,
    Organization, ReferenceItem, Registration, RegistrationPage, RegistrationSummary, Ticket,
};
pub use requests::InvalidateRequest;
pub use responses::{ClearResponse, DeleteResponse, HealthResponse, InvalidateResponse};
