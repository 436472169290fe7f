//! Domain records mapped from repository rows.
//!
//! These are the shapes the service façades cache and return. Timestamps are
//! kept as the RFC 3339 strings the data source returns.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::repository::Row;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub event_start: Option<String>,
    pub event_end: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub featured: bool,
}

/// A purchasable ticket type of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTicket {
    pub event_ticket_id: String,
    pub event_id: String,
    pub name: String,
    pub price: f64,
    pub total_capacity: Option<i64>,
    pub available_count: Option<i64>,
}

/// An issued or reserved ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub event_id: String,
    pub event_ticket_id: Option<String>,
    pub registration_id: Option<String>,
    pub attendee_id: Option<String>,
    pub status: String,
    pub price_paid: Option<f64>,
    pub qr_code_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub registration_id: String,
    pub confirmation_number: Option<String>,
    pub event_id: Option<String>,
    pub customer_id: Option<String>,
    pub registration_type: Option<String>,
    pub status: String,
    pub payment_status: Option<String>,
    pub total_amount_paid: Option<f64>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub attendee_id: String,
    pub registration_id: String,
    pub first_name: String,
    pub last_name: String,
    pub attendee_type: Option<String>,
}

/// Lightweight registration view for confirmation screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub registration_id: String,
    pub confirmation_number: Option<String>,
    pub status: String,
    pub payment_status: Option<String>,
    pub total_amount_paid: Option<f64>,
    pub attendee_count: u64,
    pub ticket_count: u64,
}

/// Registration with everything hanging off it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteRegistration {
    pub registration: Registration,
    pub attendees: Vec<Attendee>,
    pub tickets: Vec<Ticket>,
}

/// One page of registration search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPage {
    pub registrations: Vec<Registration>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrandLodge {
    pub grand_lodge_id: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lodge {
    pub lodge_id: String,
    pub grand_lodge_id: String,
    pub name: String,
    pub number: Option<i64>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub organization_id: String,
    pub name: String,
    pub organization_type: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub country_code: String,
    pub name: String,
}

/// Reference list entry (titles, attendee relationships).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: String,
    pub name: String,
    pub sort_order: Option<i64>,
}

/// Everything the landing page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomepageData {
    pub featured_events: Vec<Event>,
    pub upcoming_events: Vec<Event>,
    pub grand_lodge_count: usize,
}

// == Row Mapping ==
/// Maps one row to a domain record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// Maps every row, failing on the first that does not fit.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

/// Serializes a record into a row for writes.
pub fn to_row<T: Serialize>(record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(crate::error::DataError::InvalidRequest(format!(
            "expected an object, got {other}"
        ))),
    }
}
