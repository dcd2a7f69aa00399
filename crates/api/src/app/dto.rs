//! Request bodies and JSON views of the read models.
//!
//! Ids in bodies arrive as strings and are parsed by the handlers, so a bad id
//! answers `invalid_id` rather than a generic body error.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use cargohub_core::{Address, AggregateId, AggregateRoot};
use cargohub_customers::Customer;
use cargohub_customs::{CustomsDeclaration, DeclarationItem};
use cargohub_infra::event_store::StoredEvent;
use cargohub_invoicing::{Invoice, InvoiceLine};
use cargohub_notifications::{Notification, NotificationChannel};
use cargohub_routing::{DeliveryRoute, Driver, DriverStatus};
use cargohub_shipments::Shipment;
use cargohub_support::{MessageAuthor, SupportTicket, TicketPriority};
use cargohub_warehouses::Warehouse;

// Customers

#[derive(Debug, Deserialize)]
pub struct RegisterCustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendCustomerRequest {
    pub reason: Option<String>,
}

// Warehouses

#[derive(Debug, Deserialize)]
pub struct RegisterWarehouseRequest {
    pub code: String,
    pub name: String,
    pub address: Address,
    pub capacity: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWarehouseRequest {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub capacity: Option<u32>,
}

// Shipments

#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    pub customer_id: String,
    pub origin_warehouse_id: String,
    pub destination_warehouse_id: String,
    pub recipient_name: String,
    pub delivery_address: Address,
    pub weight_grams: u64,
    #[serde(default)]
    pub declared_value: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShipmentStatusRequest {
    pub status: String,
    pub location: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelShipmentRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReturnShipmentRequest {
    pub reason: String,
    pub location: Option<String>,
}

// Invoices

#[derive(Debug, Deserialize)]
pub struct IssueInvoiceRequest {
    pub customer_id: String,
    pub shipment_id: Option<String>,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    /// Defaults to now plus the configured payment terms.
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewInvoiceRequest {
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPaymentRequest {
    pub amount: u64,
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoidInvoiceRequest {
    pub reason: Option<String>,
}

// Customs

#[derive(Debug, Deserialize)]
pub struct FileDeclarationRequest {
    pub shipment_id: String,
    pub exporter: String,
    pub importer: String,
    pub destination_country: String,
    pub items: Vec<DeclarationItem>,
}

#[derive(Debug, Deserialize)]
pub struct AmendItemsRequest {
    pub items: Vec<DeclarationItem>,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

// Tickets

#[derive(Debug, Deserialize)]
pub struct OpenTicketRequest {
    pub customer_id: String,
    pub shipment_id: Option<String>,
    pub subject: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: TicketPriority,
}

fn default_priority() -> TicketPriority {
    TicketPriority::Medium
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub assignee: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyToTicketRequest {
    pub author: MessageAuthor,
    pub author_name: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePriorityRequest {
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTicketRequest {
    pub resolution: String,
}

// Notifications

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub customer_id: String,
    #[serde(default = "default_channel")]
    pub channel: NotificationChannel,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub shipment_id: Option<String>,
}

fn default_channel() -> NotificationChannel {
    NotificationChannel::InApp
}

fn default_kind() -> String {
    "manual".to_string()
}

// Drivers and routes

#[derive(Debug, Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub phone: String,
    pub license_number: String,
    pub vehicle_plate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDriverRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle_plate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DriverStatusRequest {
    pub status: DriverStatus,
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub shipment_id: String,
    /// Falls back to the shipment's delivery address.
    pub address: Option<Address>,
}

#[derive(Debug, Deserialize)]
pub struct PlanRouteRequest {
    pub scheduled_date: NaiveDate,
    pub driver_id: Option<String>,
    #[serde(default)]
    pub stops: Vec<StopRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderStopsRequest {
    pub order: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteStopRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FailStopRequest {
    pub note: String,
}

// Responses

/// `{"id", "events_committed"}` for a command on `id`.
pub fn committed(status: StatusCode, id: AggregateId, events: &[StoredEvent]) -> Response {
    (
        status,
        Json(json!({
            "id": id.to_string(),
            "events_committed": events.len(),
        })),
    )
        .into_response()
}

pub fn items(items: Vec<JsonValue>) -> Response {
    (StatusCode::OK, Json(json!({ "items": items }))).into_response()
}

pub fn one(value: JsonValue) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

fn enum_str<T: serde::Serialize>(value: T) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

pub fn customer_to_json(c: Customer) -> JsonValue {
    json!({
        "id": c.id().to_string(),
        "name": c.name(),
        "email": c.email(),
        "phone": c.phone(),
        "company": c.company(),
        "address": c.address(),
        "status": enum_str(c.status()),
        "can_ship": c.can_ship(),
        "version": c.version(),
    })
}

pub fn warehouse_to_json(w: Warehouse) -> JsonValue {
    json!({
        "id": w.id().to_string(),
        "code": w.code().map(|c| c.as_str()),
        "name": w.name(),
        "address": w.address(),
        "capacity": w.capacity(),
        "status": enum_str(w.status()),
        "version": w.version(),
    })
}

pub fn shipment_to_json(s: Shipment) -> JsonValue {
    json!({
        "id": s.id().to_string(),
        "tracking_number": s.tracking_number(),
        "customer_id": s.customer_id().map(|c| c.to_string()),
        "origin_warehouse_id": s.origin_warehouse_id().map(|w| w.to_string()),
        "destination_warehouse_id": s.destination_warehouse_id().map(|w| w.to_string()),
        "recipient_name": s.recipient_name(),
        "delivery_address": s.delivery_address(),
        "weight_grams": s.weight_grams(),
        "declared_value": s.declared_value(),
        "description": s.description(),
        "status": s.status().as_str(),
        "last_location": s.last_location(),
        "history": s.history(),
        "version": s.version(),
    })
}

/// Public tracking view: no customer or pricing data.
pub fn tracking_to_json(s: Shipment) -> JsonValue {
    json!({
        "tracking_number": s.tracking_number(),
        "status": s.status().as_str(),
        "last_location": s.last_location(),
        "history": s.history(),
    })
}

pub fn invoice_to_json(inv: Invoice, now: DateTime<Utc>) -> JsonValue {
    json!({
        "id": inv.id().to_string(),
        "invoice_number": inv.invoice_number(),
        "customer_id": inv.customer_id().map(|c| c.to_string()),
        "shipment_id": inv.shipment_id().map(|s| s.to_string()),
        "currency": inv.currency(),
        "lines": inv.lines(),
        "totals": inv.totals(),
        "total_paid": inv.total_paid(),
        "outstanding": inv.outstanding_amount(),
        "due_date": inv.due_date(),
        "overdue": inv.is_overdue(now),
        "status": enum_str(inv.status()),
        "version": inv.version(),
    })
}

pub fn declaration_to_json(d: CustomsDeclaration) -> JsonValue {
    json!({
        "id": d.id().to_string(),
        "declaration_number": d.declaration_number(),
        "shipment_id": d.shipment_id().map(|s| s.to_string()),
        "exporter": d.exporter(),
        "importer": d.importer(),
        "destination_country": d.destination_country(),
        "items": d.items(),
        "totals": d.totals(),
        "status": enum_str(d.status()),
        "status_reason": d.status_reason(),
        "version": d.version(),
    })
}

pub fn ticket_to_json(t: SupportTicket) -> JsonValue {
    json!({
        "id": t.id().to_string(),
        "reference": t.reference(),
        "customer_id": t.customer_id().map(|c| c.to_string()),
        "shipment_id": t.shipment_id().map(|s| s.to_string()),
        "subject": t.subject(),
        "description": t.description(),
        "priority": enum_str(t.priority()),
        "status": enum_str(t.status()),
        "assignee": t.assignee(),
        "resolution": t.resolution(),
        "messages": t.messages(),
        "version": t.version(),
    })
}

pub fn notification_to_json(n: Notification) -> JsonValue {
    json!({
        "id": n.id().to_string(),
        "customer_id": n.customer_id().map(|c| c.to_string()),
        "channel": enum_str(n.channel()),
        "kind": n.kind(),
        "title": n.title(),
        "message": n.message(),
        "shipment_id": n.shipment_id().map(|s| s.to_string()),
        "sent_at": n.sent_at(),
        "read_at": n.read_at(),
        "read": n.is_read(),
    })
}

pub fn driver_to_json(d: Driver) -> JsonValue {
    json!({
        "id": d.id().to_string(),
        "name": d.name(),
        "phone": d.phone(),
        "license_number": d.license_number(),
        "vehicle_plate": d.vehicle_plate(),
        "status": enum_str(d.status()),
        "version": d.version(),
    })
}

pub fn route_to_json(r: DeliveryRoute) -> JsonValue {
    json!({
        "id": r.id().to_string(),
        "route_code": r.route_code(),
        "scheduled_date": r.scheduled_date(),
        "driver_id": r.driver_id().map(|d| d.to_string()),
        "stops": r.stops(),
        "next_stop": r.next_stop().map(|s| s.shipment_id.to_string()),
        "status": enum_str(r.status()),
        "version": r.version(),
    })
}
