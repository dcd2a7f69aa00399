//! Notifications domain module (event-sourced).
//!
//! Messages addressed to customers. Delivery over the channel itself is out
//! of scope; a notification records what was sent and whether it was read.

pub mod notification;

pub use notification::{
    MarkNotificationRead, Notification, NotificationChannel, NotificationCommand,
    NotificationEvent, NotificationId, NotificationRead, NotificationSent, SendNotification,
};
