use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Checkout completion handled.
    Processed,
    /// Notification id seen before; nothing done.
    Duplicate,
    /// Event type this service does not act on.
    Ignored,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub outcome: WebhookOutcome,
    pub tickets_issued: usize,
}
