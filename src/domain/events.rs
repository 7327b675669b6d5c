//! Order lifecycle events, published to NATS when a client is configured.

use serde::Serialize;
use uuid::Uuid;

/// Events downstream systems (fulfilment, notifications) subscribe to.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: Uuid,
        order_number: String,
        total_amount: f64,
    },
    StatusChanged {
        order_id: Uuid,
        status: String,
    },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => "orders.created",
            OrderEvent::StatusChanged { .. } => "orders.status_changed",
        }
    }
}

/// Fire-and-forget publish. A missing client, encoding failure or broker
/// error only logs; order handling never depends on the bus.
pub async fn publish(nats: Option<&async_nats::Client>, event: OrderEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "could not encode order event");
            return;
        }
    };
    if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
        tracing::warn!(subject = event.subject(), error = %e, "could not publish order event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_event_serializes_with_tag_and_subject() {
        let event = OrderEvent::Created {
            order_id: Uuid::new_v4(),
            order_number: "ORD-00001234".into(),
            total_amount: 1275.5,
        };
        assert_eq!(event.subject(), "orders.created");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "created");
        assert_eq!(value["order_number"], "ORD-00001234");
    }

    #[test]
    fn status_event_targets_its_own_subject() {
        let event = OrderEvent::StatusChanged {
            order_id: Uuid::new_v4(),
            status: "shipped".into(),
        };
        assert_eq!(event.subject(), "orders.status_changed");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["status"], "shipped");
    }
}
