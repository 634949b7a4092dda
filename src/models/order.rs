use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::item::Item;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Accepted,
}

/// Identity and last-known location of the operator who claimed an order.
/// Written as a unit on acceptance; an order never carries a partial profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatorProfile {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub item: Item,
    pub requester_location: GeoPoint,
    pub requester_location_name: String,
    pub status: OrderStatus,
    pub operator: Option<OperatorProfile>,
    pub order_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
}

impl OrderRecord {
    pub fn new(item: Item, requester_location: GeoPoint, requester_location_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            item,
            requester_location,
            requester_location_name,
            status: OrderStatus::Pending,
            operator: None,
            order_date: Utc::now(),
            delivery_date: None,
        }
    }

    /// Display form of the creation timestamp, also matched by feed search.
    pub fn formatted_order_date(&self) -> String {
        format_order_date(self.order_date)
    }

    /// Arrival time of day shown next to the progress bar, e.g. "14:05".
    pub fn formatted_eta(&self) -> Option<String> {
        self.delivery_date
            .map(|date| date.format("%H:%M").to_string())
    }
}

pub fn format_order_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> Item {
        Item {
            id: "pizza".to_string(),
            name: "Pizza".to_string(),
            price: 20.0,
        }
    }

    #[test]
    fn new_order_is_pending_with_no_operator() {
        let order = OrderRecord::new(
            item(),
            GeoPoint {
                lat: 46.52,
                lng: 6.57,
            },
            "Campus".to_string(),
        );

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.operator.is_none());
        assert!(order.delivery_date.is_none());
        assert!(order.formatted_eta().is_none());
    }

    #[test]
    fn formatted_order_date_is_day_first() {
        let date = DateTime::parse_from_rfc3339("2024-03-09T14:05:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(format_order_date(date), "09/03/2024 14:05");
    }
}
