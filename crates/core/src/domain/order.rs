use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            _ => Self::Processing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub email: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub order_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_date: Option<NaiveDate>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub return_id: String,
    pub order_id: OrderId,
    pub reason: String,
    pub message: String,
    pub instructions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReturnRefused {
    #[error("returns can only be initiated for delivered orders")]
    NotDelivered,
}

const RETURN_INSTRUCTIONS: &[&str] = &[
    "You will receive a prepaid shipping label via email within 24 hours",
    "Pack the items securely, in the original packaging if possible",
    "Drop the parcel off at any carrier location",
    "The refund is processed within 5-7 business days after we receive the items",
];

impl Order {
    pub fn tracking(&self) -> TrackingInfo {
        let message = match self.status {
            OrderStatus::Processing => "Your order is being prepared for shipment.",
            OrderStatus::Shipped => "Your order is on its way!",
            OrderStatus::Delivered => "Your order has been delivered.",
        };

        TrackingInfo {
            order_id: self.id.clone(),
            status: self.status,
            carrier: self.carrier.clone(),
            tracking_number: self.tracking_number.clone(),
            estimated_delivery: match self.status {
                OrderStatus::Shipped => self.estimated_delivery,
                _ => None,
            },
            delivered_date: match self.status {
                OrderStatus::Delivered => self.delivered_date,
                _ => None,
            },
            message: message.to_string(),
        }
    }

    pub fn initiate_return(&self, reason: &str) -> Result<ReturnReceipt, ReturnRefused> {
        if self.status != OrderStatus::Delivered {
            return Err(ReturnRefused::NotDelivered);
        }

        let return_id = format!("RET-{}", self.id);
        Ok(ReturnReceipt {
            message: format!("Return request {return_id} created successfully"),
            return_id,
            order_id: self.id.clone(),
            reason: reason.to_string(),
            instructions: RETURN_INSTRUCTIONS.iter().map(|step| (*step).to_string()).collect(),
        })
    }
}
