use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use concierge_core::{OrderId, ProductCategory, ReturnRefused};
use concierge_db::{OrderStore, ProductCatalog};

use crate::backend::{ToolInvocation, ToolOutput};

const SEARCH_TOP: usize = 5;

/// Maps a named tool call to exactly one capability-provider operation.
///
/// Infallible from the runner's point of view: provider failures, missing
/// arguments, and unknown tool names all become structured error payloads,
/// never errors. A tool error is resolvable context for the agent, not a
/// run failure.
#[derive(Clone)]
pub struct ToolDispatcher {
    catalog: Arc<dyn ProductCatalog>,
    orders: Arc<dyn OrderStore>,
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<dyn ProductCatalog>, orders: Arc<dyn OrderStore>) -> Self {
        Self { catalog, orders }
    }

    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolOutput {
        let output = match invocation.name.as_str() {
            "search_products" => self.search_products(&invocation.arguments).await,
            "lookup_order" => self.lookup_order(&invocation.arguments).await,
            "track_delivery" => self.track_delivery(&invocation.arguments).await,
            "initiate_return" => self.initiate_return(&invocation.arguments).await,
            other => json!({ "error": format!("Unknown function: {other}") }),
        };

        debug!(
            event_name = "tools.dispatched",
            tool = %invocation.name,
            invocation_id = %invocation.id,
            "tool invocation resolved"
        );

        ToolOutput { invocation_id: invocation.id.clone(), output }
    }

    async fn search_products(&self, args: &Value) -> Value {
        let Some(query) = str_arg(args, "query") else {
            return json!({ "error": "Missing required argument: query" });
        };
        let category = str_arg(args, "category").and_then(ProductCategory::parse_filter);

        match self.catalog.search(query, category, SEARCH_TOP).await {
            Ok(products) => json!({ "count": products.len(), "products": products }),
            Err(err) => json!({ "error": format!("Product search failed: {err}") }),
        }
    }

    async fn lookup_order(&self, args: &Value) -> Value {
        if let Some(order_id) = str_arg(args, "order_id") {
            let id = OrderId(order_id.to_string());
            return match self.orders.find_by_id(&id).await {
                Ok(Some(order)) => json!({ "found": true, "order": order }),
                Ok(None) => {
                    json!({ "found": false, "message": format!("No order found with ID {id}") })
                }
                Err(err) => json!({ "error": format!("Order lookup failed: {err}") }),
            };
        }

        if let Some(email) = str_arg(args, "email") {
            return match self.orders.find_by_email(email).await {
                Ok(orders) if orders.is_empty() => {
                    json!({ "found": false, "message": format!("No orders found for {email}") })
                }
                Ok(orders) => json!({ "found": true, "count": orders.len(), "orders": orders }),
                Err(err) => json!({ "error": format!("Order lookup failed: {err}") }),
            };
        }

        json!({ "found": false, "message": "Provide an order ID or an email address" })
    }

    async fn track_delivery(&self, args: &Value) -> Value {
        let Some(order_id) = str_arg(args, "order_id") else {
            return json!({ "error": "Missing required argument: order_id" });
        };
        let id = OrderId(order_id.to_string());

        match self.orders.find_by_id(&id).await {
            Ok(Some(order)) => json!({ "found": true, "tracking": order.tracking() }),
            Ok(None) => {
                json!({ "found": false, "message": format!("No order found with ID {id}") })
            }
            Err(err) => json!({ "error": format!("Delivery tracking failed: {err}") }),
        }
    }

    async fn initiate_return(&self, args: &Value) -> Value {
        let Some(order_id) = str_arg(args, "order_id") else {
            return json!({ "error": "Missing required argument: order_id" });
        };
        let Some(reason) = str_arg(args, "reason") else {
            return json!({ "error": "Missing required argument: reason" });
        };
        let id = OrderId(order_id.to_string());

        match self.orders.find_by_id(&id).await {
            Ok(Some(order)) => match order.initiate_return(reason) {
                Ok(receipt) => json!({
                    "success": true,
                    "return_id": receipt.return_id,
                    "message": receipt.message,
                    "instructions": receipt.instructions,
                }),
                Err(ReturnRefused::NotDelivered) => json!({
                    "success": false,
                    "message": format!(
                        "Only delivered orders can be returned. Current status: {}",
                        order.status.as_str()
                    ),
                }),
            },
            Ok(None) => {
                json!({ "success": false, "message": format!("No order found with ID {id}") })
            }
            Err(err) => json!({ "error": format!("Return initiation failed: {err}") }),
        }
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|v| !v.trim().is_empty())
}

/// Function schema advertised to the model backend for a declared tool name.
pub fn tool_definition(name: &str) -> Value {
    let (description, parameters) = match name {
        "search_products" => (
            "Search the product catalog by keyword, optionally scoped to a category",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search keywords" },
                    "category": {
                        "type": "string",
                        "enum": ["shampoo", "detergent", "soap", "cleaner", "all"],
                    },
                },
                "required": ["query"],
            }),
        ),
        "lookup_order" => (
            "Find order details by order ID or by customer email",
            json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "email": { "type": "string" },
                },
            }),
        ),
        "track_delivery" => (
            "Get the shipping status for an order",
            json!({
                "type": "object",
                "properties": { "order_id": { "type": "string" } },
                "required": ["order_id"],
            }),
        ),
        "initiate_return" => (
            "Start the return process for a delivered order",
            json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "reason": { "type": "string" },
                },
                "required": ["order_id", "reason"],
            }),
        ),
        other => (other, json!({ "type": "object", "properties": {} })),
    };

    json!({
        "type": "function",
        "function": { "name": name, "description": description, "parameters": parameters },
    })
}
