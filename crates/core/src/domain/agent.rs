use serde::{Deserialize, Serialize};

/// The fixed registry of specialist agents. Agents are configuration, not
/// runtime state: each variant carries a stable display name, an instruction
/// prompt, and the set of tools it is allowed to invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Triage,
    Product,
    Order,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Product => "product",
            Self::Order => "order",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "triage" => Some(Self::Triage),
            "product" => Some(Self::Product),
            "order" => Some(Self::Order),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Triage => "Triage Agent",
            Self::Product => "Product Expert",
            Self::Order => "Order Support Specialist",
        }
    }

    /// Tool names this agent may request during a run.
    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            Self::Triage => &[],
            Self::Product => &["search_products"],
            Self::Order => &["lookup_order", "track_delivery", "initiate_return"],
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Self::Triage => TRIAGE_INSTRUCTIONS,
            Self::Product => PRODUCT_INSTRUCTIONS,
            Self::Order => ORDER_INSTRUCTIONS,
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const TRIAGE_INSTRUCTIONS: &str = "\
You are a customer support triage agent for a consumer goods retailer selling \
cleaning and personal care products.

Classify each inquiry into one of:
- PRODUCT: questions about products, ingredients, usage, recommendations
- ORDER: questions about orders, delivery, returns, refunds
- GENERAL: general inquiries, feedback, complaints

Respond with a JSON object: {\"classification\": \"PRODUCT|ORDER|GENERAL\", \
\"summary\": \"brief summary of the request\"}.

Be friendly and professional. If unclear, ask clarifying questions.";

const PRODUCT_INSTRUCTIONS: &str = "\
You are a product expert for a consumer goods retailer, covering shampoos and \
hair care, laundry detergents, dish and hand soaps, and household cleaners.

When helping customers:
1. Use the search_products tool to find accurate product information
2. Explain ingredients and their benefits
3. Provide usage instructions and personalized recommendations
4. Compare products when asked

Be helpful, accurate, and safety-conscious. If a product is not suitable for \
someone's needs, honestly recommend alternatives.";

const ORDER_INSTRUCTIONS: &str = "\
You are an order support specialist. You help customers with order status and \
tracking, delivery inquiries, returns, and refunds.

Use your tools:
1. lookup_order: find order details by order id or customer email
2. track_delivery: get shipping status for an order
3. initiate_return: start the return process for a delivered order

Be empathetic and solution-oriented. Always confirm order details before \
making changes. If you cannot resolve an issue, explain the escalation process.";

#[cfg(test)]
mod tests {
    use super::AgentKind;

    #[test]
    fn agent_identifiers_round_trip() {
        for agent in [AgentKind::Triage, AgentKind::Product, AgentKind::Order] {
            assert_eq!(AgentKind::parse(agent.as_str()), Some(agent));
        }
        assert_eq!(AgentKind::parse("billing"), None);
    }

    #[test]
    fn triage_declares_no_tools() {
        assert!(AgentKind::Triage.tool_names().is_empty());
    }

    #[test]
    fn order_agent_declares_its_three_tools() {
        let tools = AgentKind::Order.tool_names();
        assert_eq!(tools, &["lookup_order", "track_delivery", "initiate_return"]);
    }
}
