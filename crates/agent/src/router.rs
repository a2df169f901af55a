use concierge_core::{AgentKind, Intent};

/// Single source of truth for intent-to-agent mapping. Both the single-shot
/// and streaming paths go through here so their routing cannot diverge.
pub fn route(intent: Intent) -> AgentKind {
    match intent {
        Intent::Product => AgentKind::Product,
        Intent::Order => AgentKind::Order,
        Intent::General => AgentKind::Triage,
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::{AgentKind, Intent};

    use super::route;

    #[test]
    fn known_intents_map_to_their_specialist() {
        assert_eq!(route(Intent::Product), AgentKind::Product);
        assert_eq!(route(Intent::Order), AgentKind::Order);
    }

    #[test]
    fn everything_else_lands_on_triage() {
        assert_eq!(route(Intent::General), AgentKind::Triage);
        assert_eq!(route(Intent::parse("BILLING")), AgentKind::Triage);
    }

    #[test]
    fn routing_is_idempotent() {
        for intent in [Intent::Product, Intent::Order, Intent::General] {
            assert_eq!(route(intent), route(intent));
        }
    }
}
