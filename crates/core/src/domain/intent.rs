use serde::{Deserialize, Serialize};

/// Closed set of inquiry intents. Anything the classifier cannot place lands
/// in `General` rather than failing the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Product,
    Order,
    General,
}

impl Intent {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::Order => "ORDER",
            Self::General => "GENERAL",
        }
    }

    /// Unknown or missing labels map to `General`, never to an error.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PRODUCT" => Self::Product,
            "ORDER" => Self::Order,
            _ => Self::General,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub summary: String,
}

impl Classification {
    pub fn new(intent: Intent, summary: impl Into<String>) -> Self {
        Self { intent, summary: summary.into() }
    }

    pub fn general(summary: impl Into<String>) -> Self {
        Self::new(Intent::General, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::Intent;

    #[test]
    fn known_labels_parse_case_insensitively() {
        assert_eq!(Intent::parse("PRODUCT"), Intent::Product);
        assert_eq!(Intent::parse("order"), Intent::Order);
        assert_eq!(Intent::parse(" General "), Intent::General);
    }

    #[test]
    fn unknown_labels_fall_back_to_general() {
        assert_eq!(Intent::parse("BILLING"), Intent::General);
        assert_eq!(Intent::parse(""), Intent::General);
    }
}
