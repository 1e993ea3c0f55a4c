//! Merged tool catalog for one request

use crate::types::ToolDescriptor;

/// A tool and the provider that offered it
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub provider: String,
    pub tool: ToolDescriptor,
}

/// Ordered tools across all providers.
///
/// Names are unique within one provider's contribution but may collide
/// across providers; collisions are kept and lookups return the first entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one provider's tools, keeping their order
    pub fn extend(&mut self, provider: &str, tools: Vec<ToolDescriptor>) {
        self.entries.extend(tools.into_iter().map(|tool| CatalogEntry {
            provider: provider.to_string(),
            tool,
        }));
    }

    /// First entry with this tool name
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.tool.name == name)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// The descriptors, in catalog order, as handed to the model
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.tool.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collisions_preserved_first_wins() {
        let mut catalog = Catalog::new();
        catalog.extend("slack", vec![ToolDescriptor::new("search", "Slack search")]);
        catalog.extend(
            "hubspot",
            vec![
                ToolDescriptor::new("search", "CRM search"),
                ToolDescriptor::new("get_deal", "Deal"),
            ],
        );

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.names(), vec!["search", "search", "get_deal"]);
        assert_eq!(catalog.find("search").unwrap().provider, "slack");
        assert_eq!(catalog.find("get_deal").unwrap().provider, "hubspot");
        assert!(catalog.find("missing").is_none());
        assert_eq!(catalog.tools()[1].description, "CRM search");
    }
}
