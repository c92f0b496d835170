use crate::config::issues_from;
use crate::{ConfigIssue, GraphError, ToolConfig, ToolError, ToolExecutor, ToolKind, ToolNode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Factory trait for creating executors of one tool kind
pub trait ToolFactory: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Input capacity of every tool of this kind.
    fn max_inputs(&self) -> usize;

    /// Create an executor bound to a validated configuration
    fn create(&self, config: &ToolConfig) -> Result<Box<dyn ToolExecutor>, ToolError>;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::default()
    }
}

/// Description and config schema of a tool kind
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub description: String,
    pub category: String,
    pub fields: Vec<FieldDefinition>,
}

impl Default for ToolMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub read_only: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            read_only: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Registry of available tool kinds
///
/// The single source of `max_inputs` for every kind; graphs copy it onto
/// nodes at insertion and into config data before validation.
pub struct ToolRegistry {
    factories: BTreeMap<ToolKind, Arc<dyn ToolFactory>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a tool factory
    pub fn register(&mut self, factory: Arc<dyn ToolFactory>) {
        let kind = factory.kind();
        if kind.is_root() {
            tracing::warn!("Refusing to register a factory for the root sentinel");
            return;
        }
        tracing::info!("Registering tool type: {} (max inputs {})", kind, factory.max_inputs());
        self.factories.insert(kind, factory);
    }

    pub fn factory(&self, kind: ToolKind) -> Result<&Arc<dyn ToolFactory>, GraphError> {
        self.factories
            .get(&kind)
            .ok_or_else(|| GraphError::UnknownToolType(kind.to_string()))
    }

    pub fn max_inputs(&self, kind: ToolKind) -> Result<usize, GraphError> {
        self.factory(kind).map(|f| f.max_inputs())
    }

    pub fn contains(&self, kind: ToolKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Turns opaque config data into a validated config for `kind`.
    ///
    /// `type` and `max_inputs` are injected from the registry; a caller value
    /// for `max_inputs` is discarded and a conflicting `type` is an issue.
    pub fn parse_config(
        &self,
        kind: ToolKind,
        data: &serde_json::Value,
    ) -> Result<ToolConfig, Vec<ConfigIssue>> {
        let max_inputs = self.max_inputs(kind).map_err(|e| {
            vec![ConfigIssue::new("type", "unknown", e.to_string())]
        })?;

        let mut fields = match data {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(vec![ConfigIssue::new(
                    "config",
                    "invalid",
                    format!("Config must be a JSON object, got {}.", other),
                )])
            }
        };

        match fields.get("type") {
            None => {}
            Some(serde_json::Value::String(t)) if t == kind.as_ref() => {}
            Some(other) => {
                return Err(vec![ConfigIssue::new(
                    "type",
                    "mismatch",
                    format!("Config type {} does not match tool type '{}'.", other, kind),
                )])
            }
        }
        fields.insert("type".to_string(), kind.as_ref().into());
        fields.insert("max_inputs".to_string(), max_inputs.into());

        let config: ToolConfig = serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| vec![ConfigIssue::new("config", "invalid", e.to_string())])?;
        config.validate().map_err(|e| issues_from(&e))?;

        Ok(config)
    }

    /// Resolves the executor for a node, falling back to the kind's default
    /// config when the node was never configured.
    pub fn create_executor(&self, node: &ToolNode) -> Result<Box<dyn ToolExecutor>, ToolError> {
        let factory = self
            .factories
            .get(&node.kind())
            .ok_or_else(|| {
                ToolError::processing("tool_error", format!("Unknown tool type: {}", node.kind()))
            })?;

        match node.config() {
            Some(config) => factory.create(config),
            None => {
                let config = ToolConfig::default_for(node.kind(), factory.max_inputs())
                    .ok_or(ToolError::MissingConfig)?;
                factory.create(&config)
            }
        }
    }

    /// Get all registered tool kinds
    pub fn list_tool_kinds(&self) -> Vec<ToolKind> {
        self.factories.keys().copied().collect()
    }

    pub fn metadata(&self, kind: ToolKind) -> Option<ToolMetadata> {
        self.factories.get(&kind).map(|f| f.metadata())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::registry;
    use super::*;
    use serde_json::json;

    #[test]
    fn max_inputs_is_injected_over_caller_value() {
        let registry = registry();
        for bogus in [10, -3, 1, 2] {
            let config = registry
                .parse_config(
                    ToolKind::InputUrl,
                    &json!({"url": "http://www.mock.com", "max_inputs": bogus}),
                )
                .unwrap();
            assert_eq!(config.max_inputs(), 0);
        }
    }

    #[test]
    fn mismatched_type_is_reported() {
        let issues = registry()
            .parse_config(ToolKind::DescribeData, &json!({"type": "input_url"}))
            .unwrap_err();
        assert_eq!(issues[0].field, "type");
        assert_eq!(issues[0].kind, "mismatch");
    }

    #[test]
    fn non_object_config_is_reported() {
        let issues = registry()
            .parse_config(ToolKind::DescribeData, &json!([1, 2]))
            .unwrap_err();
        assert_eq!(issues[0].kind, "invalid");
    }

    #[test]
    fn wrongly_typed_field_is_reported() {
        let issues = registry()
            .parse_config(ToolKind::DescribeData, &json!({"data_type": "numeric"}))
            .unwrap_err();
        assert_eq!(issues[0].field, "config");
    }

    #[test]
    fn unregistered_kind_is_unknown() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry.max_inputs(ToolKind::ConcatData),
            Err(GraphError::UnknownToolType("concat_data".to_string()))
        );
    }

    #[test]
    fn root_factories_are_refused() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(test_support::StubFactory(ToolKind::Root, 0)));
        assert!(!registry.contains(ToolKind::Root));
    }

    #[test]
    fn unconfigured_tools_fall_back_to_defaults() {
        let registry = registry();
        let describe = ToolNode::new(1, ToolKind::DescribeData, 1);
        assert!(registry.create_executor(&describe).is_ok());

        let input = ToolNode::new(2, ToolKind::InputUrl, 0);
        assert_eq!(registry.create_executor(&input).err(), Some(ToolError::MissingConfig));
    }
}
