use super::tool::{StepOperation, Tool};
use serde::{Deserialize, Serialize};

/// A reference from a step to one of the definition's resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub input_key: String,
    /// Selects a specific part of a step output; `None` means the tool's default part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_key: Option<String>,
}

impl StepInput {
    pub fn new(input_key: &str) -> Self {
        Self {
            input_key: input_key.to_string(),
            part_key: None,
        }
    }

    pub fn with_part(input_key: &str, part_key: &str) -> Self {
        Self {
            input_key: input_key.to_string(),
            part_key: Some(part_key.to_string()),
        }
    }
}

/// A single processing node of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub key: i32,
    pub name: String,
    pub node_name: String,
    pub tool: Tool,
    #[serde(default)]
    pub inputs: Vec<StepInput>,
    /// Tool-specific configuration; never interpreted here.
    #[serde(default)]
    pub configuration: serde_json::Value,
}

impl Step {
    /// Creates a step with no inputs and a node name derived from the tool and key.
    pub fn new(key: i32, name: &str, tool: Tool) -> Self {
        Self {
            key,
            name: name.to_string(),
            node_name: format!("{}-{}", tool.slug(), key),
            tool,
            inputs: Vec::new(),
            configuration: serde_json::Value::Null,
        }
    }

    pub fn with_node_name(mut self, node_name: &str) -> Self {
        self.node_name = node_name.to_string();
        self
    }

    pub fn with_input(mut self, input_key: &str) -> Self {
        self.inputs.push(StepInput::new(input_key));
        self
    }

    pub fn with_input_part(mut self, input_key: &str, part_key: &str) -> Self {
        self.inputs.push(StepInput::with_part(input_key, part_key));
        self
    }

    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn operation(&self) -> StepOperation {
        self.tool.operation()
    }

    pub(crate) fn rekeyed(&self, key: i32) -> Self {
        Self {
            key,
            ..self.clone()
        }
    }
}
