use std::collections::BTreeMap;

/// Handler bound to a registered tool. Invoked with the arguments the model
/// supplied when it requests the call.
pub type ToolHandler = Box<dyn Fn(serde_json::Value) + Send + Sync>;

/// A callable tool the model may invoke by name. Registered with the client
/// before connecting, serialized into the setup frame.
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: ParameterSchema,
    required_args: Vec<String>,
    handler: ToolHandler,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        required_args: Vec<String>,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            required_args,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    /// Arguments that must be present for the handler to run.
    pub fn required_args(&self) -> &[String] {
        &self.required_args
    }

    pub fn invoke(&self, args: serde_json::Value) {
        (self.handler)(args)
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("required_args", &self.required_args)
            .finish_non_exhaustive()
    }
}

/// OBJECT-typed parameter schema in the Live API's declaration format.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    kind: String,
    properties: BTreeMap<String, ParameterField>,
    required: Vec<String>,
}

impl ParameterSchema {
    pub fn object() -> Self {
        Self {
            kind: "OBJECT".to_string(),
            properties: BTreeMap::new(),
            required: vec![],
        }
    }

    pub fn with_field(mut self, name: &str, field: ParameterField) -> Self {
        self.properties.insert(name.to_string(), field);
        self
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ParameterField {
    #[serde(rename = "type")]
    kind: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<ParameterField>>,
}

impl ParameterField {
    pub fn integer(description: &str) -> Self {
        Self {
            kind: "INTEGER".to_string(),
            description: description.to_string(),
            items: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self {
            kind: "STRING".to_string(),
            description: description.to_string(),
            items: None,
        }
    }

    pub fn array_of(items: ParameterField, description: &str) -> Self {
        Self {
            kind: "ARRAY".to_string(),
            description: description.to_string(),
            items: Some(Box::new(items)),
        }
    }
}

/// Wire shape of the `tools` entry in the setup frame.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclarations {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDeclarations {
    pub fn from_definitions(definitions: &[ToolDefinition]) -> Self {
        Self {
            function_declarations: definitions
                .iter()
                .map(|d| FunctionDeclaration {
                    name: d.name().to_string(),
                    description: d.description().to_string(),
                    parameters: d.parameters().clone(),
                })
                .collect(),
        }
    }
}
