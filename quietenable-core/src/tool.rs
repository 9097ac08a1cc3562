#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

#[cfg(feature = "schema")]
use crate::error::{Error, Result};

/// JSON-schema parameters of a tool
///
/// Always an object schema: named properties plus the list of required ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

/// The function half of a tool declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// Declares a callable the model may ask for
///
/// Purely descriptive: the client sends declarations and returns whatever
/// tool calls the model makes, it never runs anything.
///
/// # Examples
///
/// ```
/// use quietenable_core::ToolDeclaration;
/// use serde_json::json;
///
/// let weather = ToolDeclaration::new("get_weather", "Current weather for a city")
///     .with_property("city", json!({"type": "string"}))
///     .require("city");
///
/// assert_eq!(weather.name(), "get_weather");
/// assert_eq!(weather.function.parameters.required, vec!["city"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDeclaration,
}

impl ToolDeclaration {
    /// Creates a function tool with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDeclaration {
                name: name.into(),
                description: description.into(),
                parameters: ToolParameters::default(),
            },
        }
    }

    /// Adds a named property schema
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.function.parameters.properties.insert(name.into(), schema);
        self
    }

    /// Marks a property as required
    #[must_use]
    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.function.parameters.required.contains(&name) {
            self.function.parameters.required.push(name);
        }
        self
    }

    /// Replaces the whole parameter schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: ToolParameters) -> Self {
        self.function.parameters = parameters;
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Derives the parameter schema from a Rust type's JSON schema
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the type does not describe an object.
    ///
    /// # Examples
    ///
    /// ```
    /// use quietenable_core::ToolDeclaration;
    /// use schemars::JsonSchema;
    ///
    /// #[derive(JsonSchema)]
    /// struct Lookup {
    ///     query: String,
    ///     limit: Option<u32>,
    /// }
    ///
    /// let tool = ToolDeclaration::from_schema::<Lookup>("lookup", "Search the index").unwrap();
    /// assert_eq!(tool.function.parameters.required, vec!["query"]);
    /// ```
    #[cfg(feature = "schema")]
    pub fn from_schema<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let schema = serde_json::to_value(schemars::schema_for!(T).schema)?;

        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(Error::Config(format!(
                "parameters of tool '{name}' must be an object schema"
            )));
        }

        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self::new(name, description).with_parameters(ToolParameters {
            properties,
            required,
            ..ToolParameters::default()
        }))
    }
}

/// Tool choice strategy sent alongside declarations
///
/// The client only ever sends `Auto`, and only when at least one tool is
/// declared. The other variants exist so that callers building their own
/// [`ChatRequest`](crate::ChatRequest) can use them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// Let the model decide
    #[default]
    Auto,
    /// Force at least one tool call
    Required,
    /// Forbid tool calls
    None,
    /// Force a call to the named tool
    Function(String),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            })
            .serialize(serializer),
        }
    }
}
