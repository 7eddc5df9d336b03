use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    #[schemars(description = "The natural language content of the memory")]
    pub content: String,

    #[schemars(
        description = "Free-form classification tag, e.g. 'solution', 'configuration', 'decision'. Defaults to 'general'."
    )]
    pub r#type: Option<String>,

    #[schemars(description = "Optional category tag, e.g. 'medical', 'calendar'")]
    pub category: Option<String>,

    #[schemars(description = "Importance: 'low', 'medium' (default), 'high', or 'critical'")]
    pub importance: Option<String>,

    #[schemars(description = "Optional JSON metadata blob, stored and returned unchanged")]
    pub metadata: Option<serde_json::Value>,

    #[schemars(description = "Explicit ID. Reusing an existing ID replaces that memory.")]
    pub id: Option<String>,
}
