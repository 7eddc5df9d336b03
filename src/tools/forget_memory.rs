use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetMemoryParams {
    #[schemars(description = "ID of the memory to delete")]
    pub memory_id: String,

    #[schemars(description = "Why this memory is being forgotten (logged only)")]
    pub reason: Option<String>,
}
