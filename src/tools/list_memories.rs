use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMemoriesParams {
    #[schemars(description = "Maximum number of memories to return, newest first. Defaults to 10.")]
    pub limit: Option<usize>,

    #[schemars(description = "Only list memories of this type")]
    pub r#type: Option<String>,
}
