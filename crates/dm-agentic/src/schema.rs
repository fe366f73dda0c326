//! Response schema for the chunk transformation tool call.

use serde_json::json;

use crate::llm_client::ToolDefinition;

/// Tool forcing the model to return one standardized entry per chunk item.
///
/// Aliases are identities and must come back unchanged; `unmatched` marks
/// items the model found no applicable standard for.
pub fn chunk_response_tool() -> ToolDefinition {
    ToolDefinition {
        name: "apply_naming_standards".to_string(),
        description:
            "Return the standardized name for every draft item in the chunk, keyed by alias."
                .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "description": "Exactly one entry per input item, in input order.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "alias": {
                                "type": "string",
                                "description": "The item's alias, returned unchanged."
                            },
                            "name": {
                                "type": "string",
                                "description": "The standardized name."
                            },
                            "unmatched": {
                                "type": "boolean",
                                "description": "True when no applicable standard exists; keep the original name."
                            }
                        },
                        "required": ["alias", "name"]
                    }
                }
            },
            "required": ["items"]
        }),
    }
}
