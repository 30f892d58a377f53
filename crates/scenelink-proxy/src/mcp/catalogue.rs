//! Tools and resources advertised to MCP clients.
//!
//! Every registry command is a tool with the same name. The two read-only
//! queries are also exposed as resources:
//!
//! - `scene://info` reads `get_scene_info`.
//! - `scene://object/{object_path}` reads `get_object_info`. The path is
//!   given without its leading slash, so `scene://object/obj/geo1` describes
//!   `/obj/geo1`.

use scenelink_protocol::{CommandSpec, SchemaRegistry};
use serde_json::{Map, Value, json};

/// URI of the scene summary resource.
pub const SCENE_INFO_URI: &str = "scene://info";
/// Prefix of per-object resource URIs.
pub const OBJECT_URI_PREFIX: &str = "scene://object/";

const JSON_MIME: &str = "application/json";

/// A socket command that answers a resource read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResourceQuery {
    pub(crate) command: &'static str,
    pub(crate) params: Map<String, Value>,
}

/// Maps a resource URI to the command that reads it.
pub(crate) fn resolve_resource(uri: &str) -> Option<ResourceQuery> {
    if uri == SCENE_INFO_URI {
        return Some(ResourceQuery {
            command: "get_scene_info",
            params: Map::new(),
        });
    }
    let path = uri.strip_prefix(OBJECT_URI_PREFIX)?;
    if path.is_empty() {
        return None;
    }
    let mut params = Map::new();
    params.insert("object_name".to_owned(), json!(format!("/{path}")));
    Some(ResourceQuery {
        command: "get_object_info",
        params,
    })
}

pub(crate) fn tools(registry: &SchemaRegistry) -> Value {
    let tools: Vec<Value> = registry.specs().map(tool).collect();
    json!({ "tools": tools })
}

fn tool(spec: &CommandSpec) -> Value {
    let description = if spec.description.is_empty() {
        spec.name.clone()
    } else {
        spec.description.clone()
    };
    json!({
        "name": spec.name,
        "description": description,
        "inputSchema": spec.input_schema(),
    })
}

pub(crate) fn resources() -> Value {
    json!({
        "resources": [{
            "uri": SCENE_INFO_URI,
            "name": "scene-info",
            "description": "Scene file, frame rate, playback range and top-level nodes",
            "mimeType": JSON_MIME,
        }]
    })
}

pub(crate) fn resource_templates() -> Value {
    json!({
        "resourceTemplates": [{
            "uriTemplate": format!("{OBJECT_URI_PREFIX}{{object_path}}"),
            "name": "object-info",
            "description": "Type, parent, children and parameters of one node",
            "mimeType": JSON_MIME,
        }]
    })
}

pub(crate) fn resource_contents(uri: &str, text: String) -> Value {
    json!({
        "contents": [{
            "uri": uri,
            "mimeType": JSON_MIME,
            "text": text,
        }]
    })
}
