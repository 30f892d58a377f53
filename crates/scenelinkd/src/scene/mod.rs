//! In-memory scene host.
//!
//! The daemon needs a host application to drive. [`SceneHost`] stands in for
//! one: a mutex-guarded node graph with the usual top-level contexts, a
//! playback range and a current frame. Its operations are exposed as command
//! handlers through [`scene_handlers`], which also binds the code execution
//! capability supplied by the caller.

mod graph;
mod simulation;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::executor::{CodeRunner, ExecutorError, HandlerError, HandlerTable, Params};

use self::graph::{CONTEXTS, GraphError, SceneGraph, leaf_name, parent_of};

const SCENE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scene");

/// Command name bound to the code execution capability.
pub const CODE_EXECUTION_COMMAND: &str = "execute_houdini_code";

const DEFAULT_HIP_FILE: &str = "untitled.hip";
const DEFAULT_FPS: u32 = 24;

impl From<GraphError> for HandlerError {
    fn from(error: GraphError) -> Self {
        Self::new(error.to_string())
    }
}

#[derive(Debug)]
struct SceneState {
    graph: SceneGraph,
    hip_file: String,
    fps: u32,
    current_frame: Value,
    playback: (Value, Value),
}

/// Process-wide scene shared by every connection.
#[derive(Debug)]
pub struct SceneHost {
    state: Mutex<SceneState>,
}

impl Default for SceneHost {
    fn default() -> Self {
        Self::new()
    }
}

type Operation = fn(&SceneHost, &Params) -> Result<Value, HandlerError>;

const OPERATIONS: [(&str, Operation); 8] = [
    ("create_node", SceneHost::create_node),
    ("connect_nodes", SceneHost::connect_nodes),
    ("set_param", SceneHost::set_param),
    ("get_scene_info", SceneHost::scene_info),
    ("get_object_info", SceneHost::object_info),
    ("create_fluid_sim", SceneHost::create_fluid_sim),
    ("create_pyro_sim", SceneHost::create_pyro_sim),
    ("run_simulation", SceneHost::run_simulation),
];

/// Builds the complete handler table for `host`.
///
/// # Errors
///
/// Returns [`ExecutorError::DuplicateHandler`] if two bindings collide.
pub fn scene_handlers(
    host: &Arc<SceneHost>,
    code_runner: Arc<dyn CodeRunner>,
) -> Result<HandlerTable, ExecutorError> {
    let mut table = HandlerTable::new();
    for (name, operation) in OPERATIONS {
        let bound = Arc::clone(host);
        table.register(name, move |params: &Params| operation(&bound, params))?;
    }
    table.register_code_runner(CODE_EXECUTION_COMMAND, code_runner)?;
    Ok(table)
}

impl SceneHost {
    /// Creates an empty scene with the default contexts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SceneState {
                graph: SceneGraph::with_contexts(),
                hip_file: DEFAULT_HIP_FILE.to_owned(),
                fps: DEFAULT_FPS,
                current_frame: Value::from(1),
                playback: (Value::from(1), Value::from(240)),
            }),
        }
    }

    /// Locks the scene, recovering it if a handler panicked while holding it.
    ///
    /// Every graph mutation is a single map insertion, so a panic can at worst
    /// leave behind the nodes a handler had already created.
    fn lock(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!(target: SCENE_TARGET, "recovering scene state after a handler panic");
            self.state.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    fn create_node(&self, params: &Params) -> Result<Value, HandlerError> {
        let parent = text(params, "parent_path")?;
        let kind = text(params, "node_type")?;
        if kind.is_empty() {
            return Err(HandlerError::new("Missing required parameter: node_type"));
        }
        let name = params.get("node_name").and_then(Value::as_str);
        let path = self.lock().graph.create(parent, kind, name)?;
        info!(target: SCENE_TARGET, node_path = %path, node_type = kind, "node created");
        Ok(json!({
            "status": "success",
            "message": format!("Node created: {path}"),
            "node_path": path,
        }))
    }

    fn connect_nodes(&self, params: &Params) -> Result<Value, HandlerError> {
        let from = text(params, "from_path")?;
        let to = text(params, "to_path")?;
        let index = match params.get("input_index") {
            None => 0,
            Some(raw) => raw.as_u64().ok_or_else(|| {
                HandlerError::new(format!(
                    "Failed to connect nodes. Error: Invalid input index: {raw}"
                ))
            })?,
        };
        self.lock().graph.connect(from, to, index)?;
        Ok(json!({
            "status": "success",
            "message": format!("Connected {from} to {to} at input {index}"),
        }))
    }

    fn set_param(&self, params: &Params) -> Result<Value, HandlerError> {
        let path = text(params, "node_path")?;
        let name = text(params, "param_name")?;
        let value = params
            .get("param_value")
            .ok_or_else(|| HandlerError::new("Missing required parameter: param_value"))?;
        if name.is_empty() {
            return Err(HandlerError::new("Missing required parameter: param_name"));
        }
        self.lock()
            .graph
            .node_mut(path)?
            .params
            .insert(name.to_owned(), value.clone());
        Ok(json!({
            "status": "success",
            "message": format!("Parameter {name} set to {} on {path}", display(value)),
        }))
    }

    fn scene_info(&self, _params: &Params) -> Result<Value, HandlerError> {
        let state = self.lock();
        let top_nodes: Vec<Value> = CONTEXTS
            .iter()
            .map(|context| {
                let root = format!("/{context}");
                let nodes: Vec<&str> = state.graph.children(&root).map(leaf_name).collect();
                json!({"context": context, "nodes": nodes})
            })
            .collect();
        Ok(json!({
            "hip_file": state.hip_file,
            "fps": state.fps,
            "current_frame": state.current_frame,
            "start_frame": state.playback.0,
            "end_frame": state.playback.1,
            "top_nodes": top_nodes,
        }))
    }

    fn object_info(&self, params: &Params) -> Result<Value, HandlerError> {
        let path = text(params, "object_name")?;
        let state = self.lock();
        let Ok(node) = state.graph.node(path) else {
            return Ok(json!({"error": format!("Node not found: {path}")}));
        };
        let children: Vec<&str> = state.graph.children(path).collect();
        let inputs: Vec<Value> = node
            .inputs
            .iter()
            .map(|(index, input)| json!({"index": index, "path": input}))
            .collect();
        let outputs: Vec<Value> = state
            .graph
            .outputs(path)
            .enumerate()
            .map(|(index, output)| json!({"index": index, "path": output}))
            .collect();
        Ok(json!({
            "node_type": node.kind,
            "node_path": path,
            "parent": parent_of(path),
            "children": children,
            "parameters": Value::Object(node.params.clone()),
            "inputs": inputs,
            "outputs": outputs,
        }))
    }
}

/// Reads a string parameter that validation has already guaranteed.
fn text<'a>(params: &'a Params, name: &str) -> Result<&'a str, HandlerError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::new(format!("Missing required parameter: {name}")))
}

/// Renders a parameter value for messages; strings appear without quotes.
fn display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn params_of(entries: &[(&str, &Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).clone()))
        .collect()
}
