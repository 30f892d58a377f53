//! Simulation setup operations of the scene host.

use serde_json::{Value, json};
use tracing::info;

use crate::executor::{HandlerError, Params};

use super::graph::{GraphError, SceneGraph};
use super::{SCENE_TARGET, SceneHost, display, params_of, text};

const RUN_NOTE: &str = "To run the simulation, press play in the timeline or use playbar controls";

struct Collision {
    kind: &'static str,
    position: Value,
    size: Value,
}

impl SceneHost {
    pub(super) fn create_fluid_sim(&self, params: &Params) -> Result<Value, HandlerError> {
        let fail = |detail: String| {
            HandlerError::new(format!("Error creating fluid simulation: {detail}"))
        };
        let source_type = source_type(params).map_err(fail)?;
        let range = frame_range(params).map_err(fail)?;
        let collisions = collisions(params).map_err(fail)?;

        let mut guard = self.lock();
        let graph = &mut guard.graph;
        let container = build_fluid(graph, params, source_type, &collisions)
            .map_err(|error| fail(error.to_string()))?;
        guard.playback = range;
        info!(target: SCENE_TARGET, node_path = %container, "fluid simulation created");
        Ok(json!({
            "status": "success",
            "message": "Fluid simulation created successfully",
            "node_path": container,
        }))
    }

    pub(super) fn create_pyro_sim(&self, params: &Params) -> Result<Value, HandlerError> {
        let fail =
            |detail: String| HandlerError::new(format!("Error creating pyro simulation: {detail}"));
        let source_type = source_type(params).map_err(fail)?;
        let range = frame_range(params).map_err(fail)?;

        let mut guard = self.lock();
        let graph = &mut guard.graph;
        let container =
            build_pyro(graph, params, source_type).map_err(|error| fail(error.to_string()))?;
        guard.playback = range;
        info!(target: SCENE_TARGET, node_path = %container, "pyro simulation created");
        Ok(json!({
            "status": "success",
            "message": "Pyro simulation created successfully",
            "node_path": container,
        }))
    }

    pub(super) fn run_simulation(&self, params: &Params) -> Result<Value, HandlerError> {
        let path = text(params, "node_path")?;
        let start = param(params, "start_frame").clone();
        let end = param(params, "end_frame").clone();
        let save_to_disk = param(params, "save_to_disk").as_bool().unwrap_or(false);
        let output_path = param(params, "output_path").as_str().unwrap_or_default();

        let mut guard = self.lock();
        guard.graph.node(path)?;
        if save_to_disk && !output_path.is_empty() {
            let cache = guard
                .graph
                .create(path, "filecache", Some("simulation_cache"))?;
            guard
                .graph
                .node_mut(&cache)?
                .params
                .insert("file".to_owned(), Value::from(output_path));
        }
        let message = format!(
            "Simulation set up to run from frame {} to {}",
            display(&start),
            display(&end)
        );
        guard.current_frame = end.clone();
        guard.playback = (start, end);
        Ok(json!({
            "status": "success",
            "message": message,
            "note": RUN_NOTE,
        }))
    }
}

fn build_fluid(
    graph: &mut SceneGraph,
    params: &Params,
    source_type: &str,
    collisions: &[Collision],
) -> Result<String, GraphError> {
    let container = graph.create("/obj", "geo", Some("fluid_sim"))?;
    set(
        graph,
        &container,
        &[
            ("container_size", param(params, "container_size")),
            ("frame_range", param(params, "frame_range")),
        ],
    )?;
    let dopnet = graph.create(&container, "dopnet", Some("fluid_simulation"))?;

    let solver = graph.create(&dopnet, "flipsolver", Some("flip_solver"))?;
    set(
        graph,
        &solver,
        &[
            ("viscosity", param(params, "viscosity")),
            ("surfacetension", param(params, "surface_tension")),
            ("resolution", param(params, "resolution")),
        ],
    )?;

    let source = graph.create(&dopnet, "fluidsource", Some("fluid_source"))?;
    let source_kind = Value::from(source_type);
    set(
        graph,
        &source,
        &[
            ("sourcetype", &source_kind),
            ("size", param(params, "source_size")),
            ("position", param(params, "source_position")),
        ],
    )?;
    graph.connect(&solver, &source, 0)?;

    for (index, collision) in collisions.iter().enumerate() {
        let node = graph.create(&dopnet, "staticobject", Some(&format!("collision_{index}")))?;
        let kind = Value::from(collision.kind);
        set(
            graph,
            &node,
            &[
                ("geotype", &kind),
                ("position", &collision.position),
                ("size", &collision.size),
            ],
        )?;
        graph.connect(&solver, &node, 0)?;
    }
    Ok(container)
}

fn build_pyro(
    graph: &mut SceneGraph,
    params: &Params,
    source_type: &str,
) -> Result<String, GraphError> {
    let container = graph.create("/obj", "geo", Some("pyro_sim"))?;
    set(
        graph,
        &container,
        &[("frame_range", param(params, "frame_range"))],
    )?;

    let solver = graph.create(&container, "pyrosolver", Some("pyro_solver"))?;
    set(
        graph,
        &solver,
        &[
            ("burningrate", param(params, "burn_rate")),
            ("expansionrate", param(params, "expansion")),
            ("cooling", param(params, "cooling_rate")),
        ],
    )?;

    let source = graph.create(&container, "smokeobject", Some("pyro_source"))?;
    let source_kind = Value::from(source_type);
    set(
        graph,
        &source,
        &[
            ("primtype", &source_kind),
            ("size", param(params, "source_size")),
            ("position", param(params, "source_position")),
            ("temperature", param(params, "temperature")),
            ("fuel", param(params, "fuel")),
        ],
    )?;

    let turbulence = graph.create(&container, "gasturb", Some("turbulence"))?;
    set(graph, &turbulence, &[("amp", param(params, "turbulence"))])?;

    let windy = param(params, "wind_speed")
        .as_f64()
        .is_some_and(|speed| speed > 0.0);
    if windy {
        let wind = graph.create(&container, "gasupres", Some("wind"))?;
        set(
            graph,
            &wind,
            &[
                ("direction", param(params, "wind_direction")),
                ("speed", param(params, "wind_speed")),
            ],
        )?;
    }

    graph.connect(&solver, &source, 0)?;
    Ok(container)
}

fn set(graph: &mut SceneGraph, path: &str, entries: &[(&str, &Value)]) -> Result<(), GraphError> {
    graph.node_mut(path)?.params.extend(params_of(entries));
    Ok(())
}

fn param<'a>(params: &'a Params, name: &str) -> &'a Value {
    params.get(name).unwrap_or(&Value::Null)
}

fn source_type(params: &Params) -> Result<&'static str, String> {
    match param(params, "source_type").as_str() {
        Some("box") => Ok("box"),
        Some("sphere") => Ok("sphere"),
        other => Err(format!(
            "Unsupported source type: {}",
            other.unwrap_or("none")
        )),
    }
}

fn frame_range(params: &Params) -> Result<(Value, Value), String> {
    match param(params, "frame_range").as_array().map(Vec::as_slice) {
        Some([start, end]) if start.is_number() && end.is_number() => {
            Ok((start.clone(), end.clone()))
        }
        _ => Err("frame_range must hold a start and an end frame".to_owned()),
    }
}

fn collisions(params: &Params) -> Result<Vec<Collision>, String> {
    let Some(entries) = param(params, "collision_objects").as_array() else {
        return Ok(Vec::new());
    };
    entries
        .iter()
        .map(|entry| {
            let object = entry
                .as_object()
                .ok_or_else(|| "collision_objects entries must be objects".to_owned())?;
            let kind = match object.get("type").and_then(Value::as_str) {
                None | Some("sphere") => "sphere",
                Some("box") => "box",
                Some(other) => return Err(format!("Unsupported collision type: {other}")),
            };
            let size = object.get("size").cloned().unwrap_or_else(|| {
                if kind == "box" {
                    json!([1, 1, 1])
                } else {
                    json!(1)
                }
            });
            Ok(Collision {
                kind,
                position: object
                    .get("position")
                    .cloned()
                    .unwrap_or_else(|| json!([0, 0, 0])),
                size,
            })
        })
        .collect()
}
