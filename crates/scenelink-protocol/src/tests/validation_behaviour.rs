//! Behaviour-driven tests for command parameter validation.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Map, Value};

use crate::{SchemaRegistry, ValidationError};

#[derive(Default)]
struct TestWorld {
    registry: Option<&'static SchemaRegistry>,
    outcome: Option<Result<Map<String, Value>, ValidationError>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn outcome(world: &TestWorld) -> &Result<Map<String, Value>, ValidationError> {
    world.outcome.as_ref().expect("no validation outcome recorded")
}

#[given("the built-in command registry")]
fn given_registry(world: &mut TestWorld) {
    world.registry = Some(SchemaRegistry::builtin().expect("builtin schema loads"));
}

#[when("the command {command} is validated with params {params}")]
fn when_validated(world: &mut TestWorld, command: String, params: String) {
    let registry = world.registry.expect("registry should be loaded");
    let parsed: Map<String, Value> = serde_json::from_str(&params).expect("params are JSON");
    world.outcome = Some(registry.validate(command.trim_matches('"'), &parsed));
}

#[then("validation succeeds")]
fn then_succeeds(world: &mut TestWorld) {
    assert!(
        outcome(world).is_ok(),
        "expected success, got {:?}",
        outcome(world)
    );
}

#[then("validation fails with {message}")]
fn then_fails(world: &mut TestWorld, message: String) {
    let error = outcome(world).as_ref().expect_err("expected a validation error");
    assert_eq!(error.to_string(), message.trim_matches('"'));
}

#[then("the normalised param {name} is {value}")]
fn then_param_is(world: &mut TestWorld, name: String, value: String) {
    let normalised = outcome(world).as_ref().expect("expected success");
    let expected: Value = serde_json::from_str(&value).expect("expected value is JSON");
    assert_eq!(normalised.get(name.trim_matches('"')), Some(&expected));
}

#[scenario(path = "tests/features/command_validation.feature")]
fn command_validation_behaviour(world: TestWorld) {
    let _ = world;
}
