//! Gateway decisions driven through the real condition evaluator and
//! expression service, with guards reading caller-supplied inputs.

use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use weir_core::application::strategies::{ConstantExpressionStrategy, InputExpressionStrategy};
use weir_core::domain::flow_node_instance::FlowNodeInstance;
use weir_core::{
    EngineError, Expression, ExpressionConditionEvaluator, ExpressionContext, ExpressionService,
    FlowNodeDefinition, FlowNodeType, GatewayType, ProcessDefinition, ReturnType,
    TransitionDefinition, TransitionService,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn service() -> TransitionService {
    let expressions = ExpressionService::new()
        .with_strategy(Arc::new(InputExpressionStrategy::new()))
        .with_strategy(Arc::new(ConstantExpressionStrategy::new()));
    TransitionService::new(Arc::new(ExpressionConditionEvaluator::new(Arc::new(expressions))))
}

fn guard(input: &str) -> Expression {
    Expression::input(input, ReturnType::Boolean)
}

/// `split` routes to a, b and c; a and b are guarded by inputs of the same
/// name, c is unconditional and `fallback` is the default
fn routing(node_type: FlowNodeType, with_default: bool) -> ProcessDefinition {
    let mut definition = ProcessDefinition::new(7, "Claims", "3.0");
    definition.add_flow_node(FlowNodeDefinition::new("split", "Split", node_type));
    for target in ["a", "b", "c", "d"] {
        definition.add_flow_node(FlowNodeDefinition::new(target, target.to_uppercase(), FlowNodeType::Task));
    }
    definition.add_transition(TransitionDefinition::new("to_a", "split", "a").with_condition(guard("a")));
    definition.add_transition(TransitionDefinition::new("to_b", "split", "b").with_condition(guard("b")));
    definition.add_transition(TransitionDefinition::new("to_c", "split", "c"));
    if with_default {
        definition.add_default_transition(TransitionDefinition::new("fallback", "split", "d"));
    }
    definition
}

fn instance(node_type: FlowNodeType) -> FlowNodeInstance {
    FlowNodeInstance::new(30, "Split", "split", node_type).within(7, 500, 500)
}

fn fired(
    node_type: FlowNodeType,
    with_default: bool,
    a: serde_json::Value,
    b: serde_json::Value,
) -> Result<Vec<String>, EngineError> {
    let mut context = ExpressionContext::new().with_value("a", a).with_value("b", b);
    let chosen = service().evaluate_outgoing(
        &routing(node_type, with_default),
        &instance(node_type),
        &mut context,
    )?;
    Ok(chosen.into_iter().map(|transition| transition.id).collect())
}

#[test]
fn test_exclusive_fires_first_match_only() {
    init_logging();
    let exclusive = FlowNodeType::Gateway(GatewayType::Exclusive);

    assert_eq!(fired(exclusive, true, json!(true), json!(true)).unwrap(), vec!["to_a"]);
    assert_eq!(fired(exclusive, true, json!(false), json!(true)).unwrap(), vec!["to_b"]);
    // the unconditional transition counts as a match
    assert_eq!(fired(exclusive, true, json!(false), json!(false)).unwrap(), vec!["to_c"]);
    assert_eq!(fired(exclusive, true, json!(null), json!(false)).unwrap(), vec!["to_c"]);
}

#[test]
fn test_inclusive_fires_every_match() {
    init_logging();
    let inclusive = FlowNodeType::Gateway(GatewayType::Inclusive);

    assert_eq!(
        fired(inclusive, true, json!(true), json!(true)).unwrap(),
        vec!["to_c", "to_a", "to_b"]
    );
    assert_eq!(fired(inclusive, true, json!(false), json!(true)).unwrap(), vec!["to_c", "to_b"]);
    // conditionals existed and none held
    assert_eq!(
        fired(inclusive, true, json!(false), json!(null)).unwrap(),
        vec!["to_c", "fallback"]
    );
}

#[test]
fn test_implicit_routing_matches_inclusive() {
    let task = FlowNodeType::Task;
    let inclusive = FlowNodeType::Gateway(GatewayType::Inclusive);

    for (a, b) in [(true, true), (true, false), (false, false)] {
        assert_eq!(
            fired(task, true, json!(a), json!(b)).unwrap(),
            fired(inclusive, true, json!(a), json!(b)).unwrap()
        );
    }
}

#[test]
fn test_missing_default_is_execution_error() {
    let mut definition = ProcessDefinition::new(7, "Claims", "3.0");
    let exclusive = FlowNodeType::Gateway(GatewayType::Exclusive);
    definition.add_flow_node(FlowNodeDefinition::new("split", "Split", exclusive));
    definition.add_flow_node(FlowNodeDefinition::new("a", "A", FlowNodeType::Task));
    definition.add_transition(TransitionDefinition::new("to_a", "split", "a").with_condition(guard("a")));

    let mut context = ExpressionContext::new().with_value("a", json!(false));
    let err = service()
        .evaluate_outgoing(&definition, &instance(exclusive), &mut context)
        .unwrap_err();

    assert_matches!(err, EngineError::Execution(inner) => {
        assert_eq!(inner.flow_node_name.as_deref(), Some("Split"));
        assert_eq!(inner.process_name.as_deref(), Some("Claims"));
        assert_eq!(inner.process_version.as_deref(), Some("3.0"));
        assert_eq!(inner.process_instance_id, Some(500));
    });
}

#[test]
fn test_parallel_never_evaluates_guards() {
    let parallel = FlowNodeType::Gateway(GatewayType::Parallel);
    // no inputs in the context: evaluating any guard would fail
    let mut context = ExpressionContext::new();
    let chosen = service()
        .evaluate_outgoing(&routing(parallel, true), &instance(parallel), &mut context)
        .unwrap();

    assert_eq!(
        chosen.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
        vec!["to_a", "to_b", "to_c", "fallback"]
    );
}

#[test]
fn test_non_boolean_guard_is_rejected() {
    let exclusive = FlowNodeType::Gateway(GatewayType::Exclusive);
    let mut definition = ProcessDefinition::new(7, "Claims", "3.0");
    definition.add_flow_node(FlowNodeDefinition::new("split", "Split", exclusive));
    definition.add_flow_node(FlowNodeDefinition::new("a", "A", FlowNodeType::Task));
    definition.add_transition(
        TransitionDefinition::new("to_a", "split", "a")
            .with_name("Approve claim")
            .with_condition(Expression::input("label", ReturnType::String)),
    );

    let mut context = ExpressionContext::new().with_value("label", json!("yes"));
    let err = service()
        .evaluate_outgoing(&definition, &instance(exclusive), &mut context)
        .unwrap_err();

    assert_matches!(err, EngineError::Evaluation(inner) => {
        assert!(inner.message.contains("Approve claim"));
        assert!(inner.message.contains("String"));
    });
}

#[test]
fn test_guard_value_of_wrong_shape_is_rejected() {
    let inclusive = FlowNodeType::Gateway(GatewayType::Inclusive);
    let err = fired(inclusive, true, json!("true"), json!(false)).unwrap_err();
    assert_matches!(err, EngineError::Evaluation(inner) => {
        assert!(inner.message.contains("string"));
    });
}
