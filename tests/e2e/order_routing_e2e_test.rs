//! Order routing through the public facade, backed by in-memory collaborators

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use weir::domain::business_data::{Entity, RefBusinessDataInstance};
use weir::domain::data_instance::DataInstance;
use weir::domain::flow_node_instance::{FlowNodeInstance, ProcessInstance};
use weir::domain::repository::{Parameter, ReadPersistenceService};
use weir::inmemory::InMemoryStateStoreProvider;
use weir::strategies::DaoRegistry;
use weir::{
    DataContainer, EngineConfig, EngineError, Expression, ExpressionContext, ExpressionKind,
    ExpressionService, FlowNodeDefinition, FlowNodeType, GatewayType, ProcessDefinition,
    ReturnType, RuntimeValue, TransitionDefinition, TransitionService,
};

const ORDER: &str = "com.acme.model.Order";
const PROCESS_DEFINITION: i64 = 5;
const ROOT: i64 = 1000;
const SPLIT: i64 = 1001;
const CHECK: i64 = 1002;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Engine {
    provider: InMemoryStateStoreProvider,
    expressions: Arc<ExpressionService>,
    transitions: TransitionService,
}

/// Root instance 1000 running an inclusive split (1001) and a task (1002)
fn engine() -> Engine {
    init_logging();
    let config = EngineConfig::default();
    let provider = InMemoryStateStoreProvider::new();

    provider
        .process_instances()
        .insert(ProcessInstance::new(ROOT, "Order routing", PROCESS_DEFINITION));
    provider.flow_nodes().insert(
        FlowNodeInstance::new(SPLIT, "Route", "route", FlowNodeType::Gateway(GatewayType::Inclusive))
            .within(PROCESS_DEFINITION, ROOT, ROOT),
    );
    provider.flow_nodes().insert(
        FlowNodeInstance::new(CHECK, "Check order", "check", FlowNodeType::Task)
            .within(PROCESS_DEFINITION, ROOT, ROOT),
    );

    provider.parameters().set(PROCESS_DEFINITION, Parameter::new("expressThreshold", "500"));
    provider.parameters().set(PROCESS_DEFINITION, Parameter::new("manualReview", "true"));

    provider.business_data().insert(Entity::new(ORDER, 77, json!({ "total": 720 })));
    provider.references().bind_process_instance(
        ROOT,
        RefBusinessDataInstance::Simple {
            name: "order".to_string(),
            data_class_name: ORDER.to_string(),
            data_id: Some(77),
        },
    );

    let mut daos = DaoRegistry::new(&config);
    daos.register_entity("com.acme.model.OrderDAO", ORDER);

    let expressions = Arc::new(provider.create_expression_service(&config, daos));
    let transitions = provider.create_transition_service(expressions.clone());
    Engine {
        provider,
        expressions,
        transitions,
    }
}

fn routing() -> ProcessDefinition {
    let mut definition = ProcessDefinition::new(PROCESS_DEFINITION, "Order routing", "1.4");
    definition.add_flow_node(FlowNodeDefinition::new(
        "route",
        "Route",
        FlowNodeType::Gateway(GatewayType::Inclusive),
    ));
    for (id, name) in [("express", "Express"), ("review", "Review"), ("standard", "Standard")] {
        definition.add_flow_node(FlowNodeDefinition::new(id, name, FlowNodeType::Task));
    }
    definition.add_transition(
        TransitionDefinition::new("to_express", "route", "express")
            .with_condition(Expression::variable("express", ReturnType::Boolean)),
    );
    definition.add_transition(
        TransitionDefinition::new("to_review", "route", "review")
            .with_condition(Expression::parameter("manualReview", ReturnType::Boolean)),
    );
    definition.add_default_transition(TransitionDefinition::new("to_standard", "route", "standard"));
    definition
}

fn set_data(engine: &Engine, id: i64, name: &str, value: serde_json::Value, container: DataContainer) {
    engine
        .provider
        .data_instances()
        .insert(DataInstance::new(id, name, "java.lang.Boolean", value, container));
}

fn route(engine: &Engine) -> Vec<String> {
    let split = engine
        .provider
        .flow_nodes()
        .select_by_id(SPLIT)
        .unwrap()
        .unwrap();
    let mut context = ExpressionContext::for_container(DataContainer::flow_node(SPLIT))
        .with_process_definition(PROCESS_DEFINITION);
    engine
        .transitions
        .evaluate_outgoing(&routing(), &split, &mut context)
        .unwrap()
        .into_iter()
        .map(|transition| transition.id)
        .collect()
}

#[test]
fn test_inclusive_split_fires_every_true_branch() {
    let engine = engine();
    set_data(&engine, 1, "express", json!(true), DataContainer::process_instance(ROOT));

    assert_eq!(route(&engine), vec!["to_express", "to_review"]);
}

#[test]
fn test_gateway_local_data_shadows_process_data() {
    let engine = engine();
    set_data(&engine, 1, "express", json!(true), DataContainer::process_instance(ROOT));
    set_data(&engine, 2, "express", json!(false), DataContainer::flow_node(SPLIT));

    assert_eq!(route(&engine), vec!["to_review"]);
}

#[test]
fn test_default_branch_when_no_guard_holds() {
    let engine = engine();
    engine
        .provider
        .parameters()
        .set(PROCESS_DEFINITION, Parameter::new("manualReview", "no"));
    set_data(&engine, 1, "express", json!(null), DataContainer::process_instance(ROOT));

    assert_eq!(route(&engine), vec!["to_standard"]);
}

#[test]
fn test_task_inputs_from_every_source() {
    let engine = engine();
    set_data(&engine, 1, "express", json!(false), DataContainer::process_instance(ROOT));

    let inputs = vec![
        Expression::variable("express", ReturnType::Boolean),
        Expression::parameter("expressThreshold", ReturnType::Long),
        Expression::new("order", "order", ReturnType::Entity(ORDER.to_string()), ExpressionKind::BusinessDataReference),
        Expression::new("task", "activityInstanceId", ReturnType::Long, ExpressionKind::EngineConstant),
        Expression::constant("EUR", ReturnType::String),
    ];
    let mut context = ExpressionContext::for_container(DataContainer::flow_node(CHECK))
        .with_process_definition(PROCESS_DEFINITION);
    let values = engine.expressions.evaluate_all(&inputs, &mut context).unwrap();

    assert_eq!(
        values,
        vec![
            RuntimeValue::from(false),
            RuntimeValue::from(500_i64),
            RuntimeValue::Entity(Entity::new(ORDER, 77, json!({ "total": 720 }))),
            RuntimeValue::from(CHECK),
            RuntimeValue::from("EUR"),
        ]
    );
}

#[test]
fn test_business_object_accessor() {
    let engine = engine();
    let mut context = ExpressionContext::new();

    let dao = engine
        .expressions
        .evaluate(
            &Expression::new(
                "orders",
                "com.acme.model.OrderDAO",
                ReturnType::Entity("com.acme.model.OrderDAO".to_string()),
                ExpressionKind::BusinessObjectDao,
            ),
            &mut context,
        )
        .unwrap();
    assert_matches!(dao, RuntimeValue::Dao(handle) => {
        assert_eq!(handle.dao().implementation_name(), "com.acme.model.server.OrderDAOImpl");
        assert_eq!(
            handle.dao().find_by_persistence_id(77).unwrap().map(|order| order.persistence_id),
            Some(77)
        );
    });

    let unknown = engine.expressions.evaluate(
        &Expression::new(
            "customers",
            "com.acme.model.CustomerDAO",
            ReturnType::Entity("com.acme.model.CustomerDAO".to_string()),
            ExpressionKind::BusinessObjectDao,
        ),
        &mut context,
    );
    assert_matches!(unknown, Err(EngineError::NotFound(_)));
}

#[test]
fn test_history_of_completed_instance() {
    let engine = engine();
    let root = DataContainer::process_instance(ROOT);
    let opened = Utc::now() - Duration::days(1);

    engine
        .provider
        .archived_data_instances()
        .archive(DataInstance::new(1, "express", "java.lang.Boolean", json!(true), root), opened);
    engine.provider.archived_data_instances().archive(
        DataInstance::new(1, "express", "java.lang.Boolean", json!(false), root),
        opened + Duration::hours(2),
    );

    // the instance and its nodes have been purged from the live store
    let split = engine.provider.flow_nodes().remove(SPLIT).unwrap();
    engine.provider.archived_flow_nodes().archive(split, opened + Duration::hours(3));
    let instance = engine.provider.process_instances().remove(ROOT).unwrap();
    engine
        .provider
        .archived_process_instances()
        .archive(instance, opened + Duration::hours(3));

    let express = Expression::variable("express", ReturnType::Boolean);
    let mut context = ExpressionContext::for_container(DataContainer::flow_node(SPLIT))
        .at_time(opened + Duration::hours(1));
    assert_eq!(
        engine.expressions.evaluate(&express, &mut context).unwrap(),
        RuntimeValue::from(true)
    );

    let mut context = ExpressionContext::for_container(DataContainer::flow_node(SPLIT)).at_time(Utc::now());
    assert_eq!(
        engine.expressions.evaluate(&express, &mut context).unwrap(),
        RuntimeValue::from(false)
    );
}
