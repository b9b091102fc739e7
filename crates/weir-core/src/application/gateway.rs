//! Gateway transition evaluation
//!
//! Decides which outgoing transitions of a completed flow node fire.
//! Parallel gateways fire everything. Inclusive and exclusive gateways
//! share one scanning evaluator and differ only in their [`ScanPolicy`].
//! Non-gateway nodes use implicit routing, which fires like an inclusive
//! gateway.

use std::sync::Arc;

use tracing::debug;

use super::condition::ConditionEvaluator;
use super::default_transition::DefaultTransitionResolver;
use crate::domain::context::ExpressionContext;
use crate::domain::flow_node_instance::FlowNodeInstance;
use crate::domain::process_definition::{
    FlowNodeTransitions, FlowNodeType, GatewayType, ProcessDefinition, TransitionDefinition,
};
use crate::Result;

/// Chooses the transitions to take when a flow node completes
pub trait TransitionEvaluator: Send + Sync {
    /// Transitions to fire, in firing order
    fn evaluate(
        &self,
        definition: &ProcessDefinition,
        flow_node: &FlowNodeInstance,
        transitions: &FlowNodeTransitions,
        context: &mut ExpressionContext,
    ) -> Result<Vec<TransitionDefinition>>;
}

/// Fires every outgoing transition without looking at guards
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelTransitionEvaluator;

impl TransitionEvaluator for ParallelTransitionEvaluator {
    fn evaluate(
        &self,
        _definition: &ProcessDefinition,
        _flow_node: &FlowNodeInstance,
        transitions: &FlowNodeTransitions,
        _context: &mut ExpressionContext,
    ) -> Result<Vec<TransitionDefinition>> {
        Ok(transitions.all_outgoing.clone())
    }
}

/// What a scan over the non-default transitions found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Transitions fired, guarded or not
    pub fired: usize,

    /// Guarded transitions whose guard was evaluated
    pub conditional_seen: usize,

    /// Guarded transitions whose guard was true
    pub conditional_fired: usize,
}

/// Scanning behaviour of a gateway
pub trait ScanPolicy: Send + Sync {
    /// Whether to look at the next transition
    fn should_continue(&self, match_found: bool) -> bool;

    /// Whether the default transition must be added after the scan
    fn needs_default(&self, outcome: &ScanOutcome) -> bool;
}

/// Keeps scanning after a match
///
/// The default fires only when guards were evaluated and none was true.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnMatch;

impl ScanPolicy for ContinueOnMatch {
    fn should_continue(&self, _match_found: bool) -> bool {
        true
    }

    fn needs_default(&self, outcome: &ScanOutcome) -> bool {
        outcome.conditional_seen > 0 && outcome.conditional_fired == 0
    }
}

/// Stops at the first match; the default fires when nothing matched
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnFirstMatch;

impl ScanPolicy for StopOnFirstMatch {
    fn should_continue(&self, match_found: bool) -> bool {
        !match_found
    }

    fn needs_default(&self, outcome: &ScanOutcome) -> bool {
        outcome.fired == 0
    }
}

/// Evaluates guards in definition order under a [`ScanPolicy`]
///
/// Unconditional transitions fire first, then transitions whose guard was
/// true, then the default when the policy asks for it. Guards that are
/// absent or evaluate to null do not match.
pub struct ScanningTransitionEvaluator<P: ScanPolicy> {
    conditions: Arc<dyn ConditionEvaluator>,
    default_resolver: DefaultTransitionResolver,
    policy: P,
}

impl<P: ScanPolicy> ScanningTransitionEvaluator<P> {
    /// Create an evaluator with the given policy
    pub fn with_policy(conditions: Arc<dyn ConditionEvaluator>, policy: P) -> Self {
        Self {
            conditions,
            default_resolver: DefaultTransitionResolver::new(),
            policy,
        }
    }
}

impl<P: ScanPolicy + Default> ScanningTransitionEvaluator<P> {
    /// Create an evaluator with the policy's default configuration
    pub fn new(conditions: Arc<dyn ConditionEvaluator>) -> Self {
        Self::with_policy(conditions, P::default())
    }
}

impl<P: ScanPolicy> TransitionEvaluator for ScanningTransitionEvaluator<P> {
    fn evaluate(
        &self,
        definition: &ProcessDefinition,
        flow_node: &FlowNodeInstance,
        transitions: &FlowNodeTransitions,
        context: &mut ExpressionContext,
    ) -> Result<Vec<TransitionDefinition>> {
        let mut unconditional = Vec::new();
        let mut conditional = Vec::new();
        let mut outcome = ScanOutcome::default();

        for transition in &transitions.non_default_outgoing {
            if !self.policy.should_continue(outcome.fired > 0) {
                break;
            }
            if transition.is_unconditional() {
                unconditional.push(transition.clone());
                outcome.fired += 1;
                continue;
            }
            outcome.conditional_seen += 1;
            if self.conditions.evaluate(transition, context)? == Some(true) {
                conditional.push(transition.clone());
                outcome.fired += 1;
                outcome.conditional_fired += 1;
            }
        }

        let mut chosen = unconditional;
        chosen.extend(conditional);
        if self.policy.needs_default(&outcome) {
            chosen.push(self.default_resolver.resolve(transitions, definition, flow_node)?);
        }
        Ok(chosen)
    }
}

/// Inclusive gateway: every matching transition fires
pub type InclusiveTransitionEvaluator = ScanningTransitionEvaluator<ContinueOnMatch>;

/// Exclusive gateway: the first matching transition fires
pub type ExclusiveTransitionEvaluator = ScanningTransitionEvaluator<StopOnFirstMatch>;

/// Routing of non-gateway nodes, same firing rule as inclusive gateways
pub type ImplicitTransitionEvaluator = ScanningTransitionEvaluator<ContinueOnMatch>;

/// Selects the evaluator matching a flow node's routing semantics
pub struct TransitionService {
    parallel: Arc<dyn TransitionEvaluator>,
    inclusive: Arc<dyn TransitionEvaluator>,
    exclusive: Arc<dyn TransitionEvaluator>,
    implicit: Arc<dyn TransitionEvaluator>,
}

impl TransitionService {
    /// Create the service with the standard evaluators
    pub fn new(conditions: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            parallel: Arc::new(ParallelTransitionEvaluator),
            inclusive: Arc::new(InclusiveTransitionEvaluator::new(conditions.clone())),
            exclusive: Arc::new(ExclusiveTransitionEvaluator::new(conditions.clone())),
            implicit: Arc::new(ImplicitTransitionEvaluator::new(conditions)),
        }
    }

    /// Evaluator used for nodes of `node_type`
    pub fn evaluator_for(&self, node_type: FlowNodeType) -> &dyn TransitionEvaluator {
        match node_type.gateway_type() {
            Some(GatewayType::Parallel) => self.parallel.as_ref(),
            Some(GatewayType::Inclusive) => self.inclusive.as_ref(),
            Some(GatewayType::Exclusive) => self.exclusive.as_ref(),
            None => self.implicit.as_ref(),
        }
    }

    /// Transitions to fire for a completed flow node
    pub fn evaluate_transitions(
        &self,
        definition: &ProcessDefinition,
        flow_node: &FlowNodeInstance,
        transitions: &FlowNodeTransitions,
        context: &mut ExpressionContext,
    ) -> Result<Vec<TransitionDefinition>> {
        let chosen = self
            .evaluator_for(flow_node.node_type)
            .evaluate(definition, flow_node, transitions, context)?;
        debug!(
            "Flow node {} ({:?}) fires {} of {} outgoing transitions: {:?}",
            flow_node.name,
            flow_node.node_type,
            chosen.len(),
            transitions.all_outgoing.len(),
            chosen.iter().map(|t| t.id.as_str()).collect::<Vec<_>>()
        );
        Ok(chosen)
    }

    /// Transitions to fire, reading the outgoing transitions from the definition
    pub fn evaluate_outgoing(
        &self,
        definition: &ProcessDefinition,
        flow_node: &FlowNodeInstance,
        context: &mut ExpressionContext,
    ) -> Result<Vec<TransitionDefinition>> {
        let transitions = FlowNodeTransitions::for_flow_node(definition, &flow_node.flow_node_definition_id)?;
        self.evaluate_transitions(definition, flow_node, &transitions, context)
    }
}
