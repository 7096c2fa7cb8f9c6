//! Static checks over a [`FlowDefinition`].
//!
//! The driver tolerates every problem reported here; the report exists so
//! that authoring tools can point them out before a flow goes live.

use convoflow_context::{parse_condition, ParsedCondition};
use convoflow_core::{ConditionBranch, FlowDefinition, NodeKind, TriggerKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 运行时会导致流程提前结束或行为异常
    Error,
    /// 可疑但不影响运行
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.node_id {
            Some(id) => write!(f, "{}: [{}] {}", level, id, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// 验证报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Issues attached to `node_id`.
    pub fn for_node<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues
            .iter()
            .filter(move |i| i.node_id.as_deref() == Some(node_id))
    }

    /// `Err` listing every error; warnings do not fail.
    pub fn into_result(self) -> anyhow::Result<()> {
        if !self.has_errors() {
            return Ok(());
        }
        let lines: Vec<String> = self.errors().map(ToString::to_string).collect();
        Err(anyhow::anyhow!(
            "{} validation error(s):\n{}",
            lines.len(),
            lines.join("\n")
        ))
    }

    fn error(&mut self, node_id: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Error, node_id, message.into());
    }

    fn warning(&mut self, node_id: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Warning, node_id, message.into());
    }

    fn push(&mut self, severity: Severity, node_id: Option<&str>, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            node_id: node_id.map(str::to_string),
            message,
        });
    }
}

/// 流程验证器
pub struct FlowValidator<'a> {
    flow: &'a FlowDefinition,
    ids: HashSet<&'a str>,
    report: ValidationReport,
}

impl<'a> FlowValidator<'a> {
    pub fn new(flow: &'a FlowDefinition) -> Self {
        Self {
            flow,
            ids: flow.nodes.iter().map(|n| n.id.as_str()).collect(),
            report: ValidationReport::default(),
        }
    }

    pub fn validate(mut self) -> ValidationReport {
        if self.flow.nodes.is_empty() {
            self.report.warning(None, "flow has no nodes");
            return self.report;
        }
        self.check_ids();
        self.check_start();
        self.check_connections();
        self.check_nodes();
        self.check_reachability();
        self.check_trigger_config();
        self.report
    }

    fn check_ids(&mut self) {
        let flow = self.flow;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for node in &flow.nodes {
            if node.id.trim().is_empty() {
                self.report.error(None, "node with empty id");
            }
            *seen.entry(node.id.as_str()).or_default() += 1;
        }
        let mut duplicates: Vec<_> = seen.into_iter().filter(|(_, n)| *n > 1).collect();
        duplicates.sort();
        for (id, count) in duplicates {
            self.report.error(
                Some(id),
                format!("node id used {} times, only the first is reachable", count),
            );
        }
    }

    fn check_start(&mut self) {
        let flow = self.flow;
        let triggers: Vec<&str> = flow
            .nodes
            .iter()
            .filter(|n| n.is_trigger())
            .map(|n| n.id.as_str())
            .collect();
        match triggers.as_slice() {
            [] => {
                let first = flow.nodes[0].id.as_str();
                self.report.warning(
                    Some(first),
                    "no trigger node, the first node is used as start",
                );
            }
            [_] => {}
            [first, rest @ ..] => {
                for &id in rest {
                    self.report.warning(
                        Some(id),
                        format!("extra trigger node, runs start at {}", first),
                    );
                }
            }
        }
    }

    fn check_connections(&mut self) {
        let flow = self.flow;
        let mut outgoing: HashMap<&str, usize> = HashMap::new();
        for connection in &flow.connections {
            if !self.ids.contains(connection.from.as_str()) {
                self.report.error(
                    None,
                    format!("connection from unknown node {}", connection.from),
                );
            }
            if !self.ids.contains(connection.to.as_str()) {
                self.report.error(
                    Some(connection.from.as_str()),
                    format!("connection to unknown node {}", connection.to),
                );
            }
            *outgoing.entry(connection.from.as_str()).or_default() += 1;
        }
        let mut fanned: Vec<_> = outgoing.into_iter().filter(|(_, n)| *n > 1).collect();
        fanned.sort();
        for (id, count) in fanned {
            self.report.warning(
                Some(id),
                format!("{} outgoing connections, only the first is followed", count),
            );
        }
    }

    fn check_nodes(&mut self) {
        let flow = self.flow;
        for node in &flow.nodes {
            let id = Some(node.id.as_str());
            match &node.kind {
                NodeKind::Question(question) if question.variable.trim().is_empty() => {
                    self.report
                        .warning(id, "question has no variable, the answer is dropped");
                }
                NodeKind::Condition(condition) => {
                    if condition.conditions.is_empty() {
                        self.report.warning(id, "condition has no branches");
                    }
                    for branch in &condition.conditions {
                        if let ConditionBranch::If { expression, .. } = branch {
                            if let ParsedCondition::Unparseable {
                                reason,
                                ..
                            } = parse_condition(expression)
                            {
                                self.report.error(
                                    id,
                                    format!(
                                        "condition {:?} never matches: {}",
                                        expression, reason
                                    ),
                                );
                            }
                        }
                        let goto = branch.goto();
                        if !self.ids.contains(goto) {
                            self.report
                                .error(id, format!("goto unknown node {:?}", goto));
                        }
                    }
                }
                NodeKind::Webhook(webhook) if webhook.url.trim().is_empty() => {
                    self.report.error(id, "webhook has no url");
                }
                NodeKind::Action(action) if action.action.trim().is_empty() => {
                    self.report.warning(id, "action has no name");
                }
                _ => {}
            }
        }
    }

    fn check_reachability(&mut self) {
        let flow = self.flow;
        let Some(start) = flow.start_node() else {
            return;
        };
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        for connection in &flow.connections {
            edges
                .entry(connection.from.as_str())
                .or_default()
                .push(connection.to.as_str());
        }
        for node in &flow.nodes {
            if let NodeKind::Condition(condition) = &node.kind {
                edges
                    .entry(node.id.as_str())
                    .or_default()
                    .extend(condition.conditions.iter().map(ConditionBranch::goto));
            }
        }

        let mut reached: HashSet<&str> = HashSet::from([start.id.as_str()]);
        let mut queue = VecDeque::from([start.id.as_str()]);
        while let Some(current) = queue.pop_front() {
            for &next in edges.get(current).into_iter().flatten() {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        for node in &flow.nodes {
            if !reached.contains(node.id.as_str()) && !node.is_trigger() {
                self.report
                    .warning(Some(node.id.as_str()), "node is unreachable from the start node");
            }
        }
    }

    fn check_trigger_config(&mut self) {
        let flow = self.flow;
        let config = &flow.trigger_config;
        if config.kind == TriggerKind::Keyword
            && config.keywords.iter().all(|k| k.trim().is_empty())
        {
            self.report
                .warning(None, "keyword trigger without keywords never matches");
        }
    }
}
