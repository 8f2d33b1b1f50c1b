//! Keyword routing from a free-text question to MCP tool invocations
//!
//! Every rule is evaluated independently against the lowercased question and
//! may append one or more invocations. Rule order defines output order. When
//! nothing matches, a single wildcard log search is returned.

use serde::Serialize;
use serde_json::{Value, json};

/// A named request to call one backend tool with a specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub name: String,
    pub tool_method: String,
    pub payload: Value,
}

impl Invocation {
    pub fn new(name: &str, tool_method: &str, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            tool_method: tool_method.to_string(),
            payload,
        }
    }
}

/// Keywords that point at errors and failures
pub const ERROR_KEYWORDS: &[&str] = &["erro", "problema", "falha", "error", "problem", "failure"];

/// Keywords that ask about the most recent record
pub const LAST_RECORD_KEYWORDS: &[&str] = &[
    "último registro",
    "ultimo registro",
    "última operação",
    "ultima operação",
    "last record",
    "last operation",
];

/// Keywords that ask for counts
pub const QUANTITY_KEYWORDS: &[&str] = &[
    "quantos",
    "quantidade",
    "qtd",
    "contagem",
    "dados hoje",
    "how many",
    "quantity",
    "count",
];

pub const BROKER_KEYWORDS: &[&str] = &["rabbit"];
pub const WORKER_KEYWORDS: &[&str] = &["worker", "status"];
pub const CDC_KEYWORDS: &[&str] = &["cdc", "listener"];

const LOG_SEARCH_TOOL: &str = "logs.search";
const ERROR_QUERY: &str = "error OR exception OR fail";

/// One entry of the routing table.
pub struct RoutingRule {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
    pub build: fn() -> Vec<Invocation>,
}

impl RoutingRule {
    fn matches(&self, question_lower: &str) -> bool {
        self.keywords.iter().any(|kw| question_lower.contains(kw))
    }
}

fn recent_errors_payload() -> Value {
    json!({
        "query": ERROR_QUERY,
        "sort": { "@timestamp": "desc" },
        "size": 10
    })
}

fn today_scope_payload() -> Value {
    json!({
        "query": "*",
        "range": { "@timestamp": { "gte": "now/d" } },
        "size": 0
    })
}

fn error_invocations() -> Vec<Invocation> {
    vec![
        Invocation::new("logs.recent_errors", LOG_SEARCH_TOOL, recent_errors_payload()),
        Invocation::new("errors.summary", LOG_SEARCH_TOOL, recent_errors_payload()),
    ]
}

fn last_record_invocations() -> Vec<Invocation> {
    vec![Invocation::new(
        "data.last_inserted",
        LOG_SEARCH_TOOL,
        json!({
            "query": "*",
            "sort": { "@timestamp": "desc" },
            "size": 1
        }),
    )]
}

fn quantity_invocations() -> Vec<Invocation> {
    vec![
        Invocation::new("data.count_today", LOG_SEARCH_TOOL, today_scope_payload()),
        Invocation::new(
            "data.count_by_operation",
            LOG_SEARCH_TOOL,
            today_scope_payload(),
        ),
    ]
}

fn broker_invocations() -> Vec<Invocation> {
    vec![Invocation::new("rabbitmq.status", "rabbit.status", json!({}))]
}

fn worker_invocations() -> Vec<Invocation> {
    vec![Invocation::new("worker.status", "worker.status", json!({}))]
}

fn cdc_invocations() -> Vec<Invocation> {
    vec![Invocation::new(
        "cdc.listeners_status",
        "cdc.listeners_status",
        json!({}),
    )]
}

/// Routing table, in evaluation order.
pub const RULES: &[RoutingRule] = &[
    RoutingRule {
        label: "errors",
        keywords: ERROR_KEYWORDS,
        build: error_invocations,
    },
    RoutingRule {
        label: "last_record",
        keywords: LAST_RECORD_KEYWORDS,
        build: last_record_invocations,
    },
    RoutingRule {
        label: "quantity",
        keywords: QUANTITY_KEYWORDS,
        build: quantity_invocations,
    },
    RoutingRule {
        label: "broker",
        keywords: BROKER_KEYWORDS,
        build: broker_invocations,
    },
    RoutingRule {
        label: "worker",
        keywords: WORKER_KEYWORDS,
        build: worker_invocations,
    },
    RoutingRule {
        label: "cdc",
        keywords: CDC_KEYWORDS,
        build: cdc_invocations,
    },
];

/// Wildcard search used when no rule fires
pub fn fallback_invocation() -> Invocation {
    Invocation::new(LOG_SEARCH_TOOL, LOG_SEARCH_TOOL, json!({ "query": "*" }))
}

/// Choose the MCP tools to call for a question. Never returns an empty list.
pub fn route(question: &str) -> Vec<Invocation> {
    let lower = question.to_lowercase();
    let mut invocations = Vec::new();

    for rule in RULES {
        if rule.matches(&lower) {
            tracing::debug!("Routing rule '{}' matched", rule.label);
            invocations.extend((rule.build)());
        }
    }

    if invocations.is_empty() {
        invocations.push(fallback_invocation());
    }
    invocations
}
