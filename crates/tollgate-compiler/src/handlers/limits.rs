//! Rate limit and quota policies.
//!
//! `rate-limit` and `quota` accept per-API and per-operation overrides. Each
//! nesting level is described by a [`Level`]; an invalid nested entry is
//! reported and skipped while its siblings are still emitted.

use tollgate_core::{DiagnosticCode, Element};

use super::{check_argument_count, config_argument, ConfigHandler, ConfigReader, MethodPolicyHandler, Rule};
use crate::context::CompilationContext;
use crate::initializer::{InitializerValue, ValueKind};
use crate::syntax::Invocation;

const NAME_OR_ID: Rule = Rule::AtLeastOne(&[("Name", "name"), ("Id", "id")]);
const CALLS_OR_BANDWIDTH: Rule = Rule::AtLeastOne(&[("Calls", "calls"), ("Bandwidth", "bandwidth")]);

/// One level of a hierarchical configuration.
#[derive(Debug)]
pub struct Level {
    element: &'static str,
    rules: &'static [Rule],
    /// Field holding the entries of the next level, and that level.
    nested: Option<(&'static str, &'static Level)>,
}

/// A policy built from a configuration object with nested override levels.
#[derive(Debug)]
pub struct HierarchicalHandler {
    method: &'static str,
    config_type: &'static str,
    root: Level,
}

impl HierarchicalHandler {
    fn build_level(
        context: &CompilationContext<'_>,
        value: &InitializerValue,
        level: &Level,
    ) -> Option<Element> {
        let mut element = ConfigReader::new(context, value, level.element)
            .apply(level.rules)
            .finish()?;

        let Some((field, child_level)) = level.nested else {
            return Some(element);
        };
        let Some(entries) = value.field(field) else {
            return Some(element);
        };
        match &entries.kind {
            ValueKind::Positional(entries) => {
                for entry in entries {
                    if let Some(child) = Self::build_level(context, entry, child_level) {
                        element.add_element(child);
                    }
                }
            }
            _ => context.report(
                DiagnosticCode::ParameterNotSupported,
                entries.span,
                format!("{}: '{field}' must be an array", level.element),
            ),
        }
        Some(element)
    }
}

impl MethodPolicyHandler for HierarchicalHandler {
    fn method_name(&self) -> &'static str {
        self.method
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, self.config_type) else {
            return;
        };
        if let Some(element) = Self::build_level(context, &config, &self.root) {
            context.add_element(element);
        }
    }
}

static RATE_LIMIT_OPERATION: Level = Level {
    element: "operation",
    rules: &[
        NAME_OR_ID,
        Rule::Required("Calls", "calls"),
        Rule::Required("RenewalPeriod", "renewal-period"),
    ],
    nested: None,
};

static RATE_LIMIT_API: Level = Level {
    element: "api",
    rules: &[
        NAME_OR_ID,
        Rule::Required("Calls", "calls"),
        Rule::Required("RenewalPeriod", "renewal-period"),
    ],
    nested: Some(("Operations", &RATE_LIMIT_OPERATION)),
};

/// `context.RateLimit(new RateLimitConfig { ... })`
pub static RATE_LIMIT: HierarchicalHandler = HierarchicalHandler {
    method: "RateLimit",
    config_type: "RateLimitConfig",
    root: Level {
        element: "rate-limit",
        rules: &[
            Rule::Required("Calls", "calls"),
            Rule::Required("RenewalPeriod", "renewal-period"),
            Rule::Optional("RetryAfterHeaderName", "retry-after-header-name"),
            Rule::Optional("RetryAfterVariableName", "retry-after-variable-name"),
            Rule::Optional("RemainingCallsHeaderName", "remaining-calls-header-name"),
            Rule::Optional("RemainingCallsVariableName", "remaining-calls-variable-name"),
            Rule::Optional("TotalCallsHeaderName", "total-calls-header-name"),
        ],
        nested: Some(("Apis", &RATE_LIMIT_API)),
    },
};

static QUOTA_OPERATION: Level = Level {
    element: "operation",
    rules: &[
        NAME_OR_ID,
        CALLS_OR_BANDWIDTH,
        Rule::Optional("RenewalPeriod", "renewal-period"),
    ],
    nested: None,
};

static QUOTA_API: Level = Level {
    element: "api",
    rules: &[
        NAME_OR_ID,
        CALLS_OR_BANDWIDTH,
        Rule::Optional("RenewalPeriod", "renewal-period"),
    ],
    nested: Some(("Operations", &QUOTA_OPERATION)),
};

/// `context.Quota(new QuotaConfig { ... })`
pub static QUOTA: HierarchicalHandler = HierarchicalHandler {
    method: "Quota",
    config_type: "QuotaConfig",
    root: Level {
        element: "quota",
        rules: &[CALLS_OR_BANDWIDTH, Rule::Required("RenewalPeriod", "renewal-period")],
        nested: Some(("Apis", &QUOTA_API)),
    },
};

/// `context.RateLimitByKey(new RateLimitByKeyConfig { ... })`
pub const RATE_LIMIT_BY_KEY: ConfigHandler = ConfigHandler::new(
    "RateLimitByKey",
    "RateLimitByKeyConfig",
    "rate-limit-by-key",
    &[
        Rule::Required("Calls", "calls"),
        Rule::Required("RenewalPeriod", "renewal-period"),
        Rule::Required("CounterKey", "counter-key"),
        Rule::Optional("IncrementCondition", "increment-condition"),
        Rule::Optional("IncrementCount", "increment-count"),
        Rule::Optional("RetryAfterHeaderName", "retry-after-header-name"),
        Rule::Optional("RetryAfterVariableName", "retry-after-variable-name"),
        Rule::Optional("RemainingCallsHeaderName", "remaining-calls-header-name"),
        Rule::Optional("RemainingCallsVariableName", "remaining-calls-variable-name"),
        Rule::Optional("TotalCallsHeaderName", "total-calls-header-name"),
    ],
);

/// `context.QuotaByKey(new QuotaByKeyConfig { ... })`
pub const QUOTA_BY_KEY: ConfigHandler = ConfigHandler::new(
    "QuotaByKey",
    "QuotaByKeyConfig",
    "quota-by-key",
    &[
        Rule::Required("CounterKey", "counter-key"),
        CALLS_OR_BANDWIDTH,
        Rule::Required("RenewalPeriod", "renewal-period"),
        Rule::Optional("IncrementCondition", "increment-condition"),
        Rule::Optional("IncrementCount", "increment-count"),
        Rule::Optional("FirstPeriodStart", "first-period-start"),
    ],
);
