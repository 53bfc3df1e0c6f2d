//! Method policy handlers.
//!
//! Each handler translates one recognised call on the context parameter into
//! policy elements. Handlers are looked up by method name in the static
//! [`METHOD_HANDLERS`] and [`RETURN_VALUE_HANDLERS`] tables; adding an
//! operation means adding one entry, usually a declarative
//! [`ConfigHandler`] or [`ArgumentsHandler`].
//!
//! Every handler follows the same skeleton: check the argument count, extract
//! the argument values, pull fields into attributes with [`Rule`]s, and append
//! the element. Validation failures are reported and the element is skipped.

mod access;
mod basic;
mod limits;
mod routing;

use tollgate_core::{DiagnosticCode, Element};

use crate::context::CompilationContext;
use crate::initializer::{extract_value, InitializerValue};
use crate::syntax::{Expr, Invocation};

pub use access::{
    CheckHeaderHandler, IpFilterHandler, ManagedIdentityHandler, AUTHENTICATION_CERTIFICATE,
};
pub use basic::{
    ArgumentsHandler, BaseHandler, HeaderHandler, InlinePolicyHandler, TextHandler,
    APPEND_HEADER, APPEND_QUERY_PARAMETER, AUTHENTICATION_BASIC, CACHE_STORE, FIND_AND_REPLACE,
    INCLUDE_FRAGMENT, REMOVE_HEADER, REMOVE_QUERY_PARAMETER, REWRITE_URI, SET_BODY, SET_HEADER,
    SET_HEADER_IF_NOT_EXIST, SET_METHOD, SET_QUERY_PARAMETER, SET_QUERY_PARAMETER_IF_NOT_EXIST,
    SET_STATUS, SET_VARIABLE,
};
pub use limits::{HierarchicalHandler, Level, QUOTA, QUOTA_BY_KEY, RATE_LIMIT, RATE_LIMIT_BY_KEY};
pub use routing::{
    CacheLookupValueHandler, ReturnResponseHandler, FORWARD_REQUEST, MOCK_RESPONSE,
    SET_BACKEND_SERVICE,
};

/// Translates a call statement into policy elements.
pub trait MethodPolicyHandler: Sync {
    /// Name of the handled method.
    fn method_name(&self) -> &'static str;

    /// Appends the elements for `call` to the context.
    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation);
}

/// Translates a call whose result is bound to a local name.
pub trait ReturnValuePolicyHandler: Sync {
    /// Name of the handled method.
    fn method_name(&self) -> &'static str;

    /// Appends the elements for `call`, storing its result in `variable`.
    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation, variable: &str);
}

/// Handlers for call statements.
pub static METHOD_HANDLERS: &[&dyn MethodPolicyHandler] = &[
    &BaseHandler,
    &SET_HEADER,
    &APPEND_HEADER,
    &SET_HEADER_IF_NOT_EXIST,
    &REMOVE_HEADER,
    &SET_QUERY_PARAMETER,
    &APPEND_QUERY_PARAMETER,
    &SET_QUERY_PARAMETER_IF_NOT_EXIST,
    &REMOVE_QUERY_PARAMETER,
    &SET_METHOD,
    &SET_BODY,
    &SET_STATUS,
    &SET_VARIABLE,
    &REWRITE_URI,
    &FIND_AND_REPLACE,
    &INCLUDE_FRAGMENT,
    &InlinePolicyHandler,
    &RATE_LIMIT,
    &RATE_LIMIT_BY_KEY,
    &QUOTA,
    &QUOTA_BY_KEY,
    &CheckHeaderHandler,
    &IpFilterHandler,
    &AUTHENTICATION_BASIC,
    &AUTHENTICATION_CERTIFICATE,
    &ManagedIdentityHandler,
    &SET_BACKEND_SERVICE,
    &FORWARD_REQUEST,
    &MOCK_RESPONSE,
    &ReturnResponseHandler,
    &CACHE_STORE,
];

/// Handlers for calls bound by local declarations.
pub static RETURN_VALUE_HANDLERS: &[&dyn ReturnValuePolicyHandler] =
    &[&ManagedIdentityHandler, &CacheLookupValueHandler];

/// Finds the handler for a call statement.
#[must_use]
pub fn find_handler(method: &str) -> Option<&'static dyn MethodPolicyHandler> {
    METHOD_HANDLERS
        .iter()
        .copied()
        .find(|h| h.method_name() == method)
}

/// Finds the handler for a bound call.
#[must_use]
pub fn find_return_value_handler(method: &str) -> Option<&'static dyn ReturnValuePolicyHandler> {
    RETURN_VALUE_HANDLERS
        .iter()
        .copied()
        .find(|h| h.method_name() == method)
}

/// How one configuration field maps onto the element being built.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// `(field, attribute)` that must be present.
    Required(&'static str, &'static str),
    /// `(field, attribute)` added only when present.
    Optional(&'static str, &'static str),
    /// Exactly one of the `(field, attribute)` pairs must be present.
    ExactlyOne(&'static [(&'static str, &'static str)]),
    /// At least one of the `(field, attribute)` pairs must be present.
    AtLeastOne(&'static [(&'static str, &'static str)]),
}

/// Checks the number of arguments of a call.
pub(crate) fn check_argument_count(
    context: &CompilationContext<'_>,
    call: &Invocation,
    min: usize,
    max: usize,
) -> bool {
    let count = call.arguments.len();
    if (min..=max).contains(&count) {
        return true;
    }
    let method = call.method_name().unwrap_or_default();
    let expected = if min == max {
        min.to_string()
    } else if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    };
    context.report(
        DiagnosticCode::ArgumentCountMismatch,
        call.span,
        format!("Method '{method}' expects {expected} argument(s) but was called with {count}"),
    );
    false
}

/// Extracts a configuration object argument and checks its type.
///
/// The argument must be an object creation; its type, when written, must be
/// `expected_type`.
pub(crate) fn config_argument(
    context: &CompilationContext<'_>,
    call: &Invocation,
    index: usize,
    expected_type: &str,
) -> Option<InitializerValue> {
    let argument = call.arguments.get(index)?;
    let method = call.method_name().unwrap_or_default();
    if !matches!(argument.value, Expr::ObjectCreation(_)) {
        context.report(
            DiagnosticCode::ArgumentNotObjectCreation,
            argument.span,
            format!(
                "Argument of '{method}' must be an object creation expression but was {}",
                argument.value.shape()
            ),
        );
        return None;
    }

    let value = extract_value(context, &argument.value);
    match value.simple_type_name() {
        Some(actual) if actual != expected_type => {
            context.report(
                DiagnosticCode::ArgumentTypeMismatch,
                argument.span,
                format!("Argument of '{method}' must be of type {expected_type} but was {actual}"),
            );
            None
        }
        _ => Some(value),
    }
}

/// Extracts a plain argument that must resolve to a single string.
pub(crate) fn text_argument(
    context: &CompilationContext<'_>,
    call: &Invocation,
    index: usize,
) -> Option<String> {
    let argument = call.arguments.get(index)?;
    let value = extract_value(context, &argument.value);
    single_text(context, &value, "argument")
}

/// Returns the string of a single value, reporting other shapes.
pub(crate) fn single_text(
    context: &CompilationContext<'_>,
    value: &InitializerValue,
    what: &str,
) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }
    context.report(
        DiagnosticCode::ParameterNotSupported,
        value.span,
        format!("Expected a single value for {what}"),
    );
    None
}

/// Texts of a value that may be a single string or a list of strings.
pub(crate) fn text_list(context: &CompilationContext<'_>, value: &InitializerValue) -> Vec<String> {
    if value.as_str().is_some() {
        return single_text(context, value, "value").into_iter().collect();
    }
    value
        .elements()
        .iter()
        .filter_map(|element| single_text(context, element, "value"))
        .collect()
}

/// Builds one element from a configuration value.
///
/// Attributes read from the configuration come out in the source order of
/// their fields; attributes added with [`ConfigReader::attribute`] keep their
/// position. Any failed rule makes [`ConfigReader::finish`] return `None`.
pub(crate) struct ConfigReader<'c, 'a> {
    context: &'c CompilationContext<'a>,
    config: &'c InitializerValue,
    element: Element,
    /// Attributes in rule order, with the index of the field each was read from.
    attributes: Vec<(Option<usize>, String, String)>,
    valid: bool,
}

impl<'c, 'a> ConfigReader<'c, 'a> {
    pub(crate) fn new(
        context: &'c CompilationContext<'a>,
        config: &'c InitializerValue,
        element: &str,
    ) -> Self {
        Self {
            context,
            config,
            element: Element::new(element),
            attributes: Vec::new(),
            valid: true,
        }
    }

    pub(crate) fn apply(mut self, rules: &[Rule]) -> Self {
        for rule in rules {
            self = match *rule {
                Rule::Required(field, attribute) => self.required(field, attribute),
                Rule::Optional(field, attribute) => self.optional(field, attribute),
                Rule::ExactlyOne(choices) => self.exactly_one_of(choices),
                Rule::AtLeastOne(choices) => self.at_least_one_of(choices),
            };
        }
        self
    }

    pub(crate) fn required(mut self, field: &str, attribute: &str) -> Self {
        if self.config.field(field).is_some() {
            return self.optional(field, attribute);
        }
        self.context.report(
            DiagnosticCode::RequiredParameterMissing,
            self.config.span,
            format!("{}: required parameter '{field}' is missing", self.element.name),
        );
        self.valid = false;
        self
    }

    pub(crate) fn optional(mut self, field: &str, attribute: &str) -> Self {
        let Some(value) = self.config.field(field) else {
            return self;
        };
        match single_text(self.context, value, &format!("'{field}'")) {
            Some(text) => {
                let position = self.config.fields().iter().position(|(name, _)| name == field);
                self.attributes.push((position, attribute.to_string(), text));
            }
            None => self.valid = false,
        }
        self
    }

    pub(crate) fn exactly_one_of(mut self, choices: &[(&str, &str)]) -> Self {
        let present: Vec<_> = choices
            .iter()
            .filter(|(field, _)| self.config.field(field).is_some())
            .collect();
        match present.as_slice() {
            [(field, attribute)] => self.optional(field, attribute),
            [] => self.missing_choice(choices),
            _ => {
                let names = present.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(", ");
                self.context.report(
                    DiagnosticCode::OnlyOneOfAllowed,
                    self.config.span,
                    format!("{}: only one of {names} is allowed", self.element.name),
                );
                self.valid = false;
                self
            }
        }
    }

    pub(crate) fn at_least_one_of(mut self, choices: &[(&str, &str)]) -> Self {
        if !choices.iter().any(|(field, _)| self.config.field(field).is_some()) {
            return self.missing_choice(choices);
        }
        for (field, attribute) in choices {
            self = self.optional(field, attribute);
        }
        self
    }

    /// Adds an attribute that does not come from the configuration.
    pub(crate) fn attribute(mut self, attribute: &str, value: &str) -> Self {
        self.attributes.push((None, attribute.to_string(), value.to_string()));
        self
    }

    fn missing_choice(mut self, choices: &[(&str, &str)]) -> Self {
        let names = choices.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(", ");
        self.context.report(
            DiagnosticCode::AtLeastOneOfRequired,
            self.config.span,
            format!("{}: one of {names} is required", self.element.name),
        );
        self.valid = false;
        self
    }

    pub(crate) fn finish(mut self) -> Option<Element> {
        if !self.valid {
            return None;
        }
        let mut from_config: Vec<_> = self
            .attributes
            .iter()
            .filter_map(|(position, name, value)| Some((position.as_ref()?, name, value)))
            .collect();
        from_config.sort_by_key(|(position, _, _)| **position);
        let mut from_config = from_config.into_iter();
        for (position, name, value) in &self.attributes {
            let (name, value) = match position {
                None => (name, value),
                Some(_) => match from_config.next() {
                    Some((_, name, value)) => (name, value),
                    None => continue,
                },
            };
            self.element.add_attribute(name.as_str(), value.as_str());
        }
        Some(self.element)
    }
}

/// A handler emitting one flat element from a single configuration object.
#[derive(Debug)]
pub struct ConfigHandler {
    method: &'static str,
    config_type: &'static str,
    element: &'static str,
    /// Whether the configuration argument may be omitted.
    optional_config: bool,
    rules: &'static [Rule],
}

impl ConfigHandler {
    /// Declares a handler requiring exactly one configuration argument.
    #[must_use]
    pub const fn new(
        method: &'static str,
        config_type: &'static str,
        element: &'static str,
        rules: &'static [Rule],
    ) -> Self {
        Self {
            method,
            config_type,
            element,
            optional_config: false,
            rules,
        }
    }

    /// Allows calling the method without arguments.
    #[must_use]
    pub const fn with_optional_config(mut self) -> Self {
        self.optional_config = true;
        self
    }

    /// Builds the element, or `None` after reporting why it could not be built.
    pub(crate) fn build(&self, context: &CompilationContext<'_>, call: &Invocation) -> Option<Element> {
        let min = usize::from(!self.optional_config);
        if !check_argument_count(context, call, min, 1) {
            return None;
        }
        if call.arguments.is_empty() {
            return Some(Element::new(self.element));
        }
        let config = config_argument(context, call, 0, self.config_type)?;
        ConfigReader::new(context, &config, self.element)
            .apply(self.rules)
            .finish()
    }
}

impl MethodPolicyHandler for ConfigHandler {
    fn method_name(&self) -> &'static str {
        self.method
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if let Some(element) = self.build(context, call) {
            context.add_element(element);
        }
    }
}
