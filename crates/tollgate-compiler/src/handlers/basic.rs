//! Handlers for request and response transformation policies.

use tollgate_core::expression::strip_marker;
use tollgate_core::Element;

use super::{
    check_argument_count, text_argument, text_list, ConfigHandler, MethodPolicyHandler, Rule,
};
use crate::context::CompilationContext;
use crate::initializer::extract_value;
use crate::syntax::Invocation;

/// `context.Base()` → `<base />`.
#[derive(Debug)]
pub struct BaseHandler;

impl MethodPolicyHandler for BaseHandler {
    fn method_name(&self) -> &'static str {
        "Base"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if check_argument_count(context, call, 0, 0) {
            context.add_element(Element::new("base"));
        }
    }
}

/// Header and query parameter policies: `name`, then zero or more values.
#[derive(Debug)]
pub struct HeaderHandler {
    method: &'static str,
    element: &'static str,
    exists_action: &'static str,
    takes_values: bool,
}

impl HeaderHandler {
    const fn new(
        method: &'static str,
        element: &'static str,
        exists_action: &'static str,
        takes_values: bool,
    ) -> Self {
        Self {
            method,
            element,
            exists_action,
            takes_values,
        }
    }
}

impl MethodPolicyHandler for HeaderHandler {
    fn method_name(&self) -> &'static str {
        self.method
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        let (min, max) = if self.takes_values { (2, usize::MAX) } else { (1, 1) };
        if !check_argument_count(context, call, min, max) {
            return;
        }
        let Some(name) = text_argument(context, call, 0) else {
            return;
        };

        let mut element = Element::new(self.element)
            .with_attribute("name", name)
            .with_attribute("exists-action", self.exists_action);
        for argument in &call.arguments[1..] {
            let value = extract_value(context, &argument.value);
            for text in text_list(context, &value) {
                element.add_element(Element::new("value").with_text(text));
            }
        }
        context.add_element(element);
    }
}

/// `context.SetHeader(name, values...)`
pub const SET_HEADER: HeaderHandler = HeaderHandler::new("SetHeader", "set-header", "override", true);
/// `context.AppendHeader(name, values...)`
pub const APPEND_HEADER: HeaderHandler = HeaderHandler::new("AppendHeader", "set-header", "append", true);
/// `context.SetHeaderIfNotExist(name, values...)`
pub const SET_HEADER_IF_NOT_EXIST: HeaderHandler =
    HeaderHandler::new("SetHeaderIfNotExist", "set-header", "skip", true);
/// `context.RemoveHeader(name)`
pub const REMOVE_HEADER: HeaderHandler = HeaderHandler::new("RemoveHeader", "set-header", "delete", false);
/// `context.SetQueryParameter(name, values...)`
pub const SET_QUERY_PARAMETER: HeaderHandler =
    HeaderHandler::new("SetQueryParameter", "set-query-parameter", "override", true);
/// `context.AppendQueryParameter(name, values...)`
pub const APPEND_QUERY_PARAMETER: HeaderHandler =
    HeaderHandler::new("AppendQueryParameter", "set-query-parameter", "append", true);
/// `context.SetQueryParameterIfNotExist(name, values...)`
pub const SET_QUERY_PARAMETER_IF_NOT_EXIST: HeaderHandler =
    HeaderHandler::new("SetQueryParameterIfNotExist", "set-query-parameter", "skip", true);
/// `context.RemoveQueryParameter(name)`
pub const REMOVE_QUERY_PARAMETER: HeaderHandler =
    HeaderHandler::new("RemoveQueryParameter", "set-query-parameter", "delete", false);

/// A policy whose single argument becomes the element text.
#[derive(Debug)]
pub struct TextHandler {
    method: &'static str,
    element: &'static str,
}

impl MethodPolicyHandler for TextHandler {
    fn method_name(&self) -> &'static str {
        self.method
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        if let Some(text) = text_argument(context, call, 0) {
            context.add_element(Element::new(self.element).with_text(text));
        }
    }
}

/// `context.SetMethod(method)`
pub const SET_METHOD: TextHandler = TextHandler {
    method: "SetMethod",
    element: "set-method",
};
/// `context.SetBody(body)`
pub const SET_BODY: TextHandler = TextHandler {
    method: "SetBody",
    element: "set-body",
};

/// A policy whose positional arguments map onto attributes.
///
/// The first `required` arguments must be given; the rest are optional.
#[derive(Debug)]
pub struct ArgumentsHandler {
    method: &'static str,
    element: &'static str,
    attributes: &'static [&'static str],
    required: usize,
}

impl MethodPolicyHandler for ArgumentsHandler {
    fn method_name(&self) -> &'static str {
        self.method
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, self.required, self.attributes.len()) {
            return;
        }
        let mut element = Element::new(self.element);
        for (index, attribute) in self.attributes.iter().enumerate().take(call.arguments.len()) {
            match text_argument(context, call, index) {
                Some(text) => element.add_attribute(*attribute, text),
                None => return,
            }
        }
        context.add_element(element);
    }
}

/// `context.SetVariable(name, value)`
pub const SET_VARIABLE: ArgumentsHandler = ArgumentsHandler {
    method: "SetVariable",
    element: "set-variable",
    attributes: &["name", "value"],
    required: 2,
};
/// `context.RewriteUri(template, copyUnmatchedParams?)`
pub const REWRITE_URI: ArgumentsHandler = ArgumentsHandler {
    method: "RewriteUri",
    element: "rewrite-uri",
    attributes: &["template", "copy-unmatched-params"],
    required: 1,
};
/// `context.FindAndReplace(from, to)`
pub const FIND_AND_REPLACE: ArgumentsHandler = ArgumentsHandler {
    method: "FindAndReplace",
    element: "find-and-replace",
    attributes: &["from", "to"],
    required: 2,
};
/// `context.IncludeFragment(fragmentId)`
pub const INCLUDE_FRAGMENT: ArgumentsHandler = ArgumentsHandler {
    method: "IncludeFragment",
    element: "include-fragment",
    attributes: &["fragment-id"],
    required: 1,
};
/// `context.AuthenticationBasic(username, password)`
pub const AUTHENTICATION_BASIC: ArgumentsHandler = ArgumentsHandler {
    method: "AuthenticationBasic",
    element: "authentication-basic",
    attributes: &["username", "password"],
    required: 2,
};
/// `context.CacheStore(duration, cacheResponse?)`
pub const CACHE_STORE: ArgumentsHandler = ArgumentsHandler {
    method: "CacheStore",
    element: "cache-store",
    attributes: &["duration", "cache-response"],
    required: 1,
};

/// `context.SetStatus(new SetStatusConfig { Code, Reason })`
pub const SET_STATUS: ConfigHandler = ConfigHandler::new(
    "SetStatus",
    "SetStatusConfig",
    "set-status",
    &[Rule::Required("Code", "code"), Rule::Required("Reason", "reason")],
);

/// `context.InlinePolicy(markup)`: markup copied verbatim into the section.
#[derive(Debug)]
pub struct InlinePolicyHandler;

impl MethodPolicyHandler for InlinePolicyHandler {
    fn method_name(&self) -> &'static str {
        "InlinePolicy"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        if let Some(markup) = text_argument(context, call, 0) {
            let markup = strip_marker(&markup).map_or_else(|| markup.clone(), str::to_string);
            context.add_raw(markup);
        }
    }
}
