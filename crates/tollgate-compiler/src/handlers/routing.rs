//! Backend routing, response and caching policies.

use tollgate_core::{DiagnosticCode, Element};

use super::{
    check_argument_count, config_argument, single_text, text_list, ConfigHandler, ConfigReader,
    MethodPolicyHandler, ReturnValuePolicyHandler, Rule,
};
use crate::context::CompilationContext;
use crate::initializer::InitializerValue;
use crate::syntax::Invocation;

/// `context.SetBackendService(new SetBackendServiceConfig { ... })`
pub const SET_BACKEND_SERVICE: ConfigHandler = ConfigHandler::new(
    "SetBackendService",
    "SetBackendServiceConfig",
    "set-backend-service",
    &[
        Rule::ExactlyOne(&[("BaseUrl", "base-url"), ("BackendId", "backend-id")]),
        Rule::Optional("SfResolveCondition", "sf-resolve-condition"),
        Rule::Optional("SfServiceInstanceName", "sf-service-instance-name"),
        Rule::Optional("SfPartitionKey", "sf-partition-key"),
        Rule::Optional("SfListenerName", "sf-listener-name"),
    ],
);

/// `context.ForwardRequest()` or `context.ForwardRequest(new ForwardRequestConfig { ... })`
pub const FORWARD_REQUEST: ConfigHandler = ConfigHandler::new(
    "ForwardRequest",
    "ForwardRequestConfig",
    "forward-request",
    &[
        Rule::Optional("HttpVersion", "http-version"),
        Rule::Optional("Timeout", "timeout"),
        Rule::Optional("TimeoutMs", "timeout-ms"),
        Rule::Optional("ContinueTimeout", "continue-timeout"),
        Rule::Optional("FollowRedirects", "follow-redirects"),
        Rule::Optional("BufferRequestBody", "buffer-request-body"),
        Rule::Optional("BufferResponse", "buffer-response"),
        Rule::Optional("FailOnErrorStatusCode", "fail-on-error-status-code"),
    ],
)
.with_optional_config();

/// `context.MockResponse()` or `context.MockResponse(new MockResponseConfig { ... })`
pub const MOCK_RESPONSE: ConfigHandler = ConfigHandler::new(
    "MockResponse",
    "MockResponseConfig",
    "mock-response",
    &[
        Rule::Optional("StatusCode", "status-code"),
        Rule::Optional("ContentType", "content-type"),
        Rule::Optional("Index", "index"),
    ],
)
.with_optional_config();

/// `context.ReturnResponse(new ReturnResponseConfig { Status, Headers, Body })`
#[derive(Debug)]
pub struct ReturnResponseHandler;

impl ReturnResponseHandler {
    fn header(context: &CompilationContext<'_>, header: &InitializerValue) -> Option<Element> {
        let mut element = ConfigReader::new(context, header, "set-header")
            .required("Name", "name")
            .finish()?;
        let exists_action = match header.field("ExistsAction") {
            Some(action) => single_text(context, action, "'ExistsAction'")?.to_lowercase(),
            None => "override".to_string(),
        };
        element.add_attribute("exists-action", exists_action);
        if let Some(values) = header.field("Values") {
            for value in text_list(context, values) {
                element.add_element(Element::new("value").with_text(value));
            }
        }
        Some(element)
    }
}

impl MethodPolicyHandler for ReturnResponseHandler {
    fn method_name(&self) -> &'static str {
        "ReturnResponse"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, "ReturnResponseConfig") else {
            return;
        };
        let Some(mut element) = ConfigReader::new(context, &config, "return-response")
            .optional("ResponseVariableName", "response-variable-name")
            .finish()
        else {
            return;
        };

        if let Some(status) = config.field("Status") {
            let status = ConfigReader::new(context, status, "set-status")
                .required("Code", "code")
                .optional("Reason", "reason")
                .finish();
            if let Some(status) = status {
                element.add_element(status);
            }
        }
        if let Some(headers) = config.field("Headers") {
            for header in headers.elements() {
                if let Some(header) = Self::header(context, header) {
                    element.add_element(header);
                }
            }
        }
        if let Some(body) = config.field("Body").and_then(|body| Self::body(context, body)) {
            element.add_element(body);
        }
        context.add_element(element);
    }
}

impl ReturnResponseHandler {
    /// `Body` is either plain text or `new BodyConfig { Content, Template }`.
    fn body(context: &CompilationContext<'_>, body: &InitializerValue) -> Option<Element> {
        if body.as_str().is_some() {
            let text = single_text(context, body, "'Body'")?;
            return Some(Element::new("set-body").with_text(text));
        }
        let mut element = ConfigReader::new(context, body, "set-body")
            .optional("Template", "template")
            .finish()?;
        let Some(content) = body.field("Content") else {
            context.report(
                DiagnosticCode::RequiredParameterMissing,
                body.span,
                "set-body: required parameter 'Content' is missing",
            );
            return None;
        };
        element.add_text(single_text(context, content, "'Content'")?);
        Some(element)
    }
}

/// `var value = context.CacheLookupValue(new CacheLookupValueConfig { ... })`
#[derive(Debug)]
pub struct CacheLookupValueHandler;

impl ReturnValuePolicyHandler for CacheLookupValueHandler {
    fn method_name(&self) -> &'static str {
        "CacheLookupValue"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation, variable: &str) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, "CacheLookupValueConfig") else {
            return;
        };
        let element = ConfigReader::new(context, &config, "cache-lookup-value")
            .required("Key", "key")
            .attribute("variable-name", variable)
            .optional("DefaultValue", "default-value")
            .optional("CachingType", "caching-type")
            .finish();
        if let Some(element) = element {
            context.variables().bind(variable, variable);
            context.add_element(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{compile_inbound, inbound_xml};
    use tollgate_core::DiagnosticCode;

    #[test]
    fn test_set_backend_service_exactly_one() {
        assert_eq!(
            inbound_xml(r#"context.SetBackendService(new SetBackendServiceConfig { BaseUrl = "https://backend" });"#),
            r#"<inbound><set-backend-service base-url="https://backend" /></inbound>"#
        );

        let (inbound, diagnostics) = compile_inbound(
            "context.SetBackendService(new SetBackendServiceConfig { });",
            "",
        );
        assert!(inbound.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::AtLeastOneOfRequired);
    }

    #[test]
    fn test_forward_and_mock_take_optional_config() {
        assert_eq!(
            inbound_xml(
                "context.ForwardRequest(); context.ForwardRequest(new ForwardRequestConfig { Timeout = 30 }); context.MockResponse();"
            ),
            r#"<inbound><forward-request /><forward-request timeout="30" /><mock-response /></inbound>"#
        );

        let (_, diagnostics) = compile_inbound("context.MockResponse(1, 2);", "");
        assert_eq!(diagnostics[0].code, DiagnosticCode::ArgumentCountMismatch);
    }

    #[test]
    fn test_return_response() {
        assert_eq!(
            inbound_xml(
                r#"context.ReturnResponse(new ReturnResponseConfig
                {
                    Status = new StatusConfig { Code = 401, Reason = "Unauthorized" },
                    Headers = new[] { new HeaderConfig { Name = "WWW-Authenticate", Values = new[] { "Bearer" } } },
                    Body = new BodyConfig { Content = "denied" },
                });"#
            ),
            concat!(
                "<inbound><return-response>",
                r#"<set-status code="401" reason="Unauthorized" />"#,
                r#"<set-header name="WWW-Authenticate" exists-action="override"><value>Bearer</value></set-header>"#,
                "<set-body>denied</set-body>",
                "</return-response></inbound>"
            )
        );
    }

    #[test]
    fn test_cache_lookup_value_binds_variable() {
        assert_eq!(
            inbound_xml(
                r#"var cached = context.CacheLookupValue(new CacheLookupValueConfig { Key = "k", DefaultValue = "none" });
                   context.SetBody(cached);"#
            ),
            concat!(
                "<inbound>",
                r#"<cache-lookup-value key="k" variable-name="cached" default-value="none" />"#,
                r#"<set-body>@((string)context.Variables["cached"])</set-body>"#,
                "</inbound>"
            )
        );
    }

    #[test]
    fn test_cache_lookup_value_variable_keeps_its_position() {
        let (inbound, diagnostics) = compile_inbound(
            r#"var cached = context.CacheLookupValue(new CacheLookupValueConfig { DefaultValue = "none", Key = "k" });"#,
            "",
        );
        assert!(diagnostics.is_empty());
        let lookup = inbound.element("cache-lookup-value").unwrap();
        let names: Vec<_> = lookup.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["default-value", "variable-name", "key"]);
    }

    #[test]
    fn test_cache_lookup_value_needs_a_variable() {
        let (_, diagnostics) =
            compile_inbound("context.CacheLookupValue(new CacheLookupValueConfig { Key = \"k\" });", "");
        assert_eq!(diagnostics[0].code, DiagnosticCode::MethodNotSupported);
    }
}
