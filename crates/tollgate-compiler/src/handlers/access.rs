//! Access restriction and authentication policies.

use tollgate_core::{DiagnosticCode, Element};

use super::{
    check_argument_count, config_argument, single_text, text_list, ConfigHandler, ConfigReader,
    MethodPolicyHandler, ReturnValuePolicyHandler, Rule,
};
use crate::context::CompilationContext;
use crate::syntax::Invocation;

/// `context.CheckHeader(new CheckHeaderConfig { ... })`
#[derive(Debug)]
pub struct CheckHeaderHandler;

impl MethodPolicyHandler for CheckHeaderHandler {
    fn method_name(&self) -> &'static str {
        "CheckHeader"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, "CheckHeaderConfig") else {
            return;
        };
        let Some(mut element) = ConfigReader::new(context, &config, "check-header")
            .required("Name", "name")
            .required("FailCheckHttpCode", "failed-check-httpcode")
            .required("FailCheckErrorMessage", "failed-check-error-message")
            .required("IgnoreCase", "ignore-case")
            .finish()
        else {
            return;
        };

        if let Some(values) = config.field("Values") {
            for value in text_list(context, values) {
                element.add_element(Element::new("value").with_text(value));
            }
        }
        context.add_element(element);
    }
}

/// `context.IpFilter(new IpFilterConfig { ... })`
#[derive(Debug)]
pub struct IpFilterHandler;

impl MethodPolicyHandler for IpFilterHandler {
    fn method_name(&self) -> &'static str {
        "IpFilter"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, "IpFilterConfig") else {
            return;
        };
        let Some(mut element) = ConfigReader::new(context, &config, "ip-filter")
            .required("Action", "action")
            .finish()
        else {
            return;
        };

        if let Some(addresses) = config.field("Addresses") {
            for address in text_list(context, addresses) {
                element.add_element(Element::new("address").with_text(address));
            }
        }
        if let Some(ranges) = config.field("AddressRanges") {
            for range in ranges.elements() {
                let range = ConfigReader::new(context, range, "address-range")
                    .required("From", "from")
                    .required("To", "to")
                    .finish();
                if let Some(range) = range {
                    element.add_element(range);
                }
            }
        }
        context.add_element(element);
    }
}

/// `context.AuthenticationCertificate(new CertificateAuthenticationConfig { ... })`
pub const AUTHENTICATION_CERTIFICATE: ConfigHandler = ConfigHandler::new(
    "AuthenticationCertificate",
    "CertificateAuthenticationConfig",
    "authentication-certificate",
    &[
        Rule::ExactlyOne(&[
            ("Thumbprint", "thumbprint"),
            ("CertificateId", "certificate-id"),
            ("Body", "body"),
        ]),
        Rule::Optional("Password", "password"),
    ],
);

/// `context.AuthenticationManagedIdentity(new ManagedIdentityAuthenticationConfig { ... })`
///
/// Bound to a local name, the token is stored in a variable of that name.
#[derive(Debug)]
pub struct ManagedIdentityHandler;

impl ManagedIdentityHandler {
    const CONFIG_TYPE: &'static str = "ManagedIdentityAuthenticationConfig";
    const ELEMENT: &'static str = "authentication-managed-identity";
    const IDENTITY: &'static [Rule] = &[
        Rule::Required("Resource", "resource"),
        Rule::Optional("ClientId", "client-id"),
    ];
    const OPTIONS: &'static [Rule] = &[Rule::Optional("IgnoreError", "ignore-error")];
}

impl MethodPolicyHandler for ManagedIdentityHandler {
    fn method_name(&self) -> &'static str {
        "AuthenticationManagedIdentity"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, Self::CONFIG_TYPE) else {
            return;
        };
        let element = ConfigReader::new(context, &config, Self::ELEMENT)
            .apply(Self::IDENTITY)
            .optional("OutputTokenVariableName", "output-token-variable-name")
            .apply(Self::OPTIONS)
            .finish();
        if let Some(element) = element {
            context.add_element(element);
        }
    }
}

impl ReturnValuePolicyHandler for ManagedIdentityHandler {
    fn method_name(&self) -> &'static str {
        "AuthenticationManagedIdentity"
    }

    fn handle(&self, context: &mut CompilationContext<'_>, call: &Invocation, variable: &str) {
        if !check_argument_count(context, call, 1, 1) {
            return;
        }
        let Some(config) = config_argument(context, call, 0, Self::CONFIG_TYPE) else {
            return;
        };
        if let Some(explicit) = config.field("OutputTokenVariableName") {
            // The declared name wins; an explicit one must agree with it.
            if single_text(context, explicit, "'OutputTokenVariableName'").as_deref() != Some(variable) {
                context.report(
                    DiagnosticCode::ArgumentTypeMismatch,
                    explicit.span,
                    format!(
                        "{}: OutputTokenVariableName conflicts with the declared variable '{variable}'",
                        Self::ELEMENT
                    ),
                );
                return;
            }
        }
        let element = ConfigReader::new(context, &config, Self::ELEMENT)
            .apply(Self::IDENTITY)
            .attribute("output-token-variable-name", variable)
            .apply(Self::OPTIONS)
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
    fn test_check_header() {
        assert_eq!(
            inbound_xml(
                r#"context.CheckHeader(new CheckHeaderConfig
                {
                    Name = "Authorization",
                    FailCheckHttpCode = 401,
                    FailCheckErrorMessage = "Bad credentials",
                    IgnoreCase = true,
                    Values = new[] { "a", "b" },
                });"#
            ),
            concat!(
                "<inbound>",
                r#"<check-header name="Authorization" failed-check-httpcode="401" failed-check-error-message="Bad credentials" ignore-case="true">"#,
                "<value>a</value><value>b</value>",
                "</check-header></inbound>"
            )
        );
    }

    #[test]
    fn test_ip_filter() {
        assert_eq!(
            inbound_xml(
                r#"context.IpFilter(new IpFilterConfig
                {
                    Action = "allow",
                    Addresses = new[] { "10.0.0.1" },
                    AddressRanges = new[] { new AddressRange { From = "10.1.0.0", To = "10.1.255.255" } },
                });"#
            ),
            concat!(
                r#"<inbound><ip-filter action="allow">"#,
                "<address>10.0.0.1</address>",
                r#"<address-range from="10.1.0.0" to="10.1.255.255" />"#,
                "</ip-filter></inbound>"
            )
        );
    }

    #[test]
    fn test_certificate_requires_exactly_one_source() {
        assert_eq!(
            inbound_xml(r#"context.AuthenticationCertificate(new CertificateAuthenticationConfig { CertificateId = "client" });"#),
            r#"<inbound><authentication-certificate certificate-id="client" /></inbound>"#
        );

        let (inbound, diagnostics) = compile_inbound(
            r#"context.AuthenticationCertificate(new CertificateAuthenticationConfig { Thumbprint = "ab", Body = "cd" });"#,
            "",
        );
        assert!(inbound.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::OnlyOneOfAllowed);

        let (_, diagnostics) = compile_inbound(
            "context.AuthenticationCertificate(new CertificateAuthenticationConfig { Password = \"x\" });",
            "",
        );
        assert_eq!(diagnostics[0].code, DiagnosticCode::AtLeastOneOfRequired);
    }

    #[test]
    fn test_managed_identity_bound_to_variable() {
        assert_eq!(
            inbound_xml(
                r#"var token = context.AuthenticationManagedIdentity(new ManagedIdentityAuthenticationConfig { Resource = "https://vault.azure.net" });
                   context.SetHeader("Authorization", token);"#
            ),
            concat!(
                "<inbound>",
                r#"<authentication-managed-identity resource="https://vault.azure.net" output-token-variable-name="token" />"#,
                r#"<set-header name="Authorization" exists-action="override"><value>@((string)context.Variables["token"])</value></set-header>"#,
                "</inbound>"
            )
        );
    }

    #[test]
    fn test_managed_identity_conflicting_output_variable() {
        let (inbound, diagnostics) = compile_inbound(
            r#"var token = context.AuthenticationManagedIdentity(new ManagedIdentityAuthenticationConfig { Resource = "r", OutputTokenVariableName = "other" });"#,
            "",
        );
        assert!(inbound.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ArgumentTypeMismatch);
        assert!(diagnostics[0].message.contains("conflicts with the declared variable 'token'"));

        assert_eq!(
            inbound_xml(
                r#"var token = context.AuthenticationManagedIdentity(new ManagedIdentityAuthenticationConfig { Resource = "r", OutputTokenVariableName = "token" });"#
            ),
            r#"<inbound><authentication-managed-identity resource="r" output-token-variable-name="token" /></inbound>"#
        );
    }

    #[test]
    fn test_managed_identity_unbound() {
        assert_eq!(
            inbound_xml(r#"context.AuthenticationManagedIdentity(new ManagedIdentityAuthenticationConfig { Resource = "r", IgnoreError = false });"#),
            r#"<inbound><authentication-managed-identity resource="r" ignore-error="false" /></inbound>"#
        );
    }
}
