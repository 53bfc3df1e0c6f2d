//! End-to-end tests compiling whole policy sources.

use tollgate_compiler::{CompiledDocument, Compiler, CompilerOptions};
use tollgate_core::{DiagnosticCode, DocumentKind, SourceFile, WriterOptions};

fn compile(sources: &[(&str, &str)]) -> Vec<CompiledDocument> {
    Compiler::default()
        .compile_sources(
            sources
                .iter()
                .map(|(name, text)| SourceFile::new(*name, *text))
                .collect(),
        )
        .expect("sources parse")
}

fn compact(document: &CompiledDocument) -> String {
    document.to_xml(WriterOptions::compact())
}

// =============================================================================
// Sections and statements
// =============================================================================

#[test]
fn test_single_literal_call() {
    let documents = compile(&[(
        "Echo.cs",
        r#"
        using Tollgate.Authoring;

        namespace Contoso.Policies;

        [Document("echo")]
        public class EchoPolicy : IDocument
        {
            public void Inbound(IInboundContext context)
            {
                context.SetVariable("greeting", "hello");
            }
        }
        "#,
    )]);

    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document.marker.name, "echo");
    assert!(document.diagnostics.is_empty());
    assert_eq!(
        compact(document),
        r#"<policies><inbound><set-variable name="greeting" value="hello" /></inbound></policies>"#
    );
}

#[test]
fn test_if_else_with_helper_condition() {
    let documents = compile(&[(
        "Branch.cs",
        r#"
        [Document]
        public class BranchPolicy : IDocument
        {
            public void Inbound(IInboundContext context)
            {
                if (CheckX(context.ExpressionContext))
                {
                    context.SetHeader("Y", "1");
                }
                else
                {
                    context.SetHeader("Z", "1");
                }
            }

            bool CheckX(IExpressionContext context) => context.Request.Headers.ContainsKey("X");
        }
        "#,
    )]);

    let document = &documents[0];
    assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);

    let inbound = document.root.element("inbound").unwrap();
    let choose = inbound.element("choose").unwrap();
    let branches: Vec<_> = choose.elements().collect();
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].name, "when");
    assert_eq!(
        branches[0].attribute("condition"),
        Some("\u{1}@(context.Request.Headers.ContainsKey(\"X\"))")
    );
    assert_eq!(branches[0].element("set-header").unwrap().attribute("name"), Some("Y"));
    assert_eq!(branches[1].name, "otherwise");
    assert_eq!(branches[1].element("set-header").unwrap().attribute("name"), Some("Z"));

    assert_eq!(
        compact(document),
        concat!(
            "<policies><inbound><choose>",
            r#"<when condition="@(context.Request.Headers.ContainsKey("X"))">"#,
            r#"<set-header name="Y" exists-action="override"><value>1</value></set-header></when>"#,
            r#"<otherwise><set-header name="Z" exists-action="override"><value>1</value></set-header></otherwise>"#,
            "</choose></inbound></policies>"
        )
    );
}

#[test]
fn test_chain_of_n_links() {
    let documents = compile(&[(
        "Chain.cs",
        r#"
        [Document]
        class ChainPolicy
        {
            bool A(IExpressionContext c) => c.Variables.ContainsKey("a");
            bool B(IExpressionContext c) => c.Variables.ContainsKey("b");
            bool C(IExpressionContext c) => c.Variables.ContainsKey("c");

            void Inbound(IInboundContext context)
            {
                if (A(context.ExpressionContext)) { context.SetMethod("A"); }
                else if (B(context.ExpressionContext)) { context.SetMethod("B"); }
                else if (C(context.ExpressionContext)) { context.SetMethod("C"); }
                else { context.SetMethod("D"); }
            }
        }
        "#,
    )]);
    let document = &documents[0];
    assert!(document.diagnostics.is_empty());

    let inbound = document.root.element("inbound").unwrap();
    assert_eq!(inbound.elements().count(), 1);
    let names: Vec<_> = inbound
        .element("choose")
        .unwrap()
        .elements()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, ["when", "when", "when", "otherwise"]);
}

#[test]
fn test_failed_link_continues_chain() {
    let documents = compile(&[(
        "Chain.cs",
        r#"
        [Document]
        class ChainPolicy
        {
            bool B(IExpressionContext c) => true;

            void Inbound(IInboundContext context)
            {
                if (context.Flag) { context.SetMethod("A"); }
                else if (B(context.ExpressionContext)) { context.SetMethod("B"); }
                else { context.SetMethod("C"); }
            }
        }
        "#,
    )]);
    let document = &documents[0];
    assert_eq!(document.diagnostics.len(), 1);
    assert_eq!(document.diagnostics[0].code, DiagnosticCode::UnsupportedExpression);

    let choose = document.root.element("inbound").unwrap().element("choose").unwrap();
    let texts: Vec<_> = choose.elements().map(|branch| branch.elements().next().unwrap().text()).collect();
    assert_eq!(texts, ["B", "C"]);
}

#[test]
fn test_unsupported_loop_keeps_siblings() {
    let documents = compile(&[(
        "Loop.cs",
        r#"
        [Document]
        class LoopPolicy
        {
            void Inbound(IInboundContext context)
            {
                context.SetMethod("GET");
                foreach (var header in context.Request.Headers)
                {
                    context.RemoveHeader(header);
                }
                context.Base();
            }
        }
        "#,
    )]);
    let document = &documents[0];
    assert_eq!(document.diagnostics.len(), 1);
    assert_eq!(document.diagnostics[0].code, DiagnosticCode::UnsupportedStatement);
    assert_eq!(document.diagnostics[0].location.line, 8);
    assert_eq!(
        document.diagnostics[0].to_string(),
        "Loop.cs(8,17): error TG1001: ForEachStatement is not supported"
    );
    assert_eq!(
        compact(document),
        "<policies><inbound><set-method>GET</set-method><base /></inbound></policies>"
    );
}

// =============================================================================
// Values
// =============================================================================

#[test]
fn test_calls_or_bandwidth() {
    let neither = compile(&[(
        "Quota.cs",
        "[Document] class Q { void Inbound(IInboundContext context) { context.Quota(new QuotaConfig { RenewalPeriod = 60 }); } }",
    )]);
    assert_eq!(neither[0].diagnostics.len(), 1);
    assert_eq!(neither[0].diagnostics[0].code, DiagnosticCode::AtLeastOneOfRequired);
    assert_eq!(compact(&neither[0]), "<policies><inbound /></policies>");

    let one = compile(&[(
        "Quota.cs",
        "[Document] class Q { void Inbound(IInboundContext context) { context.Quota(new QuotaConfig { Calls = 5, RenewalPeriod = 60 }); } }",
    )]);
    assert!(one[0].diagnostics.is_empty());
    assert_eq!(
        compact(&one[0]),
        r#"<policies><inbound><quota calls="5" renewal-period="60" /></inbound></policies>"#
    );
}

#[test]
fn test_constants_across_files_are_inlined() {
    let documents = compile(&[
        (
            "Limits.cs",
            r#"
            namespace Contoso
            {
                public static class Limits
                {
                    public const int Calls = 100;
                    public const string Prefix = "tenant-";
                    public const string Key = Prefix + "id";
                }
            }
            "#,
        ),
        (
            "Throttle.cs",
            r#"
            [Document("throttle")]
            class ThrottlePolicy
            {
                void Inbound(IInboundContext context)
                {
                    context.RateLimitByKey(new RateLimitByKeyConfig
                    {
                        Calls = Limits.Calls,
                        RenewalPeriod = 60,
                        CounterKey = Limits.Key,
                    });
                }
            }
            "#,
        ),
    ]);
    let document = &documents[0];
    assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    assert_eq!(document.source, "Throttle.cs");
    assert_eq!(
        compact(document),
        r#"<policies><inbound><rate-limit-by-key calls="100" renewal-period="60" counter-key="tenant-id" /></inbound></policies>"#
    );
}

#[test]
fn test_non_constant_reference_is_replaced_by_empty_value() {
    let documents = compile(&[(
        "Bad.cs",
        r#"
        [Document]
        class BadPolicy
        {
            static string Dynamic = "x";

            void Inbound(IInboundContext context)
            {
                context.SetMethod(Dynamic);
            }
        }
        "#,
    )]);
    let document = &documents[0];
    assert_eq!(document.diagnostics.len(), 1);
    assert_eq!(document.diagnostics[0].code, DiagnosticCode::NotConstant);
    assert_eq!(compact(document), "<policies><inbound><set-method></set-method></inbound></policies>");
}

#[test]
fn test_block_bodied_helper_is_inlined_raw() {
    let documents = compile(&[(
        "Auth.cs",
        r#"
        [Document]
        class AuthPolicy
        {
            void Inbound(IInboundContext context)
            {
                context.AuthenticationBasic("svc", Password(context.ExpressionContext));
            }

            string Password(IExpressionContext context)
            {
                // Resolved at request time.
                return context.Variables["secret"] + "&more";
            }
        }
        "#,
    )]);
    let document = &documents[0];
    assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    assert_eq!(
        compact(document),
        r#"<policies><inbound><authentication-basic username="svc" password="@{return context.Variables["secret"] + "&more";}" /></inbound></policies>"#
    );
}

// =============================================================================
// Documents
// =============================================================================

#[test]
fn test_all_sections_and_fragment() {
    let documents = compile(&[
        (
            "Full.cs",
            r#"
            [Document(Name = "full", Scope = DocumentScope.Api)]
            class FullPolicy
            {
                void Inbound(IInboundContext context) { context.Base(); context.IncludeFragment("cors"); }
                void Backend(IBackendContext context) { context.ForwardRequest(new ForwardRequestConfig { Timeout = 30 }); }
                void Outbound(IOutboundContext context) { context.Base(); }
                void OnError(IOnErrorContext context) { context.Base(); }
            }
            "#,
        ),
        (
            "Cors.cs",
            r#"
            [Fragment("cors")]
            class CorsFragment
            {
                void Fragment(IFragmentContext context) { context.SetHeader("Vary", "Origin"); }
            }
            "#,
        ),
    ]);
    assert_eq!(documents.len(), 2);

    let full = &documents[0];
    assert_eq!(full.marker.scope, "api");
    assert_eq!(full.marker.kind, DocumentKind::Document);
    let sections: Vec<_> = full.root.elements().map(|e| e.name.as_str()).collect();
    assert_eq!(sections, ["inbound", "backend", "outbound", "on-error"]);

    let cors = &documents[1];
    assert_eq!(cors.marker.kind, DocumentKind::Fragment);
    assert_eq!(
        compact(cors),
        r#"<fragment><set-header name="Vary" exists-action="override"><value>Origin</value></set-header></fragment>"#
    );
}

#[test]
fn test_indented_output_differs_only_in_whitespace() {
    let sources = [(
        "Echo.cs",
        r#"[Document] class Echo { void Inbound(IInboundContext context) { context.SetHeader("X", "a", "b"); context.Base(); } }"#,
    )];
    let documents = compile(&sources);
    let indented = Compiler::new(CompilerOptions::new().with_format(true).with_indent(2)).to_xml(&documents[0]);
    assert_eq!(
        indented,
        "<policies>\n  <inbound>\n    <set-header name=\"X\" exists-action=\"override\">\n      <value>a</value>\n      <value>b</value>\n    </set-header>\n    <base />\n  </inbound>\n</policies>"
    );
    let stripped: String = indented.lines().map(str::trim).collect();
    assert_eq!(stripped, compact(&documents[0]));
}

#[test]
fn test_compiling_twice_is_identical() {
    let sources = [(
        "Mixed.cs",
        r#"
        [Document]
        class MixedPolicy
        {
            void Inbound(IInboundContext context)
            {
                context.SetHeader("A", "1");
                while (true) { }
                context.Unknown();
                context.RateLimit(new RateLimitConfig { Calls = 1, RenewalPeriod = 2 });
            }
        }
        "#,
    )];
    let first = compile(&sources);
    let second = compile(&sources);
    assert_eq!(first, second);
    assert_eq!(first[0].diagnostics.len(), 2);
}

#[test]
fn test_documents_serialize_to_json() {
    let documents = compile(&[(
        "Echo.cs",
        "[Document] class Echo { void Inbound(IInboundContext context) { context.Nope(); } }",
    )]);
    let json = serde_json::to_value(&documents[0]).unwrap();
    assert_eq!(json["marker"]["name"], "Echo");
    assert_eq!(json["diagnostics"][0]["code"], "MethodNotSupported");
    assert_eq!(json["diagnostics"][0]["location"]["line"], 1);
}
