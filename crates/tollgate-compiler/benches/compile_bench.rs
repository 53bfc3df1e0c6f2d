//! Benchmarks for parsing and compiling policy sources.

use std::fmt::Write;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use tollgate_compiler::syntax::parse;
use tollgate_compiler::Compiler;
use tollgate_core::SourceFile;

/// Builds a document with `statements` calls in its inbound section, every
/// tenth one wrapped in a conditional.
fn policy_source(statements: usize) -> String {
    let mut body = String::new();
    for i in 0..statements {
        if i % 10 == 0 {
            let _ = writeln!(
                body,
                "if (IsTrusted(context.ExpressionContext)) {{ context.SetHeader(\"X-{i}\", \"a\"); }} else {{ context.RemoveHeader(\"X-{i}\"); }}"
            );
        } else {
            let _ = writeln!(
                body,
                "context.RateLimitByKey(new RateLimitByKeyConfig {{ Calls = {i}, RenewalPeriod = 60, CounterKey = Keys.Tenant }});"
            );
        }
    }
    format!(
        r#"
static class Keys {{ public const string Tenant = "tenant-" + "id"; }}

[Document("bench")]
public class BenchPolicy : IDocument
{{
    public void Inbound(IInboundContext context)
    {{
{body}
    }}

    bool IsTrusted(IExpressionContext context) => context.Request.Headers.ContainsKey("X-Trusted");
}}
"#
    )
}

fn parse_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler/parse");
    for statements in [10, 100, 1000] {
        let source = policy_source(statements);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("{statements}_statements"), |b| {
            b.iter(|| {
                let tree = parse(SourceFile::new("Bench.cs", black_box(source.as_str())));
                black_box(tree.is_ok())
            });
        });
    }
    group.finish();
}

fn compile_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compiler/compile");
    let compiler = Compiler::default();
    for statements in [10, 100, 1000] {
        let source = policy_source(statements);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("{statements}_statements"), |b| {
            b.iter(|| {
                let documents = compiler
                    .compile_sources(vec![SourceFile::new("Bench.cs", black_box(source.as_str()))])
                    .map(|documents| documents.iter().map(|d| compiler.to_xml(d).len()).sum::<usize>());
                black_box(documents.is_ok())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, parse_benchmarks, compile_benchmarks);
criterion_main!(benches);
