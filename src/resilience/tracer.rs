//! # Operation Tracing
//!
//! The APM seam: a tracer hands back a scoped [`tracing::Span`] that the core
//! enters around every guarded call and every retry attempt. Sync paths enter
//! the span for the duration of the call; async paths attach it with
//! [`tracing::Instrument`]. The core behaves identically when the tracer is
//! [`NoopTracer`], whose spans are disabled.

use tracing::Span;

/// Tags attached to a traced operation
pub type SpanTags<'a> = &'a [(&'static str, String)];

/// Produces spans for guarded calls and retry attempts
pub trait OperationTracer: Send + Sync + std::fmt::Debug {
    fn trace_operation(&self, name: &'static str, tags: SpanTags<'_>) -> Span;
}

/// Tracer that produces disabled spans
#[derive(Debug, Clone, Default)]
pub struct NoopTracer;

impl OperationTracer for NoopTracer {
    fn trace_operation(&self, _name: &'static str, _tags: SpanTags<'_>) -> Span {
        Span::none()
    }
}

/// Tracer that opens an `info`-level span per operation
///
/// Span names in `tracing` are static, so the operation name and tags are
/// recorded as fields of a single `resilience` span.
#[derive(Debug, Clone, Default)]
pub struct SpanTracer;

impl OperationTracer for SpanTracer {
    fn trace_operation(&self, name: &'static str, tags: SpanTags<'_>) -> Span {
        tracing::info_span!("resilience", operation = name, tags = %format_tags(tags))
    }
}

fn format_tags(tags: SpanTags<'_>) -> String {
    tags.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
