//! Trace span recording
//!
//! The orchestrator always records through [`Tracer`]; when tracing is off it
//! holds a [`NoopTracer`]. [`LogTracer`] backs each span with a `tracing`
//! span, so subscriber-based exporters see its timing and recorded fields.

use std::collections::BTreeMap;
use std::time::Duration;

/// Kind of work a span covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Embedding,
    Retriever,
    Generation,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Retriever => "retriever",
            Self::Generation => "generation",
        }
    }
}

/// Token accounting for a span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

impl TokenUsage {
    /// Usage of an input-only call such as an embedding
    pub fn input_only(tokens: u32) -> Self {
        Self {
            input: tokens,
            output: 0,
            total: tokens,
        }
    }
}

/// Creates spans
pub trait Tracer: Send + Sync {
    fn start_span(
        &self,
        name: &str,
        kind: SpanKind,
        input: &str,
        attributes: BTreeMap<String, String>,
    ) -> Box<dyn Span>;
}

/// A single timed unit of work
pub trait Span: Send {
    fn set_duration(&mut self, duration: Duration);
    fn set_token_usage(&mut self, usage: TokenUsage);
    fn set_output(&mut self, output: &str);
    fn record_error(&mut self, error: &str);
    fn record_success(&mut self, message: &str);
    fn end(self: Box<Self>);
}

/// Tracer that records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

struct NoopSpan;

impl Tracer for NoopTracer {
    fn start_span(
        &self,
        _name: &str,
        _kind: SpanKind,
        _input: &str,
        _attributes: BTreeMap<String, String>,
    ) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

impl Span for NoopSpan {
    fn set_duration(&mut self, _duration: Duration) {}
    fn set_token_usage(&mut self, _usage: TokenUsage) {}
    fn set_output(&mut self, _output: &str) {}
    fn record_error(&mut self, _error: &str) {}
    fn record_success(&mut self, _message: &str) {}
    fn end(self: Box<Self>) {}
}

/// Tracer backed by `tracing` spans
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

/// Snapshot of everything recorded on a span
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanRecord {
    pub name: String,
    pub kind: Option<SpanKind>,
    pub input: String,
    pub attributes: BTreeMap<String, String>,
    pub duration: Option<Duration>,
    pub usage: Option<TokenUsage>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub status: Option<String>,
}

struct LogSpan {
    record: SpanRecord,
    span: tracing::Span,
}

impl Tracer for LogTracer {
    fn start_span(
        &self,
        name: &str,
        kind: SpanKind,
        input: &str,
        attributes: BTreeMap<String, String>,
    ) -> Box<dyn Span> {
        let span = tracing::info_span!(
            "rag_span",
            span_name = %name,
            kind = kind.as_str(),
            attributes = ?attributes,
            duration_ms = tracing::field::Empty,
            tokens = tracing::field::Empty,
            status = tracing::field::Empty,
            error = tracing::field::Empty
        );

        Box::new(LogSpan {
            record: SpanRecord {
                name: name.to_string(),
                kind: Some(kind),
                input: input.to_string(),
                attributes,
                ..Default::default()
            },
            span,
        })
    }
}

impl Span for LogSpan {
    fn set_duration(&mut self, duration: Duration) {
        self.record.duration = Some(duration);
    }

    fn set_token_usage(&mut self, usage: TokenUsage) {
        self.record.usage = Some(usage);
    }

    fn set_output(&mut self, output: &str) {
        self.record.output = Some(output.to_string());
    }

    fn record_error(&mut self, error: &str) {
        self.record.error = Some(error.to_string());
    }

    fn record_success(&mut self, message: &str) {
        self.record.status = Some(message.to_string());
    }

    fn end(self: Box<Self>) {
        let LogSpan { record: r, span } = *self;
        let duration_ms = r.duration.map(|d| d.as_millis() as u64).unwrap_or(0);
        let tokens = r.usage.map(|u| u.total).unwrap_or(0);

        span.record("duration_ms", duration_ms);
        span.record("tokens", tokens);
        if let Some(ref status) = r.status {
            span.record("status", status.as_str());
        }
        if let Some(ref error) = r.error {
            span.record("error", error.as_str());
        }

        // The span closes when dropped at the end of this call
        span.in_scope(|| match r.error {
            Some(ref error) => tracing::warn!(span = %r.name, error = %error, "span failed"),
            None => tracing::info!(
                span = %r.name,
                output = r.output.as_deref().unwrap_or(""),
                "span finished"
            ),
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Tracer that keeps finished spans for assertions

    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct RecordingTracer {
        pub finished: Arc<Mutex<Vec<SpanRecord>>>,
    }

    struct RecordingSpan {
        record: SpanRecord,
        sink: Arc<Mutex<Vec<SpanRecord>>>,
    }

    impl Tracer for RecordingTracer {
        fn start_span(
            &self,
            name: &str,
            kind: SpanKind,
            input: &str,
            attributes: BTreeMap<String, String>,
        ) -> Box<dyn Span> {
            Box::new(RecordingSpan {
                record: SpanRecord {
                    name: name.to_string(),
                    kind: Some(kind),
                    input: input.to_string(),
                    attributes,
                    ..Default::default()
                },
                sink: self.finished.clone(),
            })
        }
    }

    impl Span for RecordingSpan {
        fn set_duration(&mut self, duration: Duration) {
            self.record.duration = Some(duration);
        }
        fn set_token_usage(&mut self, usage: TokenUsage) {
            self.record.usage = Some(usage);
        }
        fn set_output(&mut self, output: &str) {
            self.record.output = Some(output.to_string());
        }
        fn record_error(&mut self, error: &str) {
            self.record.error = Some(error.to_string());
        }
        fn record_success(&mut self, message: &str) {
            self.record.status = Some(message.to_string());
        }
        fn end(self: Box<Self>) {
            self.sink.lock().unwrap().push(self.record);
        }
    }
}
