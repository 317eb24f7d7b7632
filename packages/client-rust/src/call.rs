//! Call envelopes flowing through the client middleware pipeline.

use calltimeout_core::{CallContext, CallOption, CallOptions};

/// Common view of an outgoing call, shared by unary and streaming envelopes.
pub trait RpcCall {
    /// Fully-qualified method name, e.g. `/pkg.Service/Method`.
    fn method(&self) -> &str;

    fn ctx(&self) -> &CallContext;

    fn options(&self) -> &CallOptions;
}

/// A single-request, single-response call.
#[derive(Debug, Clone)]
pub struct UnaryCall<Req> {
    pub ctx: CallContext,
    pub method: String,
    pub request: Req,
    pub options: CallOptions,
}

impl<Req> UnaryCall<Req> {
    /// Creates a call under a background context with no options.
    pub fn new(method: impl Into<String>, request: Req) -> Self {
        Self {
            ctx: CallContext::background(),
            method: method.into(),
            request,
            options: CallOptions::new(),
        }
    }

    #[must_use]
    pub fn with_ctx(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: impl CallOption) -> Self {
        self.options.push(option);
        self
    }
}

impl<Req> RpcCall for UnaryCall<Req> {
    fn method(&self) -> &str {
        &self.method
    }

    fn ctx(&self) -> &CallContext {
        &self.ctx
    }

    fn options(&self) -> &CallOptions {
        &self.options
    }
}

/// Static description of a streaming method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub stream_name: String,
    pub client_streams: bool,
    pub server_streams: bool,
}

impl StreamDescriptor {
    #[must_use]
    pub fn server_streaming(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: false,
            server_streams: true,
        }
    }

    #[must_use]
    pub fn client_streaming(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: true,
            server_streams: false,
        }
    }

    #[must_use]
    pub fn bidi(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: true,
            server_streams: true,
        }
    }
}

/// A request to open a stream.
#[derive(Debug, Clone)]
pub struct StreamCall {
    pub ctx: CallContext,
    pub desc: StreamDescriptor,
    pub method: String,
    pub options: CallOptions,
}

impl StreamCall {
    /// Creates a stream call under a background context with no options.
    pub fn new(desc: StreamDescriptor, method: impl Into<String>) -> Self {
        Self {
            ctx: CallContext::background(),
            desc,
            method: method.into(),
            options: CallOptions::new(),
        }
    }

    #[must_use]
    pub fn with_ctx(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    #[must_use]
    pub fn with_option(mut self, option: impl CallOption) -> Self {
        self.options.push(option);
        self
    }
}

impl RpcCall for StreamCall {
    fn method(&self) -> &str {
        &self.method
    }

    fn ctx(&self) -> &CallContext {
        &self.ctx
    }

    fn options(&self) -> &CallOptions {
        &self.options
    }
}
