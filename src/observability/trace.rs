//! W3C trace context propagation.
//!
//! # Responsibilities
//! - Extract `traceparent` from incoming requests
//! - Mint a root context when a request arrives without one
//! - Inject a child context into the forwarded request
//!
//! # Design Decisions
//! - Only the `traceparent` header is handled; `tracestate` passes through
//!   the proxy untouched like any other header
//! - The sampled flag is propagated verbatim, never decided here

use axum::http::{HeaderMap, HeaderValue};

/// Header name defined by the W3C Trace Context spec.
pub const TRACEPARENT: &str = "traceparent";

/// Parsed `traceparent` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: u128,
    pub parent_id: u64,
    pub sampled: bool,
}

impl TraceContext {
    /// Fresh context for a request that arrived without one.
    pub fn new_root() -> Self {
        Self {
            trace_id: nonzero_u128(),
            parent_id: nonzero_u64(),
            sampled: true,
        }
    }

    /// New span under the same trace.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            parent_id: nonzero_u64(),
            sampled: self.sampled,
        }
    }

    /// Read and parse the header, if present and well formed.
    pub fn extract(headers: &HeaderMap) -> Option<Self> {
        Self::parse(headers.get(TRACEPARENT)?.to_str().ok()?)
    }

    /// Parse a `version-traceid-parentid-flags` value. Zero ids and the
    /// reserved version `ff` are rejected per the W3C rules.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let parent_id = parts.next()?;
        let flags = parts.next()?;
        if version.len() != 2 || trace_id.len() != 32 || parent_id.len() != 16 || flags.len() != 2 {
            return None;
        }
        if version.eq_ignore_ascii_case("ff") {
            return None;
        }
        u8::from_str_radix(version, 16).ok()?;
        // Version 00 defines exactly four fields; later versions may append.
        if version == "00" && parts.next().is_some() {
            return None;
        }
        let trace_id = u128::from_str_radix(trace_id, 16).ok()?;
        let parent_id = u64::from_str_radix(parent_id, 16).ok()?;
        let flags = u8::from_str_radix(flags, 16).ok()?;
        if trace_id == 0 || parent_id == 0 {
            return None;
        }
        Some(Self {
            trace_id,
            parent_id,
            sampled: flags & 0x01 == 0x01,
        })
    }

    pub fn header_value(&self) -> String {
        format!(
            "00-{:032x}-{:016x}-{:02x}",
            self.trace_id,
            self.parent_id,
            u8::from(self.sampled)
        )
    }

    /// Write the context into `headers`, replacing any existing value.
    pub fn inject(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            headers.insert(TRACEPARENT, value);
        }
    }
}

fn nonzero_u64() -> u64 {
    rand::random::<u64>().max(1)
}

fn nonzero_u128() -> u128 {
    uuid::Uuid::new_v4().as_u128().max(1)
}
