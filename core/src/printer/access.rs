//! Accessor helpers for printer authors

use crate::host::{Host, HostResult, TypeCode};
use crate::range::ChunkDescriptor;

/// Value of a member, calling it when it is a zero-argument member function
///
/// Falls back to a direct call when the host has no field by that name, which
/// covers overloaded methods whose address cannot be taken.
pub fn member<H: Host>(host: &H, value: &H::Value, name: &str) -> HostResult<H::Value> {
    match host.field(value, name) {
        Ok(field) => {
            if matches!(host.type_code(&field), Ok(TypeCode::Function)) {
                tracing::debug!("member {}() is a function, calling it", name);
                host.call_method(value, name)
            } else {
                Ok(field)
            }
        }
        Err(e) => {
            tracing::debug!("member {} not readable ({}), trying {}()", name, e, name);
            host.call_method(value, name).map_err(|call_error| {
                tracing::debug!("{}() failed: {}", name, call_error);
                e
            })
        }
    }
}

/// Integer value of a member (or zero-argument member function)
pub fn member_int<H: Host>(host: &H, value: &H::Value, name: &str) -> HostResult<i64> {
    host.to_integer(&member(host, value, name)?)
}

/// Build a chunk descriptor from a container's begin/end (and size) members
pub fn container_range<H: Host>(
    host: &H,
    value: &H::Value,
    begin: &str,
    end: &str,
    size: Option<&str>,
) -> HostResult<ChunkDescriptor<H::Value>> {
    let begin = member(host, value, begin)?;
    let end = member(host, value, end)?;
    let size = match size {
        Some(name) => Some(member_int(host, value, name)?.max(0) as u64),
        None => None,
    };
    Ok(ChunkDescriptor { begin, end, size })
}
