//! Storage operation metrics.

use std::time::Instant;

/// Records a counter and a latency histogram for one store call.
///
/// Emits `storage_operations_total` and `storage_operation_duration_ms`, both
/// labelled with `backend`, `operation` and `status` (`success` or `error`).
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Records metrics for `result` and passes it through.
pub fn observe<T, E>(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    result: Result<T, E>,
) -> Result<T, E> {
    let status = if result.is_ok() { "success" } else { "error" };
    record_operation_metrics(backend, operation, start, status);
    result
}
