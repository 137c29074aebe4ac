/// Current wall-clock time as unix milliseconds.
///
/// Used for the timestamps that leave the process (snapshots, spawn
/// records, donation summaries). Everything time-sensitive inside the
/// pipeline runs on monotonic [`tokio::time::Instant`]s instead.
pub fn unix_now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
