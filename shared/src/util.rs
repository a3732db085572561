/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate an opaque record id.
///
/// UUID v4 without hyphens, so ids pass the strict identifier format
/// enforced at the engine boundary.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
