pub fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

pub fn normalize_ai_count(value: Option<i64>) -> usize {
    value.unwrap_or(0).clamp(0, 3) as usize
}

pub fn normalize_time_limit_ms(value: Option<i64>) -> Option<u64> {
    value.map(|seconds| seconds.clamp(10, 600) as u64 * 1_000)
}

pub fn player_order_key(player_id: &str) -> u64 {
    player_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}
