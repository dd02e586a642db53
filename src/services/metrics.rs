use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    // ── Authentication ──────────────────────────────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref REGISTRATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_registrations_total",
        "Registration attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref TOKEN_REFRESH_COUNTER: CounterVec = register_counter_vec!(
        "api_token_refresh_total",
        "Access-token refreshes by outcome",
        &["status"]
    ).unwrap();

    pub static ref GATEWAY_REJECTIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_gateway_rejections_total",
        "Requests rejected by the bearer-token gateway, by reason",
        &["reason"]
    ).unwrap();

    // ── File storage ────────────────────────────────────────────────────────
    pub static ref FILE_OPERATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_file_operations_total",
        "Secure file store operations by kind and outcome",
        &["op", "status"]
    ).unwrap();
}

pub fn record_outcome<T, E>(counter: &CounterVec, result: &Result<T, E>) {
    let status = if result.is_ok() { "success" } else { "failure" };
    counter.with_label_values(&[status]).inc();
}
