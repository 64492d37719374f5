use chrono::{DateTime, Utc};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as unix seconds, the unit every stored timestamp uses.
pub fn now_ts() -> i64 {
    utc_now().timestamp()
}
