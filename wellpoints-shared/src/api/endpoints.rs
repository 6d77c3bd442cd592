use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::API_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

pub fn auth_login(base: &str) -> String {
    base_join(base, &format!("{}/auth/login", API_PREFIX))
}

pub fn auth_logout(base: &str) -> String {
    base_join(base, &format!("{}/auth/logout", API_PREFIX))
}

pub fn points(base: &str) -> String {
    base_join(base, &format!("{}/points", API_PREFIX))
}

pub fn points_page(base: &str, page: usize, per_page: usize) -> String {
    base_join(
        base,
        &format!("{}/points?page={}&per_page={}", API_PREFIX, page, per_page),
    )
}

pub fn points_by_id(base: &str, id: i32) -> String {
    base_join(base, &format!("{}/points/{}", API_PREFIX, id))
}

pub fn points_this_week(base: &str, tz: Option<&str>) -> String {
    match tz {
        Some(tz) => base_join(
            base,
            &format!("{}/points-this-week?tz={}", API_PREFIX, enc(tz)),
        ),
        None => base_join(base, &format!("{}/points-this-week", API_PREFIX)),
    }
}
