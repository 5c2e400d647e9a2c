use chrono::{DateTime, Local, NaiveDateTime};
use once_cell::sync::Lazy;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Runs a `!Send` controller future on the GTK main context. The caller must have
/// entered [`RUNTIME`] on the main thread so network IO and timers have a reactor.
#[cfg(feature = "gtk")]
pub fn spawn_local<F>(fut: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    glib::MainContext::default().spawn_local(fut);
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Formats a backend timestamp as local `HH:MM`. Accepts RFC 3339 and naive ISO strings.
pub fn format_clock(ts: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Local).format("%H:%M").to_string());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%H:%M").to_string())
}

/// Shortens `text` to `max` characters, appending `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_scheme_and_strips_slash() {
        assert_eq!(normalize_url(" desk.example.com/ "), "https://desk.example.com");
        assert_eq!(normalize_url("http://localhost:8000"), "http://localhost:8000");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn naive_timestamps_keep_wall_clock() {
        assert_eq!(format_clock("2024-05-01T09:05:33.123").as_deref(), Some("09:05"));
        assert_eq!(format_clock("yesterday"), None);
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let long = "가".repeat(60);
        let cut = preview(&long, 50);
        assert_eq!(cut.chars().count(), 53);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("short", 50), "short");
    }
}
