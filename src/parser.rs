use regex::Regex;
use std::sync::OnceLock;

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"))
}

/// Reads the kilometre value out of a location block such as
/// `"59939 Olsberg (12 km)"`. The rightmost digit run wins, so the postal
/// code in front is skipped.
pub fn extract_distance_km(text: &str) -> Option<u32> {
    digit_runs()
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
