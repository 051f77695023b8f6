//! Conversion of metrics into human readable labels

/// Formats an amount of seconds as `HH:MM:SS`
///
/// Hours are not wrapped around, so a duration of more than a day keeps growing the hours part
pub fn elapsed_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    let seconds = seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Formats a ratio between 0 and 1 as a percentage
pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.)
}
