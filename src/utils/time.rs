//! Time formatting helpers

use chrono::Duration;

/// Format a duration as `H:MM:SS`, clamping negative values to zero
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Describe a schedule interval the way the scheduler logs it
pub fn describe_interval(secs: u64) -> String {
    format!(
        "{} seconds ({} hours, {} minutes)",
        secs,
        secs / 3600,
        (secs % 3600) / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::seconds(0)), "0:00:00");
        assert_eq!(format_elapsed(Duration::seconds(59)), "0:00:59");
        assert_eq!(format_elapsed(Duration::seconds(7322)), "2:02:02");
        assert_eq!(format_elapsed(Duration::seconds(-5)), "0:00:00");
    }

    #[test]
    fn test_describe_interval() {
        assert_eq!(
            describe_interval(7200),
            "7200 seconds (2 hours, 0 minutes)"
        );
        assert_eq!(describe_interval(90), "90 seconds (0 hours, 1 minutes)");
    }
}
