use std::time::Duration;

/// Returns the next wallet polling interval based on how long ago the
/// wallet last reported a change.
pub fn polling_freq(since_last_change: Duration) -> Duration {
    match since_last_change {
        d if d < Duration::from_secs(5) => Duration::from_secs(1),
        d if d < Duration::from_secs(30) => Duration::from_secs(2),
        d if d < Duration::from_secs(120) => Duration::from_secs(5),
        _ => Duration::from_secs(10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polling_backs_off_when_idle() {
        assert_eq!(polling_freq(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(polling_freq(Duration::from_secs(10)), Duration::from_secs(2));
        assert_eq!(polling_freq(Duration::from_secs(60)), Duration::from_secs(5));
        assert_eq!(polling_freq(Duration::from_secs(3600)), Duration::from_secs(10));
    }
}
