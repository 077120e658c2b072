//! Display helpers for the host UI

/// `m:ss`, e.g. 83.4 -> "1:23". Negative or non-finite input shows "0:00".
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Band label, e.g. 125 -> "125Hz", 2000 -> "2kHz"
pub fn format_frequency(hz: f32) -> String {
    if hz >= 1000.0 {
        format!("{}kHz", hz / 1000.0)
    } else {
        format!("{}Hz", hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonata_dsp::EQ_BANDS;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(83.4), "1:23");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-4.0), "0:00");
    }

    #[test]
    fn test_format_frequency() {
        let labels: Vec<String> = EQ_BANDS.iter().map(|&f| format_frequency(f)).collect();
        assert_eq!(
            labels,
            vec![
                "32Hz", "64Hz", "125Hz", "250Hz", "500Hz", "1kHz", "2kHz", "4kHz", "8kHz", "16kHz"
            ]
        );
    }
}
