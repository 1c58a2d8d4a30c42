//! `Server-Timing` header breakdown
//!
//! The application server reports where solve time went, e.g.
//! `compute;dur=812.4, network;dur=35`. Parsing is lenient: an entry
//! without a usable duration is skipped.

/// One named duration
#[derive(Debug, Clone, PartialEq)]
pub struct TimingEntry {
    /// Metric name
    pub name: String,
    /// Duration in milliseconds
    pub duration_ms: f64,
}

/// Parsed `Server-Timing` header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerTiming {
    entries: Vec<TimingEntry>,
}

impl ServerTiming {
    /// Parse a header value
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let entries = header
            .split(',')
            .filter_map(|metric| {
                let mut parts = metric.split(';');
                let name = parts.next()?.trim();
                if name.is_empty() {
                    return None;
                }
                let duration_ms = parts.find_map(|param| {
                    let (key, value) = param.split_once('=')?;
                    if key.trim().eq_ignore_ascii_case("dur") {
                        value.trim().trim_matches('"').parse::<f64>().ok()
                    } else {
                        None
                    }
                })?;
                Some(TimingEntry {
                    name: name.to_string(),
                    duration_ms,
                })
            })
            .collect();
        Self { entries }
    }

    /// Entries in header order
    pub fn iter(&self) -> impl Iterator<Item = &TimingEntry> {
        self.entries.iter()
    }

    /// Sum of all durations
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.entries.iter().map(|e| e.duration_ms).sum()
    }

    /// Whether nothing parsed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
