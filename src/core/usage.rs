use crate::api::UsageResponse;

/// Latest usage reading from the gateway. Replaced wholesale on every
/// fetch; no history is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub tokens_used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub exceeded: bool,
}

/// Visual tier for the usage meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    Normal,
    Warning,
    Danger,
}

impl UsageSnapshot {
    /// Unclamped percentage of the limit; a zero limit reads as 0%.
    fn percent_raw(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.tokens_used as f64 / self.limit as f64 * 100.0
        }
    }

    /// Display percentage, clamped at 100.
    pub fn percent(&self) -> f64 {
        self.percent_raw().min(100.0)
    }

    /// Fill ratio for gauge widgets, in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        (self.percent() / 100.0).clamp(0.0, 1.0)
    }

    /// Tier thresholds apply to the unclamped percentage, so overruns land
    /// on Danger rather than folding back into Warning.
    pub fn level(&self) -> UsageLevel {
        let percent = self.percent_raw();
        if percent >= 100.0 {
            UsageLevel::Danger
        } else if percent >= 90.0 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            group_thousands(self.tokens_used),
            group_thousands(self.limit)
        )
    }
}

impl From<UsageResponse> for UsageSnapshot {
    fn from(response: UsageResponse) -> Self {
        Self {
            tokens_used: response.total_tokens_used,
            limit: response.limit,
            remaining: response.remaining,
            exceeded: response.exceeded,
        }
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tokens_used: u64, limit: u64) -> UsageSnapshot {
        UsageSnapshot {
            tokens_used,
            limit,
            ..UsageSnapshot::default()
        }
    }

    #[test]
    fn overrun_clamps_to_danger() {
        let usage = snapshot(12_000, 10_000);
        assert_eq!(usage.percent(), 100.0);
        assert_eq!(usage.level(), UsageLevel::Danger);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(snapshot(8_999, 10_000).level(), UsageLevel::Normal);
        assert_eq!(snapshot(9_000, 10_000).level(), UsageLevel::Warning);
        assert_eq!(snapshot(10_000, 10_000).level(), UsageLevel::Danger);
    }

    #[test]
    fn zero_limit_reads_as_empty() {
        let usage = snapshot(500, 0);
        assert_eq!(usage.percent(), 0.0);
        assert_eq!(usage.level(), UsageLevel::Normal);
    }

    #[test]
    fn labels_group_thousands() {
        assert_eq!(snapshot(1_234_567, 10_000_000).label(), "1,234,567 / 10,000,000");
        assert_eq!(snapshot(42, 100).label(), "42 / 100");
    }
}
