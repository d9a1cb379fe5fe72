//! 周期性报文调度
//!
//! 报文在 `cycle % period == 0` 的周期到期；错过的周期不补发。

use smallvec::SmallVec;

/// 单个周期性报文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub message: &'static str,
    pub period: u64,
}

/// 周期性报文调度器（无状态）
#[derive(Debug, Clone, Default)]
pub struct CadenceScheduler {
    entries: SmallVec<[Cadence; 4]>,
}

impl CadenceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加报文（到期报文按追加顺序输出）
    pub fn with(mut self, message: &'static str, period: u64) -> Self {
        self.entries.push(Cadence { message, period });
        self
    }

    pub fn entries(&self) -> &[Cadence] {
        &self.entries
    }

    /// 本周期到期的报文
    pub fn due(&self, cycle: u64) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.period != 0 && cycle % entry.period == 0)
            .map(|entry| entry.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_periods() {
        let scheduler = CadenceScheduler::new().with("A", 4).with("B", 10);
        assert_eq!(scheduler.due(0).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(scheduler.due(4).collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(scheduler.due(10).collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(scheduler.due(20).collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(scheduler.due(7).next().is_none());
    }

    #[test]
    fn test_due_count_over_window() {
        let scheduler = CadenceScheduler::new().with("A", 4);
        let count = (0..100).filter(|c| scheduler.due(*c).next().is_some()).count();
        assert_eq!(count, 25);
    }
}
