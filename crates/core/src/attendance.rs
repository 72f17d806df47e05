use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    MorningEntry,
    MorningExit,
    AfternoonEntry,
    AfternoonExit,
}

impl TimeSlot {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "morning-entry" | "morning_entry" => Some(Self::MorningEntry),
            "morning-exit" | "morning_exit" => Some(Self::MorningExit),
            "afternoon-entry" | "afternoon_entry" => Some(Self::AfternoonEntry),
            "afternoon-exit" | "afternoon_exit" => Some(Self::AfternoonExit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimes {
    pub entry_time: Option<String>,
    pub exit_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceDay {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub morning: SessionTimes,
    pub afternoon: SessionTimes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub present_percentage: f64,
}

pub fn summarize(days: &[AttendanceDay]) -> AttendanceSummary {
    let total = days.len();
    let present = days
        .iter()
        .filter(|day| day.status == AttendanceStatus::Present)
        .count();
    let present_percentage = if total == 0 {
        0.0
    } else {
        (present as f64 / total as f64 * 1000.0).round() / 10.0
    };

    AttendanceSummary {
        total,
        present,
        absent: total - present,
        present_percentage,
    }
}

/// One student's day-by-day attendance, at most one entry per date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceLedger {
    pub student: String,
    pub days: Vec<AttendanceDay>,
}

impl AttendanceLedger {
    pub fn new(student: &str) -> Self {
        Self {
            student: student.to_string(),
            days: Vec::new(),
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&AttendanceDay> {
        self.days.iter().find(|day| day.date == date)
    }

    /// Replaces any existing entry for `date`. A present mark stamps the
    /// morning entry with `time`.
    pub fn mark(&mut self, date: NaiveDate, status: AttendanceStatus, time: &str) {
        let record = AttendanceDay {
            date,
            status,
            morning: SessionTimes {
                entry_time: (status == AttendanceStatus::Present).then(|| time.to_string()),
                exit_time: None,
            },
            afternoon: SessionTimes::default(),
        };

        match self.days.iter_mut().find(|day| day.date == date) {
            Some(existing) => *existing = record,
            None => self.days.push(record),
        }
    }

    /// Returns false when no entry exists for `date`.
    pub fn record_time(&mut self, date: NaiveDate, slot: TimeSlot, time: &str) -> bool {
        let Some(day) = self.days.iter_mut().find(|day| day.date == date) else {
            return false;
        };

        let target = match slot {
            TimeSlot::MorningEntry => &mut day.morning.entry_time,
            TimeSlot::MorningExit => &mut day.morning.exit_time,
            TimeSlot::AfternoonEntry => &mut day.afternoon.entry_time,
            TimeSlot::AfternoonExit => &mut day.afternoon.exit_time,
        };
        *target = Some(time.to_string());
        true
    }

    pub fn summary(&self) -> AttendanceSummary {
        summarize(&self.days)
    }

    /// Demo ledger for the first four school days of a month.
    pub fn demo(year: i32, month: u32) -> Self {
        let rows: [(u32, Option<[&str; 4]>); 4] = [
            (2, Some(["7:45 AM", "8:30 AM", "2:30 PM", "3:30 PM"])),
            (3, Some(["7:43 AM", "8:32 AM", "2:28 PM", "3:32 PM"])),
            (4, None),
            (5, Some(["7:50 AM", "8:28 AM", "2:25 PM", "3:28 PM"])),
        ];

        let days = rows
            .iter()
            .filter_map(|(day, times)| {
                let date = NaiveDate::from_ymd_opt(year, month, *day)?;
                Some(match times {
                    Some([m_in, m_out, a_in, a_out]) => AttendanceDay {
                        date,
                        status: AttendanceStatus::Present,
                        morning: SessionTimes {
                            entry_time: Some(m_in.to_string()),
                            exit_time: Some(m_out.to_string()),
                        },
                        afternoon: SessionTimes {
                            entry_time: Some(a_in.to_string()),
                            exit_time: Some(a_out.to_string()),
                        },
                    },
                    None => AttendanceDay {
                        date,
                        status: AttendanceStatus::Absent,
                        morning: SessionTimes::default(),
                        afternoon: SessionTimes::default(),
                    },
                })
            })
            .collect();

        Self {
            student: "Divyesh".to_string(),
            days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[test]
    fn summary_rounds_to_one_decimal() {
        let mut ledger = AttendanceLedger::new("Karan");
        ledger.mark(date(1), AttendanceStatus::Present, "7:45 AM");
        ledger.mark(date(2), AttendanceStatus::Absent, "7:45 AM");
        ledger.mark(date(3), AttendanceStatus::Present, "7:45 AM");

        let summary = ledger.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.present_percentage, 66.7);
    }

    #[test]
    fn empty_summary_is_zero_not_nan() {
        assert_eq!(summarize(&[]).present_percentage, 0.0);
    }

    #[test]
    fn mark_replaces_existing_day() {
        let mut ledger = AttendanceLedger::demo(2024, 6);
        ledger.mark(date(4), AttendanceStatus::Present, "8:01 AM");

        assert_eq!(ledger.days.len(), 4);
        let day = ledger.day(date(4)).unwrap();
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.morning.entry_time.as_deref(), Some("8:01 AM"));
        assert_eq!(ledger.summary().present, 4);
    }

    #[test]
    fn record_time_needs_an_existing_day() {
        let mut ledger = AttendanceLedger::demo(2024, 6);
        assert!(ledger.record_time(date(2), TimeSlot::AfternoonExit, "3:40 PM"));
        assert_eq!(
            ledger.day(date(2)).unwrap().afternoon.exit_time.as_deref(),
            Some("3:40 PM")
        );
        assert!(!ledger.record_time(date(20), TimeSlot::MorningEntry, "7:40 AM"));
        assert_eq!(TimeSlot::parse("morning-exit"), Some(TimeSlot::MorningExit));
    }
}
