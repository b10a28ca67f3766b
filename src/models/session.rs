use serde::{Deserialize, Serialize};

/// One continuous interval of user activity on a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    /// Server timestamp, RFC 3339
    #[serde(default)]
    pub start_time: Option<String>,
    /// Absent while the session is open
    #[serde(default)]
    pub end_time: Option<String>,
    /// Whole seconds; absent while the session is open
    #[serde(default)]
    pub duration: Option<u64>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// A user's sessions for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityReport {
    pub user_id: String,
    pub date: chrono::NaiveDate,
    pub sessions: Vec<Session>,
    pub total_duration_secs: u64,
    /// `HH:MM:SS`
    pub total_duration: String,
}

impl ActivityReport {
    pub fn new(user_id: String, date: chrono::NaiveDate, sessions: Vec<Session>) -> Self {
        let total_duration_secs = sessions.iter().filter_map(|s| s.duration).sum();
        Self {
            user_id,
            date,
            sessions,
            total_duration_secs,
            total_duration: format_duration(total_duration_secs),
        }
    }
}

/// Formats seconds as zero-padded `HH:MM:SS`; hours are not wrapped at 24
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
