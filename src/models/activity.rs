use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub trip_id: String,
    pub title: String,
    pub occurs_at: DateTime<Utc>,
}
