use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{date_input, PageMeta, PageQuery};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: String,
    pub action: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub username: String,
    pub action: String,
    pub ip_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogPage {
    pub logs: Vec<ActivityLog>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    #[serde(deserialize_with = "date_input::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "date_input::deserialize_end_of_day")]
    pub end_date: DateTime<Utc>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl DateRangeQuery {
    pub fn paging(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}
