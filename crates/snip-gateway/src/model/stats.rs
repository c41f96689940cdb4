use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub urls: u64,
    pub users: u64,
}
