use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::user::local_user_entity::LocalUser;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub pubkey: String,
    pub username: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<LocalUser> for UserView {
    fn from(user: LocalUser) -> Self {
        UserView {
            pubkey: user.pubkey,
            username: user.username,
            created_at: user.created_at,
        }
    }
}
