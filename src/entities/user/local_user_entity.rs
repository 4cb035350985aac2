use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::database::client::Db;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxError, CtxResult};
use crate::middleware::utils::db_utils::{
    get_entity, is_unique_index_violation, with_not_found_err, IdentIdName,
};

pub const TABLE_NAME: &str = "local_user";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub pubkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub struct LocalUserDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> LocalUserDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS pubkey ON TABLE {TABLE_NAME} TYPE string READONLY;
    DEFINE FIELD IF NOT EXISTS username ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() READONLY;
    DEFINE INDEX IF NOT EXISTS local_user_pubkey_idx ON TABLE {TABLE_NAME} COLUMNS pubkey UNIQUE;
    DEFINE INDEX IF NOT EXISTS local_user_username_idx ON TABLE {TABLE_NAME} COLUMNS username UNIQUE;
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate local_user");

        Ok(())
    }

    /// Users are keyed by their public key.
    pub fn get_user_id(pubkey: &str) -> Thing {
        Thing::from((TABLE_NAME, pubkey))
    }

    pub async fn find(&self, pubkey: &str) -> CtxResult<Option<LocalUser>> {
        let ident = IdentIdName::Id(Self::get_user_id(pubkey));
        get_entity::<LocalUser>(self.db, TABLE_NAME, &ident).await
    }

    pub async fn get(&self, pubkey: &str) -> CtxResult<LocalUser> {
        let opt = self.find(pubkey).await?;
        with_not_found_err(opt, self.ctx, "User")
    }

    pub async fn exists(&self, pubkey: &str) -> CtxResult<bool> {
        Ok(self.find(pubkey).await?.is_some())
    }

    /// Creates the user or, when it exists already, updates a given username.
    pub async fn register(&self, pubkey: &str, username: Option<String>) -> CtxResult<LocalUser> {
        let existing = self.find(pubkey).await?;
        let qry = match existing {
            Some(user) if username.is_none() || user.username == username => return Ok(user),
            Some(_) => "UPDATE ONLY $id SET username = $username;",
            None => "CREATE ONLY $id SET pubkey = $pubkey, username = $username;",
        };

        let res = self
            .db
            .query(qry)
            .bind(("id", Self::get_user_id(pubkey)))
            .bind(("pubkey", pubkey.to_string()))
            .bind(("username", username))
            .await
            .map_err(CtxError::from(self.ctx))?;

        let mut res = res.check().map_err(|e| {
            if is_unique_index_violation(&e) {
                self.ctx.to_ctx_error(AppError::Conflict {
                    description: "Username is already taken".to_string(),
                })
            } else {
                CtxError::from(self.ctx)(e)
            }
        })?;
        let user: Option<LocalUser> = res.take(0)?;
        with_not_found_err(user, self.ctx, "User")
    }
}
