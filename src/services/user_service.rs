use serde::Deserialize;
use validator::Validate;

use crate::database::client::Db;
use crate::entities::user::local_user_entity::{LocalUser, LocalUserDbService};
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::utils::validate_utils::{is_valid_pubkey, trim_string_opt};

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserInput {
    #[serde(default, deserialize_with = "trim_string_opt")]
    #[validate(length(min = 2, max = 40, message = "Username must have 2 to 40 characters"))]
    pub username: Option<String>,
}

pub struct UserService<'a> {
    users_repository: LocalUserDbService<'a>,
    ctx: &'a Ctx,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            users_repository: LocalUserDbService { db, ctx },
            ctx,
        }
    }

    /// Registers the caller. Calling it again only updates a given username.
    pub async fn register(&self, data: RegisterUserInput) -> CtxResult<LocalUser> {
        data.validate()?;
        let pubkey = self.ctx.user_pubkey()?;
        self.users_repository.register(&pubkey, data.username).await
    }

    pub async fn get(&self, pubkey: &str) -> CtxResult<LocalUser> {
        let pubkey = pubkey.trim().to_lowercase();
        if !is_valid_pubkey(&pubkey) {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "Invalid public key".to_string(),
            }));
        }
        self.users_repository.get(&pubkey).await
    }
}
