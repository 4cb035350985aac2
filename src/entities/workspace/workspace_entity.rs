use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Id, Thing};
use tracing::info;

use crate::access::workspace_role::WorkspaceRole;
use crate::database::client::Db;
use crate::entities::user::local_user_entity;
use crate::entities::workspace::workspace_budget_entity::WorkspaceBudgetDbService;
use crate::entities::workspace::workspace_member_entity::WorkspaceMemberDbService;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::middleware::utils::db_utils::{
    check_transaction_custom_error, get_entity, with_not_found_err, IdentIdName,
};

pub const TABLE_NAME: &str = "workspace";
const USER_TABLE: &str = local_user_entity::TABLE_NAME;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Thing,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub owner: Thing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct WorkspaceCreate {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

pub struct WorkspaceDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> WorkspaceDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS name ON TABLE {TABLE_NAME} TYPE string ASSERT string::len(string::trim($value)) > 0;
    DEFINE FIELD IF NOT EXISTS description ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS website ON TABLE {TABLE_NAME} TYPE option<string>;
    DEFINE FIELD IF NOT EXISTS owner ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() READONLY;
    DEFINE FIELD IF NOT EXISTS updated_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() VALUE time::now();
    DEFINE INDEX IF NOT EXISTS workspace_name_idx ON TABLE {TABLE_NAME} COLUMNS name UNIQUE;
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate workspace");

        Ok(())
    }

    pub async fn get(&self, workspace_id: &Thing) -> CtxResult<Workspace> {
        let opt =
            get_entity::<Workspace>(self.db, TABLE_NAME, &IdentIdName::Id(workspace_id.clone()))
                .await?;
        with_not_found_err(opt, self.ctx, "Workspace")
    }

    pub async fn name_exists(&self, name: &str) -> CtxResult<bool> {
        let ident = IdentIdName::ColumnIdent {
            column: "name".to_string(),
            val: name.to_string(),
        };
        let opt = get_entity::<Workspace>(self.db, TABLE_NAME, &ident).await?;
        Ok(opt.is_some())
    }

    /// Creates the workspace, its OWNER membership and a zeroed budget together.
    pub async fn create(&self, owner: &Thing, data: WorkspaceCreate) -> CtxResult<Workspace> {
        let workspace_id = Thing::from((TABLE_NAME, Id::ulid()));
        let members = WorkspaceMemberDbService {
            db: self.db,
            ctx: self.ctx,
        };
        let budgets = WorkspaceBudgetDbService {
            db: self.db,
            ctx: self.ctx,
        };

        let mut query = self.db.query("BEGIN TRANSACTION;");
        query = query
            .query(
                "CREATE $_ws_id SET name = $_ws_name, description = $_ws_description,
                    website = $_ws_website, owner = $_ws_owner;",
            )
            .bind(("_ws_id", workspace_id.clone()))
            .bind(("_ws_name", data.name))
            .bind(("_ws_description", data.description))
            .bind(("_ws_website", data.website))
            .bind(("_ws_owner", owner.clone()));
        query = members.build_create_query(query, &workspace_id, owner, WorkspaceRole::Owner);
        query = budgets.build_create_query(query, &workspace_id);
        query = query.query("COMMIT TRANSACTION;");

        let mut res = query.await?;
        check_transaction_custom_error(
            &mut res,
            AppError::Conflict {
                description: "Workspace name already exists".to_string(),
            },
        )
        .map_err(|e| self.ctx.to_ctx_error(e))?;

        info!(workspace = %workspace_id, owner = %owner, "workspace created");
        self.get(&workspace_id).await
    }
}
