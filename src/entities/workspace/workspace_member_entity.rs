use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::method::Query;
use surrealdb::sql::{Id, Thing};

use crate::access::workspace_role::WorkspaceRole;
use crate::database::client::Db;
use crate::entities::bounty::bounty_entity;
use crate::entities::bounty::bounty_status::BountyStatus;
use crate::entities::user::local_user_entity;
use crate::entities::workspace::workspace_entity;
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::middleware::utils::db_utils::{
    check_transaction_custom_error, with_not_found_err, THROW_PREFIX_CONFLICT,
    THROW_PREFIX_NOT_FOUND,
};

pub const TABLE_NAME: &str = "workspace_member";
const USER_TABLE: &str = local_user_entity::TABLE_NAME;
const WORKSPACE_TABLE: &str = workspace_entity::TABLE_NAME;
const BOUNTY_TABLE: &str = bounty_entity::TABLE_NAME;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub id: Thing,
    pub workspace: Thing,
    pub user: Thing,
    pub role: WorkspaceRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub struct WorkspaceMemberDbService<'a> {
    pub db: &'a Db,
    pub ctx: &'a Ctx,
}

impl<'a> WorkspaceMemberDbService<'a> {
    pub async fn mutate_db(&self) -> Result<(), AppError> {
        let sql = format!("
    DEFINE TABLE IF NOT EXISTS {TABLE_NAME} SCHEMAFULL;
    DEFINE FIELD IF NOT EXISTS workspace ON TABLE {TABLE_NAME} TYPE record<{WORKSPACE_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS user ON TABLE {TABLE_NAME} TYPE record<{USER_TABLE}> READONLY;
    DEFINE FIELD IF NOT EXISTS role ON TABLE {TABLE_NAME} TYPE string ASSERT $value INSIDE ['OWNER', 'ADMIN', 'CONTRIBUTOR', 'VIEWER'];
    DEFINE FIELD IF NOT EXISTS created_at ON TABLE {TABLE_NAME} TYPE option<datetime> DEFAULT time::now() READONLY;
    DEFINE INDEX IF NOT EXISTS workspace_user_idx ON TABLE {TABLE_NAME} COLUMNS workspace, user UNIQUE;
    DEFINE INDEX IF NOT EXISTS user_idx ON TABLE {TABLE_NAME} COLUMNS user;
    ");
        let mutation = self.db.query(sql).await?;

        mutation.check().expect("should mutate workspace_member");

        Ok(())
    }

    pub async fn find(&self, workspace: &Thing, user: &Thing) -> CtxResult<Option<WorkspaceMember>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE workspace = $workspace AND user = $user LIMIT 1;"
            ))
            .bind(("workspace", workspace.clone()))
            .bind(("user", user.clone()))
            .await?;
        Ok(res.take::<Option<WorkspaceMember>>(0)?)
    }

    pub async fn get(&self, workspace: &Thing, user: &Thing) -> CtxResult<WorkspaceMember> {
        let opt = self.find(workspace, user).await?;
        with_not_found_err(opt, self.ctx, "Workspace member")
    }

    pub async fn get_role(&self, workspace: &Thing, user: &Thing) -> CtxResult<Option<WorkspaceRole>> {
        Ok(self.find(workspace, user).await?.map(|m| m.role))
    }

    pub async fn list(&self, workspace: &Thing) -> CtxResult<Vec<WorkspaceMember>> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM {TABLE_NAME} WHERE workspace = $workspace ORDER BY created_at ASC;"
            ))
            .bind(("workspace", workspace.clone()))
            .await?;
        Ok(res.take::<Vec<WorkspaceMember>>(0)?)
    }

    pub fn build_create_query<'b>(
        &self,
        query: Query<'b, Any>,
        workspace: &Thing,
        user: &Thing,
        role: WorkspaceRole,
    ) -> Query<'b, Any> {
        query
            .query(
                "CREATE $_member_id SET workspace = $_member_workspace, user = $_member_user, role = $_member_role;",
            )
            .bind(("_member_id", Thing::from((TABLE_NAME, Id::ulid()))))
            .bind(("_member_workspace", workspace.clone()))
            .bind(("_member_user", user.clone()))
            .bind(("_member_role", role.to_string()))
    }

    pub async fn create(
        &self,
        workspace: &Thing,
        user: &Thing,
        role: WorkspaceRole,
    ) -> CtxResult<WorkspaceMember> {
        let mut query = self.db.query("BEGIN TRANSACTION;");
        query = self.build_create_query(query, workspace, user, role);
        query = query.query("COMMIT TRANSACTION;");
        let mut res = query.await?;
        check_transaction_custom_error(
            &mut res,
            AppError::Conflict {
                description: "User is already a member".to_string(),
            },
        )
        .map_err(|e| self.ctx.to_ctx_error(e))?;
        self.get(workspace, user).await
    }

    pub async fn update_role(
        &self,
        workspace: &Thing,
        user: &Thing,
        role: WorkspaceRole,
    ) -> CtxResult<WorkspaceMember> {
        let mut res = self
            .db
            .query(format!(
                "UPDATE {TABLE_NAME} SET role = $role WHERE workspace = $workspace AND user = $user;"
            ))
            .bind(("workspace", workspace.clone()))
            .bind(("user", user.clone()))
            .bind(("role", role.to_string()))
            .await?;
        let updated: Vec<WorkspaceMember> = res.take(0)?;
        with_not_found_err(updated.into_iter().next(), self.ctx, "Workspace member")
    }

    /// Removes a membership unless the member still works on an active bounty.
    pub async fn delete(&self, workspace: &Thing, user: &Thing) -> CtxResult<()> {
        let active = [BountyStatus::Assigned, BountyStatus::InReview]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let sql = format!("
            BEGIN TRANSACTION;
            LET $member = (SELECT * FROM {TABLE_NAME} WHERE workspace = $workspace AND user = $user LIMIT 1)[0];
            IF $member == NONE {{ THROW \"{THROW_PREFIX_NOT_FOUND}Workspace member\" }};
            IF count((SELECT id FROM {BOUNTY_TABLE} WHERE workspace = $workspace AND assignee = $user
                AND status INSIDE $active AND deleted_at = NONE)) > 0 {{
                THROW \"{THROW_PREFIX_CONFLICT}Member is assigned to an active bounty\"
            }};
            DELETE $member.id;
            COMMIT TRANSACTION;
        ");
        let mut res = self
            .db
            .query(sql)
            .bind(("workspace", workspace.clone()))
            .bind(("user", user.clone()))
            .bind(("active", active))
            .await?;
        check_transaction_custom_error(
            &mut res,
            AppError::Conflict {
                description: "Membership was modified concurrently".to_string(),
            },
        )
        .map_err(|e| self.ctx.to_ctx_error(e))
    }
}
