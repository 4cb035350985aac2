use serde::Deserialize;
use surrealdb::sql::Thing;
use tracing::info;
use validator::Validate;

use crate::access::workspace_role::{has_at_least_role, member_has_at_least_role, WorkspaceRole};
use crate::database::client::Db;
use crate::entities::user::local_user_entity::LocalUserDbService;
use crate::entities::workspace::workspace_budget_entity::{WorkspaceBudget, WorkspaceBudgetDbService};
use crate::entities::workspace::workspace_entity::{Workspace, WorkspaceCreate, WorkspaceDbService};
use crate::entities::workspace::workspace_member_entity::{WorkspaceMember, WorkspaceMemberDbService};
use crate::middleware::ctx::Ctx;
use crate::middleware::error::{AppError, CtxResult};
use crate::utils::validate_utils::{
    lowercase_string, trim_string, trim_string_opt, validate_pubkey,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceInput {
    #[serde(deserialize_with = "trim_string")]
    #[validate(length(min = 1, max = 100, message = "Name must have 1 to 100 characters"))]
    pub name: String,
    #[serde(default, deserialize_with = "trim_string_opt")]
    #[validate(length(max = 2000, message = "Max 2000 characters"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trim_string_opt")]
    #[validate(url(message = "Website must be a valid url"))]
    pub website: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberInput {
    #[serde(deserialize_with = "lowercase_string")]
    #[validate(custom(function = validate_pubkey))]
    pub user_pubkey: String,
    pub role: WorkspaceRole,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberInput {
    pub role: WorkspaceRole,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DepositInput {
    #[validate(range(min = 1, max = 2_100_000_000_000_000_u64, message = "Amount must be a positive integer"))]
    pub amount: u64,
}

/// Fails with Forbidden unless the user holds at least `required` in the workspace.
pub(crate) async fn require_role(
    members: &WorkspaceMemberDbService<'_>,
    ctx: &Ctx,
    workspace: &Thing,
    user: &Thing,
    required: WorkspaceRole,
) -> CtxResult<WorkspaceRole> {
    match members.get_role(workspace, user).await? {
        Some(role) if has_at_least_role(role, required) => Ok(role),
        _ => Err(ctx.to_ctx_error(AppError::Forbidden)),
    }
}

pub struct WorkspaceService<'a> {
    workspaces_repository: WorkspaceDbService<'a>,
    members_repository: WorkspaceMemberDbService<'a>,
    budgets_repository: WorkspaceBudgetDbService<'a>,
    users_repository: LocalUserDbService<'a>,
    ctx: &'a Ctx,
}

impl<'a> WorkspaceService<'a> {
    pub fn new(db: &'a Db, ctx: &'a Ctx) -> Self {
        Self {
            workspaces_repository: WorkspaceDbService { db, ctx },
            members_repository: WorkspaceMemberDbService { db, ctx },
            budgets_repository: WorkspaceBudgetDbService { db, ctx },
            users_repository: LocalUserDbService { db, ctx },
            ctx,
        }
    }

    fn caller(&self) -> CtxResult<Thing> {
        let pubkey = self.ctx.user_pubkey()?;
        Ok(LocalUserDbService::get_user_id(&pubkey))
    }

    pub async fn create(&self, data: CreateWorkspaceInput) -> CtxResult<Workspace> {
        data.validate()?;
        let pubkey = self.ctx.user_pubkey()?;
        // the creator becomes a registered user if it was not one yet
        let owner = self.users_repository.register(&pubkey, None).await?;
        let owner_id = LocalUserDbService::get_user_id(&owner.pubkey);

        if self.workspaces_repository.name_exists(&data.name).await? {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: "Workspace name already exists".to_string(),
            }));
        }

        self.workspaces_repository
            .create(
                &owner_id,
                WorkspaceCreate {
                    name: data.name,
                    description: data.description,
                    website: data.website,
                },
            )
            .await
    }

    pub async fn get(&self, workspace_id: &Thing) -> CtxResult<Workspace> {
        self.ctx.user_pubkey()?;
        self.workspaces_repository.get(workspace_id).await
    }

    pub async fn members(&self, workspace_id: &Thing) -> CtxResult<Vec<WorkspaceMember>> {
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Viewer,
        )
        .await?;
        self.members_repository.list(workspace_id).await
    }

    pub async fn add_member(
        &self,
        workspace_id: &Thing,
        data: AddMemberInput,
    ) -> CtxResult<WorkspaceMember> {
        data.validate()?;
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        let caller_role = require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Admin,
        )
        .await?;

        if data.role == WorkspaceRole::Owner {
            return Err(self.ctx.to_ctx_error(AppError::Validation {
                description: "Owner role cannot be assigned".to_string(),
            }));
        }
        if data.role > caller_role {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "Cannot grant a role above your own".to_string(),
            }));
        }
        if !self.users_repository.exists(&data.user_pubkey).await? {
            return Err(self.ctx.to_ctx_error(AppError::EntityFailIdNotFound {
                ident: "User".to_string(),
            }));
        }
        let user = LocalUserDbService::get_user_id(&data.user_pubkey);
        if self.members_repository.find(workspace_id, &user).await?.is_some() {
            return Err(self.ctx.to_ctx_error(AppError::Conflict {
                description: "User is already a member".to_string(),
            }));
        }

        let member = self
            .members_repository
            .create(workspace_id, &user, data.role)
            .await?;
        info!(workspace = %workspace_id, user = %user, role = %data.role, "member added");
        Ok(member)
    }

    pub async fn update_member(
        &self,
        workspace_id: &Thing,
        user_pubkey: &str,
        data: UpdateMemberInput,
    ) -> CtxResult<WorkspaceMember> {
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        let caller_role = require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Admin,
        )
        .await?;

        let user = LocalUserDbService::get_user_id(&user_pubkey.trim().to_lowercase());
        let member = self.members_repository.get(workspace_id, &user).await?;
        if member.role == WorkspaceRole::Owner || data.role == WorkspaceRole::Owner {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "Owner role cannot be reassigned".to_string(),
            }));
        }
        if data.role > caller_role {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "Cannot grant a role above your own".to_string(),
            }));
        }
        if member.role == data.role {
            return Ok(member);
        }

        let member = self
            .members_repository
            .update_role(workspace_id, &user, data.role)
            .await?;
        info!(workspace = %workspace_id, user = %user, role = %data.role, "member role changed");
        Ok(member)
    }

    pub async fn remove_member(&self, workspace_id: &Thing, user_pubkey: &str) -> CtxResult<()> {
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        let user = LocalUserDbService::get_user_id(&user_pubkey.trim().to_lowercase());

        let caller_role = self.members_repository.get_role(workspace_id, &caller).await?;
        let is_self = caller == user;
        if !is_self && !member_has_at_least_role(caller_role, WorkspaceRole::Admin) {
            return Err(self.ctx.to_ctx_error(AppError::Forbidden));
        }

        let member = self.members_repository.get(workspace_id, &user).await?;
        if member.role == WorkspaceRole::Owner {
            return Err(self.ctx.to_ctx_error(AppError::AuthorizationFail {
                required: "Workspace owner cannot be removed".to_string(),
            }));
        }

        self.members_repository.delete(workspace_id, &user).await?;
        info!(workspace = %workspace_id, user = %user, "member removed");
        Ok(())
    }

    pub async fn budget(&self, workspace_id: &Thing) -> CtxResult<WorkspaceBudget> {
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Viewer,
        )
        .await?;
        self.budgets_repository.get_by_workspace(workspace_id).await
    }

    pub async fn deposit(&self, workspace_id: &Thing, data: DepositInput) -> CtxResult<WorkspaceBudget> {
        data.validate()?;
        let caller = self.caller()?;
        self.workspaces_repository.get(workspace_id).await?;
        require_role(
            &self.members_repository,
            self.ctx,
            workspace_id,
            &caller,
            WorkspaceRole::Admin,
        )
        .await?;
        self.budgets_repository.deposit(workspace_id, data.amount).await
    }
}
