use taskview_shared::{
    api::{validate_task_id, CompletedTasksResponse, TaskUpdate},
    Project, RawTask, Section,
};

use crate::auth::SessionUser;
use crate::credentials::CredentialResolver;
use crate::error::AppError;
use crate::gateway::{GatewayResponse, TodoistGateway};

/// Gateway calls made on behalf of a session user. Each call resolves the
/// user's token exactly once right before the request goes out.
#[derive(Clone)]
pub struct TodoistService {
    resolver: CredentialResolver,
    gateway: TodoistGateway,
}

impl TodoistService {
    pub fn new(resolver: CredentialResolver, gateway: TodoistGateway) -> Self {
        Self { resolver, gateway }
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.resolver
    }

    pub async fn projects(&self, user: Option<&SessionUser>) -> Result<Vec<Project>, AppError> {
        let token = self.resolver.resolve(user).await?;
        self.gateway.projects(&token).await
    }

    pub async fn sections(&self, user: Option<&SessionUser>) -> Result<Vec<Section>, AppError> {
        let token = self.resolver.resolve(user).await?;
        self.gateway.sections(&token).await
    }

    pub async fn tasks(&self, user: Option<&SessionUser>) -> Result<Vec<RawTask>, AppError> {
        let token = self.resolver.resolve(user).await?;
        self.gateway.tasks(&token).await
    }

    pub async fn completed_tasks(
        &self,
        user: Option<&SessionUser>,
    ) -> Result<CompletedTasksResponse, AppError> {
        let token = self.resolver.resolve(user).await?;
        self.gateway.completed_tasks(&token).await
    }

    pub async fn update_task(
        &self,
        user: Option<&SessionUser>,
        task_id: &str,
        update: &TaskUpdate,
    ) -> Result<GatewayResponse, AppError> {
        require_id(task_id)?;
        update.validate()?;
        let token = self.resolver.resolve(user).await?;
        self.gateway.update_task(&token, task_id, update).await
    }

    pub async fn close_task(
        &self,
        user: Option<&SessionUser>,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        require_id(task_id)?;
        let token = self.resolver.resolve(user).await?;
        self.gateway.close_task(&token, task_id).await
    }

    pub async fn reopen_task(
        &self,
        user: Option<&SessionUser>,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        require_id(task_id)?;
        let token = self.resolver.resolve(user).await?;
        self.gateway.reopen_task(&token, task_id).await
    }

    pub async fn delete_task(
        &self,
        user: Option<&SessionUser>,
        task_id: &str,
    ) -> Result<GatewayResponse, AppError> {
        require_id(task_id)?;
        let token = self.resolver.resolve(user).await?;
        self.gateway.delete_task(&token, task_id).await
    }
}

fn require_id(task_id: &str) -> Result<(), AppError> {
    Ok(validate_task_id(task_id)?)
}
