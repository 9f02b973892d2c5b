use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{unique_violation, Store},
    dtos::userdtos::{RegisterUserDto, UpdateUserDto},
    error::ErrorMessage,
    models::{
        pagination::{Page, PageRequest, UserSort},
        usermodel::{NewUser, User, UserRole},
    },
    service::{error::ServiceError, notification_service::NotificationService},
    utils::password,
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

/// Turns a unique-constraint race on `users` into the matching conflict.
fn map_write_error(err: sqlx::Error, username: &str, email: &str) -> ServiceError {
    match unique_violation(&err).as_deref() {
        Some("users_username_key") => ServiceError::UsernameTaken(username.to_string()),
        Some("users_email_key") => ServiceError::EmailTaken(email.to_string()),
        _ => ServiceError::Database(err),
    }
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Creates an enabled account with `role` and queues a welcome email.
    pub async fn register(
        &self,
        dto: &RegisterUserDto,
        role: UserRole,
    ) -> Result<User, ServiceError> {
        if self.store.username_exists(&dto.username).await? {
            return Err(ServiceError::UsernameTaken(dto.username.clone()));
        }
        if self.store.email_exists(&dto.email).await? {
            return Err(ServiceError::EmailTaken(dto.email.clone()));
        }

        let hashed_password = password::hash(&dto.password)?;

        let user = self
            .store
            .save_user(NewUser {
                username: dto.username.clone(),
                email: dto.email.clone(),
                password: hashed_password,
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                role,
            })
            .await
            .map_err(|e| map_write_error(e, &dto.username, &dto.email))?;

        tracing::info!("Registered user {} ({}) as {}", user.username, user.id, user.role);
        self.notifications.notify_welcome(&user);

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .get_user(Some(user_id), None, None)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        dto: &UpdateUserDto,
    ) -> Result<User, ServiceError> {
        let mut user = self.get_user(user_id).await?;

        if user.username != dto.username && self.store.username_exists(&dto.username).await? {
            return Err(ServiceError::UsernameTaken(dto.username.clone()));
        }
        if user.email != dto.email && self.store.email_exists(&dto.email).await? {
            return Err(ServiceError::EmailTaken(dto.email.clone()));
        }

        user.username = dto.username.clone();
        user.email = dto.email.clone();
        user.first_name = dto.first_name.clone();
        user.last_name = dto.last_name.clone();
        user.role = dto.role;

        if let Some(new_password) = dto.password.as_deref().filter(|p| !p.is_empty()) {
            user.password = password::hash(new_password)?;
        }

        let updated = self
            .store
            .update_user(&user)
            .await
            .map_err(|e| map_write_error(e, &dto.username, &dto.email))?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        tracing::info!("Updated user {}", updated.id);
        Ok(updated)
    }

    pub async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<User, ServiceError> {
        let user = self
            .store
            .update_user_role(user_id, role)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        tracing::info!("User {} is now {}", user.id, user.role);
        Ok(user)
    }

    pub async fn set_enabled(&self, user_id: Uuid, enabled: bool) -> Result<User, ServiceError> {
        let user = self
            .store
            .set_user_enabled(user_id, enabled)
            .await?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        tracing::info!(
            "User {} {}",
            user.id,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(user)
    }

    pub async fn list_users(&self, page: &PageRequest<UserSort>) -> Result<Page<User>, ServiceError> {
        Ok(self.store.get_users(page).await?)
    }

    pub async fn search_users(
        &self,
        term: &str,
        page: &PageRequest<UserSort>,
    ) -> Result<Page<User>, ServiceError> {
        Ok(self.store.search_users(term, page).await?)
    }

    pub async fn users_by_role(&self, role: UserRole) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.get_users_by_role(role, false).await?)
    }

    pub async fn active_support_agents(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self
            .store
            .get_users_by_role(UserRole::SupportAgent, true)
            .await?)
    }

    /// `login` may be a username or an email. Unknown users, disabled
    /// users and wrong passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User, ServiceError> {
        let user = match self.store.get_user(None, Some(login), None).await? {
            Some(user) => Some(user),
            None => self.store.get_user(None, None, Some(login)).await?,
        };

        let user = user.ok_or(ServiceError::InvalidCredentials)?;

        let matched = match password::compare(password, &user.password) {
            Ok(matched) => matched,
            Err(ErrorMessage::InvalidHashFormat) => {
                return Err(ErrorMessage::InvalidHashFormat.into())
            }
            Err(_) => false,
        };

        if !matched {
            tracing::warn!("Failed sign-in attempt for {}", login);
            return Err(ServiceError::InvalidCredentials);
        }
        if !user.enabled {
            tracing::warn!("Disabled user {} attempted to sign in", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(user)
    }
}
