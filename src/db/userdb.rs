use async_trait::async_trait;
use uuid::Uuid;

use super::{like_pattern, DBClient};
use crate::models::{
    pagination::{Page, PageRequest, UserSort},
    usermodel::{NewUser, User, UserRole},
};

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error>;

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error>;

    async fn save_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    /// Writes every mutable column of `user`. `None` if the id is unknown.
    async fn update_user(&self, user: &User) -> Result<Option<User>, sqlx::Error>;

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn set_user_enabled(
        &self,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_users(&self, page: &PageRequest<UserSort>) -> Result<Page<User>, sqlx::Error>;

    async fn search_users(
        &self,
        term: &str,
        page: &PageRequest<UserSort>,
    ) -> Result<Page<User>, sqlx::Error>;

    async fn get_users_by_role(
        &self,
        role: UserRole,
        enabled_only: bool,
    ) -> Result<Vec<User>, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(username) = username {
            user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
    }

    async fn save_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, email = $3, password = $4, first_name = $5,
                last_name = $6, role = $7, enabled = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(user.enabled)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(role)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn set_user_enabled(
        &self,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET enabled = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(enabled)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_users(&self, page: &PageRequest<UserSort>) -> Result<Page<User>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users ORDER BY {}, id ASC LIMIT $1 OFFSET $2",
            page.order_clause()
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(users, total, page))
    }

    async fn search_users(
        &self,
        term: &str,
        page: &PageRequest<UserSort>,
    ) -> Result<Page<User>, sqlx::Error> {
        let pattern = like_pattern(term);
        let condition = r#"
            LOWER(username) LIKE $1
            OR LOWER(email) LIKE $1
            OR LOWER(first_name) LIKE $1
            OR LOWER(last_name) LIKE $1
        "#;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT * FROM users WHERE {} ORDER BY {}, id ASC LIMIT $2 OFFSET $3",
            condition,
            page.order_clause()
        ))
        .bind(&pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users WHERE {}",
            condition
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(users, total, page))
    }

    async fn get_users_by_role(
        &self,
        role: UserRole,
        enabled_only: bool,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role = $1 AND (enabled OR NOT $2)
            ORDER BY username ASC
            "#,
        )
        .bind(role)
        .bind(enabled_only)
        .fetch_all(&self.pool)
        .await
    }
}
