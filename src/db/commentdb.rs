use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::ticketmodel::Comment;

#[async_trait]
pub trait CommentExt {
    async fn save_comment(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Comment, sqlx::Error>;

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error>;

    /// Oldest first.
    async fn get_ticket_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, sqlx::Error>;

    async fn update_comment(
        &self,
        comment_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error>;

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, sqlx::Error>;
}

#[async_trait]
impl CommentExt for DBClient {
    async fn save_comment(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Comment, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (ticket_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_ticket_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(content)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
