use async_trait::async_trait;
use uuid::Uuid;

use super::DBClient;
use crate::models::ticketmodel::{Attachment, NewAttachment};

#[async_trait]
pub trait AttachmentExt {
    async fn save_attachment(
        &self,
        ticket_id: Uuid,
        uploader_id: Uuid,
        attachment: NewAttachment,
    ) -> Result<Attachment, sqlx::Error>;

    async fn get_ticket_attachments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<Attachment>, sqlx::Error>;
}

#[async_trait]
impl AttachmentExt for DBClient {
    async fn save_attachment(
        &self,
        ticket_id: Uuid,
        uploader_id: Uuid,
        attachment: NewAttachment,
    ) -> Result<Attachment, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (ticket_id, uploader_id, file_name, file_size, content_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(uploader_id)
        .bind(attachment.file_name)
        .bind(attachment.file_size)
        .bind(attachment.content_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_ticket_attachments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT * FROM attachments
            WHERE ticket_id = $1
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }
}
