use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::Store,
    dtos::ticketdtos::{AttachmentDto, CommentDto},
    models::{
        ticketmodel::{Attachment, Comment, Ticket},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        permissions::{self, TicketParties},
    },
};

/// Conversation and file metadata hanging off a ticket.
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    async fn viewable_ticket(
        &self,
        ticket_id: Uuid,
        requester: &User,
        denied: &str,
    ) -> Result<Ticket, ServiceError> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(ServiceError::TicketNotFound(ticket_id))?;

        if !permissions::can_view_ticket(requester.role, requester.id, TicketParties::from(&ticket)) {
            tracing::warn!("User {} denied access to ticket {}", requester.id, ticket_id);
            return Err(ServiceError::access_denied(denied));
        }

        Ok(ticket)
    }

    /// The comment, provided it really belongs to `ticket_id`.
    async fn comment_on(&self, ticket_id: Uuid, comment_id: Uuid) -> Result<Comment, ServiceError> {
        self.store
            .get_comment(comment_id)
            .await?
            .filter(|c| c.ticket_id == ticket_id)
            .ok_or(ServiceError::CommentNotFound(comment_id))
    }

    async fn user(&self, user_id: Uuid) -> Option<User> {
        match self.store.get_user(Some(user_id), None, None).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Failed to load notification recipient {}: {}", user_id, e);
                None
            }
        }
    }

    /// Emails the creator and the assignee, skipping the author and never
    /// writing to the same person twice.
    async fn notify_comment(&self, ticket: &Ticket, author: &User, comment: &Comment) {
        let mut recipients = Vec::with_capacity(2);
        if ticket.creator_id != author.id {
            recipients.push(ticket.creator_id);
        }
        if let Some(assignee_id) = ticket.assignee_id {
            if assignee_id != author.id && assignee_id != ticket.creator_id {
                recipients.push(assignee_id);
            }
        }

        for recipient_id in recipients {
            if let Some(recipient) = self.user(recipient_id).await {
                self.notifications
                    .notify_comment_added(&recipient, author, ticket, comment);
            }
        }
    }

    pub async fn add_comment(
        &self,
        ticket_id: Uuid,
        author: &User,
        dto: &CommentDto,
    ) -> Result<Comment, ServiceError> {
        let ticket = self
            .viewable_ticket(
                ticket_id,
                author,
                "You don't have permission to comment on this ticket",
            )
            .await?;

        let comment = self
            .store
            .save_comment(ticket.id, author.id, dto.content.clone())
            .await?;

        tracing::info!("Comment {} added to ticket {} by {}", comment.id, ticket.id, author.id);
        self.notify_comment(&ticket, author, &comment).await;

        Ok(comment)
    }

    /// Oldest first.
    pub async fn list_comments(
        &self,
        ticket_id: Uuid,
        requester: &User,
    ) -> Result<Vec<Comment>, ServiceError> {
        self.viewable_ticket(
            ticket_id,
            requester,
            "You don't have permission to view comments on this ticket",
        )
        .await?;

        Ok(self.store.get_ticket_comments(ticket_id).await?)
    }

    pub async fn update_comment(
        &self,
        ticket_id: Uuid,
        comment_id: Uuid,
        requester: &User,
        dto: &CommentDto,
    ) -> Result<Comment, ServiceError> {
        let comment = self.comment_on(ticket_id, comment_id).await?;

        if comment.author_id != requester.id {
            tracing::warn!("User {} denied edit of comment {}", requester.id, comment_id);
            return Err(ServiceError::access_denied(
                "You can only update your own comments",
            ));
        }

        let updated = self
            .store
            .update_comment(comment_id, dto.content.clone())
            .await?
            .ok_or(ServiceError::CommentNotFound(comment_id))?;

        tracing::info!("Comment {} updated", comment_id);
        Ok(updated)
    }

    pub async fn delete_comment(
        &self,
        ticket_id: Uuid,
        comment_id: Uuid,
        requester: &User,
    ) -> Result<(), ServiceError> {
        let comment = self.comment_on(ticket_id, comment_id).await?;

        if comment.author_id != requester.id && requester.role != UserRole::Admin {
            tracing::warn!("User {} denied delete of comment {}", requester.id, comment_id);
            return Err(ServiceError::access_denied(
                "You can only delete your own comments",
            ));
        }

        if !self.store.delete_comment(comment_id).await? {
            return Err(ServiceError::CommentNotFound(comment_id));
        }

        tracing::info!("Comment {} deleted by {}", comment_id, requester.id);
        Ok(())
    }

    pub async fn add_attachment(
        &self,
        ticket_id: Uuid,
        uploader: &User,
        dto: AttachmentDto,
    ) -> Result<Attachment, ServiceError> {
        self.viewable_ticket(
            ticket_id,
            uploader,
            "You don't have permission to attach files to this ticket",
        )
        .await?;

        let attachment = self
            .store
            .save_attachment(ticket_id, uploader.id, dto.into())
            .await?;

        tracing::info!(
            "Attachment {} ({}) added to ticket {}",
            attachment.id,
            attachment.file_name,
            ticket_id
        );
        Ok(attachment)
    }

    pub async fn list_attachments(
        &self,
        ticket_id: Uuid,
        requester: &User,
    ) -> Result<Vec<Attachment>, ServiceError> {
        self.viewable_ticket(
            ticket_id,
            requester,
            "You don't have permission to view attachments on this ticket",
        )
        .await?;

        Ok(self.store.get_ticket_attachments(ticket_id).await?)
    }
}
