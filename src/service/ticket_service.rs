use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::Store,
    dtos::ticketdtos::{CreateTicketDto, RateTicketDto, UpdateTicketDto},
    models::{
        pagination::{Page, PageRequest, TicketSort},
        ticketmodel::{NewTicket, StatusCount, Ticket, TicketFilter, TicketStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        notification_service::NotificationService,
        permissions::{self, TicketParties},
    },
};

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Looks up a notification recipient. A missing user only costs the
    /// email, never the request.
    async fn recipient(&self, user_id: Uuid) -> Option<User> {
        match self.store.get_user(Some(user_id), None, None).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!("Notification recipient {} no longer exists", user_id);
                None
            }
            Err(e) => {
                tracing::error!("Failed to load notification recipient {}: {}", user_id, e);
                None
            }
        }
    }

    async fn notify_assigned(&self, ticket: &Ticket) {
        let Some(assignee_id) = ticket.assignee_id else {
            return;
        };
        if let (Some(assignee), Some(creator)) = (
            self.recipient(assignee_id).await,
            self.recipient(ticket.creator_id).await,
        ) {
            self.notifications
                .notify_ticket_assigned(&assignee, &creator, ticket);
        }
    }

    pub async fn create_ticket(
        &self,
        creator: &User,
        dto: &CreateTicketDto,
    ) -> Result<Ticket, ServiceError> {
        let assignee = match dto.assignee_id {
            Some(assignee_id) => {
                let assignee = self
                    .store
                    .get_user(Some(assignee_id), None, None)
                    .await?
                    .ok_or(ServiceError::UserNotFound(assignee_id))?;

                if assignee.role.can_handle_tickets() {
                    Some(assignee)
                } else {
                    tracing::debug!(
                        "Ignoring assignee {} with role {} on new ticket",
                        assignee.id,
                        assignee.role
                    );
                    None
                }
            }
            None => None,
        };

        let ticket = self
            .store
            .save_ticket(NewTicket {
                subject: dto.subject.trim().to_string(),
                description: dto.description.clone(),
                priority: dto.priority,
                creator_id: creator.id,
                assignee_id: assignee.as_ref().map(|a| a.id),
            })
            .await?;

        tracing::info!("Ticket {} created by {}", ticket.id, creator.id);

        self.notifications.notify_ticket_created(creator, &ticket);
        if let Some(assignee) = &assignee {
            self.notifications
                .notify_ticket_assigned(assignee, creator, &ticket);
        }

        Ok(ticket)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid, requester: &User) -> Result<Ticket, ServiceError> {
        let ticket = self
            .store
            .get_ticket(ticket_id)
            .await?
            .ok_or(ServiceError::TicketNotFound(ticket_id))?;

        if !permissions::can_view_ticket(requester.role, requester.id, TicketParties::from(&ticket)) {
            tracing::warn!("User {} denied view of ticket {}", requester.id, ticket_id);
            return Err(ServiceError::access_denied(
                "You don't have permission to view this ticket",
            ));
        }

        Ok(ticket)
    }

    /// Plain users only ever see their own tickets, and cannot filter by
    /// assignee. Everyone else sees and filters the whole queue.
    pub async fn list_tickets(
        &self,
        requester: &User,
        mut filter: TicketFilter,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, ServiceError> {
        if requester.role == UserRole::User {
            filter.creator_id = Some(requester.id);
            filter.assignee_id = None;
        }
        filter.involving = None;

        tracing::debug!("Listing tickets for {} with {:?}", requester.id, filter);
        Ok(self.store.get_tickets(&filter, page).await?)
    }

    pub async fn my_tickets(
        &self,
        requester: &User,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, ServiceError> {
        let filter = match requester.role {
            UserRole::User => TicketFilter {
                creator_id: Some(requester.id),
                ..Default::default()
            },
            _ => TicketFilter {
                involving: Some(requester.id),
                ..Default::default()
            },
        };

        Ok(self.store.get_tickets(&filter, page).await?)
    }

    pub async fn assigned_tickets(
        &self,
        requester: &User,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, ServiceError> {
        let filter = TicketFilter {
            assignee_id: Some(requester.id),
            ..Default::default()
        };

        Ok(self.store.get_tickets(&filter, page).await?)
    }

    pub async fn update_ticket(
        &self,
        ticket_id: Uuid,
        requester: &User,
        dto: &UpdateTicketDto,
    ) -> Result<Ticket, ServiceError> {
        let (role, requester_id) = (requester.role, requester.id);
        let subject = dto.subject.trim().to_string();
        let description = dto.description.clone();
        let priority = dto.priority;

        let change = self
            .store
            .modify_ticket(
                ticket_id,
                Box::new(move |ticket: &mut Ticket| {
                    if !permissions::can_modify_ticket(role, requester_id, TicketParties::from(&*ticket)) {
                        return Err(ServiceError::access_denied(
                            "You don't have permission to modify this ticket",
                        ));
                    }
                    ticket.subject = subject;
                    ticket.description = description;
                    ticket.priority = priority;
                    Ok(())
                }),
            )
            .await
            .map_err(|e| {
                if matches!(e, ServiceError::AccessDenied(_)) {
                    tracing::warn!("User {} denied edit of ticket {}", requester_id, ticket_id);
                }
                e
            })?;

        tracing::info!("Ticket {} updated by {}", ticket_id, requester_id);
        Ok(change.after)
    }

    /// `assignee_id = None` unassigns. The target must be able to handle
    /// tickets.
    pub async fn assign_ticket(
        &self,
        ticket_id: Uuid,
        requester: &User,
        assignee_id: Option<Uuid>,
    ) -> Result<Ticket, ServiceError> {
        let (role, requester_id) = (requester.role, requester.id);

        // Target problems are reported only after the permission check.
        let target: Result<Option<Uuid>, ServiceError> = match assignee_id {
            None => Ok(None),
            Some(id) => match self.store.get_user(Some(id), None, None).await? {
                None => Err(ServiceError::UserNotFound(id)),
                Some(user) if !user.role.can_handle_tickets() => Err(ServiceError::invalid_argument(
                    "Can only assign tickets to support agents or admins",
                )),
                Some(user) => Ok(Some(user.id)),
            },
        };

        let change = self
            .store
            .modify_ticket(
                ticket_id,
                Box::new(move |ticket: &mut Ticket| {
                    if !permissions::can_assign_ticket(role, requester_id, TicketParties::from(&*ticket)) {
                        return Err(ServiceError::access_denied(
                            "You don't have permission to assign this ticket",
                        ));
                    }
                    ticket.assignee_id = target?;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            "Ticket {} assigned to {:?} by {}",
            ticket_id,
            change.after.assignee_id,
            requester_id
        );

        if change.assignee_changed() {
            self.notify_assigned(&change.after).await;
        }

        Ok(change.after)
    }

    pub async fn update_status(
        &self,
        ticket_id: Uuid,
        requester: &User,
        status: TicketStatus,
    ) -> Result<Ticket, ServiceError> {
        let (role, requester_id) = (requester.role, requester.id);

        let change = self
            .store
            .modify_ticket(
                ticket_id,
                Box::new(move |ticket: &mut Ticket| {
                    if !permissions::can_update_ticket_status(
                        role,
                        requester_id,
                        TicketParties::from(&*ticket),
                    ) {
                        return Err(ServiceError::access_denied(
                            "You don't have permission to update this ticket status",
                        ));
                    }
                    ticket.status = status;
                    Ok(())
                }),
            )
            .await?;

        if change.status_changed() {
            tracing::info!(
                "Ticket {} moved from {} to {} by {}",
                ticket_id,
                change.before.status,
                change.after.status,
                requester_id
            );
            if let Some(creator) = self.recipient(change.after.creator_id).await {
                self.notifications
                    .notify_status_changed(&creator, &change.after, change.before.status);
            }
        }

        Ok(change.after)
    }

    pub async fn rate_ticket(
        &self,
        ticket_id: Uuid,
        requester: &User,
        dto: &RateTicketDto,
    ) -> Result<Ticket, ServiceError> {
        let requester_id = requester.id;
        let rating = dto.rating;
        let feedback = dto.feedback.clone();

        let change = self
            .store
            .modify_ticket(
                ticket_id,
                Box::new(move |ticket: &mut Ticket| {
                    if !permissions::can_rate_ticket(requester_id, TicketParties::from(&*ticket)) {
                        return Err(ServiceError::access_denied(
                            "Only the ticket creator can rate the resolution",
                        ));
                    }
                    if !ticket.status.is_terminal() {
                        return Err(ServiceError::invalid_argument(
                            "Can only rate resolved or closed tickets",
                        ));
                    }
                    ticket.rating = Some(rating);
                    ticket.feedback = feedback;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!("Ticket {} rated {} by {}", ticket_id, rating, requester_id);
        Ok(change.after)
    }

    /// Admin only. Comments and attachments go with the ticket.
    pub async fn delete_ticket(&self, ticket_id: Uuid, requester: &User) -> Result<(), ServiceError> {
        if requester.role != UserRole::Admin {
            tracing::warn!("User {} denied delete of ticket {}", requester.id, ticket_id);
            return Err(ServiceError::access_denied(
                "Only administrators can delete tickets",
            ));
        }

        if !self.store.delete_ticket(ticket_id).await? {
            return Err(ServiceError::TicketNotFound(ticket_id));
        }

        tracing::info!("Ticket {} deleted by {}", ticket_id, requester.id);
        Ok(())
    }

    /// Per-status counts over the tickets `requester` may list.
    pub async fn ticket_stats(&self, requester: &User) -> Result<Vec<StatusCount>, ServiceError> {
        let creator_id = (requester.role == UserRole::User).then_some(requester.id);
        Ok(self.store.count_tickets_by_status(creator_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{AttachmentExt, CommentExt, TicketExt},
        models::{
            pagination::SortDirection,
            ticketmodel::{NewAttachment, TicketPriority},
        },
        service::{
            notification_service::Notification,
            testutil::{drain, seed_user, TestContext},
        },
    };

    fn create_dto(subject: &str, assignee_id: Option<Uuid>) -> CreateTicketDto {
        CreateTicketDto {
            subject: subject.to_string(),
            description: format!("{} details", subject),
            priority: TicketPriority::High,
            assignee_id,
        }
    }

    fn page() -> PageRequest<TicketSort> {
        PageRequest::default()
    }

    #[tokio::test]
    async fn test_create_ticket_starts_open_and_notifies_creator() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Printer jammed", None))
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.creator_id, bob.id);
        assert!(ticket.assignee_id.is_none());
        assert!(ticket.resolved_at.is_none() && ticket.closed_at.is_none());

        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Notification::TicketCreated { creator, .. } if creator.id == bob.id));
    }

    #[tokio::test]
    async fn test_create_ticket_with_assignee() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let alice = seed_user(&ctx, "alice", UserRole::SupportAgent).await;
        let carol = seed_user(&ctx, "carol", UserRole::User).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("VPN", Some(alice.id)))
            .await
            .unwrap();
        assert_eq!(ticket.assignee_id, Some(alice.id));
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[1], Notification::TicketAssigned { assignee, .. } if assignee.id == alice.id));

        // a plain user as assignee is silently dropped
        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Mouse", Some(carol.id)))
            .await
            .unwrap();
        assert!(ticket.assignee_id.is_none());
        assert_eq!(drain(&mut ctx.receiver).len(), 1);

        let err = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Ghost", Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_view_permissions() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let eve = seed_user(&ctx, "eve", UserRole::User).await;
        let agent = seed_user(&ctx, "agent", UserRole::SupportAgent).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;

        let ticket = ctx.tickets.create_ticket(&bob, &create_dto("Disk", None)).await.unwrap();

        assert!(ctx.tickets.get_ticket(ticket.id, &bob).await.is_ok());
        assert!(ctx.tickets.get_ticket(ticket.id, &admin).await.is_ok());
        assert!(matches!(
            ctx.tickets.get_ticket(ticket.id, &eve).await,
            Err(ServiceError::AccessDenied(_))
        ));
        assert!(matches!(
            ctx.tickets.get_ticket(ticket.id, &agent).await,
            Err(ServiceError::AccessDenied(_))
        ));
        assert!(matches!(
            ctx.tickets.get_ticket(Uuid::new_v4(), &admin).await,
            Err(ServiceError::TicketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_user_listing_only_returns_own_tickets() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let eve = seed_user(&ctx, "eve", UserRole::User).await;
        let agent = seed_user(&ctx, "agent", UserRole::SupportAgent).await;

        for i in 0..3 {
            ctx.tickets.create_ticket(&bob, &create_dto(&format!("bob {}", i), None)).await.unwrap();
        }
        ctx.tickets
            .create_ticket(&eve, &create_dto("eve's VPN", Some(agent.id)))
            .await
            .unwrap();

        // asking for someone else's assignee does not widen the view
        let filter = TicketFilter {
            assignee_id: Some(agent.id),
            ..Default::default()
        };
        let listed = ctx.tickets.list_tickets(&bob, filter, &page()).await.unwrap();
        assert_eq!(listed.total_elements, 3);
        assert!(listed.content.iter().all(|t| t.creator_id == bob.id));

        let all = ctx.tickets.list_tickets(&agent, TicketFilter::default(), &page()).await.unwrap();
        assert_eq!(all.total_elements, 4);

        let search = TicketFilter {
            search: Some("VPN".to_string()),
            ..Default::default()
        };
        let found = ctx.tickets.list_tickets(&agent, search, &page()).await.unwrap();
        assert_eq!(found.total_elements, 1);
    }

    #[tokio::test]
    async fn test_my_and_assigned_tickets() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let agent = seed_user(&ctx, "agent", UserRole::SupportAgent).await;

        ctx.tickets.create_ticket(&bob, &create_dto("one", Some(agent.id))).await.unwrap();
        ctx.tickets.create_ticket(&bob, &create_dto("two", None)).await.unwrap();
        ctx.tickets.create_ticket(&agent, &create_dto("agent's own", None)).await.unwrap();

        assert_eq!(ctx.tickets.my_tickets(&bob, &page()).await.unwrap().total_elements, 2);
        // created by or assigned to the agent
        assert_eq!(ctx.tickets.my_tickets(&agent, &page()).await.unwrap().total_elements, 2);
        assert_eq!(ctx.tickets.assigned_tickets(&agent, &page()).await.unwrap().total_elements, 1);
    }

    #[tokio::test]
    async fn test_listing_sorts_and_pages() {
        let ctx = TestContext::new();
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;
        for subject in ["charlie", "alpha", "bravo"] {
            ctx.tickets.create_ticket(&admin, &create_dto(subject, None)).await.unwrap();
        }

        let first = PageRequest::new(0, 2, TicketSort::Subject, SortDirection::Asc);
        let listed = ctx.tickets.list_tickets(&admin, TicketFilter::default(), &first).await.unwrap();
        let subjects: Vec<&str> = listed.content.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec!["alpha", "bravo"]);
        assert!(listed.first && !listed.last);

        let second = PageRequest::new(1, 2, TicketSort::Subject, SortDirection::Asc);
        let listed = ctx.tickets.list_tickets(&admin, TicketFilter::default(), &second).await.unwrap();
        assert_eq!(listed.content[0].subject, "charlie");
        assert!(listed.last);
    }

    #[tokio::test]
    async fn test_update_ticket_permissions() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let agent = seed_user(&ctx, "agent", UserRole::SupportAgent).await;
        let other = seed_user(&ctx, "other", UserRole::SupportAgent).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Old subject", Some(agent.id)))
            .await
            .unwrap();

        let dto = UpdateTicketDto {
            subject: "New subject".to_string(),
            description: "New description".to_string(),
            priority: TicketPriority::Urgent,
        };

        let updated = ctx.tickets.update_ticket(ticket.id, &agent, &dto).await.unwrap();
        assert_eq!(updated.subject, "New subject");
        assert_eq!(updated.priority, TicketPriority::Urgent);
        assert!(updated.updated_at >= ticket.updated_at);

        let err = ctx.tickets.update_ticket(ticket.id, &other, &dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_assigning_to_plain_user_is_rejected() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;
        let agent = seed_user(&ctx, "agent", UserRole::SupportAgent).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Keyboard", Some(agent.id)))
            .await
            .unwrap();
        drain(&mut ctx.receiver);

        let err = ctx
            .tickets
            .assign_ticket(ticket.id, &admin, Some(bob.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let stored = ctx.store.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.assignee_id, Some(agent.id));
        assert!(drain(&mut ctx.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_agent_cannot_take_a_ticket_held_by_someone_else() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let alice = seed_user(&ctx, "alice", UserRole::SupportAgent).await;
        let dave = seed_user(&ctx, "dave", UserRole::SupportAgent).await;

        let held = ctx
            .tickets
            .create_ticket(&bob, &create_dto("held", Some(alice.id)))
            .await
            .unwrap();
        let free = ctx.tickets.create_ticket(&bob, &create_dto("free", None)).await.unwrap();
        drain(&mut ctx.receiver);

        let err = ctx
            .tickets
            .assign_ticket(held.id, &dave, Some(dave.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        // permission is checked before the target, even when the target is bad
        let err = ctx
            .tickets
            .assign_ticket(held.id, &dave, Some(bob.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        let taken = ctx.tickets.assign_ticket(free.id, &dave, Some(dave.id)).await.unwrap();
        assert_eq!(taken.assignee_id, Some(dave.id));
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Notification::TicketAssigned { assignee, .. } if assignee.id == dave.id));
    }

    #[tokio::test]
    async fn test_reassigning_same_agent_or_unassigning_sends_nothing() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let alice = seed_user(&ctx, "alice", UserRole::SupportAgent).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Monitor", Some(alice.id)))
            .await
            .unwrap();
        drain(&mut ctx.receiver);

        ctx.tickets.assign_ticket(ticket.id, &alice, Some(alice.id)).await.unwrap();
        assert!(drain(&mut ctx.receiver).is_empty());

        let unassigned = ctx.tickets.assign_ticket(ticket.id, &alice, None).await.unwrap();
        assert!(unassigned.assignee_id.is_none());
        assert!(drain(&mut ctx.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_status_change_notifies_creator_once() {
        let mut ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let alice = seed_user(&ctx, "alice", UserRole::SupportAgent).await;

        let ticket = ctx
            .tickets
            .create_ticket(&bob, &create_dto("Wifi", Some(alice.id)))
            .await
            .unwrap();
        drain(&mut ctx.receiver);

        ctx.tickets.update_status(ticket.id, &alice, TicketStatus::InProgress).await.unwrap();
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            &sent[0],
            Notification::StatusChanged { creator, previous: TicketStatus::Open, .. } if creator.id == bob.id
        ));

        ctx.tickets.update_status(ticket.id, &alice, TicketStatus::InProgress).await.unwrap();
        assert!(drain(&mut ctx.receiver).is_empty());
    }

    #[tokio::test]
    async fn test_resolution_and_close_timestamps_are_sticky() {
        let ctx = TestContext::new();
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;
        let ticket = ctx.tickets.create_ticket(&admin, &create_dto("Fan", None)).await.unwrap();

        let resolved = ctx.tickets.update_status(ticket.id, &admin, TicketStatus::Resolved).await.unwrap();
        let resolved_at = resolved.resolved_at.unwrap();

        ctx.tickets.update_status(ticket.id, &admin, TicketStatus::InProgress).await.unwrap();
        let again = ctx.tickets.update_status(ticket.id, &admin, TicketStatus::Resolved).await.unwrap();
        assert_eq!(again.resolved_at, Some(resolved_at));

        let closed = ctx.tickets.update_status(ticket.id, &admin, TicketStatus::Closed).await.unwrap();
        let closed_at = closed.closed_at.unwrap();
        let reopened = ctx.tickets.update_status(ticket.id, &admin, TicketStatus::Open).await.unwrap();
        assert_eq!(reopened.closed_at, Some(closed_at));
        assert_eq!(reopened.resolved_at, Some(resolved_at));
    }

    #[tokio::test]
    async fn test_rating_rules() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;
        let ticket = ctx.tickets.create_ticket(&bob, &create_dto("Chair", None)).await.unwrap();

        let dto = RateTicketDto {
            rating: 4,
            feedback: Some("Quick fix".to_string()),
        };

        let err = ctx.tickets.rate_ticket(ticket.id, &bob, &dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert!(ctx.store.get_ticket(ticket.id).await.unwrap().unwrap().rating.is_none());

        ctx.tickets.update_status(ticket.id, &admin, TicketStatus::Resolved).await.unwrap();

        let err = ctx.tickets.rate_ticket(ticket.id, &admin, &dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));

        let rated = ctx.tickets.rate_ticket(ticket.id, &bob, &dto).await.unwrap();
        assert_eq!(rated.rating, Some(4));
        assert_eq!(rated.feedback.as_deref(), Some("Quick fix"));
    }

    #[tokio::test]
    async fn test_delete_ticket_is_admin_only_and_cascades() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;
        let ticket = ctx.tickets.create_ticket(&bob, &create_dto("Desk", None)).await.unwrap();
        ctx.store
            .save_comment(ticket.id, bob.id, "still broken".to_string())
            .await
            .unwrap();
        ctx.store
            .save_attachment(
                ticket.id,
                bob.id,
                NewAttachment {
                    file_name: "desk.jpg".to_string(),
                    file_size: 2048,
                    content_type: "image/jpeg".to_string(),
                },
            )
            .await
            .unwrap();

        let err = ctx.tickets.delete_ticket(ticket.id, &bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));
        assert_eq!(ctx.store.attachment_count(), 1);

        ctx.tickets.delete_ticket(ticket.id, &admin).await.unwrap();
        assert!(ctx.store.get_ticket(ticket.id).await.unwrap().is_none());
        assert_eq!(ctx.store.comment_count(), 0);
        assert_eq!(ctx.store.attachment_count(), 0);

        let err = ctx.tickets.delete_ticket(ticket.id, &admin).await.unwrap_err();
        assert!(matches!(err, ServiceError::TicketNotFound(_)));
    }

    #[tokio::test]
    async fn test_stats_are_scoped_for_plain_users() {
        let ctx = TestContext::new();
        let bob = seed_user(&ctx, "bob", UserRole::User).await;
        let eve = seed_user(&ctx, "eve", UserRole::User).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;

        ctx.tickets.create_ticket(&bob, &create_dto("a", None)).await.unwrap();
        let t = ctx.tickets.create_ticket(&bob, &create_dto("b", None)).await.unwrap();
        ctx.tickets.create_ticket(&eve, &create_dto("c", None)).await.unwrap();
        ctx.tickets.update_status(t.id, &admin, TicketStatus::Closed).await.unwrap();

        let count = |stats: &[StatusCount], status| {
            stats.iter().find(|c| c.status == status).map(|c| c.count).unwrap()
        };

        let mine = ctx.tickets.ticket_stats(&bob).await.unwrap();
        assert_eq!(mine.len(), 4);
        assert_eq!(count(mine.as_slice(), TicketStatus::Open), 1);
        assert_eq!(count(mine.as_slice(), TicketStatus::Closed), 1);

        let all = ctx.tickets.ticket_stats(&admin).await.unwrap();
        assert_eq!(count(all.as_slice(), TicketStatus::Open), 2);
        assert_eq!(count(all.as_slice(), TicketStatus::Resolved), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_support_flow() {
        let mut ctx = TestContext::new();
        let user_a = seed_user(&ctx, "user_a", UserRole::User).await;
        let agent_b = seed_user(&ctx, "agent_b", UserRole::SupportAgent).await;
        let admin = seed_user(&ctx, "admin", UserRole::Admin).await;

        let ticket = ctx
            .tickets
            .create_ticket(&user_a, &create_dto("Email not syncing", None))
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.creator_id, user_a.id);
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient().id, user_a.id);

        let assigned = ctx
            .tickets
            .assign_ticket(ticket.id, &admin, Some(agent_b.id))
            .await
            .unwrap();
        assert_eq!(assigned.assignee_id, Some(agent_b.id));
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), "ticket_assigned");
        assert_eq!(sent[0].recipient().id, agent_b.id);

        let resolved = ctx
            .tickets
            .update_status(ticket.id, &agent_b, TicketStatus::Resolved)
            .await
            .unwrap();
        assert!(resolved.resolved_at.is_some());
        let sent = drain(&mut ctx.receiver);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), "status_changed");
        assert_eq!(sent[0].recipient().id, user_a.id);

        let rated = ctx
            .tickets
            .rate_ticket(
                ticket.id,
                &user_a,
                &RateTicketDto {
                    rating: 5,
                    feedback: Some("Great".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rated.rating, Some(5));

        // the creator is neither admin nor assignee
        let err = ctx
            .tickets
            .update_status(ticket.id, &user_a, TicketStatus::Closed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccessDenied(_)));
        let stored = ctx.store.get_ticket(ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::Resolved);
        assert_eq!(stored.rating, Some(5));
    }
}
