use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    mail::{
        mails::{self, Email},
        sendmail::Mailer,
    },
    models::{
        ticketmodel::{Comment, Ticket, TicketStatus},
        usermodel::User,
    },
};

/// A lifecycle event worth an email. Each variant carries snapshots of
/// everything its template needs, so the worker never touches the store.
#[derive(Debug, Clone)]
pub enum Notification {
    Welcome {
        user: User,
    },
    TicketCreated {
        creator: User,
        ticket: Ticket,
    },
    TicketAssigned {
        assignee: User,
        creator: User,
        ticket: Ticket,
    },
    StatusChanged {
        creator: User,
        ticket: Ticket,
        previous: TicketStatus,
    },
    CommentAdded {
        recipient: User,
        author: User,
        ticket: Ticket,
        comment: Comment,
    },
}

impl Notification {
    pub fn recipient(&self) -> &User {
        match self {
            Notification::Welcome { user } => user,
            Notification::TicketCreated { creator, .. } => creator,
            Notification::TicketAssigned { assignee, .. } => assignee,
            Notification::StatusChanged { creator, .. } => creator,
            Notification::CommentAdded { recipient, .. } => recipient,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::TicketCreated { .. } => "ticket_created",
            Notification::TicketAssigned { .. } => "ticket_assigned",
            Notification::StatusChanged { .. } => "status_changed",
            Notification::CommentAdded { .. } => "comment_added",
        }
    }

    pub fn to_email(&self) -> Email {
        match self {
            Notification::Welcome { user } => mails::welcome_email(user),
            Notification::TicketCreated { creator, ticket } => {
                mails::ticket_created_email(creator, ticket)
            }
            Notification::TicketAssigned {
                assignee,
                creator,
                ticket,
            } => mails::ticket_assigned_email(assignee, creator, ticket),
            Notification::StatusChanged {
                creator,
                ticket,
                previous,
            } => mails::status_changed_email(creator, ticket, *previous),
            Notification::CommentAdded {
                recipient,
                author,
                ticket,
                comment,
            } => mails::comment_added_email(recipient, author, ticket, comment),
        }
    }
}

/// Producer side of the notification queue. Enqueueing never blocks and
/// never fails the caller.
#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: UnboundedSender<Notification>,
}

impl NotificationService {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (NotificationService { sender }, receiver)
    }

    fn dispatch(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.sender.send(notification) {
            tracing::error!("Dropping {} notification, worker is gone: {}", kind, e);
        }
    }

    pub fn notify_welcome(&self, user: &User) {
        self.dispatch(Notification::Welcome { user: user.clone() });
    }

    pub fn notify_ticket_created(&self, creator: &User, ticket: &Ticket) {
        self.dispatch(Notification::TicketCreated {
            creator: creator.clone(),
            ticket: ticket.clone(),
        });
    }

    pub fn notify_ticket_assigned(&self, assignee: &User, creator: &User, ticket: &Ticket) {
        self.dispatch(Notification::TicketAssigned {
            assignee: assignee.clone(),
            creator: creator.clone(),
            ticket: ticket.clone(),
        });
    }

    pub fn notify_status_changed(&self, creator: &User, ticket: &Ticket, previous: TicketStatus) {
        self.dispatch(Notification::StatusChanged {
            creator: creator.clone(),
            ticket: ticket.clone(),
            previous,
        });
    }

    pub fn notify_comment_added(
        &self,
        recipient: &User,
        author: &User,
        ticket: &Ticket,
        comment: &Comment,
    ) {
        self.dispatch(Notification::CommentAdded {
            recipient: recipient.clone(),
            author: author.clone(),
            ticket: ticket.clone(),
            comment: comment.clone(),
        });
    }
}

/// Drains the queue until every producer is dropped. Delivery errors are
/// logged and otherwise ignored.
pub async fn start_notification_worker(
    mut receiver: UnboundedReceiver<Notification>,
    mailer: Arc<dyn Mailer>,
) {
    tracing::info!("Notification worker started");

    while let Some(notification) = receiver.recv().await {
        let email = notification.to_email();
        match mailer.send(&email).await {
            Ok(()) => tracing::debug!(
                "Delivered {} notification to {}",
                notification.kind(),
                email.to
            ),
            Err(e) => tracing::error!(
                "Failed to deliver {} notification to {}: {}",
                notification.kind(),
                email.to,
                e
            ),
        }
    }

    tracing::info!("Notification worker stopped");
}
