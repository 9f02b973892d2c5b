//! Ticket access rules. Each predicate looks only at the requester's role
//! and identity and at who created and who holds the ticket.

use uuid::Uuid;

use crate::models::{ticketmodel::Ticket, usermodel::UserRole};

/// The parties a permission decision is made over.
#[derive(Debug, Clone, Copy)]
pub struct TicketParties {
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

impl From<&Ticket> for TicketParties {
    fn from(ticket: &Ticket) -> Self {
        TicketParties {
            creator_id: ticket.creator_id,
            assignee_id: ticket.assignee_id,
        }
    }
}

impl TicketParties {
    fn is_creator(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }

    fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignee_id == Some(user_id)
    }
}

pub fn can_view_ticket(role: UserRole, requester_id: Uuid, ticket: TicketParties) -> bool {
    role == UserRole::Admin || ticket.is_creator(requester_id) || ticket.is_assignee(requester_id)
}

/// Editing subject, description and priority.
pub fn can_modify_ticket(role: UserRole, requester_id: Uuid, ticket: TicketParties) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::SupportAgent => {
            ticket.is_creator(requester_id) || ticket.is_assignee(requester_id)
        }
        UserRole::User => ticket.is_creator(requester_id),
    }
}

/// An agent may pick up an unassigned ticket or hand on one they hold.
pub fn can_assign_ticket(role: UserRole, requester_id: Uuid, ticket: TicketParties) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::SupportAgent => {
            ticket.assignee_id.is_none() || ticket.is_assignee(requester_id)
        }
        UserRole::User => false,
    }
}

pub fn can_update_ticket_status(role: UserRole, requester_id: Uuid, ticket: TicketParties) -> bool {
    match role {
        UserRole::Admin => true,
        UserRole::SupportAgent => ticket.is_assignee(requester_id),
        UserRole::User => false,
    }
}

pub fn can_rate_ticket(requester_id: Uuid, ticket: TicketParties) -> bool {
    ticket.is_creator(requester_id)
}
