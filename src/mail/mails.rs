use crate::models::{
    ticketmodel::{Comment, Ticket, TicketStatus},
    usermodel::User,
};

const WELCOME_TEMPLATE: &str = include_str!("templates/welcome.txt");
const TICKET_CREATED_TEMPLATE: &str = include_str!("templates/ticket_created.txt");
const TICKET_ASSIGNED_TEMPLATE: &str = include_str!("templates/ticket_assigned.txt");
const STATUS_CHANGED_TEMPLATE: &str = include_str!("templates/status_changed.txt");
const COMMENT_ADDED_TEMPLATE: &str = include_str!("templates/comment_added.txt");

/// A rendered, ready to deliver message.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Replaces every `{{key}}` in `template` with its value in one pass, so
/// substituted values are never expanded again. Unknown keys are kept.
pub fn render(template: &str, placeholders: &[(&str, String)]) -> String {
    let mut body = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        body.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let key = &after[..end];
        match placeholders.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => body.push_str(value),
            None => body.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    body.push_str(rest);
    body
}

pub fn welcome_email(user: &User) -> Email {
    let placeholders = [
        ("full_name", user.full_name()),
        ("username", user.username.clone()),
        ("role", user.role.to_string()),
    ];

    Email {
        to: user.email.clone(),
        subject: "Welcome to the Helpdesk".to_string(),
        body: render(WELCOME_TEMPLATE, &placeholders),
    }
}

pub fn ticket_created_email(creator: &User, ticket: &Ticket) -> Email {
    let placeholders = [
        ("full_name", creator.full_name()),
        ("ticket_id", ticket.id.to_string()),
        ("subject", ticket.subject.clone()),
        ("priority", ticket.priority.to_string()),
        ("status", ticket.status.to_string()),
    ];

    Email {
        to: creator.email.clone(),
        subject: format!("Ticket Created - #{}", ticket.id),
        body: render(TICKET_CREATED_TEMPLATE, &placeholders),
    }
}

pub fn ticket_assigned_email(assignee: &User, creator: &User, ticket: &Ticket) -> Email {
    let placeholders = [
        ("full_name", assignee.full_name()),
        ("ticket_id", ticket.id.to_string()),
        ("subject", ticket.subject.clone()),
        ("priority", ticket.priority.to_string()),
        ("status", ticket.status.to_string()),
        ("creator_name", creator.full_name()),
    ];

    Email {
        to: assignee.email.clone(),
        subject: format!("Ticket Assigned - #{}", ticket.id),
        body: render(TICKET_ASSIGNED_TEMPLATE, &placeholders),
    }
}

pub fn status_changed_email(creator: &User, ticket: &Ticket, previous: TicketStatus) -> Email {
    let placeholders = [
        ("full_name", creator.full_name()),
        ("ticket_id", ticket.id.to_string()),
        ("subject", ticket.subject.clone()),
        ("previous_status", previous.to_string()),
        ("status", ticket.status.to_string()),
    ];

    Email {
        to: creator.email.clone(),
        subject: format!("Ticket Status Updated - #{}", ticket.id),
        body: render(STATUS_CHANGED_TEMPLATE, &placeholders),
    }
}

pub fn comment_added_email(
    recipient: &User,
    author: &User,
    ticket: &Ticket,
    comment: &Comment,
) -> Email {
    let placeholders = [
        ("full_name", recipient.full_name()),
        ("ticket_id", ticket.id.to_string()),
        ("subject", ticket.subject.clone()),
        ("author_name", author.full_name()),
        ("content", comment.content.clone()),
    ];

    Email {
        to: recipient.email.clone(),
        subject: format!("New Comment on Ticket #{}", ticket.id),
        body: render(COMMENT_ADDED_TEMPLATE, &placeholders),
    }
}
