//! In-memory store implementing the same `*Ext` traits as `DBClient`, used
//! by service tests.

use std::{cmp::Ordering, collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{AttachmentExt, CommentExt, TicketExt, TicketMutation, UserExt};
use crate::{
    models::{
        pagination::{Page, PageRequest, SortDirection, SortField, TicketSort, UserSort},
        ticketmodel::*,
        usermodel::{NewUser, User, UserRole},
    },
    service::error::ServiceError,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    tickets: HashMap<Uuid, Ticket>,
    comments: HashMap<Uuid, Comment>,
    attachments: HashMap<Uuid, Attachment>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn comment_count(&self) -> usize {
        self.state.lock().unwrap().comments.len()
    }

    pub fn attachment_count(&self) -> usize {
        self.state.lock().unwrap().attachments.len()
    }
}

fn paginate<T: Clone, S: SortField>(mut items: Vec<T>, page: &PageRequest<S>) -> Page<T> {
    let total = items.len() as i64;
    let items: Vec<T> = items
        .drain(..)
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page::new(items, total, page)
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn ticket_matches(ticket: &Ticket, filter: &TicketFilter) -> bool {
    filter.creator_id.map_or(true, |id| ticket.creator_id == id)
        && filter.assignee_id.map_or(true, |id| ticket.assignee_id == Some(id))
        && filter
            .involving
            .map_or(true, |id| ticket.creator_id == id || ticket.assignee_id == Some(id))
        && filter.status.map_or(true, |s| ticket.status == s)
        && filter.priority.map_or(true, |p| ticket.priority == p)
        && filter.search.as_deref().filter(|s| !s.is_empty()).map_or(true, |s| {
            contains_ci(&ticket.subject, s) || contains_ci(&ticket.description, s)
        })
}

fn compare_tickets(a: &Ticket, b: &Ticket, sort: TicketSort) -> Ordering {
    match sort {
        TicketSort::CreatedAt => a.created_at.cmp(&b.created_at),
        TicketSort::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        TicketSort::Subject => a.subject.cmp(&b.subject),
        TicketSort::Status => a.status.cmp(&b.status),
        TicketSort::Priority => a.priority.cmp(&b.priority),
    }
}

fn compare_users(a: &User, b: &User, sort: UserSort) -> Ordering {
    match sort {
        UserSort::CreatedAt => a.created_at.cmp(&b.created_at),
        UserSort::Username => a.username.cmp(&b.username),
        UserSort::Email => a.email.cmp(&b.email),
        UserSort::FirstName => a.first_name.cmp(&b.first_name),
        UserSort::LastName => a.last_name.cmp(&b.last_name),
        UserSort::Role => (a.role as u8).cmp(&(b.role as u8)),
    }
}

fn sorted_users(mut users: Vec<User>, page: &PageRequest<UserSort>) -> Page<User> {
    users.sort_by(|a, b| directed(compare_users(a, b, page.sort_by), page.direction).then(a.id.cmp(&b.id)));
    paginate(users, page)
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let user = if let Some(id) = user_id {
            state.users.get(&id).cloned()
        } else if let Some(username) = username {
            state.users.values().find(|u| u.username == username).cloned()
        } else if let Some(email) = email {
            state.users.values().find(|u| u.email == email).cloned()
        } else {
            None
        };
        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        Ok(self.state.lock().unwrap().users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        Ok(self.state.lock().unwrap().users.values().any(|u| u.email == email))
    }

    async fn save_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password: user.password,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(&user.id).map(|stored| {
            *stored = User {
                updated_at: Utc::now(),
                ..user.clone()
            };
            stored.clone()
        }))
    }

    async fn update_user_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(&user_id).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_user_enabled(
        &self,
        user_id: Uuid,
        enabled: bool,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        Ok(state.users.get_mut(&user_id).map(|u| {
            u.enabled = enabled;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn get_users(&self, page: &PageRequest<UserSort>) -> Result<Page<User>, sqlx::Error> {
        let users: Vec<User> = self.state.lock().unwrap().users.values().cloned().collect();
        Ok(sorted_users(users, page))
    }

    async fn search_users(
        &self,
        term: &str,
        page: &PageRequest<UserSort>,
    ) -> Result<Page<User>, sqlx::Error> {
        let users: Vec<User> = self
            .state
            .lock()
            .unwrap()
            .users
            .values()
            .filter(|u| {
                contains_ci(&u.username, term)
                    || contains_ci(&u.email, term)
                    || contains_ci(&u.first_name, term)
                    || contains_ci(&u.last_name, term)
            })
            .cloned()
            .collect();
        Ok(sorted_users(users, page))
    }

    async fn get_users_by_role(
        &self,
        role: UserRole,
        enabled_only: bool,
    ) -> Result<Vec<User>, sqlx::Error> {
        let mut users: Vec<User> = self
            .state
            .lock()
            .unwrap()
            .users
            .values()
            .filter(|u| u.role == role && (u.enabled || !enabled_only))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }
}

#[async_trait]
impl TicketExt for MemoryStore {
    async fn save_ticket(&self, ticket: NewTicket) -> Result<Ticket, sqlx::Error> {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            subject: ticket.subject,
            description: ticket.description,
            status: TicketStatus::Open,
            priority: ticket.priority,
            creator_id: ticket.creator_id,
            assignee_id: ticket.assignee_id,
            rating: None,
            feedback: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            closed_at: None,
        };
        self.state.lock().unwrap().tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        Ok(self.state.lock().unwrap().tickets.get(&ticket_id).cloned())
    }

    async fn modify_ticket(
        &self,
        ticket_id: Uuid,
        mutation: TicketMutation,
    ) -> Result<TicketChange, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let stored = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or(ServiceError::TicketNotFound(ticket_id))?;

        let before = stored.clone();
        let mut ticket = before.clone();
        mutation(&mut ticket)?;
        ticket.touch(Utc::now());
        *stored = ticket.clone();

        Ok(TicketChange {
            before,
            after: ticket,
        })
    }

    async fn get_tickets(
        &self,
        filter: &TicketFilter,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, sqlx::Error> {
        let mut tickets: Vec<Ticket> = self
            .state
            .lock()
            .unwrap()
            .tickets
            .values()
            .filter(|t| ticket_matches(t, filter))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| {
            directed(compare_tickets(a, b, page.sort_by), page.direction).then(a.id.cmp(&b.id))
        });
        Ok(paginate(tickets, page))
    }

    async fn count_tickets_by_status(
        &self,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        Ok(TicketStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: state
                    .tickets
                    .values()
                    .filter(|t| t.status == *status)
                    .filter(|t| creator_id.map_or(true, |id| t.creator_id == id))
                    .count() as i64,
            })
            .collect())
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.attachments.retain(|_, a| a.ticket_id != ticket_id);
        state.comments.retain(|_, c| c.ticket_id != ticket_id);
        Ok(state.tickets.remove(&ticket_id).is_some())
    }
}

#[async_trait]
impl CommentExt for MemoryStore {
    async fn save_comment(
        &self,
        ticket_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Comment, sqlx::Error> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            ticket_id,
            author_id,
            content,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
        Ok(self.state.lock().unwrap().comments.get(&comment_id).cloned())
    }

    async fn get_ticket_comments(&self, ticket_id: Uuid) -> Result<Vec<Comment>, sqlx::Error> {
        let mut comments: Vec<Comment> = self
            .state
            .lock()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.ticket_id == ticket_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn update_comment(
        &self,
        comment_id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        Ok(state.comments.get_mut(&comment_id).map(|c| {
            c.content = content;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self.state.lock().unwrap().comments.remove(&comment_id).is_some())
    }
}

#[async_trait]
impl AttachmentExt for MemoryStore {
    async fn save_attachment(
        &self,
        ticket_id: Uuid,
        uploader_id: Uuid,
        attachment: NewAttachment,
    ) -> Result<Attachment, sqlx::Error> {
        let attachment = Attachment {
            id: Uuid::new_v4(),
            ticket_id,
            uploader_id,
            file_name: attachment.file_name,
            file_size: attachment.file_size,
            content_type: attachment.content_type,
            uploaded_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .attachments
            .insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn get_ticket_attachments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        let mut attachments: Vec<Attachment> = self
            .state
            .lock()
            .unwrap()
            .attachments
            .values()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect();
        attachments.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(attachments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_slices_requested_page() {
        let request = PageRequest::new(1, 2, UserSort::default(), SortDirection::Asc);

        let page = paginate(vec![1, 2, 3, 4, 5], &request);

        assert_eq!(page.content, vec![3, 4]);
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        assert!(!page.first);
        assert!(!page.last);
    }
}
