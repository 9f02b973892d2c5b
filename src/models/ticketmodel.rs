use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn to_str(&self) -> &str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::InProgress => "IN_PROGRESS",
            TicketStatus::Resolved => "RESOLVED",
            TicketStatus::Closed => "CLOSED",
        }
    }

    /// Resolved and closed tickets are the only ones that can be rated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn to_str(&self) -> &str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
            TicketPriority::Urgent => "URGENT",
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub rating: Option<i32>,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Refreshes `updated_at` and stamps `resolved_at`/`closed_at` the first
    /// time the status reaches them. Existing stamps are never replaced.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.status == TicketStatus::Resolved && self.resolved_at.is_none() {
            self.resolved_at = Some(now);
        }
        if self.status == TicketStatus::Closed && self.closed_at.is_none() {
            self.closed_at = Some(now);
        }
    }
}

/// Fields supplied when opening a ticket. Status always starts at `Open`.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Ticket state before and after a unit of work, so callers can decide
/// which notifications the change deserves.
#[derive(Debug, Clone)]
pub struct TicketChange {
    pub before: Ticket,
    pub after: Ticket,
}

impl TicketChange {
    pub fn status_changed(&self) -> bool {
        self.before.status != self.after.status
    }

    pub fn assignee_changed(&self) -> bool {
        self.before.assignee_id != self.after.assignee_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub uploader_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
}

/// Criteria for ticket listings. Every `Some` field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub creator_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    /// Matches tickets created by or assigned to this user.
    pub involving: Option<Uuid>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    /// Case-insensitive substring over subject and description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: TicketStatus,
    pub count: i64,
}
