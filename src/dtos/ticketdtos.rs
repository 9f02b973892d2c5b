use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{
    pagination::{PageRequest, SortDirection, TicketSort, DEFAULT_PAGE_SIZE},
    ticketmodel::{
        Attachment, Comment, NewAttachment, StatusCount, Ticket, TicketFilter, TicketPriority,
        TicketStatus,
    },
};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketDto {
    #[validate(
        length(max = 200, message = "Subject must not exceed 200 characters"),
        custom = "not_blank"
    )]
    pub subject: String,

    #[validate(custom = "not_blank")]
    pub description: String,

    #[serde(default)]
    pub priority: TicketPriority,

    pub assignee_id: Option<Uuid>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketDto {
    #[validate(
        length(max = 200, message = "Subject must not exceed 200 characters"),
        custom = "not_blank"
    )]
    pub subject: String,

    #[validate(custom = "not_blank")]
    pub description: String,

    #[serde(default)]
    pub priority: TicketPriority,
}

/// A missing or null `assigneeId` unassigns the ticket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicketDto {
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusDto {
    pub status: TicketStatus,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RateTicketDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(max = 2000, message = "Feedback must not exceed 2000 characters"))]
    pub feedback: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CommentDto {
    #[validate(
        length(max = 5000, message = "Comment must not exceed 5000 characters"),
        custom = "not_blank"
    )]
    pub content: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,

    #[validate(range(min = 0, message = "File size must not be negative"))]
    pub file_size: i64,

    #[validate(length(min = 1, max = 255, message = "Content type is required"))]
    pub content_type: String,
}

impl From<AttachmentDto> for NewAttachment {
    fn from(dto: AttachmentDto) -> Self {
        NewAttachment {
            file_name: dto.file_name,
            file_size: dto.file_size,
            content_type: dto.content_type,
        }
    }
}

/// Query string accepted by every ticket listing.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketQueryDto {
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u32>,
    pub sort_by: Option<TicketSort>,
    pub sort_dir: Option<SortDirection>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<Uuid>,
    pub search: Option<String>,
}

impl TicketQueryDto {
    pub fn page_request(&self) -> PageRequest<TicketSort> {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            self.sort_by.unwrap_or_default(),
            self.sort_dir.unwrap_or_default(),
        )
    }

    pub fn filter(&self) -> TicketFilter {
        TicketFilter {
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee_id,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketData {
    pub ticket: Ticket,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketResponseDto {
    pub status: String,
    pub data: TicketData,
}

impl TicketResponseDto {
    pub fn success(ticket: Ticket) -> Self {
        TicketResponseDto {
            status: "success".to_string(),
            data: TicketData { ticket },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStatsDto {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

impl TicketStatsDto {
    pub fn from_counts(by_status: Vec<StatusCount>) -> Self {
        TicketStatsDto {
            total: by_status.iter().map(|c| c.count).sum(),
            by_status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponseDto {
    pub status: String,
    pub data: Comment,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentResponseDto {
    pub status: String,
    pub data: Attachment,
}
