pub mod attachmentdb;
pub mod commentdb;
#[cfg(test)]
pub mod memory;
pub mod ticketdb;
pub mod userdb;

use sqlx::{Pool, Postgres};

use crate::{models::ticketmodel::Ticket, service::error::ServiceError};

pub use attachmentdb::AttachmentExt;
pub use commentdb::CommentExt;
pub use ticketdb::TicketExt;
pub use userdb::UserExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// Everything the services need from persistence.
pub trait Store: UserExt + TicketExt + CommentExt + AttachmentExt + Send + Sync {}

impl<T> Store for T where T: UserExt + TicketExt + CommentExt + AttachmentExt + Send + Sync {}

/// Check-and-mutate step run against a locked ticket inside one unit of
/// work. Returning an error aborts the unit of work without writing.
pub type TicketMutation = Box<dyn FnOnce(&mut Ticket) -> Result<(), ServiceError> + Send>;

/// Lower-cased `%term%` pattern with LIKE wildcards in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Name of the violated unique constraint, if that is what `err` is.
pub fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
