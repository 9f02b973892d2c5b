use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{like_pattern, DBClient, TicketMutation};
use crate::{
    models::{
        pagination::{Page, PageRequest, TicketSort},
        ticketmodel::*,
    },
    service::error::ServiceError,
};

#[async_trait]
pub trait TicketExt {
    async fn save_ticket(&self, ticket: NewTicket) -> Result<Ticket, sqlx::Error>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error>;

    /// Loads and locks the ticket, runs `mutation`, stamps timestamps and
    /// persists, all in one transaction.
    async fn modify_ticket(
        &self,
        ticket_id: Uuid,
        mutation: TicketMutation,
    ) -> Result<TicketChange, ServiceError>;

    async fn get_tickets(
        &self,
        filter: &TicketFilter,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, sqlx::Error>;

    /// Per-status counts, restricted to one creator when given.
    async fn count_tickets_by_status(
        &self,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<StatusCount>, sqlx::Error>;

    /// Deletes the ticket together with its comments and attachments.
    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error>;
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
    builder.push(" WHERE TRUE");

    if let Some(creator_id) = filter.creator_id {
        builder.push(" AND creator_id = ").push_bind(creator_id);
    }
    if let Some(assignee_id) = filter.assignee_id {
        builder.push(" AND assignee_id = ").push_bind(assignee_id);
    }
    if let Some(user_id) = filter.involving {
        builder
            .push(" AND (creator_id = ")
            .push_bind(user_id)
            .push(" OR assignee_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        builder
            .push(" AND (LOWER(subject) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl TicketExt for DBClient {
    async fn save_ticket(&self, ticket: NewTicket) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (subject, description, status, priority, creator_id, assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(ticket.subject)
        .bind(ticket.description)
        .bind(TicketStatus::Open)
        .bind(ticket.priority)
        .bind(ticket.creator_id)
        .bind(ticket.assignee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn modify_ticket(
        &self,
        ticket_id: Uuid,
        mutation: TicketMutation,
    ) -> Result<TicketChange, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
            .bind(ticket_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ServiceError::TicketNotFound(ticket_id))?;

        let mut ticket = before.clone();
        mutation(&mut ticket)?;
        ticket.touch(Utc::now());

        let after = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET subject = $2, description = $3, status = $4, priority = $5,
                assignee_id = $6, rating = $7, feedback = $8, updated_at = $9,
                resolved_at = $10, closed_at = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.status)
        .bind(ticket.priority)
        .bind(ticket.assignee_id)
        .bind(ticket.rating)
        .bind(&ticket.feedback)
        .bind(ticket.updated_at)
        .bind(ticket.resolved_at)
        .bind(ticket.closed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TicketChange { before, after })
    }

    async fn get_tickets(
        &self,
        filter: &TicketFilter,
        page: &PageRequest<TicketSort>,
    ) -> Result<Page<Ticket>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM tickets");
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(page.order_clause())
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let tickets = query
            .build_query_as::<Ticket>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(tickets, total, page))
    }

    async fn count_tickets_by_status(
        &self,
        creator_id: Option<Uuid>,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (TicketStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM tickets
            WHERE ($1::uuid IS NULL OR creator_id = $1)
            GROUP BY status
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TicketStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: rows
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect())
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM attachments WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM comments WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
