use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A whitelisted ordering column. Only these names ever reach SQL.
pub trait SortField: Copy + Send + Sync {
    fn column(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TicketSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Subject,
    Status,
    Priority,
}

impl SortField for TicketSort {
    fn column(&self) -> &'static str {
        match self {
            TicketSort::CreatedAt => "created_at",
            TicketSort::UpdatedAt => "updated_at",
            TicketSort::Subject => "subject",
            TicketSort::Status => "status",
            TicketSort::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum UserSort {
    #[default]
    CreatedAt,
    Username,
    Email,
    FirstName,
    LastName,
    Role,
}

impl SortField for UserSort {
    fn column(&self) -> &'static str {
        match self {
            UserSort::CreatedAt => "created_at",
            UserSort::Username => "username",
            UserSort::Email => "email",
            UserSort::FirstName => "first_name",
            UserSort::LastName => "last_name",
            UserSort::Role => "role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<S> {
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub sort_by: S,
    pub direction: SortDirection,
}

impl<S: SortField> PageRequest<S> {
    pub fn new(page: u32, size: u32, sort_by: S, direction: SortDirection) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort_by,
            direction,
        }
    }

    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    pub fn offset(&self) -> i64 {
        self.page as i64 * self.size as i64
    }

    pub fn order_clause(&self) -> String {
        format!("{} {}", self.sort_by.column(), self.direction.to_sql())
    }
}

impl<S: SortField + Default> Default for PageRequest<S> {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE, S::default(), SortDirection::Desc)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub size: u32,
    pub number: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new<S>(content: Vec<T>, total_elements: i64, request: &PageRequest<S>) -> Self {
        let size = request.size.max(1);
        let total_pages = (total_elements + size as i64 - 1) / size as i64;
        Page {
            content,
            total_elements,
            total_pages,
            size,
            number: request.page,
            first: request.page == 0,
            last: request.page as i64 + 1 >= total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            size: self.size,
            number: self.number,
            first: self.first,
            last: self.last,
        }
    }
}
