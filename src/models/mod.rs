pub mod pagination;
pub mod ticketmodel;
pub mod usermodel;
