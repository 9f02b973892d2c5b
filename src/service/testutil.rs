use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    db::{memory::MemoryStore, UserExt},
    models::usermodel::{NewUser, User, UserRole},
    service::{
        comment_service::CommentService,
        notification_service::{Notification, NotificationService},
        ticket_service::TicketService,
        user_service::UserService,
    },
};

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub users: UserService,
    pub tickets: TicketService,
    pub comments: CommentService,
    pub receiver: UnboundedReceiver<Notification>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let (notifications, receiver) = NotificationService::new();

        TestContext {
            users: UserService::new(store.clone(), notifications.clone()),
            tickets: TicketService::new(store.clone(), notifications.clone()),
            comments: CommentService::new(store.clone(), notifications),
            store,
            receiver,
        }
    }
}

/// Inserts a user straight into the store, skipping hashing and the
/// welcome email.
pub async fn seed_user(ctx: &TestContext, username: &str, role: UserRole) -> User {
    ctx.store
        .save_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "$argon2id$not-a-real-hash".to_string(),
            first_name: username.to_string(),
            last_name: "Example".to_string(),
            role,
        })
        .await
        .unwrap()
}

pub fn drain(receiver: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut notifications = Vec::new();
    while let Ok(notification) = receiver.try_recv() {
        notifications.push(notification);
    }
    notifications
}
