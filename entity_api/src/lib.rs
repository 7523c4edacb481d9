use chrono::Utc;
use log::info;
use sea_orm::{DatabaseConnection, TransactionTrait};

pub use entity::{
    group_members, group_messages, groups, messages, notification_kind, notifications, users, Id,
};

pub mod error;
pub mod group;
pub mod group_message;
pub mod message;
pub mod notification;
pub mod user;

fn seed_user(external_id: &str, username: &str, display_name: &str) -> users::Model {
    let now = Utc::now();
    users::Model {
        id: Id::nil(),
        external_id: external_id.to_owned(),
        username: username.to_owned(),
        display_name: Some(display_name.to_owned()),
        email: Some(format!("{username}@example.com")),
        avatar_url: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Populates an empty database with a few users, a group and some traffic
/// between them for local development.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), error::Error> {
    let txn = db.begin().await?;

    let ana = user::create(&txn, seed_user("seed|ana", "ana", "Ana Moreno")).await?;
    let ben = user::create(&txn, seed_user("seed|ben", "ben", "Ben Okafor")).await?;
    let chen = user::create(&txn, seed_user("seed|chen", "chen", "Chen Li")).await?;

    let now = Utc::now();
    let walkers = group::create(
        &txn,
        groups::Model {
            id: Id::nil(),
            name: "Morning Walkers".to_owned(),
            description: Some("Daily 30 minute walks, all paces welcome".to_owned()),
            created_by: ana.id,
            created_at: now.into(),
            updated_at: now.into(),
        },
        ana.id,
    )
    .await?;
    group::add_member(&txn, walkers.id, ben.id).await?;
    group::add_member(&txn, walkers.id, chen.id).await?;

    message::create(
        &txn,
        messages::Model {
            id: Id::nil(),
            sender_id: ana.id,
            receiver_id: ben.id,
            content: "How did the first week of the new routine go?".to_owned(),
            is_read: false,
            created_at: now.into(),
            updated_at: now.into(),
        },
        ana.id,
    )
    .await?;

    group_message::create(
        &txn,
        walkers.id,
        chen.id,
        "Same spot by the river tomorrow?".to_owned(),
    )
    .await?;

    notification::create(
        &txn,
        notifications::Model {
            id: Id::nil(),
            user_id: ben.id,
            actor_id: Some(ana.id),
            kind: notification_kind::NotificationKind::Message,
            entity_id: None,
            content: "Ana Moreno sent you a message".to_owned(),
            is_read: false,
            created_at: now.into(),
        },
    )
    .await?;

    txn.commit().await?;

    info!("Seeded users {}, {} and {}", ana.username, ben.username, chen.username);
    Ok(())
}
