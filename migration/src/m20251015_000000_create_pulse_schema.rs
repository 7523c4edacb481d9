use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CREATE_TABLES: &[&str] = &[
    r#"
        CREATE TABLE IF NOT EXISTS pulse.users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            external_id VARCHAR(255) NOT NULL UNIQUE,
            username VARCHAR(255) NOT NULL UNIQUE,
            display_name VARCHAR(255),
            email VARCHAR(255),
            avatar_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS pulse.messages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            sender_id UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            receiver_id UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS pulse.groups (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            description TEXT,
            created_by UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS pulse.group_members (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            group_id UUID NOT NULL REFERENCES pulse.groups(id) ON DELETE CASCADE,
            user_id UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

            UNIQUE(group_id, user_id)
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS pulse.group_messages (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            group_id UUID NOT NULL REFERENCES pulse.groups(id) ON DELETE CASCADE,
            sender_id UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
    r#"
        CREATE TABLE IF NOT EXISTS pulse.notifications (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES pulse.users(id) ON DELETE CASCADE,
            actor_id UUID REFERENCES pulse.users(id) ON DELETE SET NULL,
            kind pulse.notification_kind NOT NULL,
            entity_id UUID,
            content TEXT NOT NULL,
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#,
];

// Conversation lookups filter on both participants and sort by time; the
// notification badge counts unread rows per recipient.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_messages_sender_receiver_created_at
     ON pulse.messages(sender_id, receiver_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_receiver_unread
     ON pulse.messages(receiver_id) WHERE is_read = FALSE",
    "CREATE INDEX IF NOT EXISTS idx_group_members_user_id
     ON pulse.group_members(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_group_messages_group_created_at
     ON pulse.group_messages(group_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_created_at
     ON pulse.notifications(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user_unread
     ON pulse.notifications(user_id) WHERE is_read = FALSE",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("CREATE SCHEMA IF NOT EXISTS pulse;")
            .await?;

        db.execute_unprepared("SET search_path TO pulse, public;")
            .await?;

        db.execute_unprepared(
            "CREATE TYPE pulse.notification_kind AS ENUM \
             ('like', 'comment', 'follow', 'mention', 'message', 'group_message')",
        )
        .await?;

        for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES) {
            db.execute_unprepared(statement).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // CASCADE removes every table, index and type in the schema
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS pulse CASCADE;")
            .await?;

        Ok(())
    }
}
