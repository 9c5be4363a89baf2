//! Chat messages stored in PostgreSQL.
use async_trait::async_trait;
use tracing::debug;

use super::{sort_columns, Repository};
use crate::model::{ChatMessage, Error, FromRow, Page, Pageable, Pool};

/// Repository backed by the `chat_message` table.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: Pool,
}

impl PostgresRepository {
    /// The schema must already exist, see [`crate::model::migrate`].
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn insert_query() -> String {
        format!(
            r#"INSERT INTO "{}" ("message", "user_name", "created_at") VALUES ($1, $2, $3) RETURNING {}"#,
            ChatMessage::TABLE,
            Self::columns(),
        )
    }

    /// Columns and sort order only come from [`ChatMessage::COLUMNS`],
    /// never from the request.
    fn select_page_query(pageable: &Pageable) -> String {
        let order_by = sort_columns(pageable)
            .into_iter()
            .map(|(column, direction)| format!(r#""{}" {}"#, column, direction.to_sql()))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"SELECT {} FROM "{}" ORDER BY {} LIMIT $1 OFFSET $2"#,
            Self::columns(),
            ChatMessage::TABLE,
            order_by,
        )
    }

    fn columns() -> String {
        ChatMessage::COLUMNS
            .iter()
            .map(|column| format!(r#""{}""#, column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage, Error> {
        let mut transaction = self.pool.transaction().await?;

        let row = transaction
            .query_cached(
                &Self::insert_query(),
                &[&message.message, &message.user_name, &message.created_at],
            )
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoRows("INSERT ... RETURNING"))?;

        let message = ChatMessage::from_row(row)?;
        transaction.commit().await?;

        debug!("inserted chat message {:?}", message.id);

        Ok(message)
    }

    async fn select_page(&self, pageable: &Pageable) -> Result<Page<ChatMessage>, Error> {
        let mut transaction = self.pool.transaction().await?;

        let count = format!(r#"SELECT COUNT(*) FROM "{}""#, ChatMessage::TABLE);
        let total: i64 = match transaction.query_cached(&count, &[]).await?.first() {
            Some(row) => row.try_get(0)?,
            None => return Err(Error::NoRows("SELECT COUNT(*)")),
        };

        let rows = transaction
            .query_cached(
                &Self::select_page_query(pageable),
                &[&pageable.size(), &pageable.offset()],
            )
            .await?;

        let content = rows
            .into_iter()
            .map(ChatMessage::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        transaction.commit().await?;

        Ok(Page::new(content, pageable.clone(), total))
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<ChatMessage>, Error> {
        let mut transaction = self.pool.transaction().await?;

        let query = format!(
            r#"SELECT {} FROM "{}" WHERE "id" = $1"#,
            Self::columns(),
            ChatMessage::TABLE
        );

        let message = match transaction.query_cached(&query, &[&id]).await?.into_iter().next() {
            Some(row) => Some(ChatMessage::from_row(row)?),
            None => None,
        };

        transaction.commit().await?;

        Ok(message)
    }
}
