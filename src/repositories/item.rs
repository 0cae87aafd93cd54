use crate::{
    entities::{Item, ItemRow},
    items::filter::{Direction, ItemQuery, Predicate},
};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, user_id, url, resolved_url, mime_type, title, has_image, has_video, date_resolved, unread";

/// Returned (inside `anyhow::Error`) by [`ItemRepositoryTrait::insert`] when the
/// user already has an item with the same resolved URL.
#[derive(Debug, thiserror::Error)]
#[error("item for {resolved_url} already exists for user {user_id}")]
pub struct DuplicateItem {
    pub user_id: Uuid,
    pub resolved_url: String,
}

/// Storage boundary for items. Listing consumes a composed [`ItemQuery`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepositoryTrait: Send + Sync {
    async fn find_by_user_and_resolved_url(
        &self,
        user_id: Uuid,
        resolved_url: &str,
    ) -> Result<Option<Item>>;

    async fn find_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Item>>;

    /// Fails with [`DuplicateItem`] when `(user_id, resolved_url)` is taken.
    async fn insert(&self, item: &Item) -> Result<Item>;

    /// Persists the mutable fields (`unread`, `tags`) of an existing item.
    async fn update(&self, item: &Item) -> Result<Item>;

    async fn delete_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

    async fn find_all(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct ItemRepository {
    pool: Pool<Postgres>,
}

impl ItemRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn load_tags(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, BTreeSet<String>>> {
        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT item_id, name FROM item_tags WHERE item_id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        let mut tags: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for (item_id, name) in rows {
            tags.entry(item_id).or_default().insert(name);
        }
        Ok(tags)
    }

    async fn attach_tags(&self, rows: Vec<ItemRow>) -> Result<Vec<Item>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut tags = self.load_tags(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let item_tags = tags.remove(&row.id).unwrap_or_default();
                Item::from_row(row, item_tags)
            })
            .collect())
    }

    async fn find_one(&self, mut builder: QueryBuilder<'_, Postgres>) -> Result<Option<Item>> {
        let row: Option<ItemRow> = builder.build_query_as().fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn select_items<'a>() -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM items WHERE "))
}

/// Appends `predicate` as a SQL boolean expression over the `items` table.
pub(crate) fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Owner(user_id) => {
            builder.push("user_id = ").push_bind(*user_id);
        }
        Predicate::Unread(unread) => {
            builder.push("unread = ").push_bind(*unread);
        }
        Predicate::MimeType(mime_type) => {
            builder.push("mime_type = ").push_bind(*mime_type);
        }
        Predicate::AnyTag(tags) => {
            builder
                .push("EXISTS (SELECT 1 FROM item_tags t WHERE t.item_id = items.id AND t.name = ANY(")
                .push_bind(tags.iter().cloned().collect::<Vec<String>>())
                .push("))");
        }
        Predicate::All(conditions) if conditions.is_empty() => {
            builder.push("TRUE");
        }
        Predicate::All(conditions) => {
            builder.push("(");
            for (i, condition) in conditions.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_predicate(builder, condition);
            }
            builder.push(")");
        }
    }
}

pub(crate) fn push_ordering(builder: &mut QueryBuilder<'_, Postgres>, query: &ItemQuery) {
    let direction = match query.ordering.direction {
        Direction::Asc => " ASC",
        Direction::Desc => " DESC",
    };
    builder
        .push(" ORDER BY ")
        .push(query.ordering.key.column())
        .push(direction)
        .push(", id")
        .push(direction)
        .push(" LIMIT ")
        .push_bind(query.limit);
}

async fn replace_tags(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    item_id: Uuid,
    tags: &BTreeSet<String>,
) -> Result<()> {
    sqlx::query("DELETE FROM item_tags WHERE item_id = $1")
        .bind(item_id)
        .execute(&mut **tx)
        .await?;

    if !tags.is_empty() {
        sqlx::query("INSERT INTO item_tags (item_id, name) SELECT $1, UNNEST($2::text[])")
            .bind(item_id)
            .bind(tags.iter().cloned().collect::<Vec<String>>())
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl ItemRepositoryTrait for ItemRepository {
    async fn find_by_user_and_resolved_url(
        &self,
        user_id: Uuid,
        resolved_url: &str,
    ) -> Result<Option<Item>> {
        let mut builder = select_items();
        builder
            .push("user_id = ")
            .push_bind(user_id)
            .push(" AND resolved_url = ")
            .push_bind(resolved_url.to_string());
        self.find_one(builder).await
    }

    async fn find_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<Item>> {
        let mut builder = select_items();
        builder
            .push("user_id = ")
            .push_bind(user_id)
            .push(" AND id = ")
            .push_bind(id);
        self.find_one(builder).await
    }

    async fn insert(&self, item: &Item) -> Result<Item> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items
                  (id, user_id, url, resolved_url, mime_type, title, has_image, has_video, date_resolved, unread)
            VALUES ($1, $2,      $3,  $4,           $5,        $6,    $7,        $8,        $9,            $10)
            "#,
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(&item.url)
        .bind(&item.resolved_url)
        .bind(item.mime_type)
        .bind(&item.title)
        .bind(item.has_image)
        .bind(item.has_video)
        .bind(item.date_resolved)
        .bind(item.unread)
        .execute(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                anyhow::Error::new(DuplicateItem {
                    user_id: item.user_id,
                    resolved_url: item.resolved_url.clone(),
                })
            }
            other => other.into(),
        })?;

        replace_tags(&mut tx, item.id, &item.tags).await?;
        tx.commit().await?;

        Ok(item.clone())
    }

    async fn update(&self, item: &Item) -> Result<Item> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE items SET unread = $1 WHERE id = $2 AND user_id = $3")
            .bind(item.unread)
            .bind(item.id)
            .bind(item.user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Item {} not found", item.id);
        }

        replace_tags(&mut tx, item.id, &item.tags).await?;
        tx.commit().await?;

        Ok(item.clone())
    }

    async fn delete_by_user_and_id(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_all(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let mut builder = select_items();
        push_predicate(&mut builder, &query.predicate);
        push_ordering(&mut builder, query);

        let rows: Vec<ItemRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        self.attach_tags(rows).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
