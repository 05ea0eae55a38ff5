use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use catalog_sync::mapper::slugify;
use catalog_sync::{
    Catalog, CatalogError, LogLine, LogStore, MediaId, ProductDraft, ProductId, ProductSnapshot,
    ProductType, Sku, SkuIndex, StateError, StockStatus, TermId, VariationDraft, VariationId,
};

use crate::schema;

/// How long accumulated sync log lines stay readable, in seconds.
pub const LOG_RETENTION_SECS: i64 = 3600;

const CATEGORY_TAXONOMY: &str = "product_cat";

/// A SQLite-backed storefront catalog.
///
/// Serves as the destination catalog, the per-store SKU index and the sync
/// log store; all three share one connection.
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrations()
            .to_latest(&mut conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T, E: From<StoreError>>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, E> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))?;
        Ok(f(&mut conn)?)
    }

    pub fn product_count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Read a product's content fields back.
    pub fn product(&self, id: ProductId) -> Result<Option<ProductDraft>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT sku, title, body, excerpt FROM products WHERE id = ?1",
                    [id.0],
                    |row| {
                        Ok(ProductDraft {
                            sku: Sku::new(row.get::<_, String>(0)?),
                            title: row.get(1)?,
                            body: row.get(2)?,
                            excerpt: row.get(3)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    pub fn price(&self, id: ProductId) -> Result<Option<f64>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT price FROM products WHERE id = ?1", [id.0], |row| row.get(0))
                .optional()?
                .flatten())
        })
    }

    pub fn meta(&self, id: ProductId, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM product_meta WHERE product_id = ?1 AND key = ?2",
                    rusqlite::params![id.0, key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    /// Category names assigned to a product, in assignment order.
    pub fn product_categories(&self, id: ProductId) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.name FROM product_terms pt
                 JOIN terms t ON t.id = pt.term_id
                 WHERE pt.product_id = ?1 AND pt.taxonomy = ?2
                 ORDER BY pt.position",
            )?;
            let names = stmt
                .query_map(rusqlite::params![id.0, CATEGORY_TAXONOMY], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }

    /// Variations of a parent in creation order.
    pub fn variations(&self, parent: ProductId) -> Result<Vec<VariationDraft>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sku, title, price, stock_status, stock_quantity, attributes_json
                 FROM variations WHERE parent_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([parent.0], |row| {
                    let status: String = row.get(3)?;
                    let attributes: String = row.get(5)?;
                    Ok(VariationDraft {
                        sku: row.get(0)?,
                        title: row.get(1)?,
                        price: row.get(2)?,
                        stock_status: parse_stock_status(&status),
                        stock_quantity: row.get(4)?,
                        attributes: serde_json::from_str(&attributes).unwrap_or_default(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn media_url(&self, media: MediaId) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT url FROM media WHERE id = ?1", [media.0], |row| row.get(0))
                .optional()?)
        })
    }

    /// Shift a store's log lines into the past (for testing retention).
    pub fn backdate_logs(&self, store: &str, secs: i64) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sync_logs SET created_at = created_at - ?2 WHERE store = ?1",
                rusqlite::params![store, secs],
            )?;
            Ok(())
        })
    }
}

fn require_product(conn: &Connection, id: ProductId) -> Result<(), StoreError> {
    let exists = conn
        .query_row("SELECT 1 FROM products WHERE id = ?1", [id.0], |_| Ok(()))
        .optional()?;
    exists.ok_or(StoreError::NotFound(id))
}

fn touch(conn: &Connection, id: ProductId, sql: &str, value: impl rusqlite::ToSql) -> Result<(), StoreError> {
    let changed = conn.execute(sql, rusqlite::params![id.0, value, now_epoch_secs()])?;
    if changed == 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(())
}

fn ensure_term(conn: &Connection, taxonomy: &str, name: &str, slug: &str) -> Result<TermId, StoreError> {
    conn.execute(
        "INSERT INTO terms (taxonomy, slug, name) VALUES (?1, ?2, ?3)
         ON CONFLICT (taxonomy, slug) DO NOTHING",
        rusqlite::params![taxonomy, slug, name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM terms WHERE taxonomy = ?1 AND slug = ?2",
        rusqlite::params![taxonomy, slug],
        |row| row.get(0),
    )?;
    Ok(TermId(id))
}

fn assign_terms(
    conn: &mut Connection,
    id: ProductId,
    taxonomy: &str,
    terms: &[TermId],
) -> Result<(), StoreError> {
    require_product(conn, id)?;
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM product_terms WHERE product_id = ?1 AND taxonomy = ?2",
        rusqlite::params![id.0, taxonomy],
    )?;
    for (position, term) in terms.iter().enumerate() {
        tx.execute(
            "INSERT OR IGNORE INTO product_terms (product_id, taxonomy, term_id, position)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.0, taxonomy, term.0, position as i64],
        )?;
    }
    tx.commit()?;
    Ok(())
}

fn parse_stock_status(s: &str) -> StockStatus {
    match s {
        "outofstock" => StockStatus::OutOfStock,
        _ => StockStatus::InStock,
    }
}

#[async_trait::async_trait]
impl Catalog for CatalogStore {
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductId>, CatalogError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT id FROM products WHERE sku = ?1",
                    [sku.as_str()],
                    |row| row.get(0),
                )
                .optional()?
                .map(ProductId))
        })
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO products (sku, title, body, excerpt, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    draft.sku.as_str(),
                    draft.title,
                    draft.body,
                    draft.excerpt,
                    now_epoch_secs(),
                ],
            )?;
            Ok(ProductId(conn.last_insert_rowid()))
        })
    }

    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET title = ?2, body = ?3, excerpt = ?4, updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id.0, draft.title, draft.body, draft.excerpt, now_epoch_secs()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    async fn set_price(&self, id: ProductId, price: f64) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            touch(
                conn,
                id,
                "UPDATE products SET price = ?2, updated_at = ?3 WHERE id = ?1",
                price,
            )
        })
    }

    async fn set_product_type(&self, id: ProductId, kind: ProductType) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            touch(
                conn,
                id,
                "UPDATE products SET product_type = ?2, updated_at = ?3 WHERE id = ?1",
                kind.as_str(),
            )
        })
    }

    async fn set_stock(
        &self,
        id: ProductId,
        status: StockStatus,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET stock_status = ?2, stock_quantity = ?3, updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![id.0, status.as_str(), quantity, now_epoch_secs()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
    }

    async fn set_meta(&self, id: ProductId, key: &str, value: &str) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            require_product(conn, id)?;
            conn.execute(
                "INSERT INTO product_meta (product_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (product_id, key) DO UPDATE SET value = excluded.value",
                rusqlite::params![id.0, key, value],
            )?;
            Ok(())
        })
    }

    async fn ensure_attribute(&self, slug: &str, label: &str) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO attributes (slug, label) VALUES (?1, ?2)",
                rusqlite::params![slug, label],
            )?;
            Ok(())
        })
    }

    async fn ensure_attribute_term(
        &self,
        attribute_slug: &str,
        name: &str,
        slug: &str,
    ) -> Result<TermId, CatalogError> {
        self.with_conn(|conn| ensure_term(conn, attribute_slug, name, slug))
    }

    async fn set_attribute_terms(
        &self,
        id: ProductId,
        attribute_slug: &str,
        terms: &[TermId],
    ) -> Result<(), CatalogError> {
        self.with_conn(|conn| assign_terms(conn, id, attribute_slug, terms))
    }

    async fn ensure_category(&self, name: &str) -> Result<TermId, CatalogError> {
        self.with_conn(|conn| ensure_term(conn, CATEGORY_TAXONOMY, name, &slugify(name)))
    }

    async fn set_categories(&self, id: ProductId, terms: &[TermId]) -> Result<(), CatalogError> {
        self.with_conn(|conn| assign_terms(conn, id, CATEGORY_TAXONOMY, terms))
    }

    async fn remove_variations(&self, parent: ProductId) -> Result<usize, CatalogError> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM variations WHERE parent_id = ?1", [parent.0])?)
        })
    }

    async fn create_variation(
        &self,
        parent: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError> {
        self.with_conn(|conn| {
            require_product(conn, parent)?;
            let attributes = serde_json::to_string(&draft.attributes)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            conn.execute(
                "INSERT INTO variations
                    (parent_id, sku, title, price, stock_status, stock_quantity, attributes_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    parent.0,
                    draft.sku,
                    draft.title,
                    draft.price,
                    draft.stock_status.as_str(),
                    draft.stock_quantity,
                    attributes,
                ],
            )?;
            Ok(VariationId(conn.last_insert_rowid()))
        })
    }

    async fn attach_media(&self, id: ProductId, url: &str) -> Result<MediaId, CatalogError> {
        self.with_conn(|conn| {
            require_product(conn, id)?;
            conn.execute(
                "INSERT INTO media (product_id, url, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![id.0, url, now_epoch_secs()],
            )?;
            Ok(MediaId(conn.last_insert_rowid()))
        })
    }

    async fn set_featured_media(&self, id: ProductId, media: MediaId) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            touch(
                conn,
                id,
                "UPDATE products SET featured_media = ?2, updated_at = ?3 WHERE id = ?1",
                media.0,
            )
        })
    }

    async fn set_gallery(&self, id: ProductId, media: &[MediaId]) -> Result<(), CatalogError> {
        let ids: Vec<i64> = media.iter().map(|m| m.0).collect();
        self.with_conn(|conn| {
            let gallery =
                serde_json::to_string(&ids).map_err(|e| StoreError::Database(e.to_string()))?;
            touch(
                conn,
                id,
                "UPDATE products SET gallery_json = ?2, updated_at = ?3 WHERE id = ?1",
                gallery,
            )
        })
    }

    async fn delete_media(&self, media: MediaId) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM media WHERE id = ?1", [media.0])?;
            Ok(())
        })
    }

    async fn snapshot(&self, id: ProductId) -> Result<ProductSnapshot, CatalogError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT sku, product_type, featured_media, gallery_json,
                            (SELECT COUNT(*) FROM variations WHERE parent_id = products.id)
                     FROM products WHERE id = ?1",
                    [id.0],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<i64>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    },
                )
                .optional()?;

            let Some((sku, kind, featured, gallery, variations)) = row else {
                return Err(StoreError::NotFound(id));
            };
            let gallery: Vec<i64> = serde_json::from_str(&gallery).unwrap_or_default();

            Ok(ProductSnapshot {
                id,
                sku: Sku::new(sku),
                product_type: kind.as_deref().and_then(ProductType::parse),
                variation_count: variations as usize,
                featured_media: featured.map(MediaId),
                gallery: gallery.into_iter().map(MediaId).collect(),
            })
        })
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM products WHERE id = ?1", [id.0])?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            tracing::debug!(product = %id, "deleted product");
            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl SkuIndex for CatalogStore {
    async fn record(&self, store: &str, sku: &Sku, id: ProductId) -> Result<(), StateError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO imported_skus (store, sku, product_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (store, sku) DO UPDATE
                    SET product_id = excluded.product_id, updated_at = excluded.updated_at",
                rusqlite::params![store, sku.as_str(), id.0, now_epoch_secs()],
            )?;
            Ok(())
        })
    }

    async fn entries(&self, store: &str) -> Result<BTreeMap<Sku, ProductId>, StateError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT sku, product_id FROM imported_skus WHERE store = ?1")?;
            let entries = stmt
                .query_map([store], |row| {
                    Ok((Sku::new(row.get::<_, String>(0)?), ProductId(row.get(1)?)))
                })?
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            Ok(entries)
        })
    }

    async fn forget(&self, store: &str, sku: &Sku) -> Result<(), StateError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM imported_skus WHERE store = ?1 AND sku = ?2",
                rusqlite::params![store, sku.as_str()],
            )?;
            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl LogStore for CatalogStore {
    async fn append(&self, store: &str, lines: &[LogLine]) -> Result<(), StateError> {
        let rendered: Vec<String> = lines.iter().map(ToString::to_string).collect();
        self.with_conn(|conn| {
            let now = now_epoch_secs();
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM sync_logs WHERE store = ?1 AND created_at < ?2",
                rusqlite::params![store, now - LOG_RETENTION_SECS],
            )?;
            for line in &rendered {
                tx.execute(
                    "INSERT INTO sync_logs (store, line, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![store, line, now],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    async fn lines(&self, store: &str) -> Result<Vec<String>, StateError> {
        self.with_conn(|conn| {
            let cutoff = now_epoch_secs() - LOG_RETENTION_SECS;
            let mut stmt = conn.prepare(
                "SELECT line FROM sync_logs WHERE store = ?1 AND created_at >= ?2 ORDER BY id",
            )?;
            let lines = stmt
                .query_map(rusqlite::params![store, cutoff], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(lines)
        })
    }

    async fn clear(&self, store: &str) -> Result<(), StateError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sync_logs WHERE store = ?1", [store])?;
            Ok(())
        })
    }
}

/// Errors specific to store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("product not found: {0}")]
    NotFound(ProductId),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for StateError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

fn now_epoch_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
