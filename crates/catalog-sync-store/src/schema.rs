use rusqlite_migration::{M, Migrations};

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE products (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sku             TEXT NOT NULL UNIQUE,
                title           TEXT NOT NULL,
                body            TEXT NOT NULL,
                excerpt         TEXT NOT NULL,
                price           REAL,
                product_type    TEXT,
                stock_status    TEXT,
                stock_quantity  INTEGER,
                featured_media  INTEGER,
                gallery_json    TEXT NOT NULL DEFAULT '[]',
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE product_meta (
                product_id      INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                key             TEXT NOT NULL,
                value           TEXT NOT NULL,
                PRIMARY KEY (product_id, key)
            );

            CREATE TABLE variations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id       INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                sku             TEXT NOT NULL,
                title           TEXT NOT NULL,
                price           REAL NOT NULL,
                stock_status    TEXT NOT NULL,
                stock_quantity  INTEGER NOT NULL,
                attributes_json TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX idx_variations_parent ON variations(parent_id);

            CREATE TABLE attributes (
                slug            TEXT PRIMARY KEY,
                label           TEXT NOT NULL
            );

            CREATE TABLE terms (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                taxonomy        TEXT NOT NULL,
                slug            TEXT NOT NULL,
                name            TEXT NOT NULL,
                UNIQUE (taxonomy, slug)
            );

            CREATE TABLE product_terms (
                product_id      INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                taxonomy        TEXT NOT NULL,
                term_id         INTEGER NOT NULL REFERENCES terms(id),
                position        INTEGER NOT NULL,
                PRIMARY KEY (product_id, taxonomy, term_id)
            );

            CREATE TABLE media (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id      INTEGER REFERENCES products(id) ON DELETE CASCADE,
                url             TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );",
        ),
        M::up(
            "CREATE TABLE imported_skus (
                store           TEXT NOT NULL,
                sku             TEXT NOT NULL,
                product_id      INTEGER NOT NULL,
                updated_at      TEXT NOT NULL,
                PRIMARY KEY (store, sku)
            );

            CREATE TABLE sync_logs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                store           TEXT NOT NULL,
                line            TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX idx_sync_logs_store ON sync_logs(store, id);",
        ),
    ])
}
