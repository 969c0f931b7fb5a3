pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- subscribers table
CREATE TABLE IF NOT EXISTS subscribers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_subscribers_email ON subscribers(email);

-- search_terms table
CREATE TABLE IF NOT EXISTS search_terms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subscriber_id INTEGER NOT NULL REFERENCES subscribers(id),
    term TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_terms_subscriber_id ON search_terms(subscriber_id);

-- items table (one row per distinct feed item address, markup cached)
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL UNIQUE,
    markup TEXT,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- alert_links table (which subscriber was notified about which item)
CREATE TABLE IF NOT EXISTS alert_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subscriber_id INTEGER NOT NULL REFERENCES subscribers(id),
    item_id INTEGER NOT NULL REFERENCES items(id),
    sent_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_alert_links_subscriber_id ON alert_links(subscriber_id);
"#;
