use std::collections::HashSet;

use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::Subscriber;

use super::schema::SCHEMA;

/// Outcome of the alert-link insert closure, mapped to an error outside the
/// connection call.
enum LinkInsert {
    Inserted,
    NoSubscriber,
    NoItem,
}

/// Owns the four record sets (subscribers, search terms, items, alert links).
/// Every method is its own atomic unit; no transaction spans two calls.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Subscriber operations

    /// Fails with `DuplicateKey` if the email is already registered.
    pub async fn add_subscriber(&self, name: &str, email: &str) -> Result<i64> {
        let (name, email_param) = (name.to_string(), email.to_string());
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO subscribers (name, email) VALUES (?1, ?2)",
                    params![name, email_param],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| duplicate_key(e, email))?;
        Ok(id)
    }

    /// Removes the subscriber's search terms and alert links, then the
    /// subscriber row, in one transaction. Removing an email that was never
    /// registered affects zero rows and is not an error.
    pub async fn remove_subscriber(&self, email: &str) -> Result<()> {
        let email = email.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM search_terms WHERE subscriber_id IN
                     (SELECT id FROM subscribers WHERE email = ?1)",
                    params![email],
                )?;
                tx.execute(
                    "DELETE FROM alert_links WHERE subscriber_id IN
                     (SELECT id FROM subscribers WHERE email = ?1)",
                    params![email],
                )?;
                tx.execute("DELETE FROM subscribers WHERE email = ?1", params![email])?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let subscribers = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT name, email FROM subscribers ORDER BY id")?;
                let subscribers = stmt
                    .query_map([], |row| {
                        Ok(Subscriber {
                            name: row.get(0)?,
                            email: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscribers)
            })
            .await?;
        Ok(subscribers)
    }

    // Search term operations

    /// Inserts a term for the subscriber keyed by email. An unknown email
    /// inserts zero rows without erroring.
    pub async fn add_search_term(&self, email: &str, term: &str) -> Result<()> {
        let (email_param, term) = (email.to_string(), term.to_string());
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "INSERT INTO search_terms (term, subscriber_id)
                     SELECT ?1, id FROM subscribers WHERE email = ?2",
                    params![term, email_param],
                )?;
                Ok(n)
            })
            .await?;
        if inserted == 0 {
            tracing::debug!("no subscriber {}, term not stored", email);
        }
        Ok(())
    }

    /// Deletes the subscriber's rows matching the exact term text; zero
    /// matching rows is not an error.
    pub async fn remove_search_term(&self, email: &str, term: &str) -> Result<()> {
        let (email, term) = (email.to_string(), term.to_string());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM search_terms WHERE subscriber_id IN
                     (SELECT id FROM subscribers WHERE email = ?1) AND term = ?2",
                    params![email, term],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Terms in insertion order. Fails with `UnknownSubscriber` when the
    /// email is absent from the subscriber set, as opposed to present with
    /// zero terms, which returns an empty vec.
    pub async fn get_search_terms(&self, email: &str) -> Result<Vec<String>> {
        let email_param = email.to_string();
        let terms = self
            .conn
            .call(move |conn| {
                let id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM subscribers WHERE email = ?1",
                        params![email_param],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(id) = id else {
                    return Ok(None);
                };
                let mut stmt = conn.prepare(
                    "SELECT term FROM search_terms WHERE subscriber_id = ?1 ORDER BY id",
                )?;
                let terms = stmt
                    .query_map(params![id], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(Some(terms))
            })
            .await?;
        terms.ok_or_else(|| AppError::UnknownSubscriber(email.to_string()))
    }

    // Item operations

    /// Records a distinct item address with its optional cached markup.
    /// Fails with `DuplicateKey` if the address is already recorded; callers
    /// rely on that failure to recognize already-seen items.
    pub async fn record_item(&self, address: &str, markup: Option<String>) -> Result<()> {
        let address_param = address.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO items (address, markup) VALUES (?1, ?2)",
                    params![address_param, markup],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| duplicate_key(e, address))?;
        Ok(())
    }

    pub async fn list_known_addresses(&self) -> Result<HashSet<String>> {
        let addresses = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT address FROM items")?;
                let addresses = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<HashSet<String>, _>>()?;
                Ok(addresses)
            })
            .await?;
        Ok(addresses)
    }

    // Alert link operations

    /// Resolves both natural keys and links them. Unlike `add_search_term`,
    /// an unresolved key is a hard failure here: `UnknownSubscriber` or
    /// `UnknownItem` respectively.
    pub async fn record_alert_link(&self, email: &str, address: &str) -> Result<()> {
        let (email_param, address_param) = (email.to_string(), address.to_string());
        let outcome = self
            .conn
            .call(move |conn| {
                let subscriber_id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM subscribers WHERE email = ?1",
                        params![email_param],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(subscriber_id) = subscriber_id else {
                    return Ok(LinkInsert::NoSubscriber);
                };
                let item_id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM items WHERE address = ?1",
                        params![address_param],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(item_id) = item_id else {
                    return Ok(LinkInsert::NoItem);
                };
                conn.execute(
                    "INSERT INTO alert_links (subscriber_id, item_id) VALUES (?1, ?2)",
                    params![subscriber_id, item_id],
                )?;
                Ok(LinkInsert::Inserted)
            })
            .await?;

        match outcome {
            LinkInsert::Inserted => Ok(()),
            LinkInsert::NoSubscriber => Err(AppError::UnknownSubscriber(email.to_string())),
            LinkInsert::NoItem => Err(AppError::UnknownItem(address.to_string())),
        }
    }

    /// Addresses the subscriber was alerted about, in alert insertion order.
    pub async fn get_alerted_addresses(&self, email: &str) -> Result<Vec<String>> {
        let email = email.to_string();
        let addresses = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT i.address FROM alert_links l
                     JOIN items i ON l.item_id = i.id
                     JOIN subscribers s ON l.subscriber_id = s.id
                     WHERE s.email = ?1
                     ORDER BY l.id",
                )?;
                let addresses = stmt
                    .query_map(params![email], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(addresses)
            })
            .await?;
        Ok(addresses)
    }
}

/// Maps a unique-constraint failure to `DuplicateKey` carrying the natural
/// key that collided; everything else passes through.
fn duplicate_key(err: tokio_rusqlite::Error, key: &str) -> AppError {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::DuplicateKey(key.to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMAIL: &str = "god_of_wine@iron_throne.com";
    const ADDRESS: &str = "https://www.bobby-b.com/god_of_wine.html";

    #[tokio::test]
    async fn add_and_list_subscribers() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        store
            .add_subscriber("jon snow", "jon@secret_targ.edu")
            .await
            .unwrap();

        let subscribers = store.list_subscribers().await.unwrap();
        assert_eq!(subscribers.len(), 2);
        assert_eq!(subscribers[0].name, "bobby b");
        assert_eq!(subscribers[0].email, EMAIL);
        assert_eq!(subscribers[1].email, "jon@secret_targ.edu");
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();

        let err = store.add_subscriber("bobby b", EMAIL).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));

        // Subscriber set unchanged by the failed insert.
        assert_eq!(store.list_subscribers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_subscriber_cascades_terms_and_links() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        store.add_search_term(EMAIL, "WINE").await.unwrap();
        store.add_search_term(EMAIL, "WARHAMMERS").await.unwrap();
        store.record_item(ADDRESS, None).await.unwrap();
        store.record_alert_link(EMAIL, ADDRESS).await.unwrap();

        store.remove_subscriber(EMAIL).await.unwrap();
        assert!(store.list_subscribers().await.unwrap().is_empty());

        // Re-registering the same email gets a clean slate: no orphaned
        // terms or links survive from the removed row.
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        assert!(store.get_search_terms(EMAIL).await.unwrap().is_empty());
        assert!(store.get_alerted_addresses(EMAIL).await.unwrap().is_empty());

        // The shared item row is untouched.
        assert!(store.list_known_addresses().await.unwrap().contains(ADDRESS));
    }

    #[tokio::test]
    async fn remove_unknown_subscriber_is_silent() {
        let store = Store::open_in_memory().await.unwrap();
        store.remove_subscriber("nobody@nowhere.net").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_subscriber_distinct_from_zero_terms() {
        let store = Store::open_in_memory().await.unwrap();

        let err = store.get_search_terms(EMAIL).await.unwrap_err();
        assert!(matches!(err, AppError::UnknownSubscriber(_)));

        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        assert_eq!(store.get_search_terms(EMAIL).await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn add_term_for_unknown_email_stores_nothing() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_search_term(EMAIL, "WINE").await.unwrap();

        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        assert!(store.get_search_terms(EMAIL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn terms_kept_in_insertion_order() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        store.add_search_term(EMAIL, "GODS I WAS STRONG").await.unwrap();
        store.add_search_term(EMAIL, "BREASTPLATE STRETCHER").await.unwrap();

        assert_eq!(
            store.get_search_terms(EMAIL).await.unwrap(),
            vec!["GODS I WAS STRONG", "BREASTPLATE STRETCHER"]
        );
    }

    #[tokio::test]
    async fn remove_search_term_exact_match_only() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();

        // Removing a term that was never added is a no-op.
        store.remove_search_term(EMAIL, "WINE").await.unwrap();

        store.add_search_term(EMAIL, "WINE").await.unwrap();
        store.add_search_term(EMAIL, "WARHAMMERS").await.unwrap();
        store.remove_search_term(EMAIL, "WINE").await.unwrap();

        assert_eq!(store.get_search_terms(EMAIL).await.unwrap(), vec!["WARHAMMERS"]);
    }

    #[tokio::test]
    async fn record_item_rejects_duplicate_address() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .record_item(ADDRESS, Some("<p>markup</p>".to_string()))
            .await
            .unwrap();

        let err = store.record_item(ADDRESS, None).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));

        let known = store.list_known_addresses().await.unwrap();
        assert_eq!(known.len(), 1);
        assert!(known.contains(ADDRESS));
    }

    #[tokio::test]
    async fn record_item_without_markup() {
        let store = Store::open_in_memory().await.unwrap();
        store.record_item(ADDRESS, None).await.unwrap();
        assert!(store.list_known_addresses().await.unwrap().contains(ADDRESS));
    }

    #[tokio::test]
    async fn alert_link_requires_both_endpoints() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        store.record_item(ADDRESS, None).await.unwrap();

        let err = store
            .record_alert_link("nobody@nowhere.net", ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownSubscriber(_)));

        let err = store
            .record_alert_link(EMAIL, "https://example.com/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownItem(_)));

        store.record_alert_link(EMAIL, ADDRESS).await.unwrap();
        assert_eq!(store.get_alerted_addresses(EMAIL).await.unwrap(), vec![ADDRESS]);
    }

    #[tokio::test]
    async fn alerted_addresses_in_link_order() {
        let store = Store::open_in_memory().await.unwrap();
        store.add_subscriber("bobby b", EMAIL).await.unwrap();
        store.record_item("https://a.example/1", None).await.unwrap();
        store.record_item("https://a.example/2", None).await.unwrap();
        store.record_alert_link(EMAIL, "https://a.example/2").await.unwrap();
        store.record_alert_link(EMAIL, "https://a.example/1").await.unwrap();

        assert_eq!(
            store.get_alerted_addresses(EMAIL).await.unwrap(),
            vec!["https://a.example/2", "https://a.example/1"]
        );
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedwatch.db");
        let path = path.to_str().unwrap();

        {
            let store = Store::open(path).await.unwrap();
            store.add_subscriber("bobby b", EMAIL).await.unwrap();
            store.add_search_term(EMAIL, "WINE").await.unwrap();
            store.record_item(ADDRESS, None).await.unwrap();
        }

        let store = Store::open(path).await.unwrap();
        assert_eq!(store.get_search_terms(EMAIL).await.unwrap(), vec!["WINE"]);
        assert!(store.list_known_addresses().await.unwrap().contains(ADDRESS));
    }
}
