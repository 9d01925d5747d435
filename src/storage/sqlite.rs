//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use crate::{Result, Error};
use crate::kind::LinkKind;
use crate::link::{LegacyId, LegacyLink, OwnedRef, UpsertOutcome};
use super::schema;

/// Default time a writer waits for another connection's write lock
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Connection tuning for [`LinkStore`]
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { busy_timeout: DEFAULT_BUSY_TIMEOUT }
    }
}

/// SQLite-backed store for legacy SMS links.
///
/// Each store owns one connection. Concurrent callers (the sync process, the
/// owning system's deletion path) open their own store on the same file;
/// every write runs in a `BEGIN IMMEDIATE` transaction so they serialize on
/// SQLite's write lock.
pub struct LinkStore {
    conn: Connection,
}

impl LinkStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open a database file with explicit connection options
    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(options.busy_timeout)?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {} (journal_mode={})", path.display(), mode);
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Link Operations ==========

    /// Create or refresh the link row for `legacy_id`.
    ///
    /// An existing row has its sync time and owned reference overwritten;
    /// the legacy id itself is never rewritten. Fails with
    /// `ConstraintViolation` when `owned_ref` already belongs to another
    /// legacy id of the same kind, and with `InvalidInput` when `owned_ref`
    /// names an owned entity that does not exist.
    pub fn upsert_link(
        &mut self,
        kind: LinkKind,
        legacy_id: LegacyId,
        synced_at: Option<DateTime<Utc>>,
        owned_ref: Option<&OwnedRef>,
    ) -> Result<UpsertOutcome> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(owned) = owned_ref {
            if !owned_exists_in(&tx, kind, owned)? {
                return Err(Error::InvalidInput(format!(
                    "{} {} does not exist",
                    kind, owned
                )));
            }

            if let Some(holder) = find_by_owned_ref_in(&tx, kind, owned)? {
                if holder.legacy_id != legacy_id {
                    tracing::warn!(
                        "Rejected {} link {} -> {}: already claimed by {}",
                        kind, legacy_id, owned, holder.legacy_id
                    );
                    return Err(Error::ConstraintViolation(format!(
                        "{} {} is already linked to legacy id {}",
                        kind, owned, holder.legacy_id
                    )));
                }
            }
        }

        let existed: bool = tx.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE legacy_id = ?1)", kind.link_table()),
            [legacy_id.get()],
            |row| row.get(0),
        )?;

        let sql = format!(
            r#"
            INSERT INTO {table} (legacy_id, last_synced_at, {col})
            VALUES (?1, ?2, ?3)
            ON CONFLICT(legacy_id) DO UPDATE SET
                last_synced_at = excluded.last_synced_at,
                {col} = excluded.{col}
            "#,
            table = kind.link_table(),
            col = kind.ref_column(),
        );
        tx.execute(
            &sql,
            params![legacy_id.get(), synced_at, owned_ref.map(OwnedRef::as_str)],
        )
        .map_err(|e| classify_write_error(e, kind, legacy_id))?;

        tx.commit()?;

        let outcome = if existed { UpsertOutcome::Updated } else { UpsertOutcome::Created };
        match outcome {
            UpsertOutcome::Created => tracing::info!("Created {} link {}", kind, legacy_id),
            UpsertOutcome::Updated => tracing::debug!("Updated {} link {}", kind, legacy_id),
        }
        Ok(outcome)
    }

    /// Detach `owned_ref` from whichever link row points at it.
    ///
    /// Returns the number of rows cleared (0 or 1). The link row is kept.
    pub fn clear_owned_ref(&mut self, kind: LinkKind, owned_ref: &OwnedRef) -> Result<usize> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let cleared = clear_owned_ref_in(&tx, kind, owned_ref)?;
        tx.commit()?;
        Ok(cleared)
    }

    /// Get a link by legacy id
    pub fn lookup_by_legacy_id(&self, kind: LinkKind, legacy_id: LegacyId) -> Result<Option<LegacyLink>> {
        let sql = format!(
            "SELECT legacy_id, last_synced_at, {} FROM {} WHERE legacy_id = ?1",
            kind.ref_column(),
            kind.link_table(),
        );
        self.conn
            .query_row(&sql, [legacy_id.get()], |row| row_to_link(kind, row))
            .optional()
            .map_err(Into::into)
    }

    /// Like [`lookup_by_legacy_id`](Self::lookup_by_legacy_id) but missing rows are an error
    pub fn require_by_legacy_id(&self, kind: LinkKind, legacy_id: LegacyId) -> Result<LegacyLink> {
        self.lookup_by_legacy_id(kind, legacy_id)?
            .ok_or_else(|| Error::NotFound(format!("{} link {}", kind, legacy_id)))
    }

    /// Get the link pointing at an owned entity (reverse lookup)
    pub fn lookup_by_owned_ref(&self, kind: LinkKind, owned_ref: &OwnedRef) -> Result<Option<LegacyLink>> {
        find_by_owned_ref_in(&self.conn, kind, owned_ref)
    }

    /// All links of a kind, ordered by legacy id
    pub fn list_links(&self, kind: LinkKind) -> Result<Vec<LegacyLink>> {
        self.query_links(kind, "")
    }

    /// Links whose owned entity is absent
    pub fn list_orphans(&self, kind: LinkKind) -> Result<Vec<LegacyLink>> {
        self.query_links(kind, &format!("WHERE {} IS NULL", kind.ref_column()))
    }

    fn query_links(&self, kind: LinkKind, filter: &str) -> Result<Vec<LegacyLink>> {
        let sql = format!(
            "SELECT legacy_id, last_synced_at, {} FROM {} {} ORDER BY legacy_id",
            kind.ref_column(),
            kind.link_table(),
            filter,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let links = stmt
            .query_map([], |row| row_to_link(kind, row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    /// Count link rows of a kind
    pub fn count_links(&self, kind: LinkKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.link_table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Owned Entity Operations ==========

    /// Record that the media platform has an owned entity with this id.
    ///
    /// Returns `false` if it was already registered.
    pub fn register_owned(&self, kind: LinkKind, owned_ref: &OwnedRef) -> Result<bool> {
        let inserted = self.conn.execute(
            &format!("INSERT OR IGNORE INTO {} (id) VALUES (?1)", kind.owned_table()),
            [owned_ref.as_str()],
        )?;
        Ok(inserted == 1)
    }

    /// Check whether an owned entity is registered
    pub fn owned_exists(&self, kind: LinkKind, owned_ref: &OwnedRef) -> Result<bool> {
        owned_exists_in(&self.conn, kind, owned_ref)
    }

    /// Delete an owned entity, clearing any link to it in the same transaction.
    ///
    /// Returns `false` if the entity was not registered.
    pub fn delete_owned(&mut self, kind: LinkKind, owned_ref: &OwnedRef) -> Result<bool> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        clear_owned_ref_in(&tx, kind, owned_ref)?;
        let deleted = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.owned_table()),
            [owned_ref.as_str()],
        )?;
        tx.commit()?;

        if deleted == 1 {
            tracing::info!("Deleted {} {}", kind, owned_ref);
        }
        Ok(deleted == 1)
    }

    /// Count owned entities of a kind
    pub fn count_owned(&self, kind: LinkKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.owned_table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== Statistics ==========

    fn kind_stats(&self, kind: LinkKind) -> Result<KindStats> {
        let orphaned: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE {} IS NULL", kind.link_table(), kind.ref_column()),
            [],
            |row| row.get(0),
        )?;
        let links = self.count_links(kind)?;
        let orphaned = orphaned as usize;

        Ok(KindStats {
            links,
            linked: links - orphaned,
            orphaned,
            owned: self.count_owned(kind)?,
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<LinkStats> {
        Ok(LinkStats {
            collection: self.kind_stats(LinkKind::Collection)?,
            media_item: self.kind_stats(LinkKind::MediaItem)?,
        })
    }
}

fn owned_exists_in(conn: &Connection, kind: LinkKind, owned_ref: &OwnedRef) -> Result<bool> {
    let exists: bool = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", kind.owned_table()),
        [owned_ref.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn find_by_owned_ref_in(conn: &Connection, kind: LinkKind, owned_ref: &OwnedRef) -> Result<Option<LegacyLink>> {
    let sql = format!(
        "SELECT legacy_id, last_synced_at, {col} FROM {} WHERE {col} = ?1",
        kind.link_table(),
        col = kind.ref_column(),
    );
    conn.query_row(&sql, [owned_ref.as_str()], |row| row_to_link(kind, row))
        .optional()
        .map_err(Into::into)
}

fn clear_owned_ref_in(conn: &Connection, kind: LinkKind, owned_ref: &OwnedRef) -> Result<usize> {
    let cleared = conn.execute(
        &format!(
            "UPDATE {table} SET {col} = NULL WHERE {col} = ?1",
            table = kind.link_table(),
            col = kind.ref_column(),
        ),
        [owned_ref.as_str()],
    )?;

    if cleared > 0 {
        tracing::info!("Cleared {} {} from {} link row(s)", kind, owned_ref, cleared);
    } else {
        tracing::debug!("No {} link references {}", kind, owned_ref);
    }
    Ok(cleared)
}

/// Helper to convert a row to a LegacyLink
fn row_to_link(kind: LinkKind, row: &rusqlite::Row) -> rusqlite::Result<LegacyLink> {
    let raw_id: i64 = row.get(0)?;
    let raw_ref: Option<String> = row.get(2)?;

    let legacy_id = LegacyId::new(raw_id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    let owned_ref = raw_ref
        .map(OwnedRef::new)
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(LegacyLink {
        kind,
        legacy_id,
        last_synced_at: row.get(1)?,
        owned_ref,
    })
}

/// Map SQLite constraint failures onto the store's error kinds.
///
/// The explicit checks in `upsert_link` normally fire first; this covers
/// writes that slip past them.
fn classify_write_error(err: rusqlite::Error, kind: LinkKind, legacy_id: LegacyId) -> Error {
    use rusqlite::ffi;

    let code = match &err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    };

    match code {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) | Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
            Error::ConstraintViolation(format!("{} link {}: {}", kind, legacy_id, err))
        }
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) | Some(ffi::SQLITE_CONSTRAINT_CHECK) => {
            Error::InvalidInput(format!("{} link {}: {}", kind, legacy_id, err))
        }
        _ => Error::Storage(err),
    }
}

/// Link counts for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub links: usize,
    pub linked: usize,
    pub orphaned: usize,
    pub owned: usize,
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub collection: KindStats,
    pub media_item: KindStats,
}

impl LinkStats {
    pub fn for_kind(&self, kind: LinkKind) -> &KindStats {
        match kind {
            LinkKind::Collection => &self.collection,
            LinkKind::MediaItem => &self.media_item,
        }
    }
}

impl std::fmt::Display for LinkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for kind in LinkKind::all() {
            let s = self.for_kind(*kind);
            writeln!(
                f,
                "  {}: {} links ({} linked, {} orphaned), {} owned",
                kind, s.links, s.linked, s.orphaned, s.owned
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn id(n: i64) -> LegacyId {
        LegacyId::new(n).unwrap()
    }

    fn owned(s: &str) -> OwnedRef {
        OwnedRef::new(s).unwrap()
    }

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 13, 12, 29, 0).unwrap()
    }

    fn store_with_owned(kind: LinkKind, refs: &[&str]) -> LinkStore {
        let store = LinkStore::open_in_memory().unwrap();
        for r in refs {
            store.register_owned(kind, &owned(r)).unwrap();
        }
        store
    }

    #[test]
    fn test_upsert_then_lookup() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);

        let outcome = store
            .upsert_link(LinkKind::Collection, id(42), Some(t1()), Some(&owned("c1")))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let link = store.lookup_by_legacy_id(LinkKind::Collection, id(42)).unwrap().unwrap();
        assert_eq!(link.legacy_id, id(42));
        assert_eq!(link.last_synced_at, Some(t1()));
        assert_eq!(link.owned_ref, Some(owned("c1")));
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut store = store_with_owned(LinkKind::MediaItem, &["m1", "m2"]);
        let t2 = t1() + chrono::Duration::hours(1);

        store.upsert_link(LinkKind::MediaItem, id(7), None, None).unwrap();
        let outcome = store
            .upsert_link(LinkKind::MediaItem, id(7), Some(t1()), Some(&owned("m1")))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        store.upsert_link(LinkKind::MediaItem, id(7), Some(t2), Some(&owned("m2"))).unwrap();

        let link = store.lookup_by_legacy_id(LinkKind::MediaItem, id(7)).unwrap().unwrap();
        assert_eq!(link.last_synced_at, Some(t2));
        assert_eq!(link.owned_ref, Some(owned("m2")));
        assert_eq!(store.count_links(LinkKind::MediaItem).unwrap(), 1);
        assert!(store.lookup_by_owned_ref(LinkKind::MediaItem, &owned("m1")).unwrap().is_none());
    }

    #[test]
    fn test_reclaiming_own_ref_is_allowed() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);

        store.upsert_link(LinkKind::Collection, id(1), None, Some(&owned("c1"))).unwrap();
        let outcome = store
            .upsert_link(LinkKind::Collection, id(1), Some(t1()), Some(&owned("c1")))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
    }

    #[test]
    fn test_claimed_ref_is_rejected() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);

        store.upsert_link(LinkKind::Collection, id(1), None, Some(&owned("c1"))).unwrap();
        let err = store
            .upsert_link(LinkKind::Collection, id(2), Some(t1()), Some(&owned("c1")))
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));

        // The rejected call left nothing behind
        assert!(store.lookup_by_legacy_id(LinkKind::Collection, id(2)).unwrap().is_none());
        let holder = store.lookup_by_owned_ref(LinkKind::Collection, &owned("c1")).unwrap().unwrap();
        assert_eq!(holder.legacy_id, id(1));
    }

    #[test]
    fn test_uniqueness_is_per_kind() {
        let mut store = LinkStore::open_in_memory().unwrap();
        store.register_owned(LinkKind::Collection, &owned("x")).unwrap();
        store.register_owned(LinkKind::MediaItem, &owned("x")).unwrap();

        store.upsert_link(LinkKind::Collection, id(1), None, Some(&owned("x"))).unwrap();
        store.upsert_link(LinkKind::MediaItem, id(2), None, Some(&owned("x"))).unwrap();

        let c = store.lookup_by_owned_ref(LinkKind::Collection, &owned("x")).unwrap().unwrap();
        let m = store.lookup_by_owned_ref(LinkKind::MediaItem, &owned("x")).unwrap().unwrap();
        assert_eq!(c.legacy_id, id(1));
        assert_eq!(m.legacy_id, id(2));
    }

    #[test]
    fn test_unknown_owned_ref_is_invalid() {
        let mut store = LinkStore::open_in_memory().unwrap();
        let err = store
            .upsert_link(LinkKind::MediaItem, id(3), None, Some(&owned("ghost")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(store.count_links(LinkKind::MediaItem).unwrap(), 0);
    }

    #[test]
    fn test_delete_owned_orphans_link() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);
        store.upsert_link(LinkKind::Collection, id(42), Some(t1()), Some(&owned("c1"))).unwrap();

        assert!(store.delete_owned(LinkKind::Collection, &owned("c1")).unwrap());

        let link = store.lookup_by_legacy_id(LinkKind::Collection, id(42)).unwrap().unwrap();
        assert_eq!(link.legacy_id, id(42));
        assert_eq!(link.last_synced_at, Some(t1()));
        assert_eq!(link.owned_ref, None);
        assert!(link.is_orphaned());
        assert!(!store.owned_exists(LinkKind::Collection, &owned("c1")).unwrap());
    }

    #[test]
    fn test_raw_delete_sets_null() {
        let mut store = store_with_owned(LinkKind::MediaItem, &["m1"]);
        store.upsert_link(LinkKind::MediaItem, id(9), Some(t1()), Some(&owned("m1"))).unwrap();

        store.conn.execute("DELETE FROM owned_media_item WHERE id = 'm1'", []).unwrap();

        let link = store.lookup_by_legacy_id(LinkKind::MediaItem, id(9)).unwrap().unwrap();
        assert_eq!(link.owned_ref, None);
        assert_eq!(link.last_synced_at, Some(t1()));
    }

    #[test]
    fn test_clear_owned_ref_is_idempotent() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);
        store.upsert_link(LinkKind::Collection, id(5), None, Some(&owned("c1"))).unwrap();

        assert_eq!(store.clear_owned_ref(LinkKind::Collection, &owned("c1")).unwrap(), 1);
        assert_eq!(store.clear_owned_ref(LinkKind::Collection, &owned("c1")).unwrap(), 0);
        assert_eq!(store.clear_owned_ref(LinkKind::Collection, &owned("never")).unwrap(), 0);

        assert_eq!(store.count_links(LinkKind::Collection).unwrap(), 1);
    }

    #[test]
    fn test_cleared_ref_can_be_claimed_again() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1"]);
        store.upsert_link(LinkKind::Collection, id(1), None, Some(&owned("c1"))).unwrap();
        store.clear_owned_ref(LinkKind::Collection, &owned("c1")).unwrap();

        store.upsert_link(LinkKind::Collection, id(2), None, Some(&owned("c1"))).unwrap();
        let holder = store.lookup_by_owned_ref(LinkKind::Collection, &owned("c1")).unwrap().unwrap();
        assert_eq!(holder.legacy_id, id(2));
    }

    #[test]
    fn test_require_missing_is_not_found() {
        let store = LinkStore::open_in_memory().unwrap();
        assert!(store.lookup_by_legacy_id(LinkKind::Collection, id(1)).unwrap().is_none());
        assert!(matches!(
            store.require_by_legacy_id(LinkKind::Collection, id(1)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_and_stats() {
        let mut store = store_with_owned(LinkKind::Collection, &["c1", "c2"]);
        store.upsert_link(LinkKind::Collection, id(3), None, Some(&owned("c1"))).unwrap();
        store.upsert_link(LinkKind::Collection, id(1), None, None).unwrap();
        store.upsert_link(LinkKind::Collection, id(2), None, Some(&owned("c2"))).unwrap();
        store.delete_owned(LinkKind::Collection, &owned("c2")).unwrap();

        let ids: Vec<i64> = store
            .list_links(LinkKind::Collection)
            .unwrap()
            .iter()
            .map(|l| l.legacy_id.get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let orphans: Vec<i64> = store
            .list_orphans(LinkKind::Collection)
            .unwrap()
            .iter()
            .map(|l| l.legacy_id.get())
            .collect();
        assert_eq!(orphans, vec![1, 2]);

        let stats = store.stats().unwrap();
        assert_eq!(
            stats.collection,
            KindStats { links: 3, linked: 1, orphaned: 2, owned: 1 }
        );
        assert_eq!(stats.media_item, KindStats::default());
    }

    #[test]
    fn test_register_owned_is_idempotent() {
        let store = LinkStore::open_in_memory().unwrap();
        assert!(store.register_owned(LinkKind::MediaItem, &owned("m1")).unwrap());
        assert!(!store.register_owned(LinkKind::MediaItem, &owned("m1")).unwrap());
        assert_eq!(store.count_owned(LinkKind::MediaItem).unwrap(), 1);
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.db");

        {
            let mut store = LinkStore::open(&path).unwrap();
            store.register_owned(LinkKind::Collection, &owned("c1")).unwrap();
            store.upsert_link(LinkKind::Collection, id(42), Some(t1()), Some(&owned("c1"))).unwrap();
        }

        let store = LinkStore::open(&path).unwrap();
        let link = store.lookup_by_legacy_id(LinkKind::Collection, id(42)).unwrap().unwrap();
        assert_eq!(link.last_synced_at, Some(t1()));
        assert_eq!(link.owned_ref, Some(owned("c1")));
    }

    #[test]
    fn test_concurrent_claims_one_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("race.db"));

        {
            let store = LinkStore::open(&path).unwrap();
            store.register_owned(LinkKind::MediaItem, &owned("shared")).unwrap();
        }

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [100_i64, 200]
            .into_iter()
            .map(|legacy| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut store = LinkStore::open(&path).unwrap();
                    barrier.wait();
                    store.upsert_link(LinkKind::MediaItem, id(legacy), Some(t1()), Some(&owned("shared")))
                })
            })
            .collect();

        let results: Vec<Result<UpsertOutcome>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(Error::ConstraintViolation(_))))
                .count(),
            1
        );

        let store = LinkStore::open(&path).unwrap();
        let holder = store.lookup_by_owned_ref(LinkKind::MediaItem, &owned("shared")).unwrap();
        assert!(holder.is_some());
        assert_eq!(store.count_links(LinkKind::MediaItem).unwrap(), 1);
    }
}
