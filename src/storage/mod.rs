use anyhow::Context;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS lyrics_cache (
  query TEXT NOT NULL,
  duration_secs INTEGER NOT NULL,
  lyrics TEXT NOT NULL,
  fetched_at INTEGER NOT NULL,
  PRIMARY KEY (query, duration_secs)
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    /// Cache the lyrics found for a search
    pub fn cache_lyrics(
        &self,
        query: &str,
        duration_secs: i64,
        lyrics: &str,
        now_unix: i64,
    ) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO lyrics_cache(query, duration_secs, lyrics, fetched_at)
VALUES(?1, ?2, ?3, ?4)
ON CONFLICT(query, duration_secs) DO UPDATE SET
  lyrics=excluded.lyrics,
  fetched_at=excluded.fetched_at
"#,
                params![query, duration_secs, lyrics, now_unix],
            )
            .context("cache lyrics")?;
        Ok(())
    }

    /// Get cached lyrics fetched at or after `not_before_unix`
    pub fn get_lyrics(
        &self,
        query: &str,
        duration_secs: i64,
        not_before_unix: i64,
    ) -> anyhow::Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT lyrics FROM lyrics_cache WHERE query=?1 AND duration_secs=?2 AND fetched_at>=?3",
            )
            .context("prepare lyrics cache")?;
        let mut rows = stmt
            .query(params![query, duration_secs, not_before_unix])
            .context("query lyrics cache")?;
        if let Some(row) = rows.next().context("read lyrics cache row")? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }
}

/// Cheap, `Send` handle that opens the database on demand.
///
/// `rusqlite::Connection` is not `Sync`; callers open per use inside
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    path: PathBuf,
}

impl StorageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> anyhow::Result<Storage> {
        Storage::open(&self.path)
    }

    pub fn get_lyrics(
        &self,
        query: &str,
        duration_secs: i64,
        not_before_unix: i64,
    ) -> anyhow::Result<Option<String>> {
        self.open()?.get_lyrics(query, duration_secs, not_before_unix)
    }

    pub fn cache_lyrics(
        &self,
        query: &str,
        duration_secs: i64,
        lyrics: &str,
        now_unix: i64,
    ) -> anyhow::Result<()> {
        self.open()?.cache_lyrics(query, duration_secs, lyrics, now_unix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyrics_roundtrip_and_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StorageHandle::new(dir.path().join("nested").join("cache.sqlite3"));

        assert_eq!(handle.get_lyrics("song band", 200, 0).unwrap(), None);

        handle.cache_lyrics("song band", 200, "first", 100).unwrap();
        handle.cache_lyrics("song band", 200, "second", 150).unwrap();
        assert_eq!(
            handle.get_lyrics("song band", 200, 0).unwrap().as_deref(),
            Some("second")
        );

        // Different duration is a different key.
        assert_eq!(handle.get_lyrics("song band", 201, 0).unwrap(), None);
    }

    #[test]
    fn test_stale_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StorageHandle::new(dir.path().join("cache.sqlite3"));
        handle.cache_lyrics("q", 10, "old", 100).unwrap();
        assert_eq!(handle.get_lyrics("q", 10, 101).unwrap(), None);
        assert_eq!(handle.get_lyrics("q", 10, 100).unwrap().as_deref(), Some("old"));
    }
}
