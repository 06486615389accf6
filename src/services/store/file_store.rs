use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::fs;

use super::{ArticleStore, StoreError};
use crate::title::is_valid_title;
use crate::types::Article;

const ARTICLE_EXTENSION: &str = "md";
const UPPER_MARK: char = '_';

/// File stem for `title`. Each uppercase letter becomes `_` plus its lowercase
/// form, so titles differing only in case never share a file on
/// case-insensitive filesystems.
fn encode_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len() + 4);
    for c in title.chars() {
        if c.is_ascii_uppercase() {
            stem.push(UPPER_MARK);
            stem.push(c.to_ascii_lowercase());
        } else {
            stem.push(c);
        }
    }
    stem
}

/// Inverse of [`encode_stem`]; `None` for stems no valid title encodes to
fn decode_stem(stem: &str) -> Option<String> {
    let mut title = String::with_capacity(stem.len());
    let mut chars = stem.chars();
    while let Some(c) = chars.next() {
        match c {
            UPPER_MARK => match chars.next() {
                Some(lower) if lower.is_ascii_lowercase() => title.push(lower.to_ascii_uppercase()),
                _ => return None,
            },
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => title.push(c),
            _ => return None,
        }
    }
    is_valid_title(&title).then_some(title)
}

/// Stores each article as `<stem>.md` inside a data directory, see [`encode_stem`]
pub struct FileStore {
    root: PathBuf,
    next_id: AtomicU64,
}

/// A live handle on the data directory, held for one operation.
///
/// Only [`FileStore::connect`] creates one, and only after the directory has
/// been reached, so dropping a `Connection` never releases something that was
/// not acquired.
struct Connection<'a> {
    root: &'a Path,
    id: u64,
}

impl Connection<'_> {
    fn article_path(&self, title: &str) -> PathBuf {
        self.root.join(format!("{}.{}", encode_stem(title), ARTICLE_EXTENSION))
    }

    /// Unique sibling path for an in-progress write; dot-prefixed so `count` skips it
    fn staging_path(&self, title: &str) -> PathBuf {
        self.root.join(format!(
            ".{}.{}.{}-{}.tmp",
            encode_stem(title),
            ARTICLE_EXTENSION,
            std::process::id(),
            self.id
        ))
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        debug!("Released store connection #{}", self.id);
    }
}

impl FileStore {
    /// Create a file store rooted at `root`; the directory is not touched until first use
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!("Creating FileStore with data directory: {:?}", root);
        Self { root, next_id: AtomicU64::new(1) }
    }

    async fn connect(&self) -> Result<Connection<'_>, StoreError> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                debug!("Acquired store connection #{}", id);
                Ok(Connection { root: &self.root, id })
            }
            Ok(_) => {
                error!("Data path is not a directory: {:?}", self.root);
                Err(StoreError::Unavailable(format!("{} is not a directory", self.root.display())))
            }
            Err(e) => {
                error!("Cannot reach data directory {:?}: {}", self.root, e);
                Err(StoreError::Unavailable(format!("{}: {}", self.root.display(), e)))
            }
        }
    }
}

fn unavailable(context: &str, path: &Path, err: io::Error) -> StoreError {
    error!("Failed to {} {:?}: {}", context, path, err);
    StoreError::Unavailable(format!("failed to {} {}: {}", context, path.display(), err))
}

/// Raised when the future driving a save is dropped before it finishes
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Write `body` to `staging` and rename it over `target`.
///
/// Runs to completion on a blocking thread even when the caller has gone
/// away. The staging file is removed on every path that does not rename it,
/// and an abandoned save is not applied if the flag is seen before the rename.
fn write_then_replace(staging: &Path, target: &Path, body: &[u8], abandoned: &AtomicBool) -> Result<(), StoreError> {
    if let Err(e) = std::fs::write(staging, body) {
        let _ = std::fs::remove_file(staging);
        return Err(unavailable("write", staging, e));
    }

    if abandoned.load(Ordering::Acquire) {
        let _ = std::fs::remove_file(staging);
        warn!("Save to {:?} abandoned before it was applied", target);
        return Err(StoreError::Unavailable(format!("save to {} abandoned", target.display())));
    }

    // rename replaces the old file in one step, so readers see old or new, never half
    if let Err(e) = std::fs::rename(staging, target) {
        let _ = std::fs::remove_file(staging);
        return Err(unavailable("replace", target, e));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ArticleStore for FileStore {
    async fn save(&self, title: &str, body: &str) -> Result<(), StoreError> {
        let conn = self.connect().await?;
        let target = conn.article_path(title);
        let staging = conn.staging_path(title);

        let abandoned = Arc::new(AtomicBool::new(false));
        let _abandon = AbandonOnDrop(Arc::clone(&abandoned));
        let owned = body.to_owned();
        tokio::task::spawn_blocking(move || write_then_replace(&staging, &target, owned.as_bytes(), &abandoned))
            .await
            .map_err(|e| {
                error!("Save task for '{}' failed: {}", title, e);
                StoreError::Unavailable(format!("save task failed: {}", e))
            })??;

        info!("Saved article '{}', {} bytes", title, body.len());
        Ok(())
    }

    async fn load(&self, title: &str) -> Result<Article, StoreError> {
        let conn = self.connect().await?;
        let path = conn.article_path(title);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No article stored at {:?}", path);
                return Err(StoreError::NotFound);
            }
            Err(e) => return Err(unavailable("read", &path, e)),
        };

        let body = match String::from_utf8(bytes) {
            Ok(body) => body,
            Err(e) => {
                warn!("Article '{}' is not valid UTF-8, decoding lossily", title);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        debug!("Loaded article '{}', {} bytes", title, body.len());
        Ok(Article::new(title, body))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.connect().await?;
        let mut entries = fs::read_dir(conn.root)
            .await
            .map_err(|e| unavailable("list", conn.root, e))?;

        let mut total = 0u64;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(unavailable("list", conn.root, e)),
            };
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_article = name
                .strip_suffix(ARTICLE_EXTENSION)
                .and_then(|stem| stem.strip_suffix('.'))
                .and_then(decode_stem)
                .is_some();
            if !is_article {
                continue;
            }
            // metadata follows symlinks, the same way load does
            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => total += 1,
                Ok(_) => {}
                Err(e) => warn!("Failed to inspect {:?}: {}", entry.path(), e),
            }
        }

        debug!("Counted {} articles in {:?}", total, conn.root);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::Bounded;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save("hello", "# Hi").await.unwrap();

        assert_eq!(store.load("hello").await.unwrap(), Article::new("hello", "# Hi"));
        let on_disk = std::fs::read_to_string(dir.path().join("hello.md")).unwrap();
        assert_eq!(on_disk, "# Hi");
    }

    #[test]
    fn stems_keep_case_apart() {
        assert_eq!(encode_stem("hello"), "hello");
        assert_eq!(encode_stem("Hello"), "_hello");
        assert_eq!(encode_stem("FrontPage2"), "_front_page2");
        assert_ne!(encode_stem("Hello").to_ascii_lowercase(), encode_stem("hello").to_ascii_lowercase());

        for title in ["hello", "Hello", "HELLO", "a1B2", "007"] {
            assert_eq!(decode_stem(&encode_stem(title)).as_deref(), Some(title));
        }
        for stem in ["", "a-b", "Hello", "_", "a_", "_1", "__a", "caf\u{e9}"] {
            assert_eq!(decode_stem(stem), None, "{stem:?}");
        }
    }

    #[tokio::test]
    async fn titles_differing_in_case_are_separate_articles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save("Hello", "a").await.unwrap();
        store.save("hello", "b").await.unwrap();

        assert_eq!(store.load("Hello").await.unwrap().body, "a");
        assert_eq!(store.load("hello").await.unwrap().body, "b");
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(dir.path().join("_hello.md").is_file());
    }

    #[tokio::test]
    async fn timed_out_saves_leave_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Bounded::new(FileStore::new(dir.path()), Duration::from_millis(1));
        let body = "x".repeat(32 * 1024 * 1024);

        for _ in 0..3 {
            let _ = store.save("Big", &body).await;
        }

        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let staged: Vec<String> = std::fs::read_dir(dir.path())
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with('.'))
                .collect();
            if staged.is_empty() {
                break;
            }
            assert!(Instant::now() < deadline, "staging files left behind: {staged:?}");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn missing_article_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.load("missing").await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn unreachable_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("does-not-exist"));

        assert!(matches!(store.load("a").await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.save("a", "b").await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.count().await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn data_path_that_is_a_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        let store = FileStore::new(&file);

        assert!(matches!(store.count().await, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn count_only_sees_articles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("one", "1").await.unwrap();
        store.save("two", "2").await.unwrap();
        store.save("one", "1 again").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join(".three.md.1-1.tmp"), "staging").unwrap();
        std::fs::create_dir(dir.path().join("sub.md")).unwrap();
        std::fs::write(dir.path().join("a-b.md"), "unreachable").unwrap();
        std::fs::write(dir.path().join("Upper.md"), "unreachable").unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalid_utf8_is_read_lossily() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.md"), [b'o', b'k', 0xff]).unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.load("bin").await.unwrap().body, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn concurrent_saves_each_apply_fully() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()));
        let bodies: Vec<String> = (0..8).map(|i| format!("body {}", i).repeat(512)).collect();

        let mut tasks = Vec::new();
        for body in bodies.clone() {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move { store.save("shared", &body).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = store.load("shared").await.unwrap().body;
        assert!(bodies.contains(&stored));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
