//! Local content store
//!
//! Each novel gets its own directory under the configured data dir:
//!
//! ```text
//! novels/
//!   novel_{id}/
//!     metadata.json
//!     cover.jpg
//!     chapters_raw/{SafeTitle}_Chapter_001.html
//!     chapters_translated/{SafeTitle}_Chapter_001.html
//! ```
//!
//! Saved translated chapters double as the translation cache: a re-run loads
//! them back instead of re-translating. Writes overwrite deterministically,
//! so repeating a run converges on the same files.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;
use crate::types::MetadataSnapshot;

const RAW_DIR: &str = "chapters_raw";
const TRANSLATED_DIR: &str = "chapters_translated";

/// Filesystem store for per-novel content
#[derive(Clone, Debug)]
pub struct ContentStore {
    data_dir: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory for one novel
    pub fn novel_dir(&self, novel_id: &str) -> PathBuf {
        self.data_dir.join(format!("novel_{novel_id}"))
    }

    fn chapter_path(
        &self,
        novel_id: &str,
        subdir: &str,
        novel_title: &str,
        number: u32,
    ) -> PathBuf {
        let safe = sanitize_title(novel_title);
        self.novel_dir(novel_id)
            .join(subdir)
            .join(format!("{safe}_Chapter_{number:03}.html"))
    }

    async fn write_chapter(&self, path: &Path, title: &str, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, format!("<h1>{title}</h1>\n\n{content}")).await?;
        Ok(())
    }

    /// Persist a chapter in the source language
    pub async fn save_raw_chapter(
        &self,
        novel_id: &str,
        novel_title: &str,
        number: u32,
        title: &str,
        content: &str,
    ) -> Result<()> {
        let path = self.chapter_path(novel_id, RAW_DIR, novel_title, number);
        self.write_chapter(&path, title, content).await
    }

    /// Persist a translated chapter
    pub async fn save_translated_chapter(
        &self,
        novel_id: &str,
        novel_title: &str,
        number: u32,
        title: &str,
        content: &str,
    ) -> Result<()> {
        let path = self.chapter_path(novel_id, TRANSLATED_DIR, novel_title, number);
        self.write_chapter(&path, title, content).await
    }

    /// Load a previously translated chapter as `(title, content)`
    ///
    /// Returns `None` when no cached translation exists for this chapter.
    pub async fn load_translated_chapter(
        &self,
        novel_id: &str,
        novel_title: &str,
        number: u32,
    ) -> Result<Option<(String, String)>> {
        let path = self.chapter_path(novel_id, TRANSLATED_DIR, novel_title, number);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(split_chapter_file(&raw)))
    }

    /// Persist the metadata snapshot (also the title/description translation cache)
    pub async fn save_metadata(&self, novel_id: &str, snapshot: &MetadataSnapshot) -> Result<()> {
        let dir = self.novel_dir(novel_id);
        fs::create_dir_all(&dir).await?;
        let data = serde_json::to_vec_pretty(snapshot)?;
        fs::write(dir.join("metadata.json"), data).await?;
        Ok(())
    }

    /// Load the metadata snapshot, if one was saved by a previous run
    pub async fn load_metadata(&self, novel_id: &str) -> Result<Option<MetadataSnapshot>> {
        let path = self.novel_dir(novel_id).join("metadata.json");
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Download the cover image next to the novel's metadata
    ///
    /// The file extension is taken from the URL path, defaulting to `.jpg`.
    /// Returns the saved filename.
    pub async fn download_cover(
        &self,
        client: &reqwest::Client,
        novel_id: &str,
        cover_url: &str,
    ) -> Result<String> {
        let dir = self.novel_dir(novel_id);
        fs::create_dir_all(&dir).await?;

        let ext = url::Url::parse(cover_url)
            .ok()
            .and_then(|u| {
                Path::new(u.path())
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "jpg".to_string());
        let filename = format!("cover.{ext}");

        let bytes = client
            .get(cover_url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        fs::write(dir.join(&filename), &bytes).await?;

        Ok(filename)
    }
}

/// Make a novel title safe for filenames
///
/// Spaces and path separators become underscores; the result is capped at
/// 50 characters.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '\\') { '_' } else { c })
        .take(50)
        .collect()
}

// Inverse of the `<h1>{title}</h1>\n\n{content}` chapter file format.
fn split_chapter_file(raw: &str) -> (String, String) {
    if let Some(rest) = raw.strip_prefix("<h1>")
        && let Some((title, content)) = rest.split_once("</h1>")
    {
        return (title.to_string(), content.trim_start().to_string());
    }
    (String::new(), raw.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ContentStore {
        ContentStore::new(dir.path())
    }

    // -----------------------------------------------------------------------
    // sanitize_title
    // -----------------------------------------------------------------------

    #[test]
    fn sanitize_replaces_spaces_and_separators() {
        assert_eq!(sanitize_title("Battle Through the Heavens"), "Battle_Through_the_Heavens");
        assert_eq!(sanitize_title("a/b\\c"), "a_b_c");
    }

    #[test]
    fn sanitize_caps_at_fifty_characters() {
        let long = "x".repeat(80);
        assert_eq!(sanitize_title(&long).chars().count(), 50);
    }

    #[test]
    fn sanitize_keeps_cjk_characters() {
        assert_eq!(sanitize_title("斗破蒼穹"), "斗破蒼穹");
    }

    // -----------------------------------------------------------------------
    // Chapter files
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn raw_chapter_lands_in_deterministic_path() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .save_raw_chapter("12345", "My Novel", 7, "第七章", "內容")
            .await
            .unwrap();

        let expected = dir
            .path()
            .join("novel_12345/chapters_raw/My_Novel_Chapter_007.html");
        let body = std::fs::read_to_string(expected).unwrap();
        assert_eq!(body, "<h1>第七章</h1>\n\n內容");
    }

    #[tokio::test]
    async fn translated_chapter_round_trips_through_cache() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .save_translated_chapter("1", "My Novel", 3, "Chapter Three", "The content.")
            .await
            .unwrap();

        let (title, content) = store
            .load_translated_chapter("1", "My Novel", 3)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(title, "Chapter Three");
        assert_eq!(content, "The content.");
    }

    #[tokio::test]
    async fn missing_translated_chapter_is_a_cache_miss() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let cached = store.load_translated_chapter("1", "My Novel", 3).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn resaving_a_chapter_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .save_translated_chapter("1", "N", 1, "Old", "old text")
            .await
            .unwrap();
        store
            .save_translated_chapter("1", "N", 1, "New", "new text")
            .await
            .unwrap();

        let (title, content) = store
            .load_translated_chapter("1", "N", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(title, "New");
        assert_eq!(content, "new text");
    }

    // -----------------------------------------------------------------------
    // Metadata snapshot
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn metadata_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let snapshot = MetadataSnapshot {
            title: "斗破蒼穹".into(),
            title_translated: Some("Battle Through the Heavens".into()),
            author: "天蠶土豆".into(),
            description: "<p>desc</p>".into(),
            description_translated: None,
            kind: "玄幻".into(),
            status: "連載中".into(),
            cover_url: Some("https://example.com/c.jpg".into()),
            source_url: "https://example.com/books/1.html".into(),
            total_chapters: 120,
        };
        store.save_metadata("1", &snapshot).await.unwrap();

        let loaded = store.load_metadata("1").await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn missing_metadata_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load_metadata("9").await.unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Cover download
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cover_extension_follows_url_path() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/covers/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let client = reqwest::Client::new();

        let filename = store
            .download_cover(&client, "1", &format!("{}/covers/1.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(filename, "cover.png");

        let saved = std::fs::read(dir.path().join("novel_1/cover.png")).unwrap();
        assert_eq!(saved, b"png bytes");
    }
}
