// ── Knowledge Store ──
//
// Repository of knowledge items over an injected storage backend. The whole
// collection lives under one key as a JSON array, newest first, and every
// mutation rewrites it in full.

use std::path::PathBuf;

use sakura_core::{Category, KnowledgeItem, NewKnowledgeItem, Result, SakuraError};

pub mod backend;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

// ── Constants ──

pub const STORAGE_KEY: &str = "sakura_beauty_kb";

// ── Types ──

/// Handle to the persisted knowledge base.
pub struct KnowledgeStore {
    backend: Box<dyn StorageBackend>,
}

// ── Helpers ──

/// The bootstrap tips written on first-ever access.
pub fn default_items() -> Vec<KnowledgeItem> {
    vec![
        KnowledgeItem {
            id: "1".to_string(),
            category: Category::Skin,
            title: "Double Cleansing".to_string(),
            content: "In Japanese skincare, double cleansing is essential. Use an oil-based cleanser first to remove makeup and sunscreen, followed by a gentle foam cleanser.".to_string(),
        },
        KnowledgeItem {
            id: "2".to_string(),
            category: Category::Health,
            title: "Green Tea Benefits".to_string(),
            content: "Matcha is rich in antioxidants. Drinking green tea daily helps reduce inflammation and improves skin elasticity.".to_string(),
        },
        KnowledgeItem {
            id: "3".to_string(),
            category: Category::Makeup,
            title: "Natural Brows".to_string(),
            content: "Japanese beauty prefers straight, natural eyebrows that soften the facial expression compared to high arches.".to_string(),
        },
    ]
}

// ── Public API ──

impl KnowledgeStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Open the file-backed store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(data_dir))
    }

    /// All items, most recently added first. Seeds and persists the
    /// defaults if nothing has ever been stored.
    pub fn list(&self) -> Result<Vec<KnowledgeItem>> {
        match self.backend.read(STORAGE_KEY)? {
            None => {
                log::info!("knowledge base not initialized, seeding defaults");
                self.seed()
            }
            Some(payload) => match serde_json::from_str::<Vec<KnowledgeItem>>(&payload) {
                Ok(items) => Ok(items),
                Err(e) => {
                    // Not data-loss-safe: the unreadable payload is replaced.
                    log::warn!(
                        "stored knowledge base is corrupted ({}), re-seeding defaults",
                        e
                    );
                    self.seed()
                }
            },
        }
    }

    /// Validate and store a new item at the front of the collection.
    pub fn add(&self, item: NewKnowledgeItem) -> Result<KnowledgeItem> {
        item.validate()?;

        let mut items = self.list()?;
        let created = item.into_item();
        items.insert(0, created.clone());
        self.save(&items)?;

        log::info!("added knowledge item {} ({})", created.id, created.category);
        Ok(created)
    }

    /// Remove the item with `id`. Unknown ids are not an error; the return
    /// value reports whether anything was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut items = self.list()?;
        let before = items.len();
        items.retain(|item| item.id != id);
        self.save(&items)?;

        let removed = items.len() != before;
        if removed {
            log::info!("deleted knowledge item {}", id);
        } else {
            log::debug!("delete: no knowledge item with id {}", id);
        }
        Ok(removed)
    }

    /// One `[category] title: content` line per item, in `list()` order.
    pub fn context(&self) -> Result<String> {
        let lines: Vec<String> = self.list()?.iter().map(KnowledgeItem::context_line).collect();
        Ok(lines.join("\n"))
    }

    fn seed(&self) -> Result<Vec<KnowledgeItem>> {
        let items = default_items();
        self.save(&items)?;
        Ok(items)
    }

    fn save(&self, items: &[KnowledgeItem]) -> Result<()> {
        let payload =
            serde_json::to_string(items).map_err(|e| SakuraError::storage(STORAGE_KEY, e))?;
        self.backend.write(STORAGE_KEY, &payload)
    }
}

// ── Tests ──
