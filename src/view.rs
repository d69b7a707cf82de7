//! Pure projection of the store into card view models.

use crate::app::{BulletinStatus, BulletinSummary};
use crate::store::BulletinStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub index: usize,
    pub name: String,
    pub available: bool,
    pub remote_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardViewModel {
    pub id: String,
    pub name: String,
    pub status: BulletinStatus,
    pub last_run: String,
    pub has_warnings: bool,
    pub rerun_disabled: bool,
    pub products: Vec<ProductView>,
    pub access_command: Option<String>,
}

impl CardViewModel {
    pub fn product(&self, index: usize) -> Option<&ProductView> {
        self.products.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Loading,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardRow {
    Card(CardViewModel),
    Placeholder(Placeholder),
}

/// Rerun is refused when the backend says so, or when it reports it cannot
/// reach the job host at all. A failed job is always retriable.
pub fn rerun_disabled(bulletin: &BulletinSummary) -> bool {
    bulletin.rerun_disabled || bulletin.status.is_backend_fault()
}

pub fn card(bulletin: &BulletinSummary) -> CardViewModel {
    CardViewModel {
        id: bulletin.id.clone(),
        name: bulletin.name.clone(),
        status: bulletin.status,
        last_run: bulletin.last_run.clone(),
        has_warnings: bulletin.has_warnings,
        rerun_disabled: rerun_disabled(bulletin),
        products: bulletin
            .product_info
            .iter()
            .enumerate()
            .map(|(index, p)| ProductView {
                index,
                name: p.name.clone(),
                available: p.available,
                remote_path: p.remote_path.clone(),
            })
            .collect(),
        access_command: bulletin
            .access_command
            .clone()
            .filter(|c| !c.trim().is_empty()),
    }
}

/// One card per bulletin in API order; an empty snapshot renders one placeholder.
pub fn render(snapshot: &[BulletinSummary]) -> Vec<CardRow> {
    if snapshot.is_empty() {
        return vec![CardRow::Placeholder(Placeholder {
            kind: PlaceholderKind::Empty,
            message: "No bulletins configured".to_string(),
        })];
    }
    snapshot.iter().map(|b| CardRow::Card(card(b))).collect()
}

/// Like [`render`], but shows a single loading or error placeholder while the
/// list is unknown.
pub fn render_store(store: &BulletinStore) -> Vec<CardRow> {
    if let Some(err) = store.last_error() {
        return vec![CardRow::Placeholder(Placeholder {
            kind: PlaceholderKind::Error,
            message: format!("Failed to load bulletins: {err}"),
        })];
    }
    if !store.is_loaded() {
        return vec![CardRow::Placeholder(Placeholder {
            kind: PlaceholderKind::Loading,
            message: "Loading bulletins…".to_string(),
        })];
    }
    render(&store.current())
}
