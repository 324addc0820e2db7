//! Rows to render, derived from the catalog snapshot and the favorites list.
//!
//! Derivation never fails: a favorite whose book is not in the snapshot is
//! simply left out, since the two sync independently.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{BookId, BookRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowViewModel {
    pub book_id: BookId,
    pub title: String,
    pub is_favorite: bool,
}

/// One row per catalog entry, in catalog order, flagged by favorites membership.
pub fn render(catalog: &[BookRecord], favorite_book_ids: &[BookId]) -> Vec<RowViewModel> {
    let favorites: HashSet<&str> = favorite_book_ids.iter().map(String::as_str).collect();
    catalog
        .iter()
        .map(|book| RowViewModel {
            book_id: book.id.clone(),
            title: book.title.clone(),
            is_favorite: favorites.contains(book.id.as_str()),
        })
        .collect()
}

/// One row per resolvable favorite, in favorites order.
pub fn render_favorites(
    catalog: &[BookRecord],
    favorite_book_ids: &[BookId],
) -> Vec<RowViewModel> {
    favorite_book_ids
        .iter()
        .filter_map(|id| catalog.iter().find(|book| &book.id == id))
        .map(|book| RowViewModel {
            book_id: book.id.clone(),
            title: book.title.clone(),
            is_favorite: true,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Catalog,
    Favorites,
}

/// Holds the currently derived rows for one list.
#[derive(Debug, Clone)]
pub struct BookListViewModel {
    kind: ListKind,
    rows: Vec<RowViewModel>,
}

impl BookListViewModel {
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    pub fn kind(&self) -> ListKind {
        self.kind
    }

    pub fn recompute(
        &mut self,
        catalog: &[BookRecord],
        favorite_book_ids: &[BookId],
    ) -> &[RowViewModel] {
        self.rows = match self.kind {
            ListKind::Catalog => render(catalog, favorite_book_ids),
            ListKind::Favorites => render_favorites(catalog, favorite_book_ids),
        };
        &self.rows
    }

    pub fn rows(&self) -> &[RowViewModel] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&RowViewModel> {
        self.rows.get(position)
    }

    /// The book shown at `position`, as currently rendered.
    pub fn book_id_at(&self, position: usize) -> Option<&str> {
        self.row(position).map(|row| row.book_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<BookRecord> {
        vec![
            BookRecord::new("b1", "Dune"),
            BookRecord::new("b2", "Emma"),
            BookRecord::new("b3", "Ulysses"),
        ]
    }

    fn ids(values: &[&str]) -> Vec<BookId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn render_flags_favorites_in_catalog_order() {
        let rows = render(&catalog(), &ids(&["b3", "b1"]));
        let flags: Vec<_> = rows.iter().map(|r| (r.book_id.as_str(), r.is_favorite)).collect();
        assert_eq!(flags, vec![("b1", true), ("b2", false), ("b3", true)]);
    }

    #[test]
    fn favorites_follow_list_order() {
        let rows = render_favorites(&catalog(), &ids(&["b3", "b1"]));
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Ulysses", "Dune"]);
    }

    #[test]
    fn unresolvable_favorites_are_skipped() {
        let rows = render_favorites(&catalog(), &ids(&["b2", "gone", "b1"]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].book_id, "b2");
        assert_eq!(rows[1].book_id, "b1");
    }

    #[test]
    fn empty_inputs() {
        assert!(render(&[], &ids(&["b1"])).is_empty());
        assert!(render_favorites(&catalog(), &[]).is_empty());
    }

    #[test]
    fn position_translates_to_rendered_book() {
        let mut view = BookListViewModel::new(ListKind::Favorites);
        view.recompute(&catalog(), &ids(&["b3", "missing", "b2"]));

        assert_eq!(view.book_id_at(0), Some("b3"));
        assert_eq!(view.book_id_at(1), Some("b2"));
        assert_eq!(view.book_id_at(2), None);
    }

    #[test]
    fn recompute_replaces_rows() {
        let mut view = BookListViewModel::new(ListKind::Catalog);
        view.recompute(&catalog(), &[]);
        assert!(view.rows().iter().all(|r| !r.is_favorite));

        view.recompute(&catalog(), &ids(&["b2"]));
        assert!(view.row(1).unwrap().is_favorite);
        assert_eq!(view.kind(), ListKind::Catalog);
    }
}
