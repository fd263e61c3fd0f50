//! Requested page orderings.
//!
//! Entries are parsed leniently: an entry with a malformed page id or a
//! missing/non-integer position is dropped and counted, and the rest of
//! the batch still applies. Only a non-list `pageOrder` rejects the whole
//! request at parse time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{check_position, ObjectId, ValidationError};

/// Move one page to a new position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMove {
    pub page_id: ObjectId,
    pub new_position: i64,
}

impl PageMove {
    pub fn new(page_id: ObjectId, new_position: i64) -> Self {
        Self { page_id, new_position }
    }
}

/// The usable part of a reorder request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOrder {
    /// Well-formed entries, in request order.
    pub moves: Vec<PageMove>,

    /// Entries dropped as malformed.
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    page_id: String,
    new_position: i64,
}

impl PageOrder {
    /// Parse a `pageOrder` JSON value.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let entries = value.as_array().ok_or(ValidationError::PageOrderNotList)?;

        let mut order = PageOrder::default();
        for (index, entry) in entries.iter().enumerate() {
            let raw = match RawEntry::deserialize(entry) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed reorder entry");
                    order.skipped += 1;
                    continue;
                }
            };

            match ObjectId::parse(&raw.page_id) {
                Ok(page_id) => order.moves.push(PageMove::new(page_id, raw.new_position)),
                Err(e) => {
                    warn!(index, page_id = %raw.page_id, error = %e, "Skipping reorder entry with invalid page id");
                    order.skipped += 1;
                }
            }
        }

        Ok(order)
    }

    /// Number of entries the caller supplied.
    pub fn requested(&self) -> usize {
        self.moves.len() + self.skipped
    }
}

/// Reject move sets that could never reach a valid at-rest state.
///
/// Duplicate checks only make sense for moves that resolve to pages of the
/// book; the store filters out the rest before calling this.
pub fn check_moves(moves: &[PageMove]) -> Result<(), ValidationError> {
    let mut pages = HashSet::with_capacity(moves.len());
    let mut positions = HashSet::with_capacity(moves.len());

    for mv in moves {
        check_position(mv.new_position)?;
        if !pages.insert(mv.page_id) {
            return Err(ValidationError::DuplicatePage(mv.page_id));
        }
        if !positions.insert(mv.new_position) {
            return Err(ValidationError::DuplicatePosition(mv.new_position));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_POSITION;
    use serde_json::json;

    const A: &str = "65a1f0c2e4b0a1b2c3d4e5f1";
    const B: &str = "65a1f0c2e4b0a1b2c3d4e5f2";

    #[test]
    fn test_non_list_rejected() {
        for value in [json!(null), json!({}), json!("A:1"), json!(3)] {
            assert_eq!(
                PageOrder::from_value(&value),
                Err(ValidationError::PageOrderNotList)
            );
        }
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let value = json!([
            { "pageId": A, "newPosition": 2 },
            { "pageId": "not-an-id", "newPosition": 1 },
            { "pageId": B },
            { "pageId": B, "newPosition": "3" },
            "garbage",
            { "pageId": B, "newPosition": 1 },
        ]);

        let order = PageOrder::from_value(&value).unwrap();
        assert_eq!(order.skipped, 4);
        assert_eq!(order.requested(), 6);
        assert_eq!(
            order.moves,
            vec![
                PageMove::new(ObjectId::parse(A).unwrap(), 2),
                PageMove::new(ObjectId::parse(B).unwrap(), 1),
            ]
        );
    }

    #[test]
    fn test_empty_list_is_valid() {
        let order = PageOrder::from_value(&json!([])).unwrap();
        assert!(order.moves.is_empty());
        assert_eq!(order.requested(), 0);
    }

    #[test]
    fn test_check_moves() {
        let a = ObjectId::parse(A).unwrap();
        let b = ObjectId::parse(B).unwrap();

        assert!(check_moves(&[PageMove::new(a, 2), PageMove::new(b, 1)]).is_ok());
        // Gaps are fine
        assert!(check_moves(&[PageMove::new(a, 10), PageMove::new(b, 0)]).is_ok());

        assert_eq!(
            check_moves(&[PageMove::new(a, -1)]),
            Err(ValidationError::NegativePosition(-1))
        );
        assert!(check_moves(&[PageMove::new(a, MAX_POSITION)]).is_ok());
        assert_eq!(
            check_moves(&[PageMove::new(a, MAX_POSITION + 1)]),
            Err(ValidationError::PositionTooLarge(MAX_POSITION + 1))
        );
        assert_eq!(
            check_moves(&[PageMove::new(a, 1), PageMove::new(a, 2)]),
            Err(ValidationError::DuplicatePage(a))
        );
        assert_eq!(
            check_moves(&[PageMove::new(a, 1), PageMove::new(b, 1)]),
            Err(ValidationError::DuplicatePosition(1))
        );
    }
}
