//! Note path resolution
//!
//! Turns the relative offset chain of a level into absolute positions.
//! Position depends only on document order, never on note timing.

use glam::Vec2;

use crate::consts::GRID_UNIT;
use crate::level::Note;

/// Resolve note offsets into absolute positions.
///
/// Element 0 is the synthetic start note at the origin; element `i + 1` is
/// element `i` plus `content[i]`'s offset scaled by the grid unit.
pub fn resolve(content: &[Note]) -> Vec<Vec2> {
    let mut positions = Vec::with_capacity(content.len() + 1);
    let mut current = Vec2::ZERO;
    positions.push(current);
    for note in content {
        let [dx, dy] = note.position_offset;
        current += Vec2::new(dx, dy) * GRID_UNIT;
        positions.push(current);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_content_is_origin_only() {
        assert_eq!(resolve(&[]), vec![Vec2::ZERO]);
    }

    #[test]
    fn test_offsets_accumulate_in_document_order() {
        // Timing is deliberately out of order; it must not affect positions
        let content = [
            Note::tap(2.0, 0.0, 3000.0),
            Note::tap(1.0, 2.0, 1000.0),
            Note::tap(-1.0, 0.0, 2000.0),
        ];
        assert_eq!(
            resolve(&content),
            vec![
                Vec2::ZERO,
                Vec2::new(100.0, 0.0),
                Vec2::new(150.0, 100.0),
                Vec2::new(100.0, 100.0),
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_length_origin_and_determinism(
            offsets in prop::collection::vec((-4i8..=4, -4i8..=4, 0u32..10_000), 0..64)
        ) {
            let content: Vec<Note> = offsets
                .iter()
                .map(|&(dx, dy, t)| Note::tap(dx as f32, dy as f32, t as f64))
                .collect();

            let first = resolve(&content);
            let second = resolve(&content);

            prop_assert_eq!(first.len(), content.len() + 1);
            prop_assert_eq!(first[0], Vec2::ZERO);
            prop_assert_eq!(&first, &second);
            for (i, note) in content.iter().enumerate() {
                let step = first[i + 1] - first[i];
                prop_assert_eq!(step, Vec2::from(note.position_offset) * GRID_UNIT);
            }
        }
    }
}
