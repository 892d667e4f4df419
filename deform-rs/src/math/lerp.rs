/// Rescales `t` from `[lower, upper]` to `[0, 1]`
pub fn rescale(t: f32, lower: f32, upper: f32) -> f32 {
    (t - lower) / (upper - lower)
}

/// The pair of neighbouring entries surrounding a query value, and how far
/// between them the query sits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub min_index: usize,
    pub max_index: usize,
    pub fraction: f32,
}

// Returns the index of the element directly less than and the index of the element directly
// greater than the given element.
// Note this the values given are not *strictly* greater or less - if the given element
// is present in the slice, the index of the given element will be returned as the lower
// index.
//
// Queries outside of the first and last element are clamped onto the first or last segment.
// This function assumes the slice is sorted. Unsorted input still yields indices inside the
// slice, but which segment is chosen is meaningless.
fn lower_upper_indices(slice: &[f32], elem: f32) -> (usize, usize) {
    debug_assert!(slice.len() > 1);
    let last = slice.len() - 1;

    if elem <= slice[0] {
        return (0, 1);
    }
    if elem >= slice[last] {
        return (last - 1, last);
    }

    match slice.binary_search_by(|x| x.total_cmp(&elem)) {
        Ok(index) => {
            if index == last {
                // Element was last value, we can only return second-to-last
                (last - 1, last)
            } else {
                (index, index + 1)
            }
        }
        Err(index) => {
            // Only reachable out of range when the slice isn't sorted.
            let index = index.clamp(1, last);
            (index - 1, index)
        }
    }
}

/// Finds the segment of `values` containing `query`, clamping at both ends.
///
/// Returns `None` for an empty slice. A single value always brackets itself
/// with a fraction of zero.
pub fn find_bracket(query: f32, values: &[f32]) -> Option<Bracket> {
    match values.len() {
        0 => None,
        1 => Some(Bracket {
            min_index: 0,
            max_index: 0,
            fraction: 0.0,
        }),
        _ => {
            let (lower, upper) = lower_upper_indices(values, query);
            let (low, high) = (values[lower], values[upper]);

            let fraction = if high == low {
                0.0
            } else {
                rescale(query, low, high).clamp(0.0, 1.0)
            };

            Some(Bracket {
                min_index: lower,
                max_index: upper,
                fraction,
            })
        }
    }
}
