//! Hierarchy expansion: one parent row with a count → one row per child.
//!
//! Used twice per study: videos → chapters and chapters → turn slots.
//! Parent order is preserved and child indices run 1..=count ascending, so
//! the output can be regrouped by contiguous runs with [`group_contiguous`].

/// Repeat each parent `count(parent)` times, pairing it with child index 1..=count.
pub fn expand<P, F>(parents: &[P], count: F) -> Vec<(P, u32)>
where
    P: Clone,
    F: Fn(&P) -> u32,
{
    let total: usize = parents.iter().map(|p| count(p) as usize).sum();
    let mut out = Vec::with_capacity(total);
    for parent in parents {
        for child in 1..=count(parent) {
            out.push((parent.clone(), child));
        }
    }
    out
}

/// Split a sequence into maximal contiguous runs sharing the same key.
pub fn group_contiguous<T, K, F>(rows: &[T], key: F) -> Vec<&[T]>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    rows.chunk_by(|a, b| key(a) == key(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_preserves_order_and_indices() {
        let parents = vec![("a", 2u32), ("b", 3), ("c", 1)];
        let rows = expand(&parents, |p| p.1);
        let flat: Vec<(&str, u32)> = rows.iter().map(|(p, i)| (p.0, *i)).collect();
        assert_eq!(
            flat,
            vec![("a", 1), ("a", 2), ("b", 1), ("b", 2), ("b", 3), ("c", 1)]
        );
    }

    #[test]
    fn test_expand_zero_count_drops_parent() {
        let parents = vec![("a", 0u32), ("b", 2)];
        let rows = expand(&parents, |p| p.1);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(p, _)| p.0 == "b"));
    }

    #[test]
    fn test_group_contiguous_regroups_expansion() {
        let parents = vec![("a", 2u32), ("b", 3)];
        let rows = expand(&parents, |p| p.1);
        let groups = group_contiguous(&rows, |(p, _)| p.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 3);
    }
}
