use std::cmp::Ordering;

use agf_common::BatchId;

/// Position of one rendered record plus the value it sorts by.
///
/// Equality and ordering consider `sort_field` only, so a stable sort keeps
/// records with equal fields in processing order.
#[derive(Debug, Clone)]
pub struct OrderKey {
    pub batch_id: BatchId,
    pub record_index: usize,
    pub sort_field: String,
}

impl OrderKey {
    pub fn new(batch_id: BatchId, record_index: usize, sort_field: String) -> Self {
        Self {
            batch_id,
            record_index,
            sort_field,
        }
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.sort_field == other.sort_field
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_field.cmp(&other.sort_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_on_equal_fields() {
        let id = BatchId::from("batch_1_0");
        let mut keys = vec![
            OrderKey::new(id.clone(), 0, "b".into()),
            OrderKey::new(id.clone(), 1, "a".into()),
            OrderKey::new(id.clone(), 2, "b".into()),
            OrderKey::new(id, 3, "a".into()),
        ];
        keys.sort();
        let order: Vec<usize> = keys.iter().map(|k| k.record_index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
