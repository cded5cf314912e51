//! Row-major index arithmetic for an N-dimensional case grid.

use serde::{Deserialize, Serialize};

/// Shape of a case matrix, one dimension per parameter group.
///
/// Indices are enumerated in row-major order where the last dimension varies
/// fastest. A grid with no dimensions has exactly one point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseGrid {
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl CaseGrid {
    #[must_use]
    pub fn new(shape: Vec<usize>) -> Self {
        let strides = compute_strides(&shape);
        Self { shape, strides }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of points
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert multi-dimensional indices to flat index
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&idx, &size)) in indices.iter().zip(&self.shape).enumerate() {
            if idx >= size {
                return None;
            }
            flat += idx * self.strides[i];
        }
        Some(flat)
    }

    /// Convert flat index to multi-dimensional indices
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.len() {
            return None;
        }
        let mut indices = Vec::with_capacity(self.shape.len());
        let mut remaining = flat;
        for &stride in &self.strides {
            indices.push(remaining / stride);
            remaining %= stride;
        }
        Some(indices)
    }

    /// Iterate over all indices in row-major order
    pub fn indices(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        (0..self.len()).filter_map(|flat| self.multi_index(flat))
    }
}

/// Compute strides for row-major order
fn compute_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len() - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_order() {
        let grid = CaseGrid::new(vec![2, 3]);
        let all: Vec<_> = grid.indices().collect();
        assert_eq!(
            all,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_flat_and_multi_index_agree() {
        let grid = CaseGrid::new(vec![3, 1, 4]);
        for flat in 0..grid.len() {
            let multi = grid.multi_index(flat).unwrap();
            assert_eq!(grid.flat_index(&multi), Some(flat));
        }
        assert_eq!(grid.flat_index(&[3, 0, 0]), None);
        assert_eq!(grid.multi_index(12), None);
    }

    #[test]
    fn test_empty_shape_has_single_point() {
        let grid = CaseGrid::new(Vec::new());
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.indices().collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
    }
}
