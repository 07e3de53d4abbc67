//! Square task grids.
//!
//! Projects are usually split into a regular grid of square tasks. This
//! builds such a grid for demo data and test fixtures.

use crate::task::{Geometry, Position, TaskCollection, TaskFeature, TaskId, TaskProperties, TaskStatus};

/// Builds a `columns` x `rows` grid of READY tasks.
///
/// Tasks are numbered from 1, row by row starting at `origin` (the
/// south-west corner); each cell is `cell_size` degrees wide and tall.
#[must_use]
pub fn square_grid(origin: Position, cell_size: f64, columns: u32, rows: u32) -> TaskCollection {
    let mut features = Vec::new();
    for row in 0..rows {
        for col in 0..columns {
            let west = cell_size.mul_add(f64::from(col), origin[0]);
            let south = cell_size.mul_add(f64::from(row), origin[1]);
            let east = west + cell_size;
            let north = south + cell_size;
            let ring = vec![
                [west, south],
                [east, south],
                [east, north],
                [west, north],
                [west, south],
            ];
            features.push(TaskFeature::new(
                Geometry::MultiPolygon(vec![vec![ring]]),
                TaskProperties {
                    task_id: TaskId::new(row * columns + col + 1),
                    task_status: TaskStatus::Ready,
                    locked_by: None,
                    action_by: None,
                    action_date: None,
                },
            ));
        }
    }
    TaskCollection::new(features)
}
