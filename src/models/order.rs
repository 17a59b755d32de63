//! Progress and ordering arithmetic shared by the store and the database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// New board position for one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderEntry {
    pub id: Uuid,
    pub order: u32,
}

/// Batch of position changes. After it is applied the full goal list must
/// still be numbered `0..N` without gaps or duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReorderInput {
    pub goals: Vec<ReorderEntry>,
}

/// Rounded mean of progress values, `0` for an empty input.
///
/// Rounds half up: `[40, 81]` averages 60.5 and yields 61. Integer math keeps
/// the result exact for any number of values.
pub fn mean_progress<I>(values: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));

    if count == 0 {
        return 0;
    }

    // round(sum / count) == floor((2 * sum + count) / (2 * count)) for sum >= 0
    ((2 * sum + count) / (2 * count)) as u8
}

/// Move the element at `from` to `to`, shifting everything in between by one.
///
/// Out-of-range indices leave the slice untouched.
pub fn move_index<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Whether `orders` is exactly `{0, 1, ..., n-1}`.
pub fn is_dense<I>(orders: I) -> bool
where
    I: IntoIterator<Item = u32>,
{
    let mut orders: Vec<u32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(i, &o)| o as usize == i)
}
