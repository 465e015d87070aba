use crate::domain::model::SelectedItem;
use crate::utils::error::{CalcError, Result};

/// Sums `unit_weight * count` over every item with a positive count.
///
/// Fails with `EmptySelectionError` when nothing qualifies so the caller
/// blocks the calculation instead of reporting a zero-weight bag.
pub fn aggregate(items: &[SelectedItem]) -> Result<f64> {
    let mut total = 0.0;
    let mut counted = 0_usize;

    for item in items {
        if item.count == 0 {
            continue;
        }
        total += item.unit_weight * item.count as f64;
        counted += 1;
    }

    if counted == 0 {
        return Err(CalcError::EmptySelectionError);
    }

    Ok(total)
}
