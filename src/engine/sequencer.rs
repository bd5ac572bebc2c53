use std::collections::HashSet;

use thiserror::Error;

use crate::models::order::OrderId;
use crate::models::route::RouteId;
use crate::models::stop::{Stop, StopStatus};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("at least one order must be selected")]
    InvalidSelection,

    #[error("order {0} is selected more than once")]
    DuplicateOrder(OrderId),
}

pub fn check_selection(selection: &[OrderId]) -> Result<(), SequenceError> {
    if selection.is_empty() {
        return Err(SequenceError::InvalidSelection);
    }

    let mut seen = HashSet::with_capacity(selection.len());
    for order_id in selection {
        if !seen.insert(*order_id) {
            return Err(SequenceError::DuplicateOrder(*order_id));
        }
    }

    Ok(())
}

/// Numbers the selection 1..=n in the order the operator picked it.
///
/// Stops are never reordered by address or distance.
pub fn sequence_stops(route_id: RouteId, selection: &[OrderId]) -> Result<Vec<Stop>, SequenceError> {
    check_selection(selection)?;

    Ok(selection
        .iter()
        .zip(1u32..)
        .map(|(order_id, stop_number)| Stop {
            route_id,
            order_id: *order_id,
            stop_number,
            status: StopStatus::Pending,
            estimated_arrival_time: None,
        })
        .collect())
}
