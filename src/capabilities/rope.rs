//! Rope-cutting puzzle board.
//!
//! The learner places cuts on a rope of fixed length so the resulting
//! pieces satisfy the level's goal. The board is shared between the host
//! (which renders it and checks the goal) and the executed code (which
//! calls `addCut`, `removeCut` and `cuts`).

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::guard::guard;
use crate::core::{CapabilitySet, GenerationLease};
use crate::evaluator::{sync_fn, HostError, HostFunction, HostResult, Value};

/// One accepted board mutation, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "position", rename_all = "camelCase")]
pub enum RopeEvent {
    AddCut(f64),
    RemoveCut(f64),
}

#[derive(Debug, Default)]
struct RopeState {
    cuts: Vec<f64>,
    history: Vec<RopeEvent>,
}

/// Cheap handle to a shared rope board.
#[derive(Debug, Clone)]
pub struct RopeBoard {
    length: f64,
    state: Arc<Mutex<RopeState>>,
}

impl RopeBoard {
    pub fn new(length: f64) -> Self {
        Self {
            length,
            state: Arc::new(Mutex::new(RopeState::default())),
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Current cut positions, ascending.
    pub fn cuts(&self) -> Vec<f64> {
        self.state.lock().cuts.clone()
    }

    /// Lengths of the pieces between consecutive cuts.
    pub fn pieces(&self) -> Vec<f64> {
        let state = self.state.lock();
        let mut edges = Vec::with_capacity(state.cuts.len() + 2);
        edges.push(0.0);
        edges.extend(state.cuts.iter().copied());
        edges.push(self.length);
        edges.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn history(&self) -> Vec<RopeEvent> {
        self.state.lock().history.clone()
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.cuts.clear();
        state.history.clear();
    }

    pub fn add_cut(&self, position: f64) -> Result<(), String> {
        if !(position > 0.0 && position < self.length) {
            return Err(format!(
                "Cut position {} is outside the rope (0 to {})",
                Value::from(position),
                Value::from(self.length)
            ));
        }
        let mut state = self.state.lock();
        match state.cuts.binary_search_by(|c| c.total_cmp(&position)) {
            Ok(_) => Err(format!("There is already a cut at {}", Value::from(position))),
            Err(index) => {
                state.cuts.insert(index, position);
                state.history.push(RopeEvent::AddCut(position));
                Ok(())
            }
        }
    }

    pub fn remove_cut(&self, position: f64) -> Result<(), String> {
        let mut state = self.state.lock();
        match state.cuts.binary_search_by(|c| c.total_cmp(&position)) {
            Ok(index) => {
                state.cuts.remove(index);
                state.history.push(RopeEvent::RemoveCut(position));
                Ok(())
            }
            Err(_) => Err(format!("There is no cut at {}", Value::from(position))),
        }
    }

    fn add_cut_fn(&self) -> Arc<dyn HostFunction> {
        let board = self.clone();
        sync_fn("addCut", move |args| {
            let position = position_arg("addCut", &args)?;
            board.add_cut(position).map_err(HostError::message)?;
            Ok(Value::Undefined)
        })
    }

    fn remove_cut_fn(&self) -> Arc<dyn HostFunction> {
        let board = self.clone();
        sync_fn("removeCut", move |args| {
            let position = position_arg("removeCut", &args)?;
            board.remove_cut(position).map_err(HostError::message)?;
            Ok(Value::Undefined)
        })
    }

    fn cuts_fn(&self) -> Arc<dyn HostFunction> {
        let board = self.clone();
        sync_fn("cuts", move |_| -> HostResult {
            Ok(Value::array(board.cuts().into_iter().map(Value::from).collect()))
        })
    }
}

fn position_arg(function: &str, args: &[Value]) -> Result<f64, HostError> {
    match args.first().and_then(Value::as_f64) {
        Some(position) if position.is_finite() => Ok(position),
        _ => Err(HostError::type_error(format!(
            "{} expects a finite number",
            function
        ))),
    }
}

impl CapabilitySet for RopeBoard {
    fn bindings(&self, lease: &GenerationLease) -> Vec<(String, Value)> {
        vec![
            ("ropeLength".to_string(), Value::from(self.length)),
            ("addCut".to_string(), Value::host(guard(self.add_cut_fn(), lease))),
            (
                "removeCut".to_string(),
                Value::host(guard(self.remove_cut_fn(), lease)),
            ),
            ("cuts".to_string(), Value::host(guard(self.cuts_fn(), lease))),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GenerationCounter;

    fn host(bindings: &[(String, Value)], name: &str) -> Arc<dyn HostFunction> {
        match bindings.iter().find(|(n, _)| n == name) {
            Some((_, Value::Function(crate::evaluator::Callable::Host(f)))) => f.clone(),
            other => panic!("no host function {}: {:?}", name, other),
        }
    }

    #[test]
    fn test_cuts_stay_sorted_and_split_the_rope() {
        let board = RopeBoard::new(10.0);
        board.add_cut(7.0).unwrap();
        board.add_cut(3.0).unwrap();
        assert_eq!(board.cuts(), vec![3.0, 7.0]);
        assert_eq!(board.pieces(), vec![3.0, 4.0, 3.0]);

        board.remove_cut(7.0).unwrap();
        assert_eq!(board.pieces(), vec![3.0, 7.0]);
        assert_eq!(
            board.history(),
            vec![
                RopeEvent::AddCut(7.0),
                RopeEvent::AddCut(3.0),
                RopeEvent::RemoveCut(7.0)
            ]
        );
    }

    #[test]
    fn test_rejects_invalid_cuts() {
        let board = RopeBoard::new(10.0);
        assert!(board.add_cut(0.0).is_err());
        assert!(board.add_cut(10.0).is_err());
        board.add_cut(5.0).unwrap();
        assert_eq!(
            board.add_cut(5.0).unwrap_err(),
            "There is already a cut at 5"
        );
        assert_eq!(board.remove_cut(4.0).unwrap_err(), "There is no cut at 4");
    }

    #[tokio::test]
    async fn test_capabilities_mutate_board_until_stale() {
        let board = RopeBoard::new(10.0);
        let counter = GenerationCounter::new();
        let bindings = board.bindings(&counter.begin());
        let add_cut = host(&bindings, "addCut");

        add_cut.call(vec![Value::from(4)]).await.unwrap();
        assert_eq!(board.cuts(), vec![4.0]);

        counter.bump();
        assert!(matches!(
            add_cut.call(vec![Value::from(6)]).await,
            Err(HostError::Refused)
        ));
        assert_eq!(board.cuts(), vec![4.0]);
    }

    #[tokio::test]
    async fn test_non_numeric_position_is_type_error() {
        let board = RopeBoard::new(10.0);
        let counter = GenerationCounter::new();
        let bindings = board.bindings(&counter.begin());
        let err = host(&bindings, "addCut")
            .call(vec![Value::from("five")])
            .await
            .unwrap_err();
        match err {
            HostError::Thrown(value) => {
                assert_eq!(value.to_string(), "TypeError: addCut expects a finite number")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
