//! Row selection filtering.

use serde_json::Value;

use super::filter::scalar_value;
use super::request::{GridRequest, RowModel};
use super::scope::QueryScope;
use crate::error::GridResult;

/// Whether toggled rows are the selection or the exceptions to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Only the toggled rows are selected.
    Include,
    /// Everything except the toggled rows is selected.
    Exclude,
}

/// Restricts a query to the selected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionFilter {
    pub mode: SelectionMode,
    pub toggled: Vec<Value>,
}

impl SelectionFilter {
    /// Selection carried by a request; `None` when no row model is given.
    pub fn from_request(request: &GridRequest) -> Option<Self> {
        let mode = match request.row_model? {
            RowModel::ServerSide if request.select_all => SelectionMode::Exclude,
            RowModel::ServerSide | RowModel::ClientSide => SelectionMode::Include,
        };
        Some(Self {
            mode,
            toggled: request.toggled_nodes.clone(),
        })
    }

    /// Restrict the scope on its primary key.
    ///
    /// An empty include list selects nothing; an empty exclude list selects
    /// everything.
    pub fn apply(&self, scope: &mut QueryScope) -> GridResult<()> {
        let primary_key = scope.primary_key().to_string();
        let ids = self
            .toggled
            .iter()
            .map(|id| scalar_value(&primary_key, id))
            .collect::<GridResult<Vec<_>>>()?;

        match self.mode {
            SelectionMode::Include => scope.where_in(&primary_key, ids),
            SelectionMode::Exclude => scope.where_not_in(&primary_key, ids),
        };
        Ok(())
    }
}
