//! Operation routing: which backend answers which operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BackendKind, Operation};

/// Per-operation backend overrides.
///
/// Operations that are not named fall back to
/// [`Operation::default_backend`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationPreference {
    overrides: BTreeMap<Operation, BackendKind>,
}

impl OperationPreference {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `operation` to `backend`.
    #[must_use]
    pub fn prefer(mut self, operation: Operation, backend: BackendKind) -> Self {
        self.overrides.insert(operation, backend);
        self
    }

    /// Route every listed operation to `backend`.
    #[must_use]
    pub fn prefer_all(
        mut self,
        operations: impl IntoIterator<Item = Operation>,
        backend: BackendKind,
    ) -> Self {
        for operation in operations {
            self.overrides.insert(operation, backend);
        }
        self
    }

    /// Backend configured for `operation`, defaults applied.
    #[must_use]
    pub fn backend_for(&self, operation: Operation) -> BackendKind {
        self.overrides
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.default_backend())
    }

    /// Explicit overrides only.
    pub fn overrides(&self) -> impl Iterator<Item = (Operation, BackendKind)> + '_ {
        self.overrides.iter().map(|(op, kind)| (*op, *kind))
    }
}

/// Fully resolved routing: one backend for every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    routes: BTreeMap<Operation, BackendKind>,
}

impl DispatchTable {
    /// Resolve every operation against `preference`.
    #[must_use]
    pub fn new(preference: &OperationPreference) -> Self {
        let routes = Operation::ALL
            .into_iter()
            .map(|operation| (operation, preference.backend_for(operation)))
            .collect();
        Self { routes }
    }

    /// Backend selected for `operation`.
    #[must_use]
    pub fn backend_for(&self, operation: Operation) -> BackendKind {
        self.routes
            .get(&operation)
            .copied()
            .unwrap_or_else(|| operation.default_backend())
    }

    /// Operations routed to `backend`.
    pub fn operations_for(&self, backend: BackendKind) -> impl Iterator<Item = Operation> + '_ {
        self.routes
            .iter()
            .filter(move |(_, kind)| **kind == backend)
            .map(|(operation, _)| *operation)
    }

    /// Every route, ordered by operation.
    pub fn iter(&self) -> impl Iterator<Item = (Operation, BackendKind)> + '_ {
        self.routes.iter().map(|(op, kind)| (*op, *kind))
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new(&OperationPreference::default())
    }
}
