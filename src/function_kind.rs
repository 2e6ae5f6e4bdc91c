use serde::Serialize;

/// How a generated call is compared against gold calls of the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionKind {
    /// Deterministic lookups (`check_*`): every argument must match.
    Exact,
    /// Searches (`search_*`): numeric fields must match, the rest is scored
    /// by token overlap.
    Fuzzy,
    /// Anything else, e.g. actions such as `sell` or `equip`. Never matched.
    Unrecognized,
}

impl FunctionKind {
    /// Classifies a function by naming convention. `check` wins over `search`
    /// when a name contains both.
    pub fn classify(name: &str) -> Self {
        if name.contains("check") {
            FunctionKind::Exact
        } else if name.contains("search") {
            FunctionKind::Fuzzy
        } else {
            FunctionKind::Unrecognized
        }
    }
}
