use serde::{Deserialize, Serialize};

/// Subscription tier resolved by the plan gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, Plan::Premium)
    }
}

/// Request-scoped caller context attached by the plan gate.
/// Handlers read it through `Extension<PlanContext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanContext {
    pub user_id: String,
    pub plan: Plan,
    /// Free-tier actions consumed so far. Always 0 for premium callers.
    pub free_usage: u32,
}
