use std::fmt::{Display, Formatter, Result};

/// Result of one attempt at an external call. Collaborators never raise; the
/// relay decides what each outcome means for the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Delivered { status: u16 },
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, StepOutcome::Delivered { .. })
    }
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            StepOutcome::Delivered { status } => write!(f, "delivered ({})", status),
            StepOutcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            StepOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
