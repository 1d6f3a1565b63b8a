//! Payment methods

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a sale is settled.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash at the counter
    #[default]
    Cash,

    /// Card terminal
    Card,

    /// Cheque
    Cheque,

    /// Bank transfer
    Transfer,

    /// Sale on the customer's account, settled later
    Credit,
}

impl PaymentMethod {
    /// Whether a sale paid this way needs a selected customer.
    pub fn requires_customer(self) -> bool {
        matches!(self, Self::Credit)
    }

    /// Wire name, as sent to the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Card => "CARD",
            Self::Cheque => "CHEQUE",
            Self::Transfer => "TRANSFER",
            Self::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
