//! # Plans
//!
//! The closed set of subscription plans and the price book that binds each
//! plan to a provider price id. Clients refer to plans by identifier
//! (`"BASIC"`, `"PREMIUM"`); the server never forwards those strings as
//! price ids.

use crate::error::{BillingError, BillingResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Subscription plan offered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    Basic,
    Premium,
}

impl Plan {
    /// Identifier used by clients and as the environment variable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "BASIC",
            Plan::Premium => "PREMIUM",
        }
    }
}

impl FromStr for Plan {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASIC" => Ok(Plan::Basic),
            "PREMIUM" => Ok(Plan::Premium),
            _ => Err(BillingError::UnknownPlan {
                plan: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan to price id mapping, complete by construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBook {
    basic: String,
    premium: String,
}

impl PriceBook {
    /// Create a price book; both price ids must be non-empty
    pub fn new(basic: impl Into<String>, premium: impl Into<String>) -> BillingResult<Self> {
        let basic = basic.into();
        let premium = premium.into();

        for (plan, price) in [(Plan::Basic, &basic), (Plan::Premium, &premium)] {
            if price.trim().is_empty() {
                return Err(BillingError::Configuration(format!(
                    "price id for plan {} is empty",
                    plan
                )));
            }
        }

        Ok(Self { basic, premium })
    }

    /// Price id bound to a plan
    pub fn price_for(&self, plan: Plan) -> &str {
        match plan {
            Plan::Basic => &self.basic,
            Plan::Premium => &self.premium,
        }
    }

    /// Resolve a client-supplied plan identifier to its price id
    pub fn resolve(&self, plan_id: &str) -> BillingResult<&str> {
        let plan: Plan = plan_id.parse()?;
        Ok(self.price_for(plan))
    }
}
