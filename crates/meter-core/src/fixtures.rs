//! # Demo Fixtures
//!
//! Identifiers and catalog data used by the fixed demo flows (tiered product
//! creation, the Connect subscription, usage reporting, the discounted
//! invoice). Defaults are compiled in; a TOML file can override any of them.

use crate::params::{PriceTier, ProductParams, RecurringInterval, TierBound, TieredPriceParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Demo product together with its tiered metered price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoCatalog {
    pub product: ProductParams,
    pub price: TieredPriceParams,
}

impl Default for DemoCatalog {
    fn default() -> Self {
        let seo_id = "developpeur-je-donne-des-cours-de-mathematiques-dinformatique-pour-tout-niveaux-et-pour-tout-mindset";

        Self {
            product: ProductParams {
                name: "Cour De Jean Maths".to_string(),
                description: Some("un produit pour announce de jean gautier ACCT".to_string()),
                metadata: BTreeMap::from([("seoId".to_string(), seo_id.to_string())]),
            },
            price: TieredPriceParams {
                product: String::new(),
                currency: "eur".to_string(),
                interval: RecurringInterval::Month,
                tiers: vec![
                    // 240 included minutes for a flat 100.00
                    PriceTier {
                        up_to: TierBound::Units(240),
                        flat_amount: Some(10_000),
                        unit_amount: None,
                        unit_amount_decimal: Some("0".to_string()),
                    },
                    PriceTier {
                        up_to: TierBound::Inf,
                        flat_amount: None,
                        unit_amount: Some(2_200),
                        unit_amount_decimal: None,
                    },
                ],
                metadata: BTreeMap::from([
                    ("availableMinutes".to_string(), "240".to_string()),
                    ("availableMonths".to_string(), "6".to_string()),
                ]),
            },
        }
    }
}

/// Fixed Connect subscription between the demo customer and connected account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectSubscriptionFixture {
    pub price: String,
    pub description: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub application_fee_percent: f64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub cancel_at: DateTime<Utc>,
}

impl Default for ConnectSubscriptionFixture {
    fn default() -> Self {
        Self {
            price: "price_1LIwQKDnahqFVvJv90OnmVJL".to_string(),
            description: "un produit pour announce de jean gautier ACCT".to_string(),
            metadata: BTreeMap::from([
                (
                    "seoId".to_string(),
                    "developpeur-je-donne-des-cours-de-mathematiques-dinformatique-pour-tout-niveaux-et-pour-tout-mindset".to_string(),
                ),
                ("teacherId".to_string(), "J-J".to_string()),
                ("announceId".to_string(), "J-J-announce".to_string()),
            ]),
            application_fee_percent: 30.0,
            // 2020-09-19T23:15:30Z
            cancel_at: DateTime::from_timestamp(1_600_557_330, 0).unwrap_or_default(),
        }
    }
}

/// Every fixed identifier the demo endpoints rely on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoFixtures {
    pub catalog: DemoCatalog,
    pub connect_subscription: ConnectSubscriptionFixture,
    /// Metered subscription item that `use-product` reports against
    pub usage_subscription_item: String,
    /// Price billed by the ad-hoc invoice
    pub invoice_price: String,
    /// Coupon applied to the ad-hoc invoice
    pub invoice_coupon: String,
}

impl Default for DemoFixtures {
    fn default() -> Self {
        Self {
            catalog: DemoCatalog::default(),
            connect_subscription: ConnectSubscriptionFixture::default(),
            usage_subscription_item: "si_M0yqKCA51nnVg0".to_string(),
            invoice_price: "price_1LskdDDnahqFVvJvYNedjT3B".to_string(),
            invoice_coupon: "NbCQqcV1".to_string(),
        }
    }
}

impl DemoFixtures {
    /// Load fixtures from a TOML string; missing sections keep their defaults
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_graduated_metered() {
        let catalog = DemoCatalog::default();
        assert_eq!(catalog.price.currency, "eur");
        assert_eq!(catalog.price.tiers.len(), 2);
        assert_eq!(catalog.price.tiers[0].flat_amount, Some(10_000));
        assert_eq!(catalog.price.tiers[1].up_to, TierBound::Inf);
    }

    #[test]
    fn test_partial_override() {
        let fixtures = DemoFixtures::from_toml(
            r#"
            usage_subscription_item = "si_override"
            invoice_coupon = "SPRING"
            "#,
        )
        .unwrap();

        assert_eq!(fixtures.usage_subscription_item, "si_override");
        assert_eq!(fixtures.invoice_coupon, "SPRING");
        assert_eq!(fixtures.invoice_price, DemoFixtures::default().invoice_price);
        assert_eq!(fixtures.catalog, DemoCatalog::default());
    }

    #[test]
    fn test_shipped_fixtures_match_defaults() {
        let fixtures =
            DemoFixtures::from_toml(include_str!("../../../config/demo.toml")).unwrap();
        assert_eq!(fixtures, DemoFixtures::default());
    }

    #[test]
    fn test_cancel_at_default() {
        let fixture = ConnectSubscriptionFixture::default();
        assert_eq!(fixture.cancel_at.timestamp(), 1_600_557_330);
        assert_eq!(fixture.application_fee_percent, 30.0);
    }
}
