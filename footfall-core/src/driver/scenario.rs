use bytes::Bytes;
use serde_json::json;

use crate::HttpRequest;

/// One weighted kind of synthetic shopper traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    /// Fraction of traffic this scenario should receive, in `(0, 1]`.
    pub weight: f64,
    pub kind: ScenarioKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    BrowseProducts,
    ViewProduct,
    SearchProducts,
    MakePurchase,
}

/// Ids the shop seeds its catalog with.
const PRODUCT_IDS: std::ops::RangeInclusive<u32> = 1..=5;
const QUANTITIES: std::ops::RangeInclusive<u32> = 1..=3;
const SEARCH_TERMS: [&str; 5] = ["laptop", "mouse", "keyboard", "monitor", "headphones"];

const BUILTIN: [Scenario; 4] = [
    Scenario {
        name: "Browse Products",
        weight: 0.4,
        kind: ScenarioKind::BrowseProducts,
    },
    Scenario {
        name: "View Product Details",
        weight: 0.3,
        kind: ScenarioKind::ViewProduct,
    },
    Scenario {
        name: "Search Products",
        weight: 0.2,
        kind: ScenarioKind::SearchProducts,
    },
    Scenario {
        name: "Make Purchase",
        weight: 0.1,
        kind: ScenarioKind::MakePurchase,
    },
];

pub fn builtin_scenarios() -> &'static [Scenario] {
    &BUILTIN
}

/// Pick a scenario for a uniform `draw` in `[0, 1)` by scanning cumulative
/// weights in table order.
///
/// Weights do not have to sum to exactly 1: if rounding (or an undershooting
/// table) leaves the draw past the last cumulative bound, the first scenario
/// wins. Returns `None` only for an empty table.
pub fn pick(scenarios: &[Scenario], draw: f64) -> Option<&Scenario> {
    let mut cumulative = 0.0;
    for scenario in scenarios {
        cumulative += scenario.weight;
        if draw <= cumulative {
            return Some(scenario);
        }
    }

    scenarios.first()
}

/// Pick a scenario with a fresh random draw.
pub fn select(scenarios: &[Scenario]) -> Option<&Scenario> {
    pick(scenarios, fastrand::f64())
}

impl ScenarioKind {
    /// Build a concrete request against `base_url`, randomizing product ids,
    /// search filters, and quantities per call.
    pub fn build_request(self, base_url: &str) -> HttpRequest {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::BrowseProducts => HttpRequest::get_owned(format!("{base}/api/products")),
            Self::ViewProduct => {
                let id = fastrand::u32(PRODUCT_IDS);
                HttpRequest::get_owned(format!("{base}/api/products/{id}"))
            }
            Self::SearchProducts => {
                let term = SEARCH_TERMS[fastrand::usize(..SEARCH_TERMS.len())];
                let category = if fastrand::bool() {
                    "electronics"
                } else {
                    "accessories"
                };

                let mut url = format!("{base}/api/search?q={term}&category={category}");
                if fastrand::bool() {
                    url.push_str("&minPrice=50");
                }
                if fastrand::bool() {
                    url.push_str("&maxPrice=500");
                }

                HttpRequest::get_owned(url)
            }
            Self::MakePurchase => {
                let body = json!({
                    "productId": fastrand::u32(PRODUCT_IDS),
                    "quantity": fastrand::u32(QUANTITIES),
                    "customerId": format!("customer_{}", fastrand::u32(0..1000)),
                });

                let mut req = HttpRequest::post_owned(
                    format!("{base}/api/purchase"),
                    Bytes::from(body.to_string()),
                );
                req.headers
                    .push(("content-type".to_string(), "application/json".to_string()));
                req
            }
        }
    }
}
