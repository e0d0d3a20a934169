//! Choosing which offered payment requirement to pay

use crate::error::{Error, Result};
use crate::x402::types::{normalize_network, PaymentRequirements};

/// Scheme this client knows how to pay
pub const EXACT_SCHEME: &str = "exact";

/// Filters applied to the `accepts` list of a 402 response
#[derive(Debug, Clone, Default)]
pub struct RequirementSelector {
    pub network: Option<String>,
    pub scheme: Option<String>,
    pub max_value: Option<u128>,
}

impl RequirementSelector {
    pub fn new(network: Option<String>, scheme: Option<String>, max_value: Option<u128>) -> Self {
        Self {
            network: network.map(|n| normalize_network(&n)),
            scheme,
            max_value,
        }
    }

    /// Replace the network filter, keeping the other filters
    pub fn with_network(mut self, network: Option<String>) -> Self {
        if let Some(n) = network {
            self.network = Some(normalize_network(&n));
        }
        self
    }

    /// Pick the first `exact` requirement that passes every filter.
    ///
    /// When requirements match but all cost more than `max_value`, the error
    /// reports the cheapest one.
    pub fn select<'a>(
        &self,
        accepts: &'a [PaymentRequirements],
    ) -> Result<&'a PaymentRequirements> {
        let mut cheapest_over_limit: Option<u128> = None;

        for req in accepts {
            let scheme_matches = self.scheme.as_deref().map_or(true, |s| req.scheme == s);
            let network_matches = self.network.as_deref().map_or(true, |n| req.network == n);
            if !(scheme_matches && network_matches && req.scheme == EXACT_SCHEME) {
                continue;
            }

            if let Some(max_value) = self.max_value {
                let amount = req.amount()?;
                if amount > max_value {
                    cheapest_over_limit =
                        Some(cheapest_over_limit.map_or(amount, |c| c.min(amount)));
                    continue;
                }
            }

            return Ok(req);
        }

        match (cheapest_over_limit, self.max_value) {
            (Some(amount), Some(max_value)) => {
                Err(Error::PaymentAmountExceeded { amount, max_value })
            }
            _ => Err(Error::UnsupportedPayment {
                reason: format!(
                    "none of {} offered requirements match scheme={} network={}",
                    accepts.len(),
                    self.scheme.as_deref().unwrap_or(EXACT_SCHEME),
                    self.network.as_deref().unwrap_or("any"),
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn req(scheme: &str, network: &str, amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: scheme.to_string(),
            network: network.to_string(),
            max_amount_required: amount.to_string(),
            resource: "https://example.com/parse".to_string(),
            description: String::new(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: "0x209693Bc6afc0C5328bA36FaF03C514EF312287C".to_string(),
            max_timeout_seconds: 60,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
            extra: None,
        }
    }

    fn offers() -> Vec<PaymentRequirements> {
        vec![
            req("upto", "base", "1"),
            req("exact", "base-sepolia", "500"),
            req("exact", "base", "10000"),
        ]
    }

    #[rstest]
    #[case(None, None, "base-sepolia")]
    #[case(Some("base"), None, "base")]
    #[case(Some("eip155:8453"), None, "base")]
    #[case(None, Some(1000), "base-sepolia")]
    fn test_select(
        #[case] network: Option<&str>,
        #[case] max_value: Option<u128>,
        #[case] expected_network: &str,
    ) {
        let offers = offers();
        let selector = RequirementSelector::new(network.map(str::to_string), None, max_value);
        let chosen = selector.select(&offers).unwrap();
        assert_eq!(chosen.network, expected_network);
        assert_eq!(chosen.scheme, "exact");
    }

    #[test]
    fn test_no_matching_network() {
        let offers = offers();
        let selector = RequirementSelector::new(Some("polygon".to_string()), None, None);
        assert!(matches!(
            selector.select(&offers),
            Err(Error::UnsupportedPayment { .. })
        ));
    }

    #[test]
    fn test_only_unsupported_scheme() {
        let offers = vec![req("upto", "base", "1")];
        let selector = RequirementSelector::default();
        assert!(matches!(
            selector.select(&offers),
            Err(Error::UnsupportedPayment { .. })
        ));
    }

    #[test]
    fn test_amount_exceeded_reports_cheapest() {
        let offers = offers();
        let selector = RequirementSelector::new(None, None, Some(100));
        match selector.select(&offers) {
            Err(Error::PaymentAmountExceeded { amount, max_value }) => {
                assert_eq!(amount, 500);
                assert_eq!(max_value, 100);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_with_network_override() {
        let offers = offers();
        let selector = RequirementSelector::new(Some("base-sepolia".to_string()), None, None)
            .with_network(Some("base".to_string()));
        assert_eq!(selector.select(&offers).unwrap().network, "base");

        let unchanged = RequirementSelector::new(Some("base".to_string()), None, None)
            .with_network(None);
        assert_eq!(unchanged.network.as_deref(), Some("base"));
    }
}
