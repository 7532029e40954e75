//! Onboarding frontend routes the return page and emails point at.

use url::Url;

pub const DEFAULT_SUCCESS_PATH: &str = "/onboarding/payment/success";
pub const DEFAULT_FAILURE_PATH: &str = "/onboarding/payment/failed";
pub const DEFAULT_PENDING_PATH: &str = "/onboarding/payment/pending";
pub const DEFAULT_ONBOARDING_PATH: &str = "/onboarding/start";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
    pub base_url: Url,
    pub success_path: String,
    pub failure_path: String,
    pub pending_path: String,
    pub onboarding_path: String,
}

impl FrontendConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            success_path: DEFAULT_SUCCESS_PATH.to_string(),
            failure_path: DEFAULT_FAILURE_PATH.to_string(),
            pending_path: DEFAULT_PENDING_PATH.to_string(),
            onboarding_path: DEFAULT_ONBOARDING_PATH.to_string(),
        }
    }

    fn route(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    pub fn success_url(&self, order_reference: &str, reservation_token: Option<&str>) -> Url {
        let mut query = vec![("orderReference", order_reference)];
        if let Some(token) = reservation_token {
            query.push(("token", token));
        }
        self.route(&self.success_path, &query)
    }

    pub fn failure_url(&self, message: &str, order_reference: Option<&str>) -> Url {
        let mut query = vec![("error", message)];
        if let Some(order_reference) = order_reference {
            query.push(("orderReference", order_reference));
        }
        self.route(&self.failure_path, &query)
    }

    pub fn pending_url(&self, order_reference: &str) -> Url {
        self.route(&self.pending_path, &[("orderReference", order_reference)])
    }

    /// Link mailed to the applicant to continue onboarding.
    pub fn onboarding_url(&self, reservation_token: &str) -> Url {
        self.route(&self.onboarding_path, &[("token", reservation_token)])
    }

    /// Origin used as the `postMessage` target.
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}
