//! Provider filtering for the listing screen.

use std::cmp::Ordering;

use crate::models::{Review, Service, ServiceProvider};
use crate::utils::format::{contains_ignore_case, normalize_for_search};

/// Search bar plus the location and specialization pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFilter {
    pub query: String,
    pub location: String,
    pub specialization: String,
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    normalize_for_search(a).cmp(&normalize_for_search(b))
}

fn same_ignore_case(a: &str, b: &str) -> bool {
    normalize_for_search(a.trim()) == normalize_for_search(b.trim())
}

impl ProviderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_active_filters(&self) -> bool {
        !self.query.trim().is_empty()
            || !self.location.trim().is_empty()
            || !self.specialization.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.location.clear();
        self.specialization.clear();
    }

    pub fn matches(&self, provider: &ServiceProvider) -> bool {
        let query = self.query.trim();
        let query_ok = query.is_empty()
            || contains_ignore_case(&provider.name, query)
            || contains_ignore_case(&provider.specialization, query)
            || contains_ignore_case(&provider.description, query);

        let location_ok = self.location.trim().is_empty()
            || same_ignore_case(&provider.location, &self.location);
        let specialization_ok = self.specialization.trim().is_empty()
            || same_ignore_case(&provider.specialization, &self.specialization);

        query_ok && location_ok && specialization_ok
    }

    /// Matching providers, best rated first, then by name.
    pub fn apply(&self, providers: &[ServiceProvider]) -> Vec<ServiceProvider> {
        let mut result: Vec<ServiceProvider> = providers.to_vec();
        result.retain(|p| self.matches(p));

        result.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| cmp_ignore_case(&a.name, &b.name))
        });

        result
    }
}

/// Distinct locations, sorted, for the location picker
pub fn locations(providers: &[ServiceProvider]) -> Vec<String> {
    let mut result: Vec<String> = providers.iter().map(|p| p.location.clone()).collect();
    result.sort_by(|a, b| cmp_ignore_case(a, b));
    result.dedup_by(|a, b| same_ignore_case(a, b));
    result
}

/// Distinct specializations, sorted, for the specialization picker
pub fn specializations(providers: &[ServiceProvider]) -> Vec<String> {
    let mut result: Vec<String> = providers.iter().map(|p| p.specialization.clone()).collect();
    result.sort_by(|a, b| cmp_ignore_case(a, b));
    result.dedup_by(|a, b| same_ignore_case(a, b));
    result
}

pub fn services_for<'a>(provider_id: &str, services: &'a [Service]) -> Vec<&'a Service> {
    services
        .iter()
        .filter(|s| s.provider_id == provider_id)
        .collect()
}

pub fn reviews_for<'a>(provider_id: &str, reviews: &'a [Review]) -> Vec<&'a Review> {
    reviews
        .iter()
        .filter(|r| r.provider_id == provider_id)
        .collect()
}
