//! Nourish - Session state
//!
//! One user's working state: a shared read-only catalog, the plan selection
//! and the last narration. Queries and aggregates are recomputed from scratch
//! on each call; the only mutation is [`Session::dispatch`].

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::aggregate::{PlanAggregates, PlanAggregator};
use crate::data::Catalog;
use crate::filter::{query, FilterCriteria};
use crate::model::FoodItem;
use crate::narrator::NarrationRequest;
use crate::plan::{PlanAction, PlanNotice, PlanSelection};

/// Plan aggregates plus the narration, when one was generated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    #[serde(flatten)]
    pub aggregates: PlanAggregates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    catalog: Arc<Catalog>,
    plan: PlanSelection,
    narration: Option<String>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            plan: PlanSelection::new(),
            narration: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn plan(&self) -> &PlanSelection {
        &self.plan
    }

    /// Filtered and sorted items for `criteria`
    pub fn query(&self, criteria: &FilterCriteria) -> Vec<&FoodItem> {
        let unknown = criteria.unknown_values(self.catalog.vocabulary());
        for value in &unknown {
            debug!("Filter {} does not occur in the catalog", value);
        }
        query(self.catalog.items(), criteria)
    }

    /// Apply a plan action. Adding an identifier not in the catalog is refused.
    pub fn dispatch(&mut self, action: PlanAction) -> PlanNotice {
        if let PlanAction::Add(name) = &action {
            if !self.catalog.contains(name) {
                return PlanNotice::UnknownItem(name.clone());
            }
        }

        let notice = self.plan.apply(action);
        if notice.is_change() && self.narration.take().is_some() {
            debug!("Plan changed; discarding narration");
        }
        notice
    }

    pub fn aggregates(&self, aggregator: &PlanAggregator) -> PlanAggregates {
        aggregator.compute(&self.catalog, &self.plan)
    }

    /// One item for a detail view
    pub fn detail(&self, name: &str) -> Option<&FoodItem> {
        self.catalog.get(name)
    }

    pub fn narration_request(&self, aggregator: &PlanAggregator) -> NarrationRequest {
        NarrationRequest::with_aggregator(&self.catalog, &self.plan, aggregator)
    }

    pub fn report(&self, aggregator: &PlanAggregator) -> PlanReport {
        PlanReport {
            aggregates: self.aggregates(aggregator),
            narration: self.narration.clone(),
        }
    }

    pub fn record_narration(&mut self, text: impl Into<String>) {
        self.narration = Some(text.into());
    }

    pub fn narration(&self) -> Option<&str> {
        self.narration.as_deref()
    }
}
