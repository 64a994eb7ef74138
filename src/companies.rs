//! Carrier companies shown by the contact and pipeline views.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub carrier_id: Value,
    /// Remaining columns, kept as delivered.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Default)]
pub struct CompanyStore {
    companies: Arc<RwLock<Vec<Company>>>,
}

impl CompanyStore {
    pub fn new() -> Self { Self::default() }

    pub fn companies(&self) -> Vec<Company> { self.companies.read().clone() }

    pub fn len(&self) -> usize { self.companies.read().len() }

    pub fn is_empty(&self) -> bool { self.companies.read().is_empty() }

    pub fn set_companies(&self, data: Vec<Company>) { *self.companies.write() = data; }

    pub fn add_company(&self, company: Company) { self.companies.write().push(company); }

    /// Replace the first company with the same `carrier_id`. Returns false when none matched.
    pub fn update_company(&self, updated: Company) -> bool {
        let mut list = self.companies.write();
        match list.iter_mut().find(|c| c.carrier_id == updated.carrier_id) {
            Some(slot) => { *slot = updated; true }
            None => false,
        }
    }
}
