//! Prescription operations.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::client::{QueryClient, QueryResult};
use crate::error::ApiError;
use crate::filter::{FilterPairs, PrescriptionFilter};
use crate::http::Http;
use crate::invalidation::{self, Resource};
use crate::keys;
use crate::model::{Prescription, PrescriptionStatus};
use crate::mutation::{Mutation, temp_id};

/// Payload for submitting a prescription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrescription {
    pub customer: i64,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPrescription {
    /// The provisional entity spliced into cached lists while the create is
    /// in flight.
    #[must_use]
    pub fn placeholder(&self, id: i64) -> Prescription {
        Prescription {
            id,
            customer: self.customer,
            status: PrescriptionStatus::Pending,
            doctor_name: self.doctor_name.clone(),
            notes: self.notes.clone(),
            submitted_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: PrescriptionStatus,
}

/// Lists prescriptions matching `filter`.
pub async fn list_prescriptions(
    http: &Http,
    filter: &PrescriptionFilter,
) -> Result<Vec<Prescription>, ApiError> {
    http.get_list("/prescriptions/", &filter.pairs()).await
}

/// Fetches one prescription.
pub async fn get_prescription(http: &Http, id: i64) -> Result<Prescription, ApiError> {
    http.get_json(&format!("/prescriptions/{id}/")).await
}

/// Submits a prescription for review.
pub async fn create_prescription(
    http: &Http,
    payload: &NewPrescription,
) -> Result<Prescription, ApiError> {
    http.post_json("/prescriptions/", payload).await
}

/// Moves a prescription to a new review status.
pub async fn update_status(
    http: &Http,
    id: i64,
    status: PrescriptionStatus,
) -> Result<Prescription, ApiError> {
    http.patch_json(&format!("/prescriptions/{id}/"), &StatusUpdate { status })
        .await
}

/// Watches the filtered prescription list.
pub fn watch_prescriptions(
    client: &Arc<QueryClient>,
    http: &Http,
    filter: PrescriptionFilter,
) -> BoxStream<'static, QueryResult<Vec<Prescription>>> {
    let key = keys::prescriptions::list(&filter);
    let http = http.clone();
    client.watch(key, client.default_options(), move || {
        let http = http.clone();
        let filter = filter.clone();
        async move { list_prescriptions(&http, &filter).await }
    })
}

/// Submit-prescription mutation: splices a pending placeholder into cached
/// lists and invalidates prescriptions (and orders, which may gate on them).
pub fn create_prescription_mutation(
    client: &Arc<QueryClient>,
    http: &Http,
) -> Mutation<NewPrescription, Prescription> {
    let http = http.clone();
    Mutation::new(Arc::clone(client), move |payload: NewPrescription| {
        let http = http.clone();
        async move { create_prescription(&http, &payload).await }
    })
    .validate(|payload| {
        if payload.customer <= 0 {
            Err(ApiError::Validation("customer id is required".to_string()))
        } else {
            Ok(())
        }
    })
    .optimistic(|guard, payload| {
        let placeholder = payload.placeholder(temp_id());
        guard.edit_list(
            &keys::prescriptions::lists(),
            |prescriptions: &mut Vec<Prescription>| {
                prescriptions.push(placeholder);
            },
        );
    })
    .invalidates(invalidation::for_resource(Resource::Prescriptions))
}
