//! JSON request bodies. Every request names its submitter in `email`.

use serde::Deserialize;

use crate::model::CandidateRecord;

/// Body carrying only the caller identity
#[derive(Debug, Deserialize)]
pub struct IdentityRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /api/add-companies`
#[derive(Debug, Deserialize)]
pub struct AddCompaniesRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub companies: Vec<CandidateRecord>,
}

/// `POST /api/update-poc-status`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PocStatusRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub poc_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `POST /api/update-poc-remarks`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PocRemarksRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub poc_id: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}
