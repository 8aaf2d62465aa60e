//! Merge candidates into the persisted company collection.
//!
//! Reconciliation is additive: profiles and POCs are unioned into the existing
//! record and only the owner is overwritten. Each candidate runs in its own
//! `BEGIN IMMEDIATE` transaction so the lookup and the write happen under the
//! SQLite write lock, and candidates of one request run strictly in order.

use std::collections::HashSet;

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::Db;
use crate::error::Result;
use crate::model::{name_key, CandidatePoc, CandidateRecord, Company, Poc};
use crate::store;

/// What happened to one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Inserted,
    Merged,
    Failed,
}

/// Result of reconciling one candidate
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub action: Action,
    pub company: Company,
}

/// `existing` in order, then incoming values not already present
pub fn merge_profiles(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    for profile in existing.iter().chain(incoming.iter()) {
        let trimmed = profile.trim();
        if !trimmed.is_empty() && seen.insert(trimmed) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Incoming POCs whose email is not already taken. POCs without an email
/// always pass.
pub fn new_pocs(existing: &[Poc], incoming: &[CandidatePoc]) -> Vec<CandidatePoc> {
    let mut taken: HashSet<&str> = existing
        .iter()
        .filter_map(|p| p.email.as_deref())
        .filter(|e| !e.is_empty())
        .collect();

    incoming
        .iter()
        .filter(|poc| match poc.email_key() {
            Some(email) => taken.insert(email),
            None => true,
        })
        .cloned()
        .collect()
}

/// Insert or merge one candidate, returning the persisted company.
pub fn reconcile_candidate(
    conn: &mut Connection,
    candidate: &CandidateRecord,
    owner_email: &str,
) -> Result<Reconciled> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let reconciled = match store::find_by_name_key(&tx, &name_key(&candidate.name))? {
        None => {
            let pocs = new_pocs(&[], &candidate.pocs);
            let profiles = merge_profiles(&[], &candidate.profiles);
            let company = store::insert_company(&tx, &candidate.name, owner_email, &profiles, &pocs)?;
            log::debug!("Inserted company {} ({} POCs)", company.name, company.pocs.len());
            Reconciled {
                action: Action::Inserted,
                company,
            }
        }
        Some(existing) => {
            let profiles = merge_profiles(&existing.profiles, &candidate.profiles);
            let additions = new_pocs(&existing.pocs, &candidate.pocs);
            if existing.owner_email != owner_email {
                log::info!(
                    "Company {} reassigned from {} to {}",
                    existing.name,
                    existing.owner_email,
                    owner_email
                );
            }
            let company = store::update_company(&tx, &existing.id, owner_email, &profiles, &additions)?;
            log::debug!("Merged company {} (+{} POCs)", company.name, additions.len());
            Reconciled {
                action: Action::Merged,
                company,
            }
        }
    };

    tx.commit()?;
    Ok(reconciled)
}

/// Per-candidate line of an ingestion response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutcome {
    pub name: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of reconciling a batch. Failures do not roll back earlier candidates.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub companies: Vec<Company>,
    pub outcomes: Vec<CandidateOutcome>,
}

impl IngestReport {
    pub fn candidate_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn affected_count(&self) -> usize {
        self.companies.len()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.action == Action::Failed).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    /// Every candidate failed (and there was at least one)
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.companies.is_empty()
    }
}

/// Reconcile candidates one after another, one store round trip each.
pub async fn reconcile_all(db: &Db, candidates: Vec<CandidateRecord>, owner_email: &str) -> IngestReport {
    let mut report = IngestReport::default();

    for candidate in candidates {
        let name = candidate.name.clone();
        let owner = owner_email.to_string();
        let result = db
            .with_connection(move |conn| reconcile_candidate(conn, &candidate, &owner))
            .await;

        match result {
            Ok(reconciled) => {
                report.outcomes.push(CandidateOutcome {
                    name,
                    action: reconciled.action,
                    company_id: Some(reconciled.company.id.clone()),
                    error: None,
                });
                report.companies.push(reconciled.company);
            }
            Err(e) => {
                log::error!("Failed to reconcile company {}: {}", name, e);
                report.outcomes.push(CandidateOutcome {
                    name,
                    action: Action::Failed,
                    company_id: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    report
}
