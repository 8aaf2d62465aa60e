//! Fold candidate rows of one upload into one candidate per company.
//!
//! Applied after every parser, whatever the source format. Rows are grouped
//! by `name_key`; the first spelling of the name wins. Profiles are unioned
//! (empty and duplicate tokens dropped) and POCs are unioned by email, both in
//! order of first appearance. POCs without an email are never duplicates.

use std::collections::{HashMap, HashSet};

use crate::model::{name_key, non_empty, CandidatePoc, CandidateRecord};

/// Accumulates one company while rows are folded in
struct Folded {
    record: CandidateRecord,
    seen_profiles: HashSet<String>,
    seen_emails: HashSet<String>,
}

impl Folded {
    fn new(name: &str) -> Self {
        Self {
            record: CandidateRecord::new(name.trim()),
            seen_profiles: HashSet::new(),
            seen_emails: HashSet::new(),
        }
    }

    fn absorb(&mut self, candidate: CandidateRecord) {
        for profile in candidate.profiles {
            let profile = profile.trim();
            if !profile.is_empty() && self.seen_profiles.insert(profile.to_string()) {
                self.record.profiles.push(profile.to_string());
            }
        }

        for poc in candidate.pocs {
            let Some(poc) = clean_poc(poc) else {
                continue;
            };
            if let Some(email) = poc.email.as_deref() {
                if !self.seen_emails.insert(email.to_string()) {
                    log::debug!("Duplicate POC {} for {} dropped", email, self.record.name);
                    continue;
                }
            }
            self.record.pocs.push(poc);
        }
    }
}

/// Trim every field; a POC without a name cannot be stored and is dropped.
fn clean_poc(poc: CandidatePoc) -> Option<CandidatePoc> {
    let Some(name) = non_empty(Some(&poc.name)) else {
        log::warn!("POC without a name dropped ({:?})", poc.email);
        return None;
    };
    Some(CandidatePoc {
        name,
        email: non_empty(poc.email.as_deref()),
        phone: non_empty(poc.phone.as_deref()),
        status: poc.status,
        remarks: non_empty(poc.remarks.as_deref()),
    })
}

/// Collapse same-named candidates, preserving order of first appearance.
/// Candidates with a blank name are dropped.
pub fn normalize_candidates(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut order: Vec<Folded> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let key = name_key(&candidate.name);
        if key.is_empty() {
            continue;
        }
        let slot = *index.entry(key).or_insert_with(|| {
            order.push(Folded::new(&candidate.name));
            order.len() - 1
        });
        order[slot].absorb(candidate);
    }

    order.into_iter().map(|f| f.record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, profiles: &[&str], emails: &[&str]) -> CandidateRecord {
        CandidateRecord {
            name: name.to_string(),
            profiles: profiles.iter().map(|p| p.to_string()).collect(),
            pocs: emails
                .iter()
                .map(|e| CandidatePoc {
                    name: format!("poc-{}", e),
                    email: Some(e.to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_same_company_rows_fold() {
        let out = normalize_candidates(vec![
            row("Acme", &["SDE"], &["a@x.com"]),
            row("Acme", &["QA"], &["b@x.com"]),
        ]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Acme");
        assert_eq!(out[0].profiles, vec!["SDE", "QA"]);
        let emails: Vec<_> = out[0].pocs.iter().map(|p| p.email.clone().unwrap()).collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_duplicate_profiles_and_emails_dropped() {
        let out = normalize_candidates(vec![
            row("Acme", &["SDE", " ", "SDE"], &["a@x.com"]),
            row("Acme", &["SDE"], &["a@x.com"]),
        ]);
        assert_eq!(out[0].profiles, vec!["SDE"]);
        assert_eq!(out[0].pocs.len(), 1);
    }

    #[test]
    fn test_name_variants_share_a_key_first_spelling_wins() {
        let out = normalize_candidates(vec![
            row(" Acme  Corp", &["SDE"], &[]),
            row("ACME corp", &["QA"], &[]),
            row("Globex", &[], &[]),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Acme  Corp");
        assert_eq!(out[0].profiles, vec!["SDE", "QA"]);
        assert_eq!(out[1].name, "Globex");
    }

    #[test]
    fn test_pocs_without_email_are_never_duplicates() {
        let mut first = row("Acme", &[], &[]);
        first.pocs.push(CandidatePoc { name: "Asha".into(), ..Default::default() });
        let mut second = row("Acme", &[], &[]);
        second.pocs.push(CandidatePoc { name: "Bilal".into(), email: Some("  ".into()), ..Default::default() });

        let out = normalize_candidates(vec![first, second]);
        assert_eq!(out[0].pocs.len(), 2);
        assert!(out[0].pocs.iter().all(|p| p.email.is_none()));
    }

    #[test]
    fn test_nameless_pocs_and_blank_companies_dropped() {
        let mut acme = row("Acme", &[], &["a@x.com"]);
        acme.pocs[0].name = " ".into();

        let out = normalize_candidates(vec![acme, row("   ", &["SDE"], &[])]);
        assert_eq!(out.len(), 1);
        assert!(out[0].pocs.is_empty());
    }
}
