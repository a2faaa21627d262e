//! Reconciliation of the legacy roster with the credentialed account store.
//!
//! Both sources describe the same residents. Accounts are matched by `id`;
//! when an id appears in both, the credentialed store wins. An account that
//! only exists in the roster is adopted into the credentialed store the first
//! time a ledger operation mutates it.

use std::collections::HashSet;

use crate::domain::models::MemberAccount;

/// Where a merged account was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSource {
    Credentialed,
    /// Only in the legacy roster; not yet adopted
    Roster,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcedAccount {
    pub account: MemberAccount,
    pub source: AccountSource,
}

impl SourcedAccount {
    pub fn is_adopted(&self) -> bool {
        self.source == AccountSource::Credentialed
    }
}

/// Union the two sources by id. Credentialed accounts come first in their
/// stored order, followed by roster-only accounts in roster order.
pub fn merge_account_sources(
    credentialed: Vec<MemberAccount>,
    roster: Vec<MemberAccount>,
) -> Vec<SourcedAccount> {
    let mut seen: HashSet<String> = HashSet::with_capacity(credentialed.len());
    let mut merged = Vec::with_capacity(credentialed.len() + roster.len());

    for account in credentialed {
        if !seen.insert(account.id.clone()) {
            continue;
        }
        merged.push(SourcedAccount {
            account,
            source: AccountSource::Credentialed,
        });
    }

    for mut account in roster {
        if !seen.insert(account.id.clone()) {
            continue;
        }
        // Roster rows are unversioned. Version 0 means "not in the account store".
        account.version = 0;
        merged.push(SourcedAccount {
            account,
            source: AccountSource::Roster,
        });
    }

    merged
}

/// Resolve one id against both sources, credentialed first.
pub fn resolve_account(
    credentialed: Option<MemberAccount>,
    roster: Option<MemberAccount>,
) -> Option<SourcedAccount> {
    match (credentialed, roster) {
        (Some(account), _) => Some(SourcedAccount {
            account,
            source: AccountSource::Credentialed,
        }),
        (None, Some(mut account)) => {
            account.version = 0;
            Some(SourcedAccount {
                account,
                source: AccountSource::Roster,
            })
        }
        (None, None) => None,
    }
}
