//! Recipient resolver: ordered, de-duplicated next-recipient lookup.
//!
//! Reclaimed `queued` attempts are retried first so a paused or recovered
//! campaign resumes where it stopped. Fresh recipients come from the
//! campaign's contact source in creation order, skipping rows that already
//! have an attempt and rows whose normalized address duplicates an earlier
//! one (one attempt per address per run, on every channel).

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::engine::types::{Recipient, RecipientSource};
use crate::error::{AppError, AppResult};
use crate::models::{Campaign, CampaignChannel, ContactSource};
use crate::repositories::{AttemptRepository, ContactRepository};

static NON_PHONE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d+]").unwrap());

const BATCH_SIZE: i64 = 50;

/// Strips formatting from a phone number, keeping digits and a leading `+`.
/// Returns `None` for numbers too short to dial.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let stripped = NON_PHONE_CHARS.replace_all(raw.trim(), "");
    let normalized = if let Some(rest) = stripped.strip_prefix('+') {
        format!("+{}", rest.replace('+', ""))
    } else {
        stripped.replace('+', "")
    };

    let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 6 {
        return None;
    }
    Some(normalized)
}

/// Lowercases and trims an email address. Returns `None` unless it has a
/// plausible local@domain shape.
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return None;
    }
    Some(normalized)
}

/// Builds a claimable recipient from raw contact fields, or `None` when the
/// channel's address is missing or unusable.
pub fn build_recipient(
    channel: CampaignChannel,
    contact_id: Option<i32>,
    name: String,
    phone: &str,
    email: &str,
) -> Option<Recipient> {
    match channel {
        CampaignChannel::Voice | CampaignChannel::Sms => {
            let normalized = normalize_phone(phone)?;
            Some(Recipient {
                contact_id,
                key: normalized.clone(),
                name,
                phone: Some(normalized),
                email: normalize_email(email),
            })
        }
        CampaignChannel::Email => {
            let normalized = normalize_email(email)?;
            Some(Recipient {
                contact_id,
                key: normalized.clone(),
                name,
                phone: normalize_phone(phone),
                email: Some(normalized),
            })
        }
    }
}

/// Postgres-backed resolver over contact lists and imported CSV rows.
#[derive(Clone)]
pub struct PgRecipientResolver {
    contacts: ContactRepository,
    attempts: AttemptRepository,
}

impl PgRecipientResolver {
    pub fn new(contacts: ContactRepository, attempts: AttemptRepository) -> Self {
        Self { contacts, attempts }
    }

    fn source_id(campaign: &Campaign) -> AppResult<i32> {
        campaign.source_id().ok_or_else(|| AppError::Configuration {
            key: "campaign.contact_source".to_string(),
            source: anyhow::anyhow!(
                "Campaign {} has no contact source configured",
                campaign.id
            ),
        })
    }

    async fn candidate_batch(
        &self,
        campaign: &Campaign,
        source_id: i32,
        after_id: i32,
    ) -> AppResult<Vec<(i32, Option<Recipient>)>> {
        match campaign.contact_source {
            ContactSource::ContactList => {
                let batch = self
                    .contacts
                    .eligible_list_batch(source_id, after_id, BATCH_SIZE)
                    .await?;
                Ok(batch
                    .into_iter()
                    .map(|c| {
                        let recipient = build_recipient(
                            campaign.channel,
                            Some(c.id),
                            c.display_name(),
                            &c.phone,
                            &c.email,
                        );
                        (c.id, recipient)
                    })
                    .collect())
            }
            ContactSource::CsvFile => {
                let batch = self
                    .contacts
                    .csv_batch(source_id, after_id, BATCH_SIZE)
                    .await?;
                Ok(batch
                    .into_iter()
                    .map(|row| {
                        let recipient = build_recipient(
                            campaign.channel,
                            None,
                            row.name.clone(),
                            &row.phone,
                            &row.email,
                        );
                        (row.id, recipient)
                    })
                    .collect())
            }
        }
    }
}

#[async_trait]
impl RecipientSource for PgRecipientResolver {
    async fn next_recipient(&self, campaign: &Campaign) -> AppResult<Option<Recipient>> {
        // Reclaimed attempts take priority over fresh recipients.
        if let Some(attempt) = self.attempts.next_queued(campaign.id).await? {
            return Ok(Some(Recipient {
                contact_id: attempt.contact_id,
                key: attempt.recipient_key,
                name: attempt.recipient_name,
                phone: attempt.recipient_phone,
                email: attempt.recipient_email,
            }));
        }

        let source_id = Self::source_id(campaign)?;
        let mut seen: HashSet<String> = self
            .attempts
            .attempted_keys(campaign.id)
            .await?
            .into_iter()
            .collect();

        let mut after_id = 0;
        loop {
            let batch = self.candidate_batch(campaign, source_id, after_id).await?;
            let Some(&(last_id, _)) = batch.last() else {
                return Ok(None);
            };

            for (_, candidate) in batch {
                let Some(recipient) = candidate else { continue };
                if seen.insert(recipient.key.clone()) {
                    return Ok(Some(recipient));
                }
            }
            after_id = last_id;
        }
    }

    async fn count_eligible(&self, campaign: &Campaign) -> AppResult<i64> {
        let source_id = Self::source_id(campaign)?;
        match (campaign.contact_source, campaign.channel) {
            (ContactSource::ContactList, CampaignChannel::Voice | CampaignChannel::Sms) => {
                self.contacts.count_eligible_list_phone(source_id).await
            }
            (ContactSource::ContactList, CampaignChannel::Email) => {
                self.contacts.count_eligible_list_email(source_id).await
            }
            (ContactSource::CsvFile, CampaignChannel::Voice | CampaignChannel::Sms) => {
                self.contacts.count_csv_phone(source_id).await
            }
            (ContactSource::CsvFile, CampaignChannel::Email) => {
                self.contacts.count_csv_email(source_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_normalization_strips_formatting() {
        assert_eq!(
            normalize_phone("+1 (555) 000-1111"),
            Some("+15550001111".to_string())
        );
        assert_eq!(normalize_phone("555.000.1111"), Some("5550001111".to_string()));
        assert_eq!(normalize_phone("  +44 20 7946 0958 "), Some("+442079460958".to_string()));
    }

    #[test]
    fn short_phone_numbers_are_rejected() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("ext. 12"), None);
    }

    #[test]
    fn email_normalization_lowercases() {
        assert_eq!(
            normalize_email("  Ada@Example.COM "),
            Some("ada@example.com".to_string())
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        assert_eq!(normalize_email("not-an-email"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("ada@"), None);
        assert_eq!(normalize_email("ada@nodot"), None);
    }

    #[test]
    fn voice_recipient_requires_a_phone() {
        let recipient = build_recipient(
            CampaignChannel::Voice,
            Some(1),
            "Ada".to_string(),
            "+1 555 000 1111",
            "ada@example.com",
        )
        .unwrap();
        assert_eq!(recipient.key, "+15550001111");
        assert_eq!(recipient.phone.as_deref(), Some("+15550001111"));

        assert!(build_recipient(CampaignChannel::Voice, Some(1), "Ada".into(), "", "a@b.co").is_none());
    }

    #[test]
    fn email_recipient_keys_on_the_address() {
        let recipient = build_recipient(
            CampaignChannel::Email,
            None,
            "Ada".to_string(),
            "",
            "Ada@Example.com",
        )
        .unwrap();
        assert_eq!(recipient.key, "ada@example.com");
        assert_eq!(recipient.phone, None);

        assert!(build_recipient(CampaignChannel::Email, None, "Ada".into(), "+15550001111", "").is_none());
    }

    #[test]
    fn duplicate_addresses_share_one_key() {
        let a = build_recipient(CampaignChannel::Sms, Some(1), "A".into(), "+1 (555) 000-1111", "");
        let b = build_recipient(CampaignChannel::Sms, Some(2), "B".into(), "15550001111", "");
        // Same digits, differing only in the leading +; keys collide only
        // when truly identical after normalization.
        assert_eq!(a.unwrap().key, "+15550001111");
        assert_eq!(b.unwrap().key, "15550001111");

        let c = build_recipient(CampaignChannel::Email, None, "C".into(), "", "x@y.io ");
        let d = build_recipient(CampaignChannel::Email, None, "D".into(), "", "X@Y.IO");
        assert_eq!(c.unwrap().key, d.unwrap().key);
    }
}
