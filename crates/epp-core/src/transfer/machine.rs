use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::wire::TransferData;
use super::{TransferOp, TransferStatus};
use crate::component::require_text;
use crate::config::TransferConfig;
use crate::error::{EppError, Result};
use crate::object::ObjectMapping;

/// One sponsorship transfer of one object.
///
/// Created pending by [`TransferRecord::request`]; mutated only by
/// `cancel`, `reject`, `approve` or the automatic response. While pending,
/// `acted_at` is the deadline for a reply; afterwards it is the time of
/// the action that ended the transfer. A reply at or after the deadline
/// is refused; only the automatic response can settle it then.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    identifier: String,
    operation: TransferOp,
    status: TransferStatus,
    requesting_client: String,
    acting_client: String,
    requested_at: DateTime<Utc>,
    acted_at: DateTime<Utc>,
    auth_token: Option<String>,
}

impl TransferRecord {
    /// Opens a pending transfer of `identifier` from `sponsor` to `requesting_client`.
    pub fn request(
        identifier: impl Into<String>,
        requesting_client: impl Into<String>,
        sponsor: impl Into<String>,
        now: DateTime<Utc>,
        config: &TransferConfig,
        auth_token: Option<String>,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let requesting_client = requesting_client.into();
        let acting_client = sponsor.into();
        require_text(&identifier, "object-identifier")?;
        require_text(&requesting_client, "requesting-client-id")?;
        require_text(&acting_client, "acting-client-id")?;
        if requesting_client == acting_client {
            return Err(EppError::state(
                "requesting-client-id",
                format!("{requesting_client} already sponsors {identifier}"),
            ));
        }

        debug!(
            identifier = %identifier,
            requesting = %requesting_client,
            sponsor = %acting_client,
            "Transfer requested"
        );

        let deadline = now
            .checked_add_signed(config.auto_response_period()?)
            .ok_or_else(|| {
                EppError::state(
                    "auto-response-days",
                    format!("deadline for {identifier} falls outside the calendar"),
                )
            })?;

        Ok(Self {
            identifier,
            operation: TransferOp::Request,
            status: TransferStatus::Pending,
            requesting_client,
            acting_client,
            requested_at: now,
            acted_at: deadline,
            auth_token,
        })
    }

    /// Current status. Never changes the record.
    pub fn query(&self) -> TransferStatus {
        self.status
    }

    /// Withdraws the request. Only the requesting client may cancel.
    pub fn cancel(&mut self, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.ensure_pending(TransferOp::Cancel)?;
        self.ensure_before_deadline(TransferOp::Cancel, now)?;
        if client != self.requesting_client {
            return Err(EppError::state(
                "requesting-client-id",
                format!("{client} did not request this transfer"),
            ));
        }
        self.transition(TransferOp::Cancel, TransferStatus::ServerCancelled, now);
        Ok(self.status)
    }

    /// Refuses the request. Only the acting (losing) sponsor may reject.
    pub fn reject(&mut self, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.ensure_pending(TransferOp::Reject)?;
        self.ensure_before_deadline(TransferOp::Reject, now)?;
        self.ensure_sponsor(client)?;
        self.transition(TransferOp::Reject, TransferStatus::ClientRejected, now);
        Ok(self.status)
    }

    /// Grants the request. Only the acting (losing) sponsor may approve.
    pub fn approve(&mut self, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.ensure_pending(TransferOp::Approve)?;
        self.ensure_before_deadline(TransferOp::Approve, now)?;
        self.ensure_sponsor(client)?;
        self.transition(TransferOp::Approve, TransferStatus::ClientApproved, now);
        Ok(self.status)
    }

    /// Applies the configured automatic response once the deadline has passed.
    ///
    /// Returns the new status, or `None` while the deadline is still ahead.
    pub fn auto_respond(
        &mut self,
        now: DateTime<Utc>,
        config: &TransferConfig,
    ) -> Result<Option<TransferStatus>> {
        if self.status.is_terminal() {
            return Err(self.terminal_error("auto-response"));
        }
        if now < self.acted_at {
            return Ok(None);
        }
        let deadline = self.acted_at;
        let operation = self.operation;
        self.transition(operation, config.auto_response.outcome(), deadline);
        Ok(Some(self.status))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The operation that last acted on the record.
    pub fn operation(&self) -> TransferOp {
        self.operation
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn requesting_client(&self) -> &str {
        &self.requesting_client
    }

    pub fn acting_client(&self) -> &str {
        &self.acting_client
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn acted_at(&self) -> DateTime<Utc> {
        self.acted_at
    }

    /// Reply deadline while the transfer is pending.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        (!self.status.is_terminal()).then_some(self.acted_at)
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The `<trnData>` view of this record in the namespace of mapping `M`.
    pub fn to_data<M: ObjectMapping>(&self) -> TransferData<M> {
        TransferData::new(
            self.identifier.clone(),
            self.status,
            self.requesting_client.clone(),
            self.requested_at,
            self.acting_client.clone(),
            self.acted_at,
        )
    }

    // ── Internal ────────────────────────────────────────────────────────

    fn ensure_pending(&self, op: TransferOp) -> Result<()> {
        if self.status.is_terminal() {
            Err(self.terminal_error(op.as_str()))
        } else {
            Ok(())
        }
    }

    fn ensure_before_deadline(&self, op: TransferOp, now: DateTime<Utc>) -> Result<()> {
        if now < self.acted_at {
            return Ok(());
        }
        Err(EppError::state(
            "deadline",
            format!(
                "{op} of {} arrived after the reply deadline {}",
                self.identifier,
                self.acted_at.to_rfc3339()
            ),
        ))
    }

    fn ensure_sponsor(&self, client: &str) -> Result<()> {
        if client == self.acting_client {
            Ok(())
        } else {
            Err(EppError::state(
                "acting-client-id",
                format!("{client} does not sponsor {}", self.identifier),
            ))
        }
    }

    fn terminal_error(&self, op: &str) -> EppError {
        EppError::state(
            "status",
            format!(
                "{op} not allowed: transfer of {} is already {}",
                self.identifier, self.status
            ),
        )
    }

    fn transition(&mut self, op: TransferOp, to: TransferStatus, at: DateTime<Utc>) {
        debug!(
            identifier = %self.identifier,
            op = %op,
            from = %self.status,
            to = %to,
            "Transfer transition"
        );
        self.operation = op;
        self.status = to;
        self.acted_at = at;
    }
}

/// Transfer records of one object type, keyed by object identifier.
///
/// Only `query` may name an object with no transfer on record (the answer
/// is `None`); every other operation needs a pending record.
#[derive(Clone, Debug, Default)]
pub struct TransferBook {
    config: TransferConfig,
    records: BTreeMap<String, TransferRecord>,
}

impl TransferBook {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            config,
            records: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// The latest record for `identifier`, if any.
    pub fn query(&self, identifier: &str) -> Option<&TransferRecord> {
        self.records.get(identifier)
    }

    pub fn status(&self, identifier: &str) -> Option<TransferStatus> {
        self.query(identifier).map(TransferRecord::query)
    }

    /// Opens a transfer. A terminal record for the same object is replaced.
    pub fn request(
        &mut self,
        identifier: &str,
        requesting_client: &str,
        sponsor: &str,
        now: DateTime<Utc>,
        auth_token: Option<String>,
    ) -> Result<&TransferRecord> {
        if let Some(existing) = self.records.get(identifier) {
            if !existing.status().is_terminal() {
                return Err(EppError::state(
                    "object-identifier",
                    format!("{identifier} already has a pending transfer"),
                ));
            }
        }
        let record = TransferRecord::request(
            identifier,
            requesting_client,
            sponsor,
            now,
            &self.config,
            auth_token,
        )?;
        self.records.insert(identifier.to_string(), record);
        self.query(identifier)
            .ok_or_else(|| EppError::missing_field("object-identifier"))
    }

    /// Cancels on behalf of the requester. A late reply first settles the
    /// record with the automatic response and is then refused.
    pub fn cancel(&mut self, identifier: &str, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.due_record(identifier, now)?.cancel(client, now)
    }

    pub fn reject(&mut self, identifier: &str, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.due_record(identifier, now)?.reject(client, now)
    }

    pub fn approve(&mut self, identifier: &str, client: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        self.due_record(identifier, now)?.approve(client, now)
    }

    /// Applies automatic responses to every pending record whose deadline has passed.
    ///
    /// Returns the identifiers that changed, with their new status.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<(String, TransferStatus)> {
        let config = self.config.clone();
        let mut resolved = Vec::new();
        for (identifier, record) in self.records.iter_mut() {
            if record.status().is_terminal() {
                continue;
            }
            if let Ok(Some(status)) = record.auto_respond(now, &config) {
                resolved.push((identifier.clone(), status));
            }
        }
        resolved
    }

    /// Records still awaiting a reply.
    pub fn pending(&self) -> impl Iterator<Item = &TransferRecord> {
        self.records.values().filter(|r| !r.status().is_terminal())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record for `identifier`, with any overdue automatic response applied.
    fn due_record(&mut self, identifier: &str, now: DateTime<Utc>) -> Result<&mut TransferRecord> {
        let config = self.config.clone();
        let record = self.record_mut(identifier)?;
        if !record.status().is_terminal() {
            record.auto_respond(now, &config)?;
        }
        Ok(record)
    }

    fn record_mut(&mut self, identifier: &str) -> Result<&mut TransferRecord> {
        self.records.get_mut(identifier).ok_or_else(|| {
            EppError::state(
                "object-identifier",
                format!("no transfer in progress for {identifier}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::AutoResponsePolicy;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 6, 6, 22, 0, 0).unwrap()
    }

    fn pending() -> TransferRecord {
        TransferRecord::request(
            "example.com",
            "ClientX",
            "ClientY",
            t0(),
            &TransferConfig::default(),
            Some("2fooBAR".into()),
        )
        .unwrap()
    }

    #[test]
    fn request_creates_pending_record_with_deadline() {
        let record = pending();
        assert_eq!(record.status(), TransferStatus::Pending);
        assert_eq!(record.operation(), TransferOp::Request);
        assert_eq!(record.deadline(), Some(t0() + Duration::days(5)));
        assert_eq!(record.auth_token(), Some("2fooBAR"));
    }

    #[test]
    fn requester_cannot_already_sponsor() {
        let err = TransferRecord::request(
            "example.com",
            "ClientY",
            "ClientY",
            t0(),
            &TransferConfig::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.subject(), "requesting-client-id");
    }

    #[test]
    fn approve_by_sponsor() {
        let mut record = pending();
        assert_eq!(record.query(), TransferStatus::Pending);
        let later = t0() + Duration::days(1);
        assert_eq!(record.approve("ClientY", later).unwrap(), TransferStatus::ClientApproved);
        assert_eq!(record.acted_at(), later);
        assert_eq!(record.operation(), TransferOp::Approve);
        assert!(record.deadline().is_none());
    }

    #[test]
    fn approve_by_requester_is_refused() {
        let mut record = pending();
        let err = record.approve("ClientX", t0()).unwrap_err();
        assert_eq!(err.subject(), "acting-client-id");
        assert_eq!(record.status(), TransferStatus::Pending);
    }

    #[test]
    fn cancel_only_by_requester() {
        let mut record = pending();
        assert_eq!(record.cancel("ClientY", t0()).unwrap_err().subject(), "requesting-client-id");
        assert_eq!(record.cancel("ClientX", t0()).unwrap(), TransferStatus::ServerCancelled);
    }

    #[test]
    fn reject_by_sponsor() {
        let mut record = pending();
        assert_eq!(record.reject("ClientY", t0()).unwrap(), TransferStatus::ClientRejected);
    }

    #[test]
    fn terminal_records_refuse_further_operations() {
        let mut record = pending();
        record.reject("ClientY", t0()).unwrap();
        let snapshot = record.clone();

        assert!(record.approve("ClientY", t0()).unwrap_err().is_state());
        assert!(record.reject("ClientY", t0()).unwrap_err().is_state());
        assert!(record.cancel("ClientX", t0()).unwrap_err().is_state());
        assert!(record
            .auto_respond(t0() + Duration::days(30), &TransferConfig::default())
            .unwrap_err()
            .is_state());
        assert_eq!(record, snapshot);
        assert_eq!(record.query(), TransferStatus::ClientRejected);
    }

    #[test]
    fn auto_response_waits_for_deadline() {
        let config = TransferConfig::default();
        let mut record = pending();
        assert_eq!(record.auto_respond(t0() + Duration::days(4), &config).unwrap(), None);
        assert_eq!(record.status(), TransferStatus::Pending);

        let status = record.auto_respond(t0() + Duration::days(6), &config).unwrap();
        assert_eq!(status, Some(TransferStatus::ServerApproved));
        assert_eq!(record.acted_at(), t0() + Duration::days(5));
    }

    #[test]
    fn auto_response_follows_policy() {
        let config = TransferConfig {
            auto_response: AutoResponsePolicy::Reject,
            auto_response_days: 1,
        };
        let mut record =
            TransferRecord::request("sh8013", "ClientX", "ClientY", t0(), &config, None).unwrap();
        let status = record.auto_respond(t0() + Duration::days(1), &config).unwrap();
        assert_eq!(status, Some(TransferStatus::ServerRejected));
    }

    #[test]
    fn late_replies_are_refused_without_change() {
        let mut record = pending();
        let deadline = t0() + Duration::days(5);
        let snapshot = record.clone();

        let err = record.approve("ClientY", deadline).unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "deadline");
        assert_eq!(record.reject("ClientY", deadline + Duration::days(1)).unwrap_err().subject(), "deadline");
        assert_eq!(record.cancel("ClientX", deadline).unwrap_err().subject(), "deadline");
        assert_eq!(record, snapshot);

        let just_before = deadline - Duration::seconds(1);
        assert_eq!(record.approve("ClientY", just_before).unwrap(), TransferStatus::ClientApproved);
    }

    #[test]
    fn request_refuses_unusable_reply_window() {
        for days in [0, i64::MAX] {
            let config = TransferConfig {
                auto_response: AutoResponsePolicy::Approve,
                auto_response_days: days,
            };
            let err = TransferRecord::request("example.com", "ClientX", "ClientY", t0(), &config, None)
                .unwrap_err();
            assert_eq!(err.subject(), "auto-response-days");
        }

        // Representable as a duration but past the end of the calendar.
        let config = TransferConfig {
            auto_response: AutoResponsePolicy::Approve,
            auto_response_days: 100_000_000,
        };
        let err = TransferRecord::request("example.com", "ClientX", "ClientY", t0(), &config, None)
            .unwrap_err();
        assert_eq!(err.subject(), "auto-response-days");
    }

    #[test]
    fn book_settles_late_reply_with_automatic_response() {
        let mut book = TransferBook::new(TransferConfig {
            auto_response: AutoResponsePolicy::Reject,
            auto_response_days: 2,
        });
        book.request("example.com", "ClientX", "ClientY", t0(), None).unwrap();

        let err = book
            .approve("example.com", "ClientY", t0() + Duration::days(3))
            .unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "status");

        let record = book.query("example.com").unwrap();
        assert_eq!(record.status(), TransferStatus::ServerRejected);
        assert_eq!(record.acted_at(), t0() + Duration::days(2));
        assert_eq!(book.pending().count(), 0);
    }

    #[test]
    fn book_query_answers_none_without_transfer() {
        let book = TransferBook::default();
        assert!(book.query("example.com").is_none());
        assert!(book.status("example.com").is_none());
    }

    #[test]
    fn book_operations_need_a_record() {
        let mut book = TransferBook::default();
        let err = book.approve("example.com", "ClientY", t0()).unwrap_err();
        assert!(err.is_state());
        assert_eq!(err.subject(), "object-identifier");
        assert!(book.cancel("example.com", "ClientX", t0()).is_err());
        assert!(book.reject("example.com", "ClientY", t0()).is_err());
    }

    #[test]
    fn book_refuses_second_pending_request() {
        let mut book = TransferBook::default();
        book.request("example.com", "ClientX", "ClientY", t0(), None).unwrap();
        let err = book
            .request("example.com", "ClientZ", "ClientY", t0(), None)
            .unwrap_err();
        assert_eq!(err.subject(), "object-identifier");
    }

    #[test]
    fn book_allows_new_request_after_terminal() {
        let mut book = TransferBook::default();
        book.request("example.com", "ClientX", "ClientY", t0(), None).unwrap();
        book.reject("example.com", "ClientY", t0()).unwrap();
        let record = book
            .request("example.com", "ClientZ", "ClientY", t0(), None)
            .unwrap();
        assert_eq!(record.requesting_client(), "ClientZ");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn sweep_resolves_only_due_records() {
        let mut book = TransferBook::new(TransferConfig {
            auto_response: AutoResponsePolicy::Approve,
            auto_response_days: 2,
        });
        book.request("a.example", "ClientX", "ClientY", t0(), None).unwrap();
        book.request("b.example", "ClientX", "ClientY", t0() + Duration::days(3), None)
            .unwrap();
        book.request("c.example", "ClientX", "ClientY", t0(), None).unwrap();
        book.approve("c.example", "ClientY", t0()).unwrap();

        let resolved = book.sweep(t0() + Duration::days(2));
        assert_eq!(
            resolved,
            vec![("a.example".to_string(), TransferStatus::ServerApproved)]
        );
        assert_eq!(book.pending().count(), 1);
    }
}
