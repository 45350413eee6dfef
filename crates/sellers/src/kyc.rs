use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fairmarket_core::{DomainError, DomainResult, Entity, SellerId, SubmissionId, UserId};

/// Review state of a single KYC submission.
///
/// Distinct from [`crate::seller::KycStatus`]: a submission is never
/// "not submitted", and each one is decided at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admissible review outcomes.
///
/// A closed enum: anything other than approve/reject is unrepresentable, and
/// the transport boundary parses via [`FromStr`] into a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycOutcome {
    Approved,
    Rejected,
}

impl FromStr for KycOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(KycOutcome::Approved),
            "rejected" => Ok(KycOutcome::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown kyc outcome '{other}': expected 'approved' or 'rejected'"
            ))),
        }
    }
}

/// Accepted identity document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdDocumentType {
    Nin,
    Passport,
    DriversLicense,
}

impl FromStr for IdDocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nin" => Ok(IdDocumentType::Nin),
            "passport" => Ok(IdDocumentType::Passport),
            "drivers_license" => Ok(IdDocumentType::DriversLicense),
            other => Err(DomainError::validation(format!(
                "unknown id document type '{other}'"
            ))),
        }
    }
}

/// References to the identity documents backing a submission.
///
/// Document storage is external; only the reference and declared identity
/// number travel through this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDocumentRefs {
    pub id_type: IdDocumentType,
    pub id_number: String,
    pub document_url: String,
}

/// A seller's identity-verification submission.
///
/// Created pending, decided exactly once, immutable afterwards. A rejected
/// seller files a fresh submission rather than amending an old one, so the
/// newest submission is the current one of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycSubmission {
    id: SubmissionId,
    seller_id: SellerId,
    documents: KycDocumentRefs,
    status: SubmissionStatus,
    reviewed_by: Option<UserId>,
    review_notes: Option<String>,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl KycSubmission {
    /// File a new submission for review.
    pub fn submit(
        id: SubmissionId,
        seller_id: SellerId,
        documents: KycDocumentRefs,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if documents.id_number.trim().is_empty() {
            return Err(DomainError::validation("id_number cannot be empty"));
        }
        if documents.document_url.trim().is_empty() {
            return Err(DomainError::validation("document_url cannot be empty"));
        }

        Ok(Self {
            id,
            seller_id,
            documents,
            status: SubmissionStatus::Pending,
            reviewed_by: None,
            review_notes: None,
            submitted_at: now,
            reviewed_at: None,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> SubmissionId {
        self.id
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn documents(&self) -> &KycDocumentRefs {
        &self.documents
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    pub fn review_notes(&self) -> Option<&str> {
        self.review_notes.as_deref()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == SubmissionStatus::Pending
    }

    /// Record the reviewer's decision. Legal exactly once, from pending.
    pub fn decide(
        &mut self,
        outcome: KycOutcome,
        reviewer: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != SubmissionStatus::Pending {
            return Err(DomainError::invalid_state(
                "submission has already been decided",
            ));
        }
        self.status = match outcome {
            KycOutcome::Approved => SubmissionStatus::Approved,
            KycOutcome::Rejected => SubmissionStatus::Rejected,
        };
        self.reviewed_by = Some(reviewer);
        self.review_notes = notes;
        self.reviewed_at = Some(now);
        Ok(())
    }

    /// Copy stamped with the storage version assigned by the record store on
    /// commit.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

impl Entity for KycSubmission {
    type Id = SubmissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
