//! Core data models used throughout BIP Explorer.
//!
//! These types represent the parsed proposals, derived author views, and
//! aggregate statistics that flow through the refresh pipeline and out of
//! the HTTP API. Wire shapes use camelCase field names.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a proposal, as declared in its preamble.
///
/// Status text from source documents is normalized by substring containment
/// in declaration order; unrecognized text falls back to [`BipStatus::Draft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BipStatus {
    Draft,
    Proposed,
    Active,
    Final,
    Deferred,
    Rejected,
    Withdrawn,
    Replaced,
    Obsolete,
}

impl BipStatus {
    /// Normalize free-form status text against the known status words.
    ///
    /// First match wins; unknown text is replaced with `Draft` rather than
    /// preserved verbatim.
    pub fn from_text(text: &str) -> Self {
        let lowered = text.to_lowercase();
        for (needle, status) in [
            ("draft", BipStatus::Draft),
            ("proposed", BipStatus::Proposed),
            ("active", BipStatus::Active),
            ("final", BipStatus::Final),
            ("deferred", BipStatus::Deferred),
            ("rejected", BipStatus::Rejected),
            ("withdrawn", BipStatus::Withdrawn),
            ("replaced", BipStatus::Replaced),
            ("obsolete", BipStatus::Obsolete),
        ] {
            if lowered.contains(needle) {
                return status;
            }
        }
        BipStatus::Draft
    }
}

impl std::fmt::Display for BipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BipStatus::Draft => "Draft",
            BipStatus::Proposed => "Proposed",
            BipStatus::Active => "Active",
            BipStatus::Final => "Final",
            BipStatus::Deferred => "Deferred",
            BipStatus::Rejected => "Rejected",
            BipStatus::Withdrawn => "Withdrawn",
            BipStatus::Replaced => "Replaced",
            BipStatus::Obsolete => "Obsolete",
        };
        f.write_str(name)
    }
}

/// Proposal track, as declared in its preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BipType {
    #[serde(rename = "Standards Track")]
    StandardsTrack,
    Informational,
    Process,
}

impl BipType {
    /// Normalize free-form type text; unknown text falls back to
    /// `StandardsTrack`.
    pub fn from_text(text: &str) -> Self {
        let lowered = text.to_lowercase();
        if lowered.contains("informational") {
            BipType::Informational
        } else if lowered.contains("process") {
            BipType::Process
        } else {
            BipType::StandardsTrack
        }
    }
}

impl std::fmt::Display for BipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BipType::StandardsTrack => "Standards Track",
            BipType::Informational => "Informational",
            BipType::Process => "Process",
        };
        f.write_str(name)
    }
}

/// One Bitcoin Improvement Proposal with parsed metadata and raw content.
///
/// The number is derived from the source filename and is the primary key;
/// it never changes once assigned. `categories` is filled by the
/// categorizer during refresh and is never empty on a served document.
/// `explanation` is backfilled asynchronously and may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bip {
    pub number: u32,
    pub title: String,
    pub authors: Vec<String>,
    pub status: BipStatus,
    #[serde(rename = "type")]
    pub kind: BipType,
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub source_filename: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replaces: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replaced_by: Vec<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Derived author view: rebuilt from the full document set on every
/// request, never stored as its own entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub bip_count: usize,
    pub bips: Vec<u32>,
}

/// Aggregate statistics over the full document set, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_bips: usize,
    /// Documents with `Final` status.
    pub final_bips: usize,
    /// Documents with `Active` or `Draft` status.
    pub active_bips: usize,
    /// Documents with `Draft` status.
    pub draft_bips: usize,
    pub standards_track: usize,
    pub informational: usize,
    pub process: usize,
    /// Distinct contributor names across all documents.
    pub contributors: usize,
}
