//! Topic categorization for proposals.
//!
//! Two strategies live here. [`categorize`] is the served path: a curated
//! number→tags table with a numeric-range fallback, pure and deterministic,
//! never empty. [`categorize_by_keywords`] is an alternate rule engine that
//! scans title/abstract/content against per-topic keyword lists and
//! produces a broader tag set; the two are intentionally not reconciled.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{Bip, BipType};

/// Curated topic tags per proposal number.
static CURATED: &[(u32, &[&str])] = &[
    (1, &["governance", "process"]),
    (2, &["governance", "process"]),
    (8, &["consensus", "soft-fork", "process"]),
    (9, &["consensus", "soft-fork", "process"]),
    (10, &["transactions", "multisig"]),
    (11, &["transactions", "multisig", "scripts"]),
    (12, &["scripts", "consensus"]),
    (13, &["addresses", "scripts"]),
    (14, &["p2p"]),
    (15, &["addresses"]),
    (16, &["consensus", "scripts", "soft-fork"]),
    (17, &["scripts"]),
    (18, &["scripts", "consensus"]),
    (19, &["transactions", "multisig"]),
    (20, &["payments"]),
    (21, &["payments", "wallets"]),
    (22, &["mining"]),
    (23, &["mining"]),
    (30, &["consensus", "transactions"]),
    (31, &["p2p"]),
    (32, &["wallets", "keys"]),
    (33, &["p2p"]),
    (34, &["consensus", "blocks", "soft-fork"]),
    (35, &["p2p"]),
    (36, &["p2p"]),
    (37, &["p2p", "privacy"]),
    (38, &["wallets", "keys", "security"]),
    (39, &["wallets", "mnemonics"]),
    (42, &["consensus"]),
    (43, &["wallets", "keys"]),
    (44, &["wallets", "keys"]),
    (45, &["wallets", "multisig"]),
    (47, &["privacy", "payments"]),
    (49, &["wallets", "segwit"]),
    (50, &["consensus", "blocks"]),
    (60, &["p2p"]),
    (61, &["p2p"]),
    (62, &["consensus", "transactions"]),
    (64, &["p2p"]),
    (65, &["scripts", "consensus", "soft-fork"]),
    (66, &["consensus", "soft-fork"]),
    (67, &["wallets", "multisig"]),
    (68, &["consensus", "transactions", "soft-fork"]),
    (69, &["transactions", "privacy"]),
    (70, &["payments"]),
    (71, &["payments"]),
    (72, &["payments"]),
    (73, &["payments"]),
    (74, &["payments"]),
    (75, &["payments"]),
    (78, &["privacy", "payments"]),
    (79, &["privacy", "payments"]),
    (80, &["wallets", "keys"]),
    (81, &["wallets", "keys"]),
    (83, &["wallets", "keys"]),
    (84, &["wallets", "keys", "segwit"]),
    (85, &["wallets", "keys"]),
    (86, &["wallets", "keys", "taproot"]),
    (87, &["wallets", "multisig"]),
    (88, &["wallets", "keys"]),
    (90, &["consensus"]),
    (91, &["consensus", "segwit"]),
    (93, &["wallets", "keys"]),
    (99, &["governance", "consensus"]),
    (101, &["consensus", "blocks", "hard-fork"]),
    (102, &["consensus", "blocks", "hard-fork"]),
    (103, &["consensus", "blocks"]),
    (104, &["consensus", "blocks"]),
    (105, &["consensus", "blocks"]),
    (106, &["consensus", "blocks"]),
    (107, &["consensus", "blocks"]),
    (109, &["consensus", "blocks", "hard-fork"]),
    (111, &["p2p"]),
    (112, &["scripts", "consensus", "soft-fork"]),
    (113, &["consensus", "transactions", "soft-fork"]),
    (114, &["scripts", "contracts"]),
    (115, &["scripts", "consensus"]),
    (116, &["scripts"]),
    (117, &["scripts"]),
    (118, &["transactions", "lightning"]),
    (119, &["contracts", "scripts"]),
    (120, &["payments"]),
    (121, &["payments"]),
    (122, &["payments"]),
    (123, &["governance", "process"]),
    (124, &["wallets", "scripts"]),
    (125, &["transactions", "fees"]),
    (126, &["privacy", "transactions"]),
    (127, &["transactions", "security"]),
    (129, &["wallets", "multisig"]),
    (130, &["p2p"]),
    (131, &["transactions"]),
    (132, &["governance"]),
    (133, &["p2p", "fees"]),
    (134, &["transactions", "hard-fork"]),
    (135, &["consensus"]),
    (136, &["transactions", "blocks"]),
    (137, &["security", "wallets"]),
    (140, &["transactions"]),
    (141, &["consensus", "segwit", "soft-fork"]),
    (142, &["addresses", "segwit"]),
    (143, &["consensus", "segwit", "transactions"]),
    (144, &["p2p", "segwit"]),
    (145, &["mining", "segwit"]),
    (146, &["consensus", "transactions"]),
    (147, &["consensus", "segwit"]),
    (148, &["consensus", "governance", "soft-fork"]),
    (149, &["consensus", "segwit"]),
    (150, &["p2p", "security"]),
    (151, &["p2p", "privacy", "security"]),
    (152, &["p2p", "blocks"]),
    (155, &["p2p"]),
    (156, &["p2p", "privacy"]),
    (157, &["p2p", "privacy", "wallets"]),
    (158, &["p2p", "privacy", "wallets"]),
    (159, &["p2p"]),
    (171, &["payments"]),
    (173, &["addresses", "segwit"]),
    (174, &["transactions", "wallets", "psbt"]),
    (175, &["payments", "contracts"]),
    (176, &["general"]),
    (178, &["wallets", "keys"]),
    (199, &["contracts", "scripts"]),
    (300, &["consensus", "contracts"]),
    (301, &["mining", "consensus"]),
    (310, &["mining"]),
    (320, &["mining"]),
    (322, &["security", "wallets"]),
    (324, &["p2p", "privacy", "security"]),
    (325, &["consensus", "p2p"]),
    (326, &["transactions", "taproot"]),
    (327, &["multisig", "schnorr", "taproot"]),
    (328, &["wallets", "keys", "multisig"]),
    (330, &["p2p"]),
    (331, &["p2p", "transactions", "fees"]),
    (338, &["p2p"]),
    (339, &["p2p"]),
    (340, &["consensus", "schnorr", "taproot"]),
    (341, &["consensus", "taproot", "soft-fork"]),
    (342, &["consensus", "taproot", "scripts"]),
    (343, &["consensus", "taproot"]),
    (345, &["scripts", "contracts", "security"]),
    (347, &["scripts", "contracts"]),
    (348, &["scripts"]),
    (349, &["scripts", "taproot"]),
    (350, &["addresses", "taproot"]),
    (351, &["privacy", "payments"]),
    (352, &["privacy", "payments", "addresses"]),
    (353, &["addresses", "payments"]),
    (370, &["transactions", "wallets", "psbt"]),
    (371, &["transactions", "wallets", "psbt", "taproot"]),
    (372, &["transactions", "psbt"]),
    (373, &["transactions", "psbt", "multisig"]),
    (374, &["transactions", "psbt"]),
    (375, &["transactions", "psbt", "privacy"]),
    (379, &["wallets", "descriptors"]),
    (380, &["wallets", "descriptors"]),
    (381, &["wallets", "descriptors"]),
    (382, &["wallets", "descriptors", "segwit"]),
    (383, &["wallets", "descriptors", "multisig"]),
    (384, &["wallets", "descriptors"]),
    (385, &["wallets", "descriptors"]),
    (386, &["wallets", "descriptors", "taproot"]),
    (387, &["wallets", "descriptors", "multisig"]),
    (388, &["wallets", "descriptors"]),
    (389, &["wallets", "descriptors"]),
    (390, &["wallets", "descriptors", "multisig"]),
    (431, &["transactions", "fees"]),
];

static CATEGORY_TABLE: Lazy<HashMap<u32, &'static [&'static str]>> =
    Lazy::new(|| CURATED.iter().copied().collect());

/// Map a proposal number to its topic tags.
///
/// Direct table lookup first; numbers outside the table classify by
/// numeric range. The result is never empty.
pub fn categorize(number: u32) -> Vec<String> {
    if let Some(tags) = CATEGORY_TABLE.get(&number) {
        return tags.iter().map(|t| t.to_string()).collect();
    }

    let fallback = if number <= 2 {
        "governance"
    } else if number <= 50 {
        "consensus"
    } else if number <= 100 {
        "wallets"
    } else if number <= 200 {
        "transactions"
    } else {
        "general"
    };
    vec![fallback.to_string()]
}

/// Per-topic keyword lists for the rule engine.
static KEYWORD_RULES: &[(&str, &[&str])] = &[
    (
        "consensus",
        &[
            "soft fork",
            "hard fork",
            "consensus rule",
            "block validation",
            "activation",
            "deployment",
        ],
    ),
    (
        "segwit",
        &["segregated witness", "segwit", "witness program"],
    ),
    (
        "taproot",
        &["taproot", "schnorr", "tapscript", "key aggregation"],
    ),
    (
        "wallets",
        &[
            "wallet",
            "derivation path",
            "seed",
            "mnemonic",
            "extended key",
            "descriptor",
        ],
    ),
    (
        "addresses",
        &["address format", "bech32", "base58", "address encoding"],
    ),
    (
        "transactions",
        &[
            "transaction format",
            "signature hash",
            "sighash",
            "locktime",
            "replace-by-fee",
            "partially signed",
            "malleability",
        ],
    ),
    ("scripts", &["opcode", "op_", "script language", "redeem script"]),
    (
        "p2p",
        &[
            "peer-to-peer",
            "p2p",
            "network message",
            "relay",
            "handshake",
            "service bit",
        ],
    ),
    (
        "privacy",
        &["privacy", "fingerprint", "unlinkab", "coinjoin"],
    ),
    (
        "payments",
        &["payment request", "payment protocol", "uri scheme", "invoice"],
    ),
    (
        "mining",
        &["mining", "getblocktemplate", "stratum", "coinbase transaction"],
    ),
    (
        "security",
        &["encryption", "authentication", "key recovery", "backup"],
    ),
    ("lightning", &["lightning", "payment channel", "htlc"]),
];

/// Prefix of the content considered by the keyword scan. Full documents can
/// run to hundreds of kilobytes of reference text and test vectors that
/// drown the signal.
const KEYWORD_CONTENT_CHARS: usize = 4000;

/// Alternate keyword-rule categorization.
///
/// Scans title, abstract, and the head of the content against
/// [`KEYWORD_RULES`], then applies type-based tags. Produces a different,
/// broader tag set than [`categorize`] and is not wired into the served
/// path.
pub fn categorize_by_keywords(bip: &Bip) -> Vec<String> {
    let head: String = bip.content.chars().take(KEYWORD_CONTENT_CHARS).collect();
    let haystack = format!("{} {} {}", bip.title, bip.abstract_text, head).to_lowercase();

    let mut tags: Vec<String> = Vec::new();
    for (topic, keywords) in KEYWORD_RULES {
        if keywords.iter().any(|k| haystack.contains(k)) {
            tags.push(topic.to_string());
        }
    }

    match bip.kind {
        BipType::Process => {
            if !tags.iter().any(|t| t == "process") {
                tags.push("process".to_string());
            }
        }
        BipType::Informational => {
            if !tags.iter().any(|t| t == "informational") {
                tags.push("informational".to_string());
            }
        }
        BipType::StandardsTrack => {}
    }

    if tags.is_empty() {
        tags.push("general".to_string());
    }
    tags
}
