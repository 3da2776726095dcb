//! Event model and content addressing.
//!
//! An event id is the hex SHA-256 of the canonical serialization
//! `[0, pubkey, created_at, kind, tags, content]` (compact JSON). The signature
//! is a BIP-340 Schnorr signature over the 32 id bytes.

use crate::error::{PipelineError, Result};
use secp256k1::{schnorr::Signature, Message, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A tag expressed as an array of strings, e.g. `["e", "<event id>"]`.
///
/// The first element names the tag; the remaining ones hold data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(parts.into_iter().map(Into::into).collect())
    }

    /// Tag name (first element), if any
    pub fn kind(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// First data element after the name
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }
}

/// Event payload before id and signature assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub kind: u32,
    /// Unix timestamp in seconds
    pub created_at: i64,
    pub tags: Vec<Tag>,
    pub content: String,
    /// Author public key (64 hex chars, x-only)
    pub pubkey: String,
}

impl UnsignedEvent {
    /// Canonical byte string hashed into the event id
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let arr = serde_json::json!([
            0,
            self.pubkey,
            self.created_at,
            self.kind,
            self.tags,
            self.content
        ]);
        Ok(serde_json::to_vec(&arr)?)
    }

    pub fn hash(&self) -> Result<[u8; 32]> {
        let data = self.canonical_bytes()?;
        Ok(Sha256::digest(&data).into())
    }

    /// Content address the event will carry once signed
    pub fn compute_id(&self) -> Result<String> {
        Ok(hex::encode(self.hash()?))
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.kind() == Some(name))
    }

    /// First values of every tag named `name`
    pub fn tag_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.kind() == Some(name))
            .filter_map(Tag::value)
    }

    /// Attach an id and signature produced elsewhere
    pub fn into_signed(self, id: String, sig: String) -> Event {
        Event {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig,
        }
    }
}

/// Signed, content-addressed event.
///
/// ```json
/// {
///   "id": "4376c65d2f232afbe9b882a35baa4f6fe8667c4e684749af565f981833ed6a65",
///   "pubkey": "6e468422dfb74a5738702a8823b9b28168abab8655faacb6853cd0ee15deee93",
///   "created_at": 1673347337,
///   "kind": 1,
///   "tags": [["e", "3da979448d9ba263864c4d6f14984c423a3838364ec255f03c7904b1ae77f206"]],
///   "content": "hello",
///   "sig": "908a15e46fb4d8675bab026fc230a0e3542bfade63da02d542fb78b2a8513fcd..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl Event {
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            kind: self.kind,
            created_at: self.created_at,
            tags: self.tags.clone(),
            content: self.content.clone(),
            pubkey: self.pubkey.clone(),
        }
    }

    /// Recompute the id and check the Schnorr signature against `pubkey`.
    pub fn verify(&self) -> Result<()> {
        let hash = self.unsigned().hash()?;
        if hex::encode(hash) != self.id {
            return Err(PipelineError::signing("event id does not match content"));
        }
        let sig_bytes = hex::decode(&self.sig)
            .map_err(|e| PipelineError::signing(format!("signature is not hex: {e}")))?;
        let sig = Signature::from_slice(&sig_bytes)
            .map_err(|e| PipelineError::signing(format!("malformed signature: {e}")))?;
        let pk_bytes = hex::decode(&self.pubkey)
            .map_err(|e| PipelineError::signing(format!("pubkey is not hex: {e}")))?;
        let pk = XOnlyPublicKey::from_slice(&pk_bytes)
            .map_err(|e| PipelineError::signing(format!("malformed pubkey: {e}")))?;
        let msg = Message::from_digest_slice(&hash)
            .map_err(|e| PipelineError::signing(e.to_string()))?;
        Secp256k1::verification_only()
            .verify_schnorr(&sig, &msg, &pk)
            .map_err(|e| PipelineError::signing(format!("signature verification failed: {e}")))
    }
}
