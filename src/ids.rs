//! Lexicographically sortable, time-ordered identifiers.
//!
//! Every entity ID is `<prefix>_<26 crockford-base32 chars>`: a 48-bit
//! millisecond timestamp followed by 80 bits of randomness, the same shape
//! as a ULID. Sorting the strings byte-wise sorts them by creation time.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ENCODED_LEN: usize = 26;

/// Type tag carried as the literal prefix of every entity ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Note,
    Collection,
    Version,
    Publication,
    Session,
    Snapshot,
    /// Passages are indexer-internal rather than a top-level entity, but
    /// follow the same id scheme for consistency rather than introducing a
    /// second id shape.
    Passage,
}

impl IdKind {
    fn prefix(self) -> &'static str {
        match self {
            IdKind::Note => "note_",
            IdKind::Collection => "col_",
            IdKind::Version => "ver_",
            IdKind::Publication => "pub_",
            IdKind::Session => "ses_",
            IdKind::Snapshot => "snp_",
            IdKind::Passage => "psg_",
        }
    }
}

/// A time-ordered identifier, e.g. `note_01ARZ3NDEKTSV4RRFFQ69G5FAV`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Mints a new ID of the given kind using the current wall clock.
    pub fn new(kind: IdKind) -> Self {
        Self::from_millis(kind, now_millis())
    }

    fn from_millis(kind: IdKind, millis: u64) -> Self {
        let mut rng = rand::thread_rng();
        let mut random = [0u8; 10];
        rng.fill_bytes(&mut random);
        let mut out = String::with_capacity(kind.prefix().len() + ENCODED_LEN);
        out.push_str(kind.prefix());
        encode_time(millis, &mut out);
        encode_random(&random, &mut out);
        Id(out)
    }

    /// Wraps an already-formatted id string, e.g. one parsed out of a path
    /// or query parameter. Does not validate the prefix or encoding.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Id(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_prefix(&self, kind: IdKind) -> bool {
        self.0.starts_with(kind.prefix())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

fn encode_time(millis: u64, out: &mut String) {
    // 48 bits of timestamp -> 10 base32 characters.
    for i in (0..10).rev() {
        let shift = i * 5;
        let idx = ((millis >> shift) & 0x1F) as usize;
        out.push(ENCODING[idx] as char);
    }
}

fn encode_random(random: &[u8; 10], out: &mut String) {
    // 80 bits of randomness -> 16 base32 characters.
    let mut buf: u128 = 0;
    for &b in random {
        buf = (buf << 8) | b as u128;
    }
    for i in (0..16).rev() {
        let shift = i * 5;
        let idx = ((buf >> shift) & 0x1F) as usize;
        out.push(ENCODING[idx] as char);
    }
}

/// Monotonic wall-clock source for `Version.created_at`.
///
/// IDs are random enough to be unique but not guaranteed strictly
/// increasing within a millisecond; `created_at` timestamps for a note's
/// version history must be, so the store advances a high-water mark
/// through this instead of trusting raw `SystemTime::now()` twice in a
/// row.
pub struct MonotonicClock {
    last_millis: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { last_millis: 0 }
    }

    /// Returns a timestamp strictly greater than every prior call.
    pub fn tick(&mut self) -> u64 {
        let now = now_millis();
        let next = if now > self.last_millis {
            now
        } else {
            self.last_millis + 1
        };
        self.last_millis = next;
        next
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
