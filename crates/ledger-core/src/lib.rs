pub mod constants;
pub mod consensus;
pub mod dump;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod peers;
pub mod validate;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;

pub use consensus::{select_longest, ChainCandidate};
pub use dump::ChainDump;
pub use error::{ChainError, LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use peers::PeerSet;
pub use validate::{is_valid, validate_chain, validate_chain_strict, ValidationPolicy};

use constants::{GENESIS_PREVIOUS_HASH, TIMESTAMP_FORMAT};

/// Current local time in the ledger's timestamp format.
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: String,
    pub content: String,
    pub timestamp: String,
}

impl Transaction {
    /// Builds a pool entry, stamping it with the local clock.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> LedgerResult<Self> {
        let author = author.into();
        let content = content.into();
        if author.is_empty() {
            return Err(LedgerError::InvalidTransaction("author"));
        }
        if content.is_empty() {
            return Err(LedgerError::InvalidTransaction("content"));
        }
        Ok(Self {
            author,
            content,
            timestamp: now_timestamp(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: String,
    pub previous_hash: String,
    pub nonce: u64,
    /// Empty until the block is sealed.
    #[serde(default)]
    pub hash: String,
}

impl Block {
    /// Unsealed block with nonce 0, timestamped now.
    pub fn new(index: u64, transactions: Vec<Transaction>, previous_hash: impl Into<String>) -> Self {
        Self {
            index,
            transactions,
            timestamp: now_timestamp(),
            previous_hash: previous_hash.into(),
            nonce: 0,
            hash: String::new(),
        }
    }

    /// Sealed genesis block. No proof-of-work is required of it.
    pub fn genesis() -> Self {
        let mut block = Self::new(0, Vec::new(), GENESIS_PREVIOUS_HASH);
        block.hash = block.seal();
        block
    }

    /// Hex SHA-256 of the canonical encoding of every field except `hash`.
    pub fn seal(&self) -> String {
        self.seal_template().digest(self.nonce)
    }

    pub fn seal_template(&self) -> SealTemplate {
        SealTemplate::new(self)
    }
}

/// Canonical encoding of a block split around its nonce.
///
/// The encoded form is `{"index": I, "nonce": N, "previous_hash": ..., "timestamp": ...,
/// "transactions": [...]}`. Everything before `N` is absorbed into a hasher once;
/// everything after it is kept as bytes, so each nonce costs one clone and two updates.
#[derive(Clone)]
pub struct SealTemplate {
    prefix: Sha256,
    suffix: Vec<u8>,
}

#[derive(Serialize)]
struct SealTail<'a> {
    previous_hash: &'a str,
    timestamp: &'a str,
    transactions: &'a [Transaction],
}

impl SealTemplate {
    fn new(block: &Block) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(format!("{{\"index\": {}, \"nonce\": ", block.index));

        let tail = canonical_json(&SealTail {
            previous_hash: &block.previous_hash,
            timestamp: &block.timestamp,
            transactions: &block.transactions,
        });
        // tail is a JSON object; drop its opening brace and splice it after the nonce
        let mut suffix = Vec::with_capacity(tail.len() + 1);
        suffix.extend_from_slice(b", ");
        suffix.extend_from_slice(&tail[1..]);

        Self { prefix, suffix }
    }

    pub fn digest(&self, nonce: u64) -> String {
        let mut hasher = self.prefix.clone();
        hasher.update(nonce.to_string());
        hasher.update(&self.suffix);
        hex::encode(hasher.finalize())
    }
}

/// JSON with sorted keys (struct field order), `", "` and `": "` separators and
/// every non-ASCII character escaped as `\uXXXX`. Field order of the serialized
/// type is the key order, so canonical records declare their fields alphabetically.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value
        .serialize(&mut ser)
        .expect("canonical records contain only strings, integers and sequences");
    out
}

struct CanonicalFormatter;

impl serde_json::ser::Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

pub mod pow {
    use super::Block;

    pub fn leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }

    pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Searches nonces upward from 0 and leaves the smallest winning one on `block`.
    /// Returns the winning hash; assigning it to `block.hash` is up to the caller.
    pub fn proof_of_work(block: &mut Block, difficulty: usize) -> String {
        let template = block.seal_template();
        let mut nonce = 0u64;
        loop {
            let hash = template.digest(nonce);
            if meets_difficulty(&hash, difficulty) {
                block.nonce = nonce;
                return hash;
            }
            nonce = nonce.wrapping_add(1);
        }
    }

    /// `proof` must meet the difficulty and be the block's own seal.
    pub fn is_valid_proof(block: &Block, proof: &str, difficulty: usize) -> bool {
        meets_difficulty(proof, difficulty) && proof == block.seal()
    }
}
