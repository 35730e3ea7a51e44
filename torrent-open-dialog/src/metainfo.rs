//! Torrent metainfo parsing.
//!
//! The confirm gate only needs a yes/no answer plus a diagnostic, so the
//! parser exposes a single [`MetainfoParser::parse`] call. The default
//! [`BencodeMetainfoParser`] decodes the bencoded dictionary with
//! `serde_bencode` and then checks the structure a torrent client relies on:
//! a named `info` dictionary, a positive piece length, a `pieces` string made
//! of 20-byte SHA-1 digests that matches the payload size, and exactly one of
//! the single-file (`length`) or multi-file (`files`) layouts.
//!
//! Before decoding, a flat scan bounds container nesting and checks that the
//! top-level dictionary spans the whole buffer.
use serde::Deserialize;
use serde_bytes::ByteBuf;
use thiserror::Error;

/// Length of one SHA-1 piece digest.
const PIECE_HASH_LEN: usize = 20;

/// Deepest list/dictionary nesting accepted anywhere in a descriptor.
const MAX_NESTING: usize = 64;

/// Information extracted from a structurally valid torrent descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TorrentSummary {
    /// Suggested name of the file or top-level directory.
    pub name: String,
    /// Total payload size in bytes.
    pub total_size: u64,
    /// Number of files described (1 for single-file torrents).
    pub file_count: usize,
    /// Bytes per piece.
    pub piece_length: u64,
    /// Number of piece digests.
    pub piece_count: usize,
    /// Tracker URLs from `announce` and `announce-list`, deduplicated in order.
    pub trackers: Vec<String>,
    /// Whether the `private` flag is set.
    pub private: bool,
}

/// Reasons a byte buffer is not a usable torrent descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetainfoError {
    /// Not bencode, or bencode of the wrong shape.
    #[error("malformed bencode: {0}")]
    Decode(String),
    /// Bytes follow the top-level dictionary.
    #[error("{0} trailing bytes after metainfo")]
    TrailingData(usize),
    /// `info.name` is empty.
    #[error("torrent name is empty")]
    EmptyName,
    /// `info.piece length` is zero.
    #[error("piece length must be positive")]
    ZeroPieceLength,
    /// `info.pieces` is empty or not a whole number of digests.
    #[error("pieces field has invalid length {0}")]
    InvalidPieces(usize),
    /// The number of digests does not cover the payload.
    #[error("expected {expected} pieces, found {found}")]
    PieceCountMismatch {
        /// Digests implied by payload size and piece length.
        expected: u64,
        /// Digests present in `pieces`.
        found: usize,
    },
    /// Neither `length` nor `files` is present.
    #[error("info dictionary has neither length nor files")]
    MissingLayout,
    /// Both `length` and `files` are present.
    #[error("info dictionary has both length and files")]
    AmbiguousLayout,
    /// `files` is an empty list.
    #[error("file list is empty")]
    EmptyFileList,
    /// A `files` entry has no path components.
    #[error("file {0} has an empty path")]
    EmptyFilePath(usize),
    /// The payload is zero bytes long.
    #[error("torrent describes no data")]
    EmptyPayload,
    /// Summing file lengths overflowed.
    #[error("total size overflows")]
    SizeOverflow,
}

impl From<serde_bencode::Error> for MetainfoError {
    fn from(err: serde_bencode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Parses candidate bytes into a [`TorrentSummary`].
///
/// Implementations are shared with background validation threads.
pub trait MetainfoParser: Send + Sync {
    /// Parse one file's contents.
    fn parse(&self, bytes: &[u8]) -> Result<TorrentSummary, MetainfoError>;
}

/// Default parser for bencoded metainfo (BEP 3).
#[derive(Clone, Copy, Debug, Default)]
pub struct BencodeMetainfoParser;

impl MetainfoParser for BencodeMetainfoParser {
    fn parse(&self, bytes: &[u8]) -> Result<TorrentSummary, MetainfoError> {
        let end = scan_extent(bytes)?;
        if end != bytes.len() {
            return Err(MetainfoError::TrailingData(bytes.len() - end));
        }
        let raw: RawMetainfo = serde_bencode::from_bytes(bytes)?;
        summarize(raw)
    }
}

/// Walks one bencode value starting at offset 0 without recursion and
/// returns the offset just past it.
///
/// Only framing is checked here: integer bodies and dictionary key order are
/// left to the decoder.
fn scan_extent(bytes: &[u8]) -> Result<usize, MetainfoError> {
    let decode = MetainfoError::Decode;
    let mut pos = 0usize;
    let mut depth = 0usize;
    loop {
        let Some(&tag) = bytes.get(pos) else {
            return Err(decode(format!("unexpected end of input at offset {pos}")));
        };
        match tag {
            b'l' | b'd' => {
                depth += 1;
                if depth > MAX_NESTING {
                    let msg = format!("nesting deeper than {MAX_NESTING} at offset {pos}");
                    return Err(decode(msg));
                }
                pos += 1;
                continue;
            }
            b'e' if depth > 0 => {
                depth -= 1;
                pos += 1;
            }
            b'i' => {
                let Some(len) = bytes[pos + 1..].iter().position(|&b| b == b'e') else {
                    return Err(decode(format!("unterminated integer at offset {pos}")));
                };
                pos += len + 2;
            }
            b'0'..=b'9' => {
                let digits = bytes[pos..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if bytes.get(pos + digits) != Some(&b':') {
                    return Err(decode(format!("bad string length at offset {pos}")));
                }
                let len = std::str::from_utf8(&bytes[pos..pos + digits])
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(|| decode(format!("bad string length at offset {pos}")))?;
                let start = pos + digits + 1;
                pos = start
                    .checked_add(len)
                    .filter(|&end| end <= bytes.len())
                    .ok_or_else(|| decode(format!("string overruns input at offset {pos}")))?;
            }
            other => {
                return Err(decode(format!("unexpected byte 0x{other:02x} at offset {pos}")));
            }
        }
        if depth == 0 {
            return Ok(pos);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMetainfo {
    info: RawInfo,
    #[serde(default)]
    announce: Option<ByteBuf>,
    #[serde(default, rename = "announce-list")]
    announce_list: Option<Vec<Vec<ByteBuf>>>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    name: ByteBuf,
    #[serde(rename = "piece length")]
    piece_length: u64,
    pieces: ByteBuf,
    #[serde(default)]
    length: Option<u64>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
    #[serde(default)]
    private: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    length: u64,
    path: Vec<ByteBuf>,
}

fn summarize(raw: RawMetainfo) -> Result<TorrentSummary, MetainfoError> {
    let RawMetainfo {
        info,
        announce,
        announce_list,
    } = raw;

    let name = String::from_utf8_lossy(&info.name).into_owned();
    if name.is_empty() {
        return Err(MetainfoError::EmptyName);
    }
    if info.piece_length == 0 {
        return Err(MetainfoError::ZeroPieceLength);
    }
    let pieces_len = info.pieces.len();
    if pieces_len == 0 || pieces_len % PIECE_HASH_LEN != 0 {
        return Err(MetainfoError::InvalidPieces(pieces_len));
    }
    let piece_count = pieces_len / PIECE_HASH_LEN;

    let (total_size, file_count) = match (info.length, info.files) {
        (Some(_), Some(_)) => return Err(MetainfoError::AmbiguousLayout),
        (None, None) => return Err(MetainfoError::MissingLayout),
        (Some(length), None) => (length, 1),
        (None, Some(files)) => {
            if files.is_empty() {
                return Err(MetainfoError::EmptyFileList);
            }
            let mut total = 0u64;
            for (index, file) in files.iter().enumerate() {
                if file.path.is_empty() || file.path.iter().all(|c| c.is_empty()) {
                    return Err(MetainfoError::EmptyFilePath(index));
                }
                total = total
                    .checked_add(file.length)
                    .ok_or(MetainfoError::SizeOverflow)?;
            }
            (total, files.len())
        }
    };
    if total_size == 0 {
        return Err(MetainfoError::EmptyPayload);
    }

    let expected = total_size.div_ceil(info.piece_length);
    if expected != piece_count as u64 {
        return Err(MetainfoError::PieceCountMismatch {
            expected,
            found: piece_count,
        });
    }

    let mut trackers: Vec<String> = Vec::new();
    let tiers = announce_list.into_iter().flatten().flatten();
    for raw_url in announce.into_iter().chain(tiers) {
        let url = String::from_utf8_lossy(&raw_url).into_owned();
        if !url.is_empty() && !trackers.contains(&url) {
            trackers.push(url);
        }
    }

    Ok(TorrentSummary {
        name,
        total_size,
        file_count,
        piece_length: info.piece_length,
        piece_count,
        trackers,
        private: info.private.unwrap_or(0) == 1,
    })
}
