//! Room identifier classification.
//!
//! A room id is the URL path a client connected on, minus the leading `/`.
//! Classification is a pure function of the id string: the same id always
//! yields the same class, and a room's kind never changes after creation.

use std::fmt;

/// Structured classification of a room identifier.
///
/// Patterns are anchored and case-sensitive, evaluated in order:
/// `repo-<int>[-<path>]`, `filetree-<int>`, `savepoint-<int>`, the literal
/// `default`, and everything else is unsupported. A malformed integer makes
/// the whole id unsupported rather than falling through to another pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomClass {
    /// Collaborative code-editor room. The file path may be empty in the
    /// relaxed admission form (`repo-7`); such rooms relay and replicate but
    /// are not save-eligible.
    CodeEditor {
        repository_id: u64,
        file_path: String,
    },
    /// Directory-event broadcast room, no document state.
    FileTree { repository_id: u64 },
    /// Broadcast-only room used by save schedulers.
    SavePoint { repository_id: u64 },
    /// The literal `default` path, used by load balancers to probe the
    /// server. Closed immediately with a normal close code.
    Probe,
    /// Anything else. Refused at admission.
    Unsupported,
}

/// The kind tag carried by an admitted room, driving its lifecycle policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    CodeEditor,
    FileTree,
    SavePoint,
}

impl RoomClass {
    /// Classify a room identifier.
    pub fn parse(id: &str) -> RoomClass {
        if id == "default" {
            return RoomClass::Probe;
        }
        if let Some(rest) = id.strip_prefix("repo-") {
            let (digits, file_path) = match rest.find('-') {
                Some(i) => (&rest[..i], &rest[i + 1..]),
                None => (rest, ""),
            };
            return match parse_repository_id(digits) {
                Some(repository_id) => RoomClass::CodeEditor {
                    repository_id,
                    file_path: file_path.to_string(),
                },
                None => RoomClass::Unsupported,
            };
        }
        if let Some(digits) = id.strip_prefix("filetree-") {
            return match parse_repository_id(digits) {
                Some(repository_id) => RoomClass::FileTree { repository_id },
                None => RoomClass::Unsupported,
            };
        }
        if let Some(digits) = id.strip_prefix("savepoint-") {
            return match parse_repository_id(digits) {
                Some(repository_id) => RoomClass::SavePoint { repository_id },
                None => RoomClass::Unsupported,
            };
        }
        RoomClass::Unsupported
    }

    /// The lifecycle kind for admitted rooms, `None` for probe/unsupported.
    pub fn kind(&self) -> Option<RoomKind> {
        match self {
            RoomClass::CodeEditor { .. } => Some(RoomKind::CodeEditor),
            RoomClass::FileTree { .. } => Some(RoomKind::FileTree),
            RoomClass::SavePoint { .. } => Some(RoomKind::SavePoint),
            RoomClass::Probe | RoomClass::Unsupported => None,
        }
    }
}

impl RoomKind {
    /// Whether the server keeps a CRDT replica for rooms of this kind.
    pub fn allows_document(self) -> bool {
        matches!(self, RoomKind::CodeEditor)
    }

    /// Whether an emptied room of this kind gets a grace period before
    /// destruction instead of being torn down immediately.
    pub fn uses_grace_period(self) -> bool {
        matches!(self, RoomKind::CodeEditor)
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomKind::CodeEditor => "code-editor",
            RoomKind::FileTree => "file-tree",
            RoomKind::SavePoint => "save-point",
        };
        write!(f, "{}", name)
    }
}

/// Digits-only integer parse, matching an anchored `\d+`. Rejects signs,
/// whitespace, and empty strings that `str::parse` would tolerate or that
/// would un-anchor the pattern.
fn parse_repository_id(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
