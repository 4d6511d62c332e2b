// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The table of known ID3v2 frames
//!
//! Every known frame ID maps to a [`FrameDef`] which names
//! the tag versions it appears in, the codec for its payload,
//! and optionally the ID of its equivalent frame in the next
//! tag version up.
//!
//! | v2.2 | v2.3 | v2.4 |
//! |------|------|------|
//! | `TYE` | `TYER` | `TDRC` |
//! | `TOR` | `TORY` | `TDOR` |
//! | `IPL` | `IPLS` | `TIPL` |
//! | `TT2` | `TIT2` | `TIT2` |
//!
//! IDs not found in the table are classified by two families:
//! anything starting with `T` is an unknown text frame
//! and anything starting with `W` is an unknown URL frame,
//! provided the remaining characters are uppercase letters or digits
//! (and not all `X`).
//! Everything else is treated as opaque binary.

use super::value::Codec;
use std::collections::HashMap;

/// A set of ID3v2 major versions
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Versions(u8);

impl Versions {
    /// ID3v2.2 only
    pub const V2: Self = Self(0b001);
    /// ID3v2.3 only
    pub const V3: Self = Self(0b010);
    /// ID3v2.4 only
    pub const V4: Self = Self(0b100);
    /// ID3v2.3 and ID3v2.4
    pub const V34: Self = Self(0b110);
    /// Every version
    pub const ALL: Self = Self(0b111);

    fn bit(version: u8) -> u8 {
        match version {
            2..=4 => 1 << (version - 2),
            _ => 0,
        }
    }

    /// Whether the set contains the given major version
    pub fn contains(self, version: u8) -> bool {
        self.0 & Self::bit(version) != 0
    }

    /// Iterates over the versions in the set, lowest first
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (2..=4).filter(move |v| self.contains(*v))
    }

    /// The lowest version in the set
    pub fn lowest(self) -> Option<u8> {
        self.iter().next()
    }

    /// The highest version in the set
    pub fn highest(self) -> Option<u8> {
        self.iter().last()
    }

    /// Whether every version in the set is above `version`
    pub fn newer_than(self, version: u8) -> bool {
        self.lowest().is_some_and(|v| v > version)
    }

    /// Whether every version in the set is below `version`
    pub fn older_than(self, version: u8) -> bool {
        self.highest().is_some_and(|v| v < version)
    }
}

/// A registry entry
#[derive(Debug, Eq, PartialEq)]
pub struct FrameDef {
    /// The canonical frame ID, empty for the fallback definitions
    pub id: &'static str,
    /// A short human-readable title
    pub title: &'static str,
    /// The tag versions this frame ID appears in
    pub versions: Versions,
    /// The codec for the frame's payload
    pub codec: Codec,
    /// The equivalent frame ID in the next version up, if any
    pub upgrade: Option<&'static str>,
}

impl FrameDef {
    /// Whether this definition came from the table
    /// rather than from one of the fallback families
    pub fn is_known(&self) -> bool {
        !self.id.is_empty()
    }

    /// The title, if this definition came from the table
    pub fn known_title(&self) -> Option<&'static str> {
        self.is_known().then_some(self.title)
    }
}

/// Definition for unknown IDs in the `T` family
pub static UNKNOWN_TEXT: FrameDef = FrameDef {
    id: "",
    title: "Unknown text frame",
    versions: Versions::ALL,
    codec: Codec::Text,
    upgrade: None,
};

/// Definition for unknown IDs in the `W` family
pub static UNKNOWN_URL: FrameDef = FrameDef {
    id: "",
    title: "Unknown URL frame",
    versions: Versions::ALL,
    codec: Codec::Url,
    upgrade: None,
};

/// Definition for every other unknown ID
pub static UNKNOWN_BINARY: FrameDef = FrameDef {
    id: "",
    title: "Unknown frame",
    versions: Versions::ALL,
    codec: Codec::Binary,
    upgrade: None,
};

macro_rules! frame_table {
    ($(($id:literal, $versions:ident, $codec:ident, $title:literal $(, $upgrade:literal)?)),* $(,)?) => {
        &[$(FrameDef {
            id: $id,
            title: $title,
            versions: Versions::$versions,
            codec: Codec::$codec,
            upgrade: frame_table!(@upgrade $($upgrade)?),
        }),*]
    };
    (@upgrade) => { None };
    (@upgrade $upgrade:literal) => { Some($upgrade) };
}

/// Every known frame definition
pub static FRAMES: &[FrameDef] = frame_table![
    // ID3v2.2
    ("BUF", V2, BufferSize, "Recommended buffer size", "RBUF"),
    ("CNT", V2, Number, "Play counter", "PCNT"),
    ("COM", V2, LangDescText, "Comments", "COMM"),
    ("CRA", V2, AudioEncryption, "Audio encryption", "AENC"),
    ("CRM", V2, Binary, "Encrypted meta frame"),
    ("ETC", V2, EventTiming, "Event timing codes", "ETCO"),
    ("EQU", V2, Binary, "Equalization", "EQUA"),
    ("GEO", V2, EncapsulatedObject, "General encapsulated object", "GEOB"),
    ("GP1", V2, Text, "Grouping", "GRP1"),
    ("IPL", V2, Pairs, "Involved people list", "IPLS"),
    ("LNK", V2, LinkedInfo, "Linked information", "LINK"),
    ("MCI", V2, Binary, "Music CD identifier", "MCDI"),
    ("MLL", V2, Binary, "MPEG location lookup table", "MLLT"),
    ("MVI", V2, Text, "Movement number", "MVIN"),
    ("MVN", V2, Text, "Movement name", "MVNM"),
    ("PIC", V2, Picture, "Attached picture", "APIC"),
    ("POP", V2, Popularimeter, "Popularimeter", "POPM"),
    ("REV", V2, Binary, "Reverb", "RVRB"),
    ("RVA", V2, VolumeAdjustment, "Relative volume adjustment", "RVAD"),
    ("SLT", V2, SyncedLyrics, "Synchronized lyric/text", "SYLT"),
    ("STC", V2, Binary, "Synced tempo codes", "SYTC"),
    ("TAL", V2, Text, "Album/Movie/Show title", "TALB"),
    ("TBP", V2, Text, "BPM (Beats Per Minute)", "TBPM"),
    ("TCM", V2, Text, "Composer", "TCOM"),
    ("TCO", V2, Text, "Content type", "TCON"),
    ("TCP", V2, Boolean, "iTunes compilation flag", "TCMP"),
    ("TCR", V2, Text, "Copyright message", "TCOP"),
    ("TDA", V2, Text, "Date", "TDAT"),
    ("TDY", V2, Text, "Playlist delay", "TDLY"),
    ("TEN", V2, Text, "Encoded by", "TENC"),
    ("TFT", V2, Text, "File type", "TFLT"),
    ("TIM", V2, Text, "Time", "TIME"),
    ("TKE", V2, Text, "Initial key", "TKEY"),
    ("TLA", V2, Text, "Language(s)", "TLAN"),
    ("TLE", V2, Text, "Length", "TLEN"),
    ("TMT", V2, Text, "Media type", "TMED"),
    ("TOA", V2, Text, "Original artist(s)/performer(s)", "TOPE"),
    ("TOF", V2, Text, "Original filename", "TOFN"),
    ("TOL", V2, Text, "Original Lyricist(s)/text writer(s)", "TOLY"),
    ("TOR", V2, Text, "Original release year", "TORY"),
    ("TOT", V2, Text, "Original album/Movie/Show title", "TOAL"),
    ("TP1", V2, Text, "Lead artist(s)/Lead performer(s)/Soloist(s)/Performing group", "TPE1"),
    ("TP2", V2, Text, "Band/Orchestra/Accompaniment", "TPE2"),
    ("TP3", V2, Text, "Conductor/Performer refinement", "TPE3"),
    ("TP4", V2, Text, "Interpreted, remixed, or otherwise modified by", "TPE4"),
    ("TPA", V2, Text, "Part of a set", "TPOS"),
    ("TPB", V2, Text, "Publisher", "TPUB"),
    ("TRC", V2, Text, "ISRC (International Standard Recording Code)", "TSRC"),
    ("TRD", V2, Text, "Recording dates", "TRDA"),
    ("TRK", V2, Text, "Track number/Position in set", "TRCK"),
    ("TS2", V2, Text, "iTunes album artist sort order", "TSO2"),
    ("TSA", V2, Text, "Album sort order", "TSOA"),
    ("TSC", V2, Text, "iTunes composer sort order", "TSOC"),
    ("TSI", V2, Text, "Size", "TSIZ"),
    ("TSP", V2, Text, "Performer sort order", "TSOP"),
    ("TSS", V2, Text, "Software/hardware and settings used for encoding", "TSSE"),
    ("TST", V2, Text, "Title sort order", "TSOT"),
    ("TT1", V2, Text, "Content group description", "TIT1"),
    ("TT2", V2, Text, "Title/Songname/Content description", "TIT2"),
    ("TT3", V2, Text, "Subtitle/Description refinement", "TIT3"),
    ("TXT", V2, Text, "Lyricist/text writer", "TEXT"),
    ("TXX", V2, IdText, "User defined text information frame", "TXXX"),
    ("TYE", V2, Text, "Year", "TYER"),
    ("UFI", V2, IdBinary, "Unique file identifier", "UFID"),
    ("ULT", V2, LangDescText, "Unsychronized lyric/text transcription", "USLT"),
    ("WAF", V2, Url, "Official audio file webpage", "WOAF"),
    ("WAR", V2, Url, "Official artist/performer webpage", "WOAR"),
    ("WAS", V2, Url, "Official audio source webpage", "WOAS"),
    ("WCM", V2, Url, "Commercial information", "WCOM"),
    ("WCP", V2, Url, "Copyright/Legal information", "WCOP"),
    ("WPB", V2, Url, "Publishers official webpage", "WPUB"),
    ("WXX", V2, IdUrl, "User defined URL link frame", "WXXX"),
    // ID3v2.3 only
    ("EQUA", V3, Binary, "Equalization"),
    ("IPLS", V3, Pairs, "Involved people list", "TIPL"),
    ("NCON", V3, Binary, "MusicMatch binary data"),
    ("RGAD", V3, Binary, "Replay gain adjustment"),
    ("RVAD", V3, VolumeAdjustment, "Relative volume adjustment"),
    ("TDAT", V3, Text, "Date"),
    ("TIME", V3, Text, "Time"),
    ("TORY", V3, Text, "Original release year", "TDOR"),
    ("TRDA", V3, Text, "Recording dates"),
    ("TSIZ", V3, Text, "Size"),
    ("TYER", V3, Text, "Year", "TDRC"),
    ("XDOR", V3, Text, "MusicBrainz original release date"),
    ("XSOA", V3, Text, "MusicBrainz album sort order"),
    ("XSOP", V3, Text, "MusicBrainz performer sort order"),
    ("XSOT", V3, Text, "MusicBrainz title sort order"),
    // ID3v2.3 and ID3v2.4
    ("AENC", V34, AudioEncryption, "Audio encryption"),
    ("APIC", V34, Picture, "Attached picture"),
    ("CHAP", V34, Chapter, "Chapter"),
    ("COMM", V34, LangDescText, "Comments"),
    ("COMR", V34, Binary, "Commercial frame"),
    ("CTOC", V34, ChapterToc, "Table of contents"),
    ("ENCR", V34, Registration, "Encryption method registration"),
    ("ETCO", V34, EventTiming, "Event timing codes"),
    ("GEOB", V34, EncapsulatedObject, "General encapsulated object"),
    ("GRID", V34, Registration, "Group identification registration"),
    ("GRP1", V34, Text, "Grouping"),
    ("LINK", V34, LinkedInfo, "Linked information"),
    ("MCDI", V34, Binary, "Music CD identifier"),
    ("MLLT", V34, Binary, "MPEG location lookup table"),
    ("MVIN", V34, Text, "Movement number"),
    ("MVNM", V34, Text, "Movement name"),
    ("OWNE", V34, Ownership, "Ownership frame"),
    ("PCNT", V34, Number, "Play counter"),
    ("PCST", V34, Number, "Podcast flag"),
    ("POPM", V34, Popularimeter, "Popularimeter"),
    ("POSS", V34, PositionSync, "Position synchronisation frame"),
    ("PRIV", V34, IdBinary, "Private frame"),
    ("RBUF", V34, BufferSize, "Recommended buffer size"),
    ("RVRB", V34, Binary, "Reverb"),
    ("SYLT", V34, SyncedLyrics, "Synchronised lyric/text"),
    ("SYTC", V34, Binary, "Synchronised tempo codes"),
    ("TALB", V34, Text, "Album/Movie/Show title"),
    ("TBPM", V34, Text, "BPM (beats per minute)"),
    ("TCMP", V34, Boolean, "iTunes compilation flag"),
    ("TCOM", V34, Text, "Composer"),
    ("TCON", V34, Text, "Content type"),
    ("TCOP", V34, Text, "Copyright message"),
    ("TDES", V34, Text, "Podcast description"),
    ("TDLY", V34, Text, "Playlist delay"),
    ("TENC", V34, Text, "Encoded by"),
    ("TEXT", V34, Text, "Lyricist/Text writer"),
    ("TFLT", V34, Text, "File type"),
    ("TGID", V34, Text, "Podcast identifier"),
    ("TIT1", V34, Text, "Content group description"),
    ("TIT2", V34, Text, "Title/songname/content description"),
    ("TIT3", V34, Text, "Subtitle/Description refinement"),
    ("TKEY", V34, Text, "Initial key"),
    ("TKWD", V34, Text, "Podcast keywords"),
    ("TLAN", V34, Text, "Language(s)"),
    ("TLEN", V34, Text, "Length"),
    ("TMED", V34, Text, "Media type"),
    ("TOAL", V34, Text, "Original album/movie/show title"),
    ("TOFN", V34, Text, "Original filename"),
    ("TOLY", V34, Text, "Original lyricist(s)/text writer(s)"),
    ("TOPE", V34, Text, "Original artist(s)/performer(s)"),
    ("TOWN", V34, Text, "File owner/licensee"),
    ("TPE1", V34, Text, "Lead performer(s)/Soloist(s)"),
    ("TPE2", V34, Text, "Band/orchestra/accompaniment"),
    ("TPE3", V34, Text, "Conductor/performer refinement"),
    ("TPE4", V34, Text, "Interpreted, remixed, or otherwise modified by"),
    ("TPOS", V34, Text, "Part of a set"),
    ("TPUB", V34, Text, "Publisher"),
    ("TRCK", V34, Text, "Track number/Position in set"),
    ("TRSN", V34, Text, "Internet radio station name"),
    ("TRSO", V34, Text, "Internet radio station owner"),
    ("TSO2", V34, Text, "iTunes album artist sort order"),
    ("TSOA", V34, Text, "Album sort order"),
    ("TSOC", V34, Text, "iTunes composer sort order"),
    ("TSOP", V34, Text, "Performer sort order"),
    ("TSOT", V34, Text, "Title sort order"),
    ("TSRC", V34, Text, "ISRC (international standard recording code)"),
    ("TSSE", V34, Text, "Software/Hardware and settings used for encoding"),
    ("TXXX", V34, IdText, "User defined text information frame"),
    ("UFID", V34, IdBinary, "Unique file identifier"),
    ("USER", V34, TermsOfUse, "Terms of use"),
    ("USLT", V34, LangDescText, "Unsynchronised lyric/text transcription"),
    ("WCOM", V34, Url, "Commercial information"),
    ("WCOP", V34, Url, "Copyright/Legal information"),
    ("WFED", V34, Text, "Podcast feed URL"),
    ("WOAF", V34, Url, "Official audio file webpage"),
    ("WOAR", V34, Url, "Official artist/performer webpage"),
    ("WOAS", V34, Url, "Official audio source webpage"),
    ("WORS", V34, Url, "Official Internet radio station homepage"),
    ("WPAY", V34, Url, "Payment"),
    ("WPUB", V34, Url, "Publishers official webpage"),
    ("WXXX", V34, IdUrl, "User defined URL link frame"),
    // ID3v2.4 only
    ("ASPI", V4, Binary, "Audio seek point index"),
    ("EQU2", V4, Binary, "Equalisation (2)"),
    ("RVA2", V4, VolumeAdjustment2, "Relative volume adjustment (2)"),
    ("SEEK", V4, Number, "Seek frame"),
    ("SIGN", V4, Binary, "Signature frame"),
    ("TDEN", V4, Text, "Encoding time"),
    ("TDOR", V4, Text, "Original release time"),
    ("TDRC", V4, Text, "Recording time"),
    ("TDRL", V4, Text, "Release time"),
    ("TDTG", V4, Text, "Tagging time"),
    ("TIPL", V4, Pairs, "Involved people list"),
    ("TMCL", V4, Pairs, "Musician credits list"),
    ("TMOO", V4, Text, "Mood"),
    ("TPRO", V4, Text, "Produced notice"),
    ("TSST", V4, Text, "Set subtitle"),
];

/// Whether the bytes following a family's first letter
/// are uppercase letters or digits, and not all `X`
fn is_family_suffix(suffix: &[u8]) -> bool {
    (2..=3).contains(&suffix.len())
        && suffix
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        && !suffix.iter().all(|b| *b == b'X')
}

/// Whether the ID belongs to the unknown text frame family
pub fn is_text_family(id: &[u8]) -> bool {
    matches!(id, [b'T', suffix @ ..] if is_family_suffix(suffix))
}

/// Whether the ID belongs to the unknown URL frame family
pub fn is_url_family(id: &[u8]) -> bool {
    matches!(id, [b'W', suffix @ ..] if is_family_suffix(suffix))
}

/// Drops a single trailing space or NUL from a raw frame ID
pub fn trim_id(id: &[u8]) -> &[u8] {
    match id {
        [rest @ .., b' ' | 0] => rest,
        id => id,
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    children: Vec<(u8, usize)>,
    def: Option<usize>,
}

/// A prefix tree over raw frame ID bytes
#[derive(Debug)]
struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    fn child(&self, node: usize, byte: u8) -> Option<usize> {
        self.nodes[node]
            .children
            .iter()
            .find_map(|(b, child)| (*b == byte).then_some(*child))
    }

    fn insert(&mut self, key: &[u8], def: usize) {
        let mut node = 0;
        for byte in key.iter().copied() {
            node = match self.child(node, byte) {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.push((byte, child));
                    child
                }
            };
        }
        self.nodes[node].def = Some(def);
    }

    fn get(&self, key: &[u8]) -> Option<usize> {
        key.iter()
            .try_fold(0, |node, byte| self.child(node, *byte))
            .and_then(|node| self.nodes[node].def)
    }
}

/// Frame definitions along with their lookup structures
///
/// Built once, explicitly, and then shared by reference
/// with everything that needs to look up frames.
///
/// # Example
/// ```
/// use id3_codec::id3v2::registry::Registry;
///
/// let registry = Registry::new();
///
/// assert_eq!(registry.find("TT2").upgrade, Some("TIT2"));
/// assert!(registry.is_valid_id(b"TIT2"));
/// assert!(registry.is_valid_id(b"TT2\0"));
/// assert!(registry.is_valid_id(b"TZZZ"));  // unknown text frame
/// assert!(!registry.is_valid_id(b"tit2"));
///
/// // the year frame changes its ID between versions
/// assert_eq!(registry.resolve_for_version("TYE", 4).map(|d| d.id), Some("TDRC"));
/// assert_eq!(registry.resolve_for_version("TDRC", 2).map(|d| d.id), Some("TYE"));
/// ```
#[derive(Debug)]
pub struct Registry {
    by_id: HashMap<&'static str, usize>,
    by_upgrade: HashMap<&'static str, usize>,
    trie: Trie,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Builds the lookup tables from [`FRAMES`]
    pub fn new() -> Self {
        let mut by_id = HashMap::with_capacity(FRAMES.len());
        let mut by_upgrade = HashMap::new();
        let mut trie = Trie::new();

        for (index, def) in FRAMES.iter().enumerate() {
            by_id.entry(def.id).or_insert(index);
            if let Some(upgrade) = def.upgrade {
                by_upgrade.entry(upgrade).or_insert(index);
            }
            trie.insert(def.id.as_bytes(), index);
        }

        Self {
            by_id,
            by_upgrade,
            trie,
        }
    }

    /// Every definition in the table
    pub fn frames(&self) -> &'static [FrameDef] {
        FRAMES
    }

    /// Looks up a definition from the table only
    pub fn get(&self, id: &str) -> Option<&'static FrameDef> {
        let id = id.strip_suffix([' ', '\0']).unwrap_or(id);
        self.by_id.get(id).map(|index| &FRAMES[*index])
    }

    /// Looks up a definition, falling back to the unknown families
    ///
    /// This never fails; IDs that match nothing at all
    /// are treated as opaque binary frames.
    pub fn find(&self, id: &str) -> &'static FrameDef {
        self.get(id).unwrap_or_else(|| {
            let id = trim_id(id.as_bytes());
            if is_text_family(id) {
                &UNKNOWN_TEXT
            } else if is_url_family(id) {
                &UNKNOWN_URL
            } else {
                &UNKNOWN_BINARY
            }
        })
    }

    /// The definition whose upgrade is the given ID
    pub fn downgrade(&self, id: &str) -> Option<&'static FrameDef> {
        self.by_upgrade.get(id).map(|index| &FRAMES[*index])
    }

    /// Whether raw bytes look like the start of a real frame
    ///
    /// Consults the table's prefix tree first,
    /// then the text and URL families.
    pub fn is_valid_id(&self, id: &[u8]) -> bool {
        let id = trim_id(id);
        self.trie.get(id).is_some() || is_text_family(id) || is_url_family(id)
    }

    /// Finds the definition to use when writing an ID
    /// into a tag of the given version
    ///
    /// If the ID's own definition doesn't apply to that version,
    /// the upgrade graph is walked forward (toward newer versions)
    /// or backward (toward older versions) until one does.
    /// Returns `None` if no such definition exists,
    /// in which case the frame can't be written to that version.
    ///
    /// Fallback definitions apply to every version.
    pub fn resolve_for_version(&self, id: &str, version: u8) -> Option<&'static FrameDef> {
        let mut def = self.find(id);
        let mut visited: Vec<&'static str> = Vec::new();

        loop {
            if def.versions.contains(version) {
                return Some(def);
            }
            if visited.contains(&def.id) {
                return None;
            }
            visited.push(def.id);

            def = if def.versions.newer_than(version) {
                self.downgrade(def.id)?
            } else if def.versions.older_than(version) {
                self.get(def.upgrade?)?
            } else {
                return None;
            };
        }
    }
}
