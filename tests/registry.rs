use id3_codec::id3v2::registry::{Registry, Versions, is_text_family, is_url_family, trim_id};
use id3_codec::id3v2::value::Codec;
use std::collections::HashSet;

#[test]
fn test_lookup() {
    let registry = Registry::new();

    let title = registry.get("TIT2").unwrap();
    assert_eq!(title.codec, Codec::Text);
    assert!(title.versions.contains(3));
    assert!(title.versions.contains(4));
    assert!(!title.versions.contains(2));

    assert_eq!(registry.get("APIC").unwrap().codec, Codec::Picture);
    assert_eq!(registry.get("PIC").unwrap().codec, Codec::Picture);
    assert_eq!(registry.get("TXXX").unwrap().codec, Codec::IdText);
    assert_eq!(registry.get("CHAP").unwrap().codec, Codec::Chapter);

    // a single trailing space or NUL is ignored
    assert_eq!(registry.get("TAL ").unwrap().id, "TAL");
    assert_eq!(registry.get("TAL\0").unwrap().id, "TAL");

    assert!(registry.get("ZZZZ").is_none());
}

#[test]
fn test_fallback_families() {
    let registry = Registry::new();

    let text = registry.find("TZZZ");
    assert!(!text.is_known());
    assert_eq!(text.codec, Codec::Text);
    assert_eq!(text.known_title(), None);

    assert_eq!(registry.find("WZZ9").codec, Codec::Url);
    assert_eq!(registry.find("ZZZZ").codec, Codec::Binary);

    assert!(is_text_family(b"TAB"));
    assert!(is_text_family(b"TAB1"));
    assert!(!is_text_family(b"TXX"));
    assert!(!is_text_family(b"Tab1"));
    assert!(!is_text_family(b"TABCD"));
    assert!(is_url_family(b"WABC"));
    assert!(!is_url_family(b"TABC"));

    assert_eq!(trim_id(b"TT2 "), b"TT2");
    assert_eq!(trim_id(b"TIT2"), b"TIT2");
}

#[test]
fn test_valid_ids() {
    let registry = Registry::new();

    for def in registry.frames() {
        assert!(registry.is_valid_id(def.id.as_bytes()), "{}", def.id);
    }

    assert!(registry.is_valid_id(b"TZZZ"));
    assert!(registry.is_valid_id(b"WZZZ"));
    assert!(!registry.is_valid_id(b"ZZZZ"));
    assert!(!registry.is_valid_id(b"tit2"));
    assert!(!registry.is_valid_id(b"\xFF\xFB\x90\x64"));
    assert!(!registry.is_valid_id(b"\0\0\0\0"));
}

#[test]
fn test_table_consistency() {
    let registry = Registry::new();
    let mut ids = HashSet::new();
    let mut upgrades = HashSet::new();

    for def in registry.frames() {
        assert!(ids.insert(def.id), "duplicate ID {}", def.id);
        assert!(def.versions.lowest().is_some(), "{} has no versions", def.id);

        let expected_len = match def.versions {
            Versions::V2 => 3,
            _ => 4,
        };
        assert_eq!(def.id.len(), expected_len, "{}", def.id);

        if let Some(upgrade) = def.upgrade {
            assert!(upgrades.insert(upgrade), "duplicate upgrade {upgrade}");
            let target = registry.get(upgrade).unwrap();
            assert!(
                target.versions.lowest() > def.versions.highest(),
                "{} upgrades to {upgrade}",
                def.id
            );
            assert_eq!(registry.downgrade(upgrade).unwrap().id, def.id);
        }
    }
}

#[test]
fn test_version_mapping_roundtrip() {
    let registry = Registry::new();

    for def in registry.frames().iter().filter(|d| d.upgrade.is_some()) {
        let lowest = def.versions.lowest().unwrap();

        // the newest version the frame can reach
        let (newest, mapped) = (lowest + 1..=4)
            .rev()
            .find_map(|v| registry.resolve_for_version(def.id, v).map(|m| (v, m)))
            .unwrap_or_else(|| panic!("{} can't be upgraded", def.id));
        assert!(mapped.versions.contains(newest));

        let back = registry.resolve_for_version(mapped.id, lowest).unwrap();
        assert_eq!(back.id, def.id);
    }
}

#[test]
fn test_version_mapping() {
    let registry = Registry::new();
    let resolve = |id, version| registry.resolve_for_version(id, version).map(|d| d.id);

    assert_eq!(resolve("TT2", 3), Some("TIT2"));
    assert_eq!(resolve("TT2", 4), Some("TIT2"));
    assert_eq!(resolve("TIT2", 2), Some("TT2"));
    assert_eq!(resolve("TYE", 4), Some("TDRC"));
    assert_eq!(resolve("TYER", 4), Some("TDRC"));
    assert_eq!(resolve("TDRC", 3), Some("TYER"));
    assert_eq!(resolve("IPLS", 4), Some("TIPL"));

    // no equivalent exists
    assert_eq!(resolve("RVAD", 4), None);
    assert_eq!(resolve("RVA2", 3), None);
    assert_eq!(resolve("TDAT", 4), None);

    // already fine as-is
    assert_eq!(resolve("TALB", 3), Some("TALB"));

    // fallback definitions fit any version
    assert_eq!(resolve("TZZZ", 4), Some(""));
}
