use id3_codec::Error;
use id3_codec::binary::Encoding;
use id3_codec::id3v2::registry::Registry;
use id3_codec::id3v2::value::{FrameValue, Pairs, ParseContext, Picture, Text, VolumeAdjustment2};
use id3_codec::id3v2::{ExtendedHeader, FormatFlags, Frame, Tag, WriteOptions, read_raw_frames};
use id3_codec::synchsafe::synchsafe;

fn frame_v2(id: &[u8; 3], payload: &[u8]) -> Vec<u8> {
    let mut bytes = id.to_vec();
    bytes.extend(&(payload.len() as u32).to_be_bytes()[1..]);
    bytes.extend(payload);
    bytes
}

fn frame_v3(id: &[u8; 4], flags: [u8; 2], payload: &[u8]) -> Vec<u8> {
    let mut bytes = id.to_vec();
    bytes.extend((payload.len() as u32).to_be_bytes());
    bytes.extend(flags);
    bytes.extend(payload);
    bytes
}

fn tag_bytes(version: u8, flags: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = b"ID3".to_vec();
    bytes.extend([version, 0, flags]);
    let size = match version {
        2 => body.len() as u32,
        _ => synchsafe(body.len() as u32),
    };
    bytes.extend(size.to_be_bytes());
    bytes.extend(body);
    bytes
}

fn ids(tag: &Tag) -> Vec<&str> {
    tag.frames.iter().map(|f| f.id.as_str()).collect()
}

fn lowercase_garbage() -> Vec<u8> {
    std::iter::repeat_with(|| fastrand::u8(b'a'..=b'z'))
        .take(fastrand::usize(1..16))
        .collect()
}

#[test]
fn test_v4_layout() {
    let registry = Registry::new();

    let mut tag = Tag::new(4);
    tag.frames.push(Frame::text("TIT2", "Title"));
    tag.frames.push(Frame::text("TPE1", "Artist"));

    let bytes = tag
        .to_bytes(4, &WriteOptions::default().padding(10), &registry)
        .unwrap();

    let mut expected = b"ID3\x04\x00\x00\x00\x00\x00\x2B".to_vec();
    expected.extend(b"TIT2\x00\x00\x00\x06\x00\x00\x03Title");
    expected.extend(b"TPE1\x00\x00\x00\x07\x00\x00\x03Artist");
    expected.extend([0; 10]);
    assert_eq!(bytes, expected);

    let parsed = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(parsed.header.version, 4);
    assert_eq!(parsed.header.size, 16 + 17 + 10);
    assert_eq!(parsed.total_size(), bytes.len() as u64);
    assert_eq!(parsed.padding, 10);
    assert_eq!(ids(&parsed), ["TIT2", "TPE1"]);
    assert_eq!(parsed.text("TIT2"), Some("Title"));
    assert_eq!(parsed.text("TPE1"), Some("Artist"));
    assert!(parsed.get("TIT2").unwrap().title.is_some());
    assert_eq!(
        parsed.get("TIT2").unwrap().value,
        FrameValue::Text(Text {
            encoding: Some(Encoding::Utf8),
            text: "Title".to_owned()
        })
    );
}

#[test]
fn test_rewrite_is_idempotent() {
    let registry = Registry::new();

    for version in 2..=4 {
        let mut tag = Tag::new(version);
        tag.set_text("TIT2", "Ünïcödé");
        tag.set_text("TALB", "Album");
        tag.frames.push(Frame::new(
            "APIC",
            FrameValue::Picture(Picture {
                mime_type: "image/png".to_owned(),
                data: vec![0x89, b'P', b'N', b'G', 0xFF, 0xFF],
                ..Picture::default()
            }),
        ));
        tag.frames.push(Frame::text("TZZZ", "unknown"));

        let options = WriteOptions::default().padding(64);
        let first = tag.to_bytes(version, &options, &registry).unwrap();
        let parsed = Tag::parse(&first, &registry).unwrap();
        assert_eq!(parsed.padding, 64);

        // padding carries over from the parsed tag
        let second = parsed
            .to_bytes(version, &WriteOptions::default(), &registry)
            .unwrap();
        assert_eq!(first, second, "ID3v2.{version}");
        assert_eq!(Tag::parse(&second, &registry).unwrap(), parsed);
    }
}

#[test]
fn test_version_mapping() {
    let registry = Registry::new();

    let mut tag = Tag::new(2);
    tag.frames.push(Frame::text("TT2", "Title"));
    tag.frames.push(Frame::text("TYE", "1999"));
    tag.frames.push(Frame::text("TP1", "Artist"));

    let v4 = Tag::parse(
        &tag.to_bytes(4, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v4), ["TIT2", "TDRC", "TPE1"]);
    assert_eq!(v4.text("TDRC"), Some("1999"));

    let v3 = Tag::parse(
        &v4.to_bytes(3, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v3), ["TIT2", "TYER", "TPE1"]);

    let v2 = Tag::parse(
        &v3.to_bytes(2, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v2), ["TT2", "TYE", "TP1"]);
    assert_eq!(v2.text("TT2"), Some("Title"));
}

#[test]
fn test_frames_without_equivalent_are_dropped() {
    let registry = Registry::new();

    let mut tag = Tag::new(4);
    tag.frames.push(Frame::new(
        "TIPL",
        FrameValue::Pairs(Pairs {
            encoding: None,
            pairs: vec![("producer".to_owned(), "Someone".to_owned())],
        }),
    ));
    tag.frames.push(Frame::new(
        "RVA2",
        FrameValue::VolumeAdjustment2(VolumeAdjustment2::default()),
    ));
    tag.frames.push(Frame::text("TZZZ", "unknown"));
    tag.frames.push(Frame::new(
        "APIC",
        FrameValue::Picture(Picture {
            mime_type: "image/png".to_owned(),
            ..Picture::default()
        }),
    ));

    let v3 = Tag::parse(
        &tag.to_bytes(3, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v3), ["IPLS", "TZZZ", "APIC"]);

    // four character IDs don't fit ID3v2.2
    let v2 = Tag::parse(
        &tag.to_bytes(2, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v2), ["IPL", "PIC"]);
    match &v2.frames[1].value {
        FrameValue::Picture(picture) => assert_eq!(picture.mime_type, "image/png"),
        other => panic!("unexpected value {other:?}"),
    }

    let mut tag = Tag::new(3);
    tag.frames.push(Frame::text("TDAT", "0101"));
    tag.frames.push(Frame::text("TIT2", "Title"));
    let v4 = Tag::parse(
        &tag.to_bytes(4, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v4), ["TIT2"]);
}

#[test]
fn test_resync_fixed() {
    let registry = Registry::new();

    let mut body = b"zz".to_vec();
    body.extend(frame_v3(b"TIT2", [0, 0], b"\0A"));
    body.extend(b"qqq");
    body.extend(frame_v3(b"TPE1", [0, 0], b"\0B"));
    body.extend([0; 10]);

    let tag = Tag::parse(&tag_bytes(3, 0, &body), &registry).unwrap();
    assert_eq!(ids(&tag), ["TIT2", "TPE1"]);
    assert_eq!(tag.text("TIT2"), Some("Aqqq"));
    assert_eq!(tag.text("TPE1"), Some("B"));
    assert_eq!(tag.padding, 10);
}

#[test]
fn test_resync_random() {
    let registry = Registry::new();

    for _ in 0..100 {
        let garbage = [
            lowercase_garbage(),
            lowercase_garbage(),
            lowercase_garbage(),
        ];

        let mut body = garbage[0].clone();
        body.extend(frame_v3(b"TIT2", [0, 0], b"\0A"));
        body.extend(&garbage[1]);
        body.extend(frame_v3(b"TPE1", [0, 0], b"\0B"));
        body.extend(&garbage[2]);
        body.extend(frame_v3(b"TALB", [0, 0], b"\0C"));

        let tag = Tag::parse(&tag_bytes(3, 0, &body), &registry).unwrap();
        assert_eq!(ids(&tag), ["TIT2", "TPE1", "TALB"]);

        // skipped bytes belong to the frame before them
        let expected = |prefix: &str, garbage: &[u8]| {
            format!("{prefix}{}", String::from_utf8_lossy(garbage))
        };
        assert_eq!(tag.text("TIT2").unwrap(), expected("A", &garbage[1]));
        assert_eq!(tag.text("TPE1").unwrap(), expected("B", &garbage[2]));
        assert_eq!(tag.text("TALB"), Some("C"));
        assert_eq!(tag.padding, 0);
    }
}

#[test]
fn test_raw_frames() {
    let registry = Registry::new();
    let ctx = ParseContext::new(2, &registry);

    let mut data = frame_v2(b"TT2", b"\0Title");
    data.extend(frame_v2(b"COM", b"\0engdesc\0text"));
    data.extend([0; 4]);

    let (frames, consumed) = read_raw_frames(&data, &ctx);
    assert_eq!(consumed, data.len() - 4);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].id, "TT2");
    assert_eq!(frames[0].offset, 0);
    assert_eq!(frames[0].size, 6);
    assert_eq!(frames[0].data, b"\0Title");
    assert_eq!(frames[1].id, "COM");
    assert_eq!(frames[1].offset, 12);

    // a declared size past the end is skipped over
    let mut data = frame_v3(b"TIT2", [0, 0], b"\0A");
    data[7] = 0x40;
    let (frames, _) = read_raw_frames(&data, &ParseContext::new(3, &registry));
    assert!(frames.is_empty());
}

#[test]
fn test_header_errors() {
    let registry = Registry::new();

    let mut bytes = tag_bytes(3, 0, &frame_v3(b"TIT2", [0, 0], b"\0A"));
    assert!(Tag::parse(&bytes, &registry).is_ok());

    bytes[2] = b'4';
    assert!(matches!(
        Tag::parse(&bytes, &registry),
        Err(Error::InvalidTagMarker)
    ));
    bytes[2] = b'3';

    bytes[3] = 5;
    assert!(matches!(
        Tag::parse(&bytes, &registry),
        Err(Error::UnsupportedVersion(5))
    ));
    bytes[3] = 3;

    bytes[4] = 0xFF;
    assert!(matches!(
        Tag::parse(&bytes, &registry),
        Err(Error::UnsupportedVersion(3))
    ));
    bytes[4] = 0;

    bytes[9] |= 0x80;
    assert!(matches!(
        Tag::parse(&bytes, &registry),
        Err(Error::InvalidTagSize)
    ));
    bytes[9] &= 0x7F;

    assert!(matches!(
        Tag::parse(&bytes[..bytes.len() - 1], &registry),
        Err(Error::UnexpectedEnd)
    ));

    let tag = Tag::new(4);
    assert!(matches!(
        tag.to_bytes(5, &WriteOptions::default(), &registry),
        Err(Error::UnsupportedVersion(5))
    ));
    assert!(matches!(
        tag.to_bytes(1, &WriteOptions::default(), &registry),
        Err(Error::UnsupportedVersion(1))
    ));
}

#[test]
fn test_grouping() {
    let registry = Registry::new();

    let grouped = Frame {
        format: FormatFlags {
            grouping: true,
            ..FormatFlags::default()
        },
        ..Frame::text("TIT2", "Title")
    };

    let mut tag = Tag::new(4);
    tag.frames.push(grouped.clone());
    for version in [3, 4] {
        assert!(matches!(
            tag.to_bytes(version, &WriteOptions::default(), &registry),
            Err(Error::MissingGroupId)
        ));
    }

    tag.frames[0].group_id = Some(0x42);
    for version in [3, 4] {
        let parsed = Tag::parse(
            &tag.to_bytes(version, &WriteOptions::default(), &registry)
                .unwrap(),
            &registry,
        )
        .unwrap();
        let frame = &parsed.frames[0];
        assert!(frame.format.grouping);
        assert_eq!(frame.group_id, Some(0x42));
        assert_eq!(frame.value.as_text(), Some("Title"));
    }

    // ID3v2.2 has no grouping
    let parsed = Tag::parse(
        &tag.to_bytes(2, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(parsed.frames[0].group_id, None);
    assert_eq!(parsed.text("TT2"), Some("Title"));
}

#[test]
fn test_extended_header_crc() {
    let registry = Registry::new();

    let mut tag = Tag::new(3);
    tag.extended = Some(ExtendedHeader {
        crc: Some(0),
        ..ExtendedHeader::default()
    });
    tag.set_text("TIT2", "Title");

    // ID3v2.3 covers the frames alone
    let bytes = tag
        .to_bytes(3, &WriteOptions::default().padding(4), &registry)
        .unwrap();
    assert_eq!(bytes[5], 0x40);
    let mut crc = flate2::Crc::new();
    crc.update(&bytes[24..bytes.len() - 4]);

    let parsed = Tag::parse(&bytes, &registry).unwrap();
    let extended = parsed.extended.unwrap();
    assert_eq!(extended.crc, Some(crc.sum()));
    assert_eq!(extended.padding_size, 4);
    assert_eq!(parsed.padding, 4);
    assert_eq!(parsed.text("TIT2"), Some("Title"));

    // ID3v2.4 covers the padding too
    let bytes = tag
        .to_bytes(4, &WriteOptions::default().padding(4), &registry)
        .unwrap();
    let mut crc = flate2::Crc::new();
    crc.update(&bytes[22..]);

    let parsed = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(parsed.extended.unwrap().crc, Some(crc.sum()));
    assert_eq!(parsed.text("TIT2"), Some("Title"));

    // mismatches are tolerated
    let mut corrupt = bytes.clone();
    let last = corrupt.len() - 5;
    corrupt[last] = b'X';
    let parsed = Tag::parse(&corrupt, &registry).unwrap();
    assert_eq!(parsed.text("TIT2"), Some("TitlX"));
}

#[test]
fn test_extended_header_fields() {
    let registry = Registry::new();

    let mut tag = Tag::new(4);
    tag.extended = Some(ExtendedHeader {
        update: true,
        restrictions: Some(0x12),
        ..ExtendedHeader::default()
    });
    tag.set_text("TIT2", "Title");

    let bytes = tag
        .to_bytes(4, &WriteOptions::default(), &registry)
        .unwrap();
    let parsed = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(parsed.extended, tag.extended);
    assert_eq!(parsed.text("TIT2"), Some("Title"));

    // an extended header too short for its fields
    let mut body = vec![0, 0, 0, 6, 1, 0x20, 5];
    body.extend(frame_v3(b"TIT2", [0, 0], b"\0A"));
    assert!(matches!(
        Tag::parse(&tag_bytes(4, 0x40, &body), &registry),
        Err(Error::InvalidExtendedHeader)
    ));
}

#[test]
fn test_footer() {
    let registry = Registry::new();

    let mut tag = Tag::new(4);
    tag.header.flags.footer = true;
    tag.set_text("TIT2", "Title");

    // padding is never written along with a footer
    let bytes = tag
        .to_bytes(4, &WriteOptions::default().padding(10), &registry)
        .unwrap();
    assert_eq!(bytes.len(), 10 + 16 + 10);
    assert_eq!(bytes[5], 0x10);
    assert_eq!(&bytes[26..29], b"3DI");
    assert_eq!(bytes[29..], bytes[3..10]);

    let parsed = Tag::parse(&bytes, &registry).unwrap();
    assert!(parsed.header.flags.footer);
    assert_eq!(parsed.total_size(), bytes.len() as u64);
    assert_eq!(parsed.padding, 0);
    assert_eq!(parsed.text("TIT2"), Some("Title"));

    // only ID3v2.4 has footers
    let bytes = tag
        .to_bytes(3, &WriteOptions::default(), &registry)
        .unwrap();
    assert_eq!(bytes[5], 0);
}

#[test]
fn test_compression() {
    let registry = Registry::new();
    let text = "la".repeat(500);

    let mut tag = Tag::new(4);
    tag.set_text("TIT2", text.as_str());

    for version in [3, 4] {
        let bytes = tag
            .to_bytes(version, &WriteOptions::default().compression(true), &registry)
            .unwrap();
        assert!(bytes.len() < 500);

        let parsed = Tag::parse(&bytes, &registry).unwrap();
        let frame = parsed.get("TIT2").unwrap();
        assert!(frame.is_valid());
        assert!(frame.format.compression);
        assert_eq!(frame.format.data_length_indicator, version == 4);
        assert_eq!(frame.value.as_text(), Some(text.as_str()));

        // compression carries over on rewrite
        let again = parsed
            .to_bytes(version, &WriteOptions::default(), &registry)
            .unwrap();
        assert_eq!(again, bytes);
    }
}

#[test]
fn test_raw_deflate_frame() {
    use std::io::Write;

    let registry = Registry::new();

    let mut encoder =
        flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"\0deflated").unwrap();
    let mut payload = 9u32.to_be_bytes().to_vec();
    payload.extend(encoder.finish().unwrap());

    let bytes = tag_bytes(3, 0, &frame_v3(b"TIT2", [0, 0x80], &payload));
    let tag = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(tag.text("TIT2"), Some("deflated"));

    // data which inflates neither way
    let bytes = tag_bytes(3, 0, &frame_v3(b"TIT2", [0, 0x80], &[0, 0, 0, 9, 0xFF, 0xFF]));
    let tag = Tag::parse(&bytes, &registry).unwrap();
    assert!(!tag.frames[0].is_valid());
}

#[test]
fn test_unsynchronisation() {
    let registry = Registry::new();

    // sized so the ID3v2.3 frame header holds a 0xFF byte
    let data: Vec<u8> = [0xFF, 0xE0].repeat(121);
    let mut tag = Tag::new(3);
    tag.frames.push(Frame::new(
        "APIC",
        FrameValue::Picture(Picture {
            encoding: Some(Encoding::Latin1),
            mime_type: "image/png".to_owned(),
            data: data.clone(),
            ..Picture::default()
        }),
    ));

    for version in [3, 4] {
        let bytes = tag
            .to_bytes(version, &WriteOptions::default().unsynchronisation(true), &registry)
            .unwrap();
        assert_eq!(bytes[5] & 0x80, 0x80);
        assert!(
            bytes[10..]
                .windows(2)
                .all(|pair| !(pair[0] == 0xFF && pair[1] >= 0xE0))
        );

        let parsed = Tag::parse(&bytes, &registry).unwrap();
        assert!(parsed.header.flags.unsynchronisation);
        let frame = parsed.get("APIC").unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.format.unsynchronisation, version == 4);
        match &frame.value {
            FrameValue::Picture(picture) => assert_eq!(picture.data, data),
            other => panic!("unexpected value {other:?}"),
        }
    }

    // nothing to protect, so no flag
    let mut plain = Tag::new(3);
    plain.set_text("TIT2", "Title");
    let bytes = plain
        .to_bytes(3, &WriteOptions::default().unsynchronisation(true), &registry)
        .unwrap();
    assert_eq!(bytes[5], 0);
}

#[test]
fn test_invalid_frames_preserved() {
    let registry = Registry::new();

    let mut body = frame_v3(b"TIT2", [0, 0], &[5, b'x']);
    body.extend(frame_v3(b"TALB", [0, 0x40], b"\x01encrypted"));
    body.extend(frame_v3(b"TPE1", [0, 0], b"\0B"));
    body.extend([0; 4]);
    let bytes = tag_bytes(3, 0, &body);

    let tag = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(ids(&tag), ["TIT2", "TALB", "TPE1"]);

    let title = tag.get("TIT2").unwrap();
    assert!(!title.is_valid());
    assert_eq!(title.value, FrameValue::Binary(vec![5, b'x']));
    assert_eq!(
        title.invalid.as_ref().unwrap().reason,
        Error::InvalidTextEncoding(5).to_string()
    );

    let album = tag.get("TALB").unwrap();
    assert!(!album.is_valid());
    assert!(album.format.encryption);
    assert_eq!(
        album.invalid.as_ref().unwrap().reason,
        Error::EncryptedFrame.to_string()
    );

    // written back verbatim to the same version
    assert_eq!(
        tag.to_bytes(3, &WriteOptions::default(), &registry)
            .unwrap(),
        bytes
    );

    // and dropped from any other
    let v4 = Tag::parse(
        &tag.to_bytes(4, &WriteOptions::default(), &registry).unwrap(),
        &registry,
    )
    .unwrap();
    assert_eq!(ids(&v4), ["TPE1"]);
}

#[test]
fn test_v2_plain_size() {
    let registry = Registry::new();

    // 256 bytes, which isn't a valid synchsafe value
    let mut payload = b"\0".to_vec();
    payload.resize(250, b'x');
    let body = frame_v2(b"TT2", &payload);
    assert_eq!(body.len(), 256);

    let bytes = tag_bytes(2, 0, &body);
    assert_eq!(&bytes[6..10], &[0x00, 0x00, 0x01, 0x00]);

    let tag = Tag::parse(&bytes, &registry).unwrap();
    assert_eq!(tag.header.size, 256);
    assert_eq!(tag.header.raw_size, 0x100);
    assert_eq!(tag.header.synchsafe_size, 0x80);
    assert_eq!(tag.total_size(), 266);
    assert_eq!(tag.text("TT2"), Some("x".repeat(249).as_str()));
    assert_eq!(tag.padding, 0);

    // and written back the same way
    let written = tag.to_bytes(2, &WriteOptions::default(), &registry).unwrap();
    assert_eq!(written, bytes);

    // later versions still require synchsafe sizes
    let mut bytes = tag_bytes(3, 0, &frame_v3(b"TIT2", [0, 0], &payload));
    bytes[8] = 0x01;
    bytes[9] = 0x80;
    assert!(matches!(
        Tag::parse(&bytes, &registry),
        Err(Error::InvalidTagSize)
    ));
}

#[test]
fn test_resync_under_unsynchronisation() {
    let registry = Registry::new();

    // skipped bytes can never hold 0x00, which would be taken as padding
    let mut body = frame_v3(b"TIT2", [0, 0], b"\0Ti");
    body.extend(b"q\xFFq");
    body.extend(frame_v3(b"TPE1", [0, 0], b"\0A"));

    let tag = Tag::parse(&tag_bytes(3, 0x80, &body), &registry).unwrap();
    assert!(tag.header.flags.unsynchronisation);
    assert_eq!(ids(&tag), ["TIT2", "TPE1"]);
    assert_eq!(tag.text("TIT2"), Some("Tiq\u{FF}q"));
    assert_eq!(tag.text("TPE1"), Some("A"));
}

#[test]
fn test_oversized_volume_adjustment() {
    let registry = Registry::new();

    let mut payload = vec![0, 64, 0x80, 0, 0, 0, 0, 0, 0, 0];
    payload.resize(2 + 4 * 8, 0);
    let mut body = frame_v3(b"RVAD", [0, 0], &payload);
    body.extend(frame_v3(b"TIT2", [0, 0], b"\0Title"));

    let tag = Tag::parse(&tag_bytes(3, 0, &body), &registry).unwrap();
    assert_eq!(ids(&tag), ["RVAD", "TIT2"]);

    let invalid = tag.frames[0].invalid.as_ref().unwrap();
    assert_eq!(invalid.reason, Error::ExcessiveValue.to_string());
    assert_eq!(invalid.raw, payload);
    assert_eq!(tag.text("TIT2"), Some("Title"));
}

#[test]
fn test_compressed_v2_tag() {
    let registry = Registry::new();

    let body = frame_v2(b"TT2", b"\0Title");
    let tag = Tag::parse(&tag_bytes(2, 0x40, &body), &registry).unwrap();
    assert!(tag.header.flags.compression);
    assert!(tag.frames.is_empty());
    assert_eq!(tag.padding as usize, body.len());
}

#[test]
fn test_tag_helpers() {
    let mut tag = Tag::new(4);
    tag.set_text("TIT2", "first");
    tag.frames.push(Frame::text("TXXX", "a"));
    tag.frames.push(Frame::text("TXXX", "b"));
    tag.set_text("TIT2", "second");

    assert_eq!(tag.text("TIT2"), Some("second"));
    assert_eq!(tag.frames.iter().filter(|f| f.id == "TIT2").count(), 1);
    assert_eq!(tag.remove("TXXX"), 2);
    assert_eq!(tag.remove("TXXX"), 0);
    assert!(tag.get("TXXX").is_none());
    assert_eq!(tag.text("TPE1"), None);
}
