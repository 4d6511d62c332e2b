use id3_codec::synchsafe::{
    SYNCHSAFE_MAX, insert_unsync, needs_unsync, remove_unsync, synchsafe, synchsafe_u35,
    unsynchsafe, unsynchsafe_u35,
};

#[test]
fn test_synchsafe_roundtrip() {
    for x in [0, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, SYNCHSAFE_MAX] {
        assert_eq!(unsynchsafe(synchsafe(x)), x);
    }

    for _ in 0..10_000 {
        let x = fastrand::u32(0..=SYNCHSAFE_MAX);
        let encoded = synchsafe(x);
        assert!(encoded.to_be_bytes().iter().all(|b| *b < 0x80));
        assert_eq!(unsynchsafe(encoded), x);
    }
}

#[test]
fn test_synchsafe_wraps() {
    assert_eq!(synchsafe(0x1000_0000), 0);
    assert_eq!(synchsafe(0x1000_0001), 1);
    assert_eq!(synchsafe(u32::MAX), synchsafe(SYNCHSAFE_MAX));
    assert_eq!(unsynchsafe(synchsafe(0x1234_5678)), 0x0234_5678);

    // high bits of each byte are ignored when decoding
    assert_eq!(unsynchsafe(0xFFFF_FFFF), SYNCHSAFE_MAX);
}

#[test]
fn test_synchsafe_u35() {
    for x in [0, 1, 0x7F, 0x80, 0xDEAD_BEEF, u32::MAX] {
        let encoded = synchsafe_u35(x);
        assert!(encoded.iter().all(|b| *b < 0x80));
        assert_eq!(unsynchsafe_u35(encoded), x);
    }
    assert_eq!(synchsafe_u35(u32::MAX), [0x0F, 0x7F, 0x7F, 0x7F, 0x7F]);
}

#[test]
fn test_unsync_roundtrip() {
    let fixed: &[&[u8]] = &[
        &[],
        &[0xFF],
        &[0xFF, 0x00],
        &[0xFF, 0xFF, 0xFF],
        &[0xFF, 0xE0],
        &[0xFF, 0xDF],
        &[0x00, 0xFF, 0x00, 0x00],
        &[0xFF, 0xFB, 0x90, 0x64],
    ];

    for buf in fixed {
        assert_eq!(remove_unsync(&insert_unsync(buf)), buf.to_vec());
    }

    for _ in 0..1000 {
        // bias toward 0xFF so stuffing actually happens
        let buf: Vec<u8> = std::iter::repeat_with(|| match fastrand::u8(0..4) {
            0 => 0xFF,
            1 => 0x00,
            _ => fastrand::u8(..),
        })
        .take(fastrand::usize(0..64))
        .collect();

        let unsynced = insert_unsync(&buf);
        assert_eq!(remove_unsync(&unsynced), buf);

        // no false sync patterns survive
        assert!(
            unsynced
                .windows(2)
                .all(|pair| !(pair[0] == 0xFF && pair[1] >= 0xE0))
        );
    }
}

#[test]
fn test_unsync_stuffing() {
    assert_eq!(insert_unsync(&[0xFF, 0xE0]), [0xFF, 0x00, 0xE0]);
    assert_eq!(insert_unsync(&[0xFF, 0x00]), [0xFF, 0x00, 0x00]);
    assert_eq!(insert_unsync(&[0xFF, 0x10]), [0xFF, 0x10]);
    assert_eq!(insert_unsync(&[0x01, 0xFF]), [0x01, 0xFF, 0x00]);

    assert!(needs_unsync(&[0xFF, 0xFB]));
    assert!(!needs_unsync(&[0xFF, 0x10, 0x00]));

    // only the zero following a 0xFF is removed
    assert_eq!(remove_unsync(&[0x00, 0xFF, 0x00, 0x00]), [0x00, 0xFF, 0x00]);
}
