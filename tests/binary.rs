use id3_codec::Error;
use id3_codec::binary::{Encoding, Reader, Writer};

#[test]
fn test_integers() {
    let mut w = Writer::new();
    w.write_u8(0x12).unwrap();
    w.write_u16(0x3456).unwrap();
    w.write_u24(0x789ABC).unwrap();
    w.write_u32(0xDEADBEEF).unwrap();
    w.write_i16(-2).unwrap();
    w.write_synchsafe(0x80).unwrap();
    w.write_uint(0x0102, 2).unwrap();
    let bytes = w.into_inner();

    assert_eq!(
        bytes,
        [
            0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFE, 0x00, 0x00,
            0x01, 0x00, 0x01, 0x02
        ]
    );

    let mut r = Reader::new(&bytes);
    assert_eq!(r.read_u8().unwrap(), 0x12);
    assert_eq!(r.read_u16().unwrap(), 0x3456);
    assert_eq!(r.read_u24().unwrap(), 0x789ABC);
    assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
    assert_eq!(r.read_i16().unwrap(), -2);
    assert_eq!(r.read_synchsafe().unwrap(), 0x80);
    assert_eq!(r.read_uint(2).unwrap(), 0x0102);
    assert!(r.is_empty());
    assert!(matches!(r.read_u8(), Err(Error::UnexpectedEnd)));
}

#[test]
fn test_value_limits() {
    let mut w = Writer::new();
    assert!(matches!(w.write_uint(0x100, 1), Err(Error::ExcessiveValue)));
    assert!(matches!(w.write_uint(1, 5), Err(Error::ExcessiveValue)));
    assert!(matches!(
        w.write_synchsafe(0x1000_0000),
        Err(Error::ExcessiveValue)
    ));
    assert!(w.is_empty());
}

#[test]
fn test_positioning() {
    let data = [1, 2, 3, 4, 5];
    let mut r = Reader::new(&data);

    assert_eq!(r.peek(2), Some([1, 2].as_slice()));
    assert_eq!(r.read_bytes(3).unwrap(), [1, 2, 3]);
    assert_eq!(r.position(), 3);
    assert_eq!(r.remaining(), 2);

    r.rewind(2);
    assert_eq!(r.position(), 1);
    r.rewind(10);
    assert_eq!(r.position(), 0);

    r.seek(4).unwrap();
    assert_eq!(r.read_rest(), [5]);
    assert!(matches!(r.seek(6), Err(Error::UnexpectedEnd)));
    assert!(r.peek(1).is_none());
}

#[test]
fn test_flags() {
    let mut w = Writer::new();
    w.write_flags([true, false, true, false, false, false, false, true])
        .unwrap();
    assert_eq!(w.as_slice(), [0b1010_0001]);

    let mut r = Reader::new(w.as_slice());
    assert_eq!(
        r.read_flags().unwrap(),
        [true, false, true, false, false, false, false, true]
    );
}

#[test]
fn test_encoding_table() {
    assert_eq!(Encoding::from_byte(0, 3).unwrap(), Encoding::Latin1);
    assert_eq!(Encoding::from_byte(1, 2).unwrap(), Encoding::Utf16);
    assert_eq!(Encoding::from_byte(3, 4).unwrap(), Encoding::Utf8);
    assert!(matches!(
        Encoding::from_byte(3, 3),
        Err(Error::InvalidTextEncoding(3))
    ));
    assert!(matches!(
        Encoding::from_byte(4, 4),
        Err(Error::InvalidTextEncoding(4))
    ));

    assert_eq!(Encoding::Utf8.for_version(4), Encoding::Utf8);
    assert_eq!(Encoding::Utf8.for_version(3), Encoding::Utf16);
    assert_eq!(Encoding::Utf16Be.for_version(2), Encoding::Utf16);
    assert_eq!(Encoding::Latin1.for_version(2), Encoding::Latin1);
}

#[test]
fn test_strings() {
    for encoding in Encoding::ALL {
        for text in ["", "ASCII text", "Ünïcödé", "日本語のテキスト"] {
            if encoding == Encoding::Latin1 && !text.chars().all(|c| u32::from(c) < 0x100) {
                continue;
            }

            let mut w = Writer::new();
            w.write_string(encoding, text, true).unwrap();
            w.write_string(encoding, "after", false).unwrap();
            let bytes = w.into_inner();

            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_string(encoding).unwrap(), text, "{encoding}");
            assert_eq!(r.read_string_to_end(encoding).unwrap(), "after");
        }
    }
}

#[test]
fn test_utf16_byte_order() {
    assert_eq!(Encoding::Utf16.encode("A"), [0xFF, 0xFE, 0x41, 0x00]);
    assert_eq!(Encoding::Utf16Be.encode("A"), [0x00, 0x41]);

    // either byte order mark is honored
    assert_eq!(Encoding::Utf16.decode(&[0xFE, 0xFF, 0x00, 0x41]), "A");
    assert_eq!(Encoding::Utf16.decode(&[0xFF, 0xFE, 0x41, 0x00]), "A");

    // UTF-16 terminators are aligned to code units
    let mut r = Reader::new(&[0x00, 0x41, 0x01, 0x00, 0x00, 0x00, 0x00, 0x42]);
    assert_eq!(r.read_string(Encoding::Utf16Be).unwrap(), "A\u{100}");
    assert_eq!(r.read_string(Encoding::Utf16Be).unwrap(), "B");
}

#[test]
fn test_multiple_values() {
    let mut w = Writer::new();
    w.write_string(Encoding::Utf8, "Rock\0Pop", false).unwrap();
    assert_eq!(w.as_slice(), b"Rock\0Pop");

    // trailing terminators are dropped
    let mut r = Reader::new(b"Rock\0Pop\0\0");
    assert_eq!(r.read_string_to_end(Encoding::Utf8).unwrap(), "Rock\0Pop");
}

#[test]
fn test_fixed_strings() {
    let mut w = Writer::new();
    w.write_fixed_string("en", 3).unwrap();
    w.write_fixed_string("toolong", 3).unwrap();
    assert_eq!(w.as_slice(), b"en\0too");

    let mut r = Reader::new(b"eng  \0xy");
    assert_eq!(r.read_fixed_string(8).unwrap(), "eng");
}
