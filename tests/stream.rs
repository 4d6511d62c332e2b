use id3_codec::stream::{ByteSink, ByteStream};

fn random_bytes(len: usize) -> Vec<u8> {
    std::iter::repeat_with(|| fastrand::u8(..))
        .take(len)
        .collect()
}

#[tokio::test]
async fn test_chunked_reads() {
    let data = random_bytes(1000);

    for chunk_size in [1, 7, 64, 1000, 4096] {
        let mut stream = ByteStream::with_chunk_size(data.as_slice(), chunk_size);
        let mut output = Vec::new();
        loop {
            let bytes = stream.read(33).await.unwrap();
            if bytes.is_empty() {
                break;
            }
            output.extend(bytes);
        }
        assert_eq!(output, data);
        assert_eq!(stream.position(), 1000);
        assert!(stream.is_finished());
    }
}

#[tokio::test]
async fn test_short_read_at_end() {
    let data = [1, 2, 3];
    let mut stream = ByteStream::with_chunk_size(data.as_slice(), 2);
    assert_eq!(stream.read(2).await.unwrap(), [1, 2]);
    assert_eq!(stream.read(10).await.unwrap(), [3]);
    assert!(stream.read(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pull_on_demand() {
    let data = random_bytes(100);
    let mut stream = ByteStream::with_chunk_size(data.as_slice(), 10);
    assert_eq!(stream.buffered(), 0);

    stream.read(5).await.unwrap();
    assert_eq!(stream.buffered(), 5);

    // satisfied from the buffer, so nothing more is pulled
    stream.read(5).await.unwrap();
    assert_eq!(stream.buffered(), 0);
}

#[tokio::test]
async fn test_unshift() {
    let mut stream = ByteStream::with_chunk_size(b"abcdef".as_slice(), 4);
    let bytes = stream.read(3).await.unwrap();
    assert_eq!(bytes, b"abc");
    assert_eq!(stream.position(), 3);

    stream.unshift(bytes[1..].to_vec());
    assert_eq!(stream.position(), 1);
    assert_eq!(stream.read_to_end().await.unwrap(), b"bcdef");
}

#[tokio::test]
async fn test_skip() {
    let data = random_bytes(500);
    let mut stream = ByteStream::with_chunk_size(data.as_slice(), 16);
    assert_eq!(stream.skip(250).await.unwrap(), 250);
    assert_eq!(stream.read(10).await.unwrap(), &data[250..260]);
    assert_eq!(stream.skip(1000).await.unwrap(), 240);
    assert!(stream.is_finished());
}

#[tokio::test]
async fn test_scan_across_chunks() {
    let mut data = vec![0; 1000];
    data[500..503].copy_from_slice(b"ID3");

    // every chunk size splits the marker differently
    for chunk_size in 1..8 {
        let mut stream = ByteStream::with_chunk_size(data.as_slice(), chunk_size);
        assert_eq!(stream.scan(b"ID3").await.unwrap(), Some(500));
        assert_eq!(stream.read(3).await.unwrap(), b"ID3");
        assert_eq!(stream.scan(b"ID3").await.unwrap(), None);
        assert!(stream.is_finished());
    }
}

#[tokio::test]
async fn test_close() {
    let data = [0; 100];
    let mut stream = ByteStream::with_chunk_size(data.as_slice(), 10);
    stream.read(5).await.unwrap();
    stream.close();
    assert!(stream.is_finished());
    assert!(stream.read(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sink_backpressure() {
    let mut sink = ByteSink::with_high_water(Vec::new(), 8);
    sink.write(b"abcd").await.unwrap();
    assert!(!sink.is_saturated());
    assert_eq!(sink.position(), 4);

    // reaching the high-water mark drains everything
    sink.write(b"efghij").await.unwrap();
    assert!(!sink.is_saturated());
    assert_eq!(sink.position(), 10);

    sink.write(b"k").await.unwrap();
    assert_eq!(sink.finish().await.unwrap(), b"abcdefghijk");
}

#[tokio::test]
async fn test_pipe() {
    let data = random_bytes(200_000);
    let mut stream = ByteStream::with_chunk_size(data.as_slice(), 1000);
    stream.skip(100).await.unwrap();

    let mut sink = ByteSink::new(Vec::new());
    sink.write(b"head").await.unwrap();
    assert_eq!(sink.pipe(&mut stream).await.unwrap(), 199_900);

    let output = sink.finish().await.unwrap();
    assert_eq!(&output[..4], b"head");
    assert_eq!(&output[4..], &data[100..]);
}
