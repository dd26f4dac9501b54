mod common;

use common::*;
use flate2::read::GzDecoder;
use std::io::Read;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn xfeature_negotiation() {
    let engine = memory_engine().await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer
        .write_all(b"XFEATURE COMPRESS GZIP TERMINATOR\r\n")
        .await
        .unwrap();
    assert!(read_line(&mut reader).await.starts_with("290"));

    writer.write_all(b"XFEATURE COMPRESS LZW\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));
}

#[tokio::test]
async fn gzip_framed_overview_decompresses_to_plain_protocol() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["alpha", "beta"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    // capture the uncompressed body first
    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;
    writer.write_all(b"OVER 1-2\r\n").await.unwrap();
    read_line(&mut reader).await;
    let plain_rows = read_multiline(&mut reader).await;
    assert_eq!(plain_rows.len(), 2);
    let mut plain_wire = String::new();
    for row in &plain_rows {
        plain_wire.push_str(row);
        plain_wire.push_str("\r\n");
    }
    plain_wire.push_str(".\r\n");

    // negotiate compression and repeat; the body arrives as one gzip stream
    writer
        .write_all(b"XFEATURE COMPRESS GZIP TERMINATOR\r\n")
        .await
        .unwrap();
    assert!(read_line(&mut reader).await.starts_with("290"));

    writer.write_all(b"OVER 1-2\r\n").await.unwrap();
    let status = read_line(&mut reader).await;
    assert!(status.starts_with("224"));

    // close the write side so the remaining bytes are bounded
    writer.write_all(b"QUIT\r\n").await.unwrap();
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();

    // the gzip member ends before the QUIT response
    let mut decoder = GzDecoder::new(&rest[..]);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).unwrap();
    assert_eq!(String::from_utf8(decompressed).unwrap(), plain_wire);
}
