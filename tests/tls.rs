mod common;

use annals::{SessionEnd, handle_client};
use common::*;
use rcgen::{CertifiedKey, generate_simple_self_signed};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector, rustls};

fn make_tls_pair() -> (TlsAcceptor, rustls::Certificate) {
    let CertifiedKey { cert, signing_key } =
        generate_simple_self_signed(["localhost".to_string()]).unwrap();
    let cert_der = cert.der().to_vec();
    let key = signing_key.serialize_der();
    let server_config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(
            vec![rustls::Certificate(cert_der.clone())],
            rustls::PrivateKey(key),
        )
        .unwrap();
    (
        TlsAcceptor::from(Arc::new(server_config)),
        rustls::Certificate(cert_der),
    )
}

fn make_connector(cert: &rustls::Certificate) -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert).unwrap();
    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[tokio::test]
async fn implicit_tls_session() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["body"]).await;
    let (acceptor, cert) = make_tls_pair();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (sock, peer) = listener.accept().await.unwrap();
        // handshake before the greeting
        let stream = acceptor.accept(sock).await.unwrap();
        let _ = handle_client(stream, engine, true, peer.ip().is_loopback(), false).await;
    });

    let connector = make_connector(&cert);
    let stream = TcpStream::connect(addr).await.unwrap();
    let server_name = rustls::ServerName::try_from("localhost").unwrap();
    let tls = connector.connect(server_name, stream).await.unwrap();
    let mut stream = BufReader::new(tls);

    let mut line = String::new();
    stream.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("200"));

    stream.write_all(b"GROUP comp.test\r\n").await.unwrap();
    line.clear();
    stream.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("211 1"));

    stream.write_all(b"QUIT\r\n").await.unwrap();
    line.clear();
    stream.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("205"));
}

#[tokio::test]
async fn starttls_upgrade_in_place() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["body"]).await;
    let (acceptor, cert) = make_tls_pair();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (sock, peer) = listener.accept().await.unwrap();
        let loopback = peer.ip().is_loopback();
        match handle_client(sock, engine.clone(), false, loopback, true).await {
            Ok(SessionEnd::UpgradeTls(sock)) => {
                let stream = acceptor.accept(sock).await.unwrap();
                let _ = handle_client(stream, engine, true, loopback, false).await;
            }
            other => panic!("expected STARTTLS upgrade, got {:?}", other.is_err()),
        }
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut plain = BufReader::new(stream);
    let mut line = String::new();
    plain.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("200"));

    plain.write_all(b"STARTTLS\r\n").await.unwrap();
    line.clear();
    plain.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("382"));

    // upgrade the same socket and expect a fresh greeting over TLS
    let connector = make_connector(&cert);
    let server_name = rustls::ServerName::try_from("localhost").unwrap();
    let tls = connector
        .connect(server_name, plain.into_inner())
        .await
        .unwrap();
    let mut stream = BufReader::new(tls);

    line.clear();
    stream.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("200"));

    stream.write_all(b"GROUP comp.test\r\n").await.unwrap();
    line.clear();
    stream.read_line(&mut line).await.unwrap();
    assert!(line.starts_with("211 1"));
}

#[tokio::test]
async fn starttls_refused_when_unavailable() {
    let engine = memory_engine().await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"STARTTLS\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("580"));

    // the session continues in cleartext
    writer.write_all(b"DATE\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("111"));
}
