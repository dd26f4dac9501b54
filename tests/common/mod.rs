#![allow(dead_code)]

use annals::auth::{Directory, DynDirectory, sqlite::SqliteDirectory};
use annals::config::Config;
use annals::models::{Article, Capabilities, Newsgroup};
use annals::storage::{DynStore, GroupPost, Store, sqlite::SqliteStore};
use annals::{Engine, handle_client, parse_article};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Engine over fresh in-memory databases.
pub async fn memory_engine() -> Engine {
    memory_engine_with("site_name = \"news.test\"").await
}

pub async fn memory_engine_with(cfg_toml: &str) -> Engine {
    let store: DynStore = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let directory: DynDirectory =
        Arc::new(SqliteDirectory::new("sqlite::memory:").await.unwrap());
    let cfg: Config = toml::from_str(cfg_toml).unwrap();
    Engine::new(store, directory, cfg)
}

/// Spawn a loopback server that serves every accepted connection with
/// `handle_client`.
pub async fn setup_server(engine: Engine) -> std::net::SocketAddr {
    setup_server_opts(engine, true).await
}

pub async fn setup_server_opts(engine: Engine, peer_is_loopback: bool) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (sock, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine.clone();
            tokio::spawn(async move {
                let _ = handle_client(sock, engine, false, peer_is_loopback, false).await;
            });
        }
    });
    addr
}

pub async fn connect(
    addr: std::net::SocketAddr,
) -> (
    BufReader<tokio::net::tcp::OwnedReadHalf>,
    tokio::net::tcp::OwnedWriteHalf,
) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (r, w) = stream.into_split();
    (BufReader::new(r), w)
}

/// Read one response line.
pub async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    line
}

/// Read a multi-line body up to the lone dot, returning the payload lines.
pub async fn read_multiline<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "." {
            break;
        }
        lines.push(trimmed.to_string());
    }
    lines
}

/// Create a group and seed it with `bodies.len()` articles.
pub async fn seed_group(engine: &Engine, group: &str, bodies: &[&str]) {
    engine
        .store
        .create_group(&Newsgroup::new(group, "test group", "tester", false))
        .await
        .unwrap();
    for (i, body) in bodies.iter().enumerate() {
        let article = fixture_article(&format!("<{}@{group}>", i + 1), group, body);
        engine
            .store
            .insert_article(
                &article,
                &[GroupPost {
                    group_name: group.to_string(),
                    pending: false,
                }],
            )
            .await
            .unwrap();
    }
}

pub fn fixture_article(message_id: &str, group: &str, body: &str) -> Article {
    let raw = format!(
        "Message-ID: {message_id}\r\n\
         Date: Thu, 01 Jan 2026 00:00:00 +0000\r\n\
         From: tester <tester@news.test>\r\n\
         Subject: test article\r\n\
         Newsgroups: {group}\r\n\
         Path: news.test\r\n\
         \r\n\
         {body}"
    );
    parse_article(&raw).unwrap()
}

/// Add an administrator with the given capabilities.
pub async fn add_admin(engine: &Engine, username: &str, password: &str, caps: Capabilities) {
    engine
        .directory
        .add_user(username, password, &caps)
        .await
        .unwrap();
}

/// Drive the AUTHINFO exchange to completion.
pub async fn login<R, W>(reader: &mut R, writer: &mut W, user: &str, pass: &str)
where
    R: AsyncBufReadExt + Unpin,
    W: tokio::io::AsyncWriteExt + Unpin,
{
    writer
        .write_all(format!("AUTHINFO USER {user}\r\n").as_bytes())
        .await
        .unwrap();
    assert!(read_line(reader).await.starts_with("381"));
    writer
        .write_all(format!("AUTHINFO PASS {pass}\r\n").as_bytes())
        .await
        .unwrap();
    assert!(read_line(reader).await.starts_with("281"));
}
