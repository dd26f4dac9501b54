mod common;

use common::*;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn greeting_and_capabilities() {
    let engine = memory_engine().await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;

    let greeting = read_line(&mut reader).await;
    assert_eq!(greeting, "200 Service available, posting allowed\r\n");

    writer.write_all(b"CAPABILITIES\r\n").await.unwrap();
    let status = read_line(&mut reader).await;
    assert!(status.starts_with("101"));
    let caps = read_multiline(&mut reader).await;
    assert!(caps.iter().any(|l| l == "VERSION 2"));
    assert!(caps.iter().any(|l| l == "READER"));
    assert!(caps.iter().any(|l| l == "POST"));

    writer.write_all(b"QUIT\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("205"));
}

#[tokio::test]
async fn greeting_reflects_posting_prohibition() {
    let engine = memory_engine_with("allow_posting = false").await;
    let addr = setup_server(engine).await;
    let (mut reader, _writer) = connect(addr).await;
    assert!(read_line(&mut reader).await.starts_with("201"));
}

#[tokio::test]
async fn group_selection_and_article_fetch() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["first body"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    assert_eq!(read_line(&mut reader).await, "211 1 1 1 comp.test\r\n");

    writer.write_all(b"ARTICLE 1\r\n").await.unwrap();
    let status = read_line(&mut reader).await;
    assert!(status.starts_with("220 1 <1@comp.test>"));
    let lines = read_multiline(&mut reader).await;
    assert!(lines.iter().any(|l| l == "Subject: test article"));
    assert!(lines.iter().any(|l| l.is_empty()));
    assert_eq!(lines.last().map(String::as_str), Some("first body"));
}

#[tokio::test]
async fn message_id_lookup_without_group_context() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["body"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    // message-id lookups report number 0 without group context
    writer
        .write_all(b"ARTICLE <1@comp.test>\r\n")
        .await
        .unwrap();
    let status = read_line(&mut reader).await;
    assert!(status.starts_with("220 0 <1@comp.test>"));
    read_multiline(&mut reader).await;

    writer.write_all(b"STAT <none@comp.test>\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("430"));
}

#[tokio::test]
async fn head_body_and_stat() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["only body line"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;

    writer.write_all(b"HEAD 1\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("221 1"));
    let head = read_multiline(&mut reader).await;
    assert!(head.iter().all(|l| l != "only body line"));

    writer.write_all(b"BODY 1\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("222 1"));
    let body = read_multiline(&mut reader).await;
    assert_eq!(body, vec!["only body line"]);

    writer.write_all(b"STAT 1\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("223 1"));
}

#[tokio::test]
async fn over_range_scan() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["a", "b", "c"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    assert_eq!(read_line(&mut reader).await, "211 3 1 3 comp.test\r\n");

    writer.write_all(b"OVER 1-3\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("224"));
    let rows = read_multiline(&mut reader).await;
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.split('\t').collect();
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0], (i + 1).to_string());
        // :bytes is twice the single-character body length
        assert_eq!(fields[6], "2");
        assert_eq!(fields[7], "1");
    }
}

#[tokio::test]
async fn range_error_codes() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["a", "b"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    // numeric selection without a group
    writer.write_all(b"OVER 1-2\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("412"));

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;

    // inverted range is empty
    writer.write_all(b"OVER 2-1\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("423"));

    // malformed range is a syntax error
    writer.write_all(b"OVER 1-2-3\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));

    // open-ended range resolves to the high watermark
    writer.write_all(b"OVER 1-\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("224"));
    assert_eq!(read_multiline(&mut reader).await.len(), 2);
}

#[tokio::test]
async fn last_and_next_navigation() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["a", "b", "c"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"NEXT\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("412"));

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;

    writer.write_all(b"LAST\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("422"));

    writer.write_all(b"NEXT\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("223 2"));

    writer.write_all(b"NEXT\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("223 3"));

    writer.write_all(b"NEXT\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("421"));

    writer.write_all(b"LAST\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("223 2"));
}

#[tokio::test]
async fn listgroup_and_list_keywords() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["a", "b"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"LISTGROUP comp.test\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("211 2 1 2 comp.test"));
    assert_eq!(read_multiline(&mut reader).await, vec!["1", "2"]);

    writer.write_all(b"LISTGROUP comp.test 2-\r\n").await.unwrap();
    read_line(&mut reader).await;
    assert_eq!(read_multiline(&mut reader).await, vec!["2"]);

    writer.write_all(b"LIST\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("215"));
    let active = read_multiline(&mut reader).await;
    assert_eq!(active, vec!["comp.test 2 1 y"]);

    writer.write_all(b"LIST ACTIVE comp.*\r\n").await.unwrap();
    read_line(&mut reader).await;
    assert_eq!(read_multiline(&mut reader).await.len(), 1);

    writer.write_all(b"LIST ACTIVE other.*\r\n").await.unwrap();
    read_line(&mut reader).await;
    assert!(read_multiline(&mut reader).await.is_empty());

    writer.write_all(b"LIST NEWSGROUPS\r\n").await.unwrap();
    read_line(&mut reader).await;
    assert_eq!(
        read_multiline(&mut reader).await,
        vec!["comp.test\ttest group"]
    );

    writer.write_all(b"LIST ACTIVE.TIMES\r\n").await.unwrap();
    read_line(&mut reader).await;
    let times = read_multiline(&mut reader).await;
    assert_eq!(times.len(), 1);
    assert!(times[0].starts_with("comp.test "));
    assert!(times[0].ends_with(" tester"));

    writer.write_all(b"LIST OVERVIEW.FMT\r\n").await.unwrap();
    read_line(&mut reader).await;
    let fmt = read_multiline(&mut reader).await;
    assert_eq!(fmt.first().map(String::as_str), Some("Subject:"));
    assert_eq!(fmt.last().map(String::as_str), Some(":lines"));

    writer.write_all(b"LIST BOGUS\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));
}

#[tokio::test]
async fn newgroups_since() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &[]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer
        .write_all(b"NEWGROUPS 19700101 000000 GMT\r\n")
        .await
        .unwrap();
    assert!(read_line(&mut reader).await.starts_with("231"));
    let groups = read_multiline(&mut reader).await;
    assert!(groups.iter().any(|l| l.starts_with("comp.test ")));

    writer
        .write_all(b"NEWGROUPS 20990101 000000 GMT\r\n")
        .await
        .unwrap();
    read_line(&mut reader).await;
    assert!(read_multiline(&mut reader).await.is_empty());

    writer.write_all(b"NEWGROUPS xx\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));
}

#[tokio::test]
async fn hdr_by_range_and_message_id() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["abcd", "efgh"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;

    writer.write_all(b"HDR Subject 1-2\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("225"));
    assert_eq!(
        read_multiline(&mut reader).await,
        vec!["1 test article", "2 test article"]
    );

    writer
        .write_all(b"XHDR :bytes <1@comp.test>\r\n")
        .await
        .unwrap();
    assert!(read_line(&mut reader).await.starts_with("221"));
    assert_eq!(read_multiline(&mut reader).await, vec!["0 8"]);
}

#[tokio::test]
async fn date_and_mode_reader() {
    let engine = memory_engine().await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"DATE\r\n").await.unwrap();
    let date = read_line(&mut reader).await;
    assert!(date.starts_with("111 "));
    assert_eq!(date.trim_end().len(), "111 ".len() + 14);

    writer.write_all(b"MODE READER\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("200"));

    writer.write_all(b"MODE STREAM\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));
}

#[tokio::test]
async fn malformed_input_leaves_state_unchanged() {
    let engine = memory_engine().await;
    seed_group(&engine, "comp.test", &["a"]).await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP comp.test\r\n").await.unwrap();
    read_line(&mut reader).await;

    // one 500/501 per malformed line, session state intact
    writer.write_all(b"123 456\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("500"));
    writer.write_all(b"FROBNICATE\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("500"));
    writer.write_all(b"ARTICLE not-a-number\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("501"));

    writer.write_all(b"ARTICLE\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("220 1"));
    read_multiline(&mut reader).await;
}

#[tokio::test]
async fn unknown_group_and_no_current_article() {
    let engine = memory_engine().await;
    let addr = setup_server(engine).await;
    let (mut reader, mut writer) = connect(addr).await;
    read_line(&mut reader).await;

    writer.write_all(b"GROUP does.not.exist\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("411"));

    writer.write_all(b"ARTICLE\r\n").await.unwrap();
    assert!(read_line(&mut reader).await.starts_with("412"));
}
