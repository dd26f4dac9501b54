mod common;

use annals::models::{Newsgroup, Visibility};
use annals::storage::{GroupPost, Store, sqlite::SqliteStore};
use common::fixture_article;

async fn store_with_group(group: &str) -> SqliteStore {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    store
        .create_group(&Newsgroup::new(group, "", "tester", false))
        .await
        .unwrap();
    store
}

fn post(group: &str) -> Vec<GroupPost> {
    vec![GroupPost {
        group_name: group.to_string(),
        pending: false,
    }]
}

#[tokio::test]
async fn numbers_are_monotonic_and_never_reused() {
    let store = store_with_group("misc.seq").await;

    for i in 1..=3 {
        let article = fixture_article(&format!("<{i}@seq>"), "misc.seq", "x");
        let links = store.insert_article(&article, &post("misc.seq")).await.unwrap();
        assert_eq!(links[0].number, i);
    }

    // cancel the highest-numbered link
    let mut link = store.find_link("<3@seq>", "misc.seq").await.unwrap().unwrap();
    link.cancelled = true;
    store.update_link(&link).await.unwrap();

    // the next insert still advances past the cancelled number
    let article = fixture_article("<4@seq>", "misc.seq", "x");
    let links = store.insert_article(&article, &post("misc.seq")).await.unwrap();
    assert_eq!(links[0].number, 4);
}

#[tokio::test]
async fn visibility_filters_partition_links() {
    let store = store_with_group("misc.vis").await;

    let visible = fixture_article("<v@vis>", "misc.vis", "x");
    store.insert_article(&visible, &post("misc.vis")).await.unwrap();

    let pending = fixture_article("<p@vis>", "misc.vis", "x");
    store
        .insert_article(
            &pending,
            &[GroupPost {
                group_name: "misc.vis".into(),
                pending: true,
            }],
        )
        .await
        .unwrap();

    let cancelled = fixture_article("<c@vis>", "misc.vis", "x");
    store.insert_article(&cancelled, &post("misc.vis")).await.unwrap();
    let mut link = store.find_link("<c@vis>", "misc.vis").await.unwrap().unwrap();
    link.cancelled = true;
    store.update_link(&link).await.unwrap();

    let ids = |entries: Vec<annals::models::StoredArticle>| {
        entries
            .into_iter()
            .map(|e| e.article.message_id)
            .collect::<Vec<_>>()
    };

    let visible_rows = store
        .list_articles_in_range("misc.vis", 1, 100, 100, Visibility::Visible)
        .await
        .unwrap();
    assert_eq!(ids(visible_rows), ["<v@vis>"]);

    let pending_rows = store
        .list_articles_in_range("misc.vis", 1, 100, 100, Visibility::Pending)
        .await
        .unwrap();
    assert_eq!(ids(pending_rows), ["<p@vis>"]);

    let cancelled_rows = store
        .list_articles_in_range("misc.vis", 1, 100, 100, Visibility::Cancelled)
        .await
        .unwrap();
    assert_eq!(ids(cancelled_rows), ["<c@vis>"]);
}

#[tokio::test]
async fn message_id_lookup_sees_only_visible_links() {
    let store = store_with_group("misc.vis").await;
    let article = fixture_article("<a@vis>", "misc.vis", "x");
    store.insert_article(&article, &post("misc.vis")).await.unwrap();
    assert!(store.get_article_by_message_id("<a@vis>").await.unwrap().is_some());

    let mut link = store.find_link("<a@vis>", "misc.vis").await.unwrap().unwrap();
    link.cancelled = true;
    store.update_link(&link).await.unwrap();
    assert!(store.get_article_by_message_id("<a@vis>").await.unwrap().is_none());
    // the raw article record survives for moderation and audit paths
    assert!(store.get_article("<a@vis>").await.unwrap().is_some());
}

#[tokio::test]
async fn range_reads_are_ordered_and_capped() {
    let store = store_with_group("misc.range").await;
    for i in 1..=5 {
        let article = fixture_article(&format!("<{i}@range>"), "misc.range", "x");
        store.insert_article(&article, &post("misc.range")).await.unwrap();
    }

    let rows = store
        .list_articles_in_range("misc.range", 2, 4, 100, Visibility::Visible)
        .await
        .unwrap();
    let numbers: Vec<u64> = rows.iter().map(|e| e.link.number).collect();
    assert_eq!(numbers, [2, 3, 4]);

    let capped = store
        .list_articles_in_range("misc.range", 1, 5, 2, Visibility::Visible)
        .await
        .unwrap();
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].link.number, 1);

    let empty = store
        .list_articles_in_range("misc.range", 4, 2, 100, Visibility::Visible)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn watermarks_reconcile_on_mutation() {
    let store = store_with_group("misc.marks").await;
    for i in 1..=3 {
        let article = fixture_article(&format!("<{i}@marks>"), "misc.marks", "x");
        store.insert_article(&article, &post("misc.marks")).await.unwrap();
    }

    let group = store.get_newsgroup("misc.marks").await.unwrap().unwrap();
    assert_eq!(
        (group.post_count, group.low_watermark, group.high_watermark),
        (3, 1, 3)
    );

    let mut link = store.find_link("<1@marks>", "misc.marks").await.unwrap().unwrap();
    link.cancelled = true;
    store.update_link(&link).await.unwrap();

    let group = store.get_newsgroup("misc.marks").await.unwrap().unwrap();
    assert_eq!(
        (group.post_count, group.low_watermark, group.high_watermark),
        (2, 2, 3)
    );
}

#[tokio::test]
async fn crosspost_links_share_one_article() {
    let store = store_with_group("misc.one").await;
    store
        .create_group(&Newsgroup::new("misc.two", "", "tester", false))
        .await
        .unwrap();

    let mut article = fixture_article("<x@cross>", "misc.one", "x");
    article.set_header("Newsgroups", "misc.one,misc.two");
    let links = store
        .insert_article(
            &article,
            &[
                GroupPost {
                    group_name: "misc.one".into(),
                    pending: false,
                },
                GroupPost {
                    group_name: "misc.two".into(),
                    pending: false,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(links.len(), 2);

    let one = store
        .get_article_by_number("misc.one", 1, Visibility::Visible)
        .await
        .unwrap()
        .unwrap();
    let two = store
        .get_article_by_number("misc.two", 1, Visibility::Visible)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.article.message_id, two.article.message_id);
}

#[tokio::test]
async fn group_stats_per_visibility() {
    let store = store_with_group("misc.stats").await;
    for i in 1..=2 {
        let article = fixture_article(&format!("<{i}@stats>"), "misc.stats", "x");
        store.insert_article(&article, &post("misc.stats")).await.unwrap();
    }
    let mut link = store.find_link("<2@stats>", "misc.stats").await.unwrap().unwrap();
    link.cancelled = true;
    store.update_link(&link).await.unwrap();

    assert_eq!(
        store.group_stats("misc.stats", Visibility::Visible).await.unwrap(),
        (1, 1, 1)
    );
    assert_eq!(
        store.group_stats("misc.stats", Visibility::Cancelled).await.unwrap(),
        (1, 2, 2)
    );
    assert_eq!(
        store.group_stats("misc.stats", Visibility::Pending).await.unwrap(),
        (0, 0, 0)
    );
}
