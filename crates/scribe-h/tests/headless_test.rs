use scribe_engine::backend::Backend;
use scribe_engine::intent::definition::LookupStrategy;
use scribe_h::HeadlessBackend;
use serial_test::serial;

const FIXTURE: &str = "data:text/html;charset=utf-8,\
<title>Editor</title>\
<button>予約投稿</button><button>投稿する</button>\
<button style='display:none'>公開設定</button>\
<div class='editor-input' contenteditable='true'></div>\
<ul><li>a</li><li>b</li><li>c</li></ul>\
<p id='__next-route-announcer__' aria-live='assertive' role='alert' \
style='position:absolute;width:1px;height:1px;overflow:hidden;clip:rect(0 0 0 0)'>記事編集 | note</p>";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn launched() -> Option<HeadlessBackend> {
    init_tracing();
    let mut backend = HeadlessBackend::default();
    match backend.launch().await {
        Ok(()) => Some(backend),
        Err(e) => {
            eprintln!("Skipping test: Headless browser not available: {}", e);
            None
        }
    }
}

#[tokio::test]
#[serial]
async fn test_navigate_and_lookup() {
    let Some(mut backend) = launched().await else {
        return;
    };

    let nav = backend.navigate(FIXTURE).await.expect("navigate");
    assert_eq!(nav.title, "Editor");

    let confirm = backend
        .query(&LookupStrategy::text_excluding("button", "投稿", &["予約"]))
        .await
        .expect("query")
        .expect("visible confirm button");
    let again = backend
        .query(&LookupStrategy::text_excluding("button", "投稿", &["予約"]))
        .await
        .expect("query")
        .expect("same button");
    assert_eq!(confirm.id, again.id);

    let hidden = backend
        .query(&LookupStrategy::text("button", "公開設定"))
        .await
        .expect("query");
    assert!(hidden.is_none());

    let last = backend
        .query(&LookupStrategy::position("li", -1))
        .await
        .expect("query");
    assert!(last.is_some());

    let announcer = backend
        .query(&LookupStrategy::selector("[role=\"alert\"]"))
        .await
        .expect("query");
    assert!(announcer.is_none());

    let bad = backend.query(&LookupStrategy::selector("button[")).await;
    assert!(bad.is_err());

    backend.close().await.expect("close");
}

#[tokio::test]
#[serial]
async fn test_insert_text_and_capture() {
    let Some(mut backend) = launched().await else {
        return;
    };

    backend.navigate(FIXTURE).await.expect("navigate");
    let body = backend
        .query(&LookupStrategy::selector(".editor-input"))
        .await
        .expect("query")
        .expect("editor body");
    backend
        .insert_text(&body, "line one\nline two")
        .await
        .expect("insert");

    let html = backend.page_content().await.expect("content");
    assert!(html.contains("line one"));
    assert!(html.contains("data-scribe-id"));

    let png = backend.screenshot().await.expect("screenshot");
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

    backend.close().await.expect("close");
}
