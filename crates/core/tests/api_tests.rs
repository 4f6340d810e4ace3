//! Library API integration tests
use std::collections::HashMap;
use std::time::Duration;

use narou_txt_core::*;

const INDEX_URL: &str = "https://ncode.syosetu.com/n1234ab/";

fn get_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

struct FixtureSource {
    pages: HashMap<String, String>,
}

impl FixtureSource {
    fn serial() -> Self {
        let chapter = get_fixture("chapter.html");
        let mut pages = HashMap::new();
        pages.insert(INDEX_URL.to_string(), get_fixture("index_page1.html"));
        pages.insert(format!("{}?p=2", INDEX_URL), get_fixture("index_page2.html"));
        for n in 1..=3 {
            pages.insert(format!("{}{}/", INDEX_URL, n), chapter.clone());
        }
        Self { pages }
    }
}

impl PageSource for FixtureSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.pages.get(url).cloned().ok_or(NarouError::Timeout { timeout: 10 })
    }
}

fn fast_config() -> DownloadConfig {
    DownloadConfig {
        chapter_interval: Duration::ZERO,
        fetch_retry: RetryPolicy::immediate(3),
        save_retry: RetryPolicy::immediate(1),
        ..Default::default()
    }
}

#[test]
fn test_convert_api() {
    let converter = Converter::default();
    assert_eq!(converter.convert("これは<br>テストです<br />", false), "これは\nテストです\n");
    assert_eq!(converter.convert("<ruby>漢字<rt>かんじ</rt></ruby>", false), "｜漢字《かんじ》");
    assert_eq!(
        converter.convert("<em class=\"emphasisDots\">重要</em>", false),
        "［＃傍点］重要［＃傍点終わり］"
    );
}

#[test]
fn test_converter_builder_rejects_bad_pattern() {
    let result = ConverterConfig::builder().illustration_pattern("(unclosed").build();
    assert!(matches!(result, Err(NarouError::ConfigError(_))));

    let result = ConverterConfig::builder().illustration_pattern("<img>").build();
    assert!(matches!(result, Err(NarouError::ConfigError(_))));
}

#[test]
fn test_restore_entities_api() {
    assert_eq!(restore_entities("&#65;&#66;&#67;"), "ABC");
    assert_eq!(restore_entities("&#x41;&#x42;&#x43;"), "ABC");
}

#[test]
fn test_chapter_fixture_extraction() {
    let html = get_fixture("chapter.html");
    let url = "https://ncode.syosetu.com/n1234ab/1/";
    let content = chapter::extract_chapter(&html, url, &Converter::default()).unwrap();

    let sections: Vec<&str> = content.text.split(chapter::SECTION_SEPARATOR).collect();
    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0], "お読みいただきありがとうございます。");
    assert!(sections[1].starts_with("その夜、｜星《ほし》が降った。\n\n"));
    assert!(sections[1].contains("「≪光≫だ」"));
    assert!(sections[1].ends_with("A & B <C>"));
    assert_eq!(sections[2], "次回もお楽しみに。");

    assert!(content.structural_html.contains("p-novel__text--afterword"));
    assert!(content.full_page_html.contains("https://ncode.syosetu.com/css/novel.css?1700000000"));
    assert!(content.full_page_html.contains("https://ncode.syosetu.com/js/novel.js?1700000000"));
    assert!(content.full_page_html.contains("//example.syosetu.com/image/1.jpg"));
}

#[tokio::test]
async fn test_discover_serial_fixture() {
    let source = FixtureSource::serial();
    let work = discover(&source, "https://ncode.syosetu.com/n1234ab/2/", &Converter::default())
        .await
        .unwrap();

    assert_eq!(work.page_type, PageType::Serial);
    assert_eq!(work.title, "星降る街の記録");
    assert_eq!(work.author, "灯火ひかり");
    assert_eq!(work.index_pages.len(), 2);

    let urls: Vec<&str> = work.chapters.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://ncode.syosetu.com/n1234ab/1/",
            "https://ncode.syosetu.com/n1234ab/2/",
            "https://ncode.syosetu.com/n1234ab/3/",
        ]
    );
    assert_eq!(work.chapters[0].title, "プロローグ");
}

#[tokio::test]
async fn test_discover_standalone_fixture() {
    let url = "https://ncode.syosetu.com/n5555cc/";
    let source = FixtureSource { pages: HashMap::from([(url.to_string(), get_fixture("short_story.html"))]) };
    let work = discover(&source, url, &Converter::default()).await.unwrap();

    assert_eq!(work.page_type, PageType::Standalone);
    assert_eq!(work.author, "作者：雨音しずく");
    assert_eq!(
        work.chapters[0].text_content.as_deref(),
        Some("雨が降っていた。\n　｜手紙《てがみ》は濡れていた。")
    );
}

#[tokio::test]
async fn test_download_to_directory_and_resume() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("work"));
    let downloader = Downloader::new(FixtureSource::serial(), NullProgress, fast_config());

    let mut work = downloader.discover(INDEX_URL).await.unwrap();
    let report = downloader.run(&store, &mut work).await.unwrap();
    assert_eq!(report, DownloadReport { total: 3, saved: 3, skipped: 0, failed: 0 });

    for n in 1..=3 {
        assert!(dir.path().join(format!("work/N1234AB-{}.txt", n)).is_file());
    }
    let chapter_one = std::fs::read_to_string(dir.path().join("work/N1234AB-1.txt")).unwrap();
    assert!(chapter_one.starts_with("プロローグ\n\nお読みいただきありがとうございます。\n"));

    let combined = std::fs::read_to_string(dir.path().join("work/all.txt")).unwrap();
    assert!(combined.starts_with("星降る街の記録\n灯火ひかり\n\n\nプロローグ\n\n"));
    assert_eq!(combined.matches("\n\n----------------\n\n\n").count(), 2);

    let mut again = downloader.discover(INDEX_URL).await.unwrap();
    let report = downloader.run(&store, &mut again).await.unwrap();
    assert_eq!(report.skipped, 3);
    assert!(again.chapters.iter().all(|c| c.state == ChapterState::Skipped));
}

#[tokio::test]
async fn test_download_crlf_and_structural() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).with_line_ending(LineEnding::Crlf);
    let config = DownloadConfig {
        options: DownloadOptions { emit_text: true, emit_structural: true, emit_combined: false },
        ..fast_config()
    };
    let downloader = Downloader::new(FixtureSource::serial(), NullProgress, config);

    let mut work = downloader.discover(INDEX_URL).await.unwrap();
    downloader.run(&store, &mut work).await.unwrap();

    let text = std::fs::read_to_string(dir.path().join("N1234AB-2.txt")).unwrap();
    assert!(text.starts_with("星の欠片\r\n\r\n"));
    assert!(!dir.path().join("all.txt").exists());

    let page = std::fs::read_to_string(dir.path().join("html/2.html")).unwrap();
    assert!(page.contains("p-novel__body"));
    assert!(!page.contains("<iframe"));
}

#[tokio::test]
async fn test_unreachable_chapters_trip_circuit_breaker() {
    let mut source = FixtureSource::serial();
    for n in 1..=3 {
        source.pages.remove(&format!("{}{}/", INDEX_URL, n));
    }
    let downloader = Downloader::new(source, NullProgress, fast_config());
    let dir = tempfile::tempdir().unwrap();

    let mut work = downloader.discover(INDEX_URL).await.unwrap();
    let err = downloader.run(&FileStore::new(dir.path()), &mut work).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("3 consecutive"));
}
