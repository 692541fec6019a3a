//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small genealogy site and test the
//! full crawl cycle end-to-end against a temporary database.

use lineage_crawler::config::{Config, CrawlerConfig, UserAgentConfig};
use lineage_crawler::crawler::{crawl, retry_pending, scrape_one, Coordinator, CrawlOptions};
use lineage_crawler::output::export_gedcom;
use lineage_crawler::storage::{SessionMode, SessionStatus, SqliteStorage, Storage};
use lineage_crawler::{LineageError, RelationType};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration with no delays between attempts
fn create_test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency: 2,
            limit: 100,
            delay_ms: 0,
            timeout_secs: 5,
            retry_backoff_ms: 0,
            rate_limit_backoff_base: 0.0,
            max_attempts: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        ..Default::default()
    }
}

fn options(limit: usize, concurrency: usize) -> CrawlOptions {
    CrawlOptions {
        limit,
        concurrency,
        delay: Duration::ZERO,
    }
}

fn open_temp_storage() -> (TempDir, Arc<Mutex<SqliteStorage>>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(&temp_dir.path().join("test.db")).expect("Failed to open db");
    (temp_dir, Arc::new(Mutex::new(storage)))
}

/// One person page on the mock site
#[derive(Default, Clone)]
struct Page {
    name: String,
    gender: &'static str,
    father: Option<String>,
    mother: Option<String>,
    spouse: Option<String>,
    kids: Vec<String>,
}

impl Page {
    fn new(name: &str, gender: &'static str) -> Self {
        Self {
            name: name.to_string(),
            gender,
            ..Default::default()
        }
    }

    fn father(mut self, id: &str) -> Self {
        self.father = Some(id.to_string());
        self
    }

    fn mother(mut self, id: &str) -> Self {
        self.mother = Some(id.to_string());
        self
    }

    fn spouse(mut self, id: &str) -> Self {
        self.spouse = Some(id.to_string());
        self
    }

    fn kids(mut self, ids: &[&str]) -> Self {
        self.kids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    fn html(&self) -> String {
        let mut parents = String::new();
        if let Some(father) = &self.father {
            parents.push_str(&format!(r#"<li><a href="?i={}" class="male"><h3>אב</h3></a></li>"#, father));
        }
        if let Some(mother) = &self.mother {
            parents.push_str(&format!(r#"<li><a href="?i={}" class="female"><h3>אם</h3></a></li>"#, mother));
        }
        let spouse = self
            .spouse
            .as_ref()
            .map(|id| format!(r#"<h4><a href="?i={}">בן זוג</a></h4>"#, id))
            .unwrap_or_default();
        let kids: String = self
            .kids
            .iter()
            .map(|id| format!(r#"<li><a href="?i={}" class="male"><h3>ילד</h3></a></li>"#, id))
            .collect();

        format!(
            r#"<html><body><div class="current-view">
            <ul class="parents">{}</ul>
            <div class="person {}"><div class="info"><h2>{}</h2>{}
                <ul><li><strong>תאריך לידה: </strong>ט' כסלו תרנ"ד</li></ul>
            </div></div>
            <ul class="kids">{}</ul>
            </div></body></html>"#,
            parents, self.gender, self.name, spouse, kids
        )
    }
}

/// Serves `/tree?i=<id>` from a fixed set of pages, 404 for anything else
struct Site {
    pages: HashMap<String, String>,
}

impl Site {
    fn new(pages: Vec<(&str, Page)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(id, page)| (id.to_string(), page.html()))
                .collect(),
        }
    }
}

impl Respond for Site {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "i")
            .map(|(_, value)| value.into_owned());

        match id.and_then(|id| self.pages.get(&id)) {
            Some(body) => ResponseTemplate::new(200)
                .set_body_string(body.clone())
                .insert_header("content-type", "text/html; charset=utf-8"),
            None => ResponseTemplate::new(404),
        }
    }
}

async fn serve(mock_server: &MockServer, site: Site) {
    Mock::given(method("GET"))
        .and(path("/tree"))
        .respond_with(site)
        .mount(mock_server)
        .await;
}

fn person_url(mock_server: &MockServer, id: &str) -> String {
    format!("{}/tree?i={}", mock_server.uri(), id)
}

/// A binary tree: person `n` has children `2n` and `2n + 1`, up to `size`
fn binary_tree(size: usize) -> Site {
    let pages = (1..=size)
        .map(|n| {
            let kids: Vec<String> = [2 * n, 2 * n + 1]
                .iter()
                .filter(|kid| **kid <= size)
                .map(|kid| kid.to_string())
                .collect();
            let kid_refs: Vec<&str> = kids.iter().map(String::as_str).collect();
            let mut page = Page::new(&format!("אדם {}", n), "male").kids(&kid_refs);
            if n > 1 {
                page = page.father(&(n / 2).to_string());
            }
            (n.to_string(), page)
        })
        .collect::<Vec<_>>();

    Site {
        pages: pages
            .into_iter()
            .map(|(id, page)| (id, page.html()))
            .collect(),
    }
}

async fn request_ids(mock_server: &MockServer) -> Vec<String> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "i")
                .map(|(_, value)| value.into_owned())
        })
        .collect()
}

fn three_person_family() -> Site {
    Site::new(vec![
        ("1", Page::new("בן", "male").father("2").mother("3")),
        ("2", Page::new("אב", "male").spouse("3").kids(&["1"])),
        ("3", Page::new("אם", "female").spouse("2").kids(&["1"])),
    ])
}

#[tokio::test]
async fn test_crawl_respects_limit_across_concurrency() {
    for concurrency in [1, 2, 5] {
        for limit in [0, 1, 10] {
            let mock_server = MockServer::start().await;
            serve(&mock_server, binary_tree(40)).await;
            let (_temp_dir, storage) = open_temp_storage();

            let fetched = crawl(
                create_test_config(),
                Arc::clone(&storage),
                &person_url(&mock_server, "1"),
                options(limit, concurrency),
            )
            .await
            .expect("Crawl failed");

            assert_eq!(fetched, limit, "concurrency {} limit {}", concurrency, limit);
            let stored = storage.lock().unwrap().count_persons().unwrap();
            assert_eq!(stored as usize, limit, "concurrency {} limit {}", concurrency, limit);

            let requests = request_ids(&mock_server).await;
            assert_eq!(requests.len(), limit, "concurrency {} limit {}", concurrency, limit);
        }
    }
}

#[tokio::test]
async fn test_rate_limited_seed_is_requested_exactly_twice() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tree"))
        .and(query_param("i", "1"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (_temp_dir, storage) = open_temp_storage();
    let result = crawl(
        create_test_config(),
        Arc::clone(&storage),
        &person_url(&mock_server, "1"),
        options(10, 2),
    )
    .await;

    assert!(matches!(result, Err(LineageError::SeedFetch { .. })));
    assert_eq!(storage.lock().unwrap().count_persons().unwrap(), 0);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_seed_failure_marks_session_failed() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, Site::new(vec![])).await;
    let (_temp_dir, storage) = open_temp_storage();

    let result = crawl(
        create_test_config(),
        Arc::clone(&storage),
        &person_url(&mock_server, "404"),
        options(10, 2),
    )
    .await;

    match result {
        Err(LineageError::SeedFetch { url, reason }) => {
            assert!(url.ends_with("/tree?i=404"));
            assert!(reason.contains("404"));
        }
        other => panic!("expected seed failure, got {:?}", other),
    }

    let sessions = storage.lock().unwrap().list_recent_sessions(1).unwrap();
    assert_eq!(sessions[0].mode, SessionMode::Crawl);
    assert_eq!(sessions[0].status, SessionStatus::Failed);
    assert_eq!(sessions[0].fetched_count, 0);
}

#[tokio::test]
async fn test_each_person_fetched_at_most_once() {
    // Everybody references everybody, so every id is offered many times
    let ids = ["1", "2", "3", "4", "5", "6", "7", "8"];
    let pages = ids
        .iter()
        .map(|id| {
            let others: Vec<&str> = ids.iter().copied().filter(|other| other != id).collect();
            (*id, Page::new("אדם", "male").kids(&others))
        })
        .collect();

    let mock_server = MockServer::start().await;
    serve(&mock_server, Site::new(pages)).await;
    let (_temp_dir, storage) = open_temp_storage();

    let fetched = crawl(
        create_test_config(),
        Arc::clone(&storage),
        &person_url(&mock_server, "1"),
        options(100, 5),
    )
    .await
    .unwrap();

    assert_eq!(fetched, ids.len());
    let requests = request_ids(&mock_server).await;
    assert_eq!(requests.len(), ids.len());
    let unique: HashSet<_> = requests.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, three_person_family()).await;
    let (_temp_dir, storage) = open_temp_storage();
    let seed = person_url(&mock_server, "1");

    let first = crawl(create_test_config(), Arc::clone(&storage), &seed, options(10, 2))
        .await
        .unwrap();
    assert_eq!(first, 3);

    let (persons, edges) = {
        let storage = storage.lock().unwrap();
        (
            storage.list_all_persons().unwrap(),
            storage.list_all_relationships().unwrap(),
        )
    };

    let second = crawl(create_test_config(), Arc::clone(&storage), &seed, options(10, 2))
        .await
        .unwrap();
    assert_eq!(second, 0);

    let storage = storage.lock().unwrap();
    assert_eq!(storage.list_all_persons().unwrap(), persons);
    assert_eq!(storage.list_all_relationships().unwrap(), edges);
    assert_eq!(request_ids(&mock_server).await.len(), 3);
}

#[tokio::test]
async fn test_rescraping_adds_no_duplicate_edges() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, three_person_family()).await;
    let (_temp_dir, storage) = open_temp_storage();
    let url = person_url(&mock_server, "1");

    scrape_one(create_test_config(), Arc::clone(&storage), &url)
        .await
        .unwrap();
    let record = scrape_one(create_test_config(), Arc::clone(&storage), &url)
        .await
        .unwrap()
        .expect("Page should hold a record");

    assert_eq!(record.id, "1");
    assert_eq!(record.birth_date_civil.as_deref(), Some("18 Nov 1893"));

    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_persons().unwrap(), 1);
    let edges = storage.get_edges("1").unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().any(|e| e.related_id == "2" && e.kind == RelationType::Father));
    assert!(edges.iter().any(|e| e.related_id == "3" && e.kind == RelationType::Mother));

    // Relatives are recorded as discovered, not fetched
    assert_eq!(storage.count_unfetched_discovered().unwrap(), 2);
    assert_eq!(request_ids(&mock_server).await, vec!["1", "1"]);
}

#[tokio::test]
async fn test_crawl_continues_past_failures_and_retry_recovers() {
    let mock_server = MockServer::start().await;

    // Child 2 fails for both attempts of the first session
    Mock::given(method("GET"))
        .and(path("/tree"))
        .and(query_param("i", "2"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    serve(
        &mock_server,
        Site::new(vec![
            ("1", Page::new("אב", "male").kids(&["2", "3"])),
            ("2", Page::new("בן", "male").father("1")),
            ("3", Page::new("בן", "male").father("1")),
        ]),
    )
    .await;

    let (_temp_dir, storage) = open_temp_storage();
    let fetched = crawl(
        create_test_config(),
        Arc::clone(&storage),
        &person_url(&mock_server, "1"),
        options(10, 1),
    )
    .await
    .unwrap();

    assert_eq!(fetched, 2);
    {
        let storage = storage.lock().unwrap();
        assert!(storage.get_person("2").unwrap().is_none());
        assert!(storage.get_person("3").unwrap().is_some());
        assert_eq!(storage.count_unfetched_discovered().unwrap(), 1);
    }

    let retried = retry_pending(create_test_config(), Arc::clone(&storage), options(10, 2))
        .await
        .unwrap();
    assert_eq!(retried, 1);

    let storage = storage.lock().unwrap();
    assert!(storage.get_person("2").unwrap().is_some());
    assert_eq!(storage.count_unfetched_discovered().unwrap(), 0);

    let sessions = storage.list_recent_sessions(2).unwrap();
    assert_eq!(sessions[0].mode, SessionMode::Retry);
    assert_eq!(sessions[0].fetched_count, 1);
    assert_eq!(sessions[1].mode, SessionMode::Crawl);
    assert_eq!(sessions[1].fetched_count, 2);
}

#[tokio::test]
async fn test_resumed_crawl_picks_up_pending_relatives() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, binary_tree(7)).await;
    let (_temp_dir, storage) = open_temp_storage();
    let seed = person_url(&mock_server, "1");

    let first = crawl(create_test_config(), Arc::clone(&storage), &seed, options(3, 1))
        .await
        .unwrap();
    assert_eq!(first, 3);

    let second = crawl(create_test_config(), Arc::clone(&storage), &seed, options(10, 2))
        .await
        .unwrap();
    assert_eq!(second, 4);
    assert_eq!(storage.lock().unwrap().count_persons().unwrap(), 7);

    let requests = request_ids(&mock_server).await;
    let unique: HashSet<_> = requests.iter().collect();
    assert_eq!(requests.len(), unique.len());
}

#[tokio::test]
async fn test_crawl_then_export_builds_family() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        Site::new(vec![
            ("p1", Page::new("שניאור זלמן", "male").father("p2")),
            ("p2", Page::new("הרב ברוך", "male").kids(&["p1"])),
        ]),
    )
    .await;
    let (temp_dir, storage) = open_temp_storage();

    let coordinator = Coordinator::new(create_test_config(), Arc::clone(&storage))
        .unwrap()
        .with_config_hash("test-hash");
    let fetched = coordinator
        .crawl(&person_url(&mock_server, "p1"), &options(2, 2))
        .await
        .unwrap();
    assert_eq!(fetched, 2);

    let output = temp_dir.path().join("tree.ged");
    let summary = {
        let storage = storage.lock().unwrap();
        assert_eq!(storage.list_recent_sessions(1).unwrap()[0].config_hash, "test-hash");
        export_gedcom(&*storage, &output).unwrap()
    };
    assert_eq!(summary.individuals, 2);
    assert_eq!(summary.families, 1);

    let gedcom = std::fs::read_to_string(&output).unwrap();
    assert!(gedcom.starts_with("0 HEAD\n"));
    assert!(gedcom.ends_with("0 TRLR\n"));
    assert!(gedcom.contains("0 @I1@ INDI\n1 NAME שניאור זלמן\n"));
    assert!(gedcom.contains("2 NPFX הרב\n"));
    assert!(gedcom.contains("0 @F1@ FAM\n1 HUSB @I2@\n1 CHIL @I1@\n"));
    assert!(gedcom.contains("1 FAMC @F1@"));
    assert!(gedcom.contains("1 FAMS @F1@"));
    assert!(gedcom.contains("2 DATE 18 Nov 1893"));
}
