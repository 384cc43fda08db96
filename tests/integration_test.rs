use searcher::{
    engine::{self, Engine},
    pipeline::{Pipeline, PipelineOptions},
    query::build_queries,
    store::ResultStore,
    writer::{self, Sink, Writer},
    Fetch, FetchError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answers each query with a page whose links name the term in the URL.
struct EchoFetcher {
    slow: Option<String>,
    terms: Vec<String>,
}

impl EchoFetcher {
    fn body_for(&self, url: &str) -> String {
        let term = self
            .terms
            .iter()
            .find(|t| url.ends_with(&t.replace(' ', "+")))
            .map(String::as_str)
            .unwrap_or("base");
        let slug = term.replace(' ', "-");
        format!(
            r#"<li class="b_algo"><h2><a href="https://{slug}.example/page">x</a></h2>
               <div class="b_caption"><p>about   {slug}</p></div></li>
               <li class="b_algo"><h2><a href="https://shared.example/">y</a></h2>
               <div class="b_caption"><p>shared from {slug}</p></div></li>"#
        )
    }
}

impl Fetch for EchoFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        if self.slow.as_deref() == Some(url) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(self.body_for(url))
    }
}

fn bing() -> &'static Engine {
    engine::find("bing").unwrap()
}

fn options(timeout: Duration) -> PipelineOptions {
    PipelineOptions {
        concurrency: 3,
        timeout,
        progress: false,
        preview: None,
    }
}

#[tokio::test]
async fn results_are_routed_to_the_term_of_their_query() {
    let terms = vec!["borrow checker".to_string(), "lifetimes".to_string()];
    let queries = build_queries("rust", false, &terms, &[bing()]);
    let fetcher = Arc::new(EchoFetcher {
        slow: None,
        terms: terms.clone(),
    });

    let pipeline = Pipeline::new(fetcher, vec![bing().compile().unwrap()], options(Duration::from_secs(5)));
    let (results, stats) = pipeline.run(queries, ResultStore::new(&terms)).await;

    assert_eq!(stats.failed, 0);
    for term in &terms {
        let slug = term.replace(' ', "-");
        let urls = &results[&Some(term.clone())];
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[&format!("https://{slug}.example/page")], format!("about {slug}"));
        assert_eq!(urls["https://shared.example/"], format!("shared from {slug}"));
    }
}

#[tokio::test]
async fn timed_out_unit_does_not_block_the_others() {
    let terms: Vec<String> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
    let queries = build_queries("rust", false, &terms, &[bing()]);
    let slow_url = queries[1].url.clone();
    let fetcher = Arc::new(EchoFetcher {
        slow: Some(slow_url),
        terms: terms.clone(),
    });

    let started = Instant::now();
    let pipeline = Pipeline::new(fetcher, vec![bing().compile().unwrap()], options(Duration::from_millis(100)));
    let (results, stats) = pipeline.run(queries, ResultStore::new(&terms)).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(stats.failed, 1);
    assert!(results[&Some("b".to_string())].is_empty());
    for term in ["a", "c", "d"] {
        assert_eq!(results[&Some(term.to_string())].len(), 2);
    }
}

#[tokio::test]
async fn written_documents_are_byte_identical_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let terms = vec!["borrow checker".to_string()];

    let mut outputs = HashMap::new();
    for run in 0..2 {
        let queries = build_queries("rust", true, &terms, &[bing()]);
        let fetcher = Arc::new(EchoFetcher {
            slow: None,
            terms: terms.clone(),
        });
        let pipeline = Pipeline::new(fetcher, vec![bing().compile().unwrap()], options(Duration::from_secs(5)));
        let (results, _) = pipeline.run(queries, ResultStore::new(&terms)).await;

        let out = dir.path().join(format!("run{run}"));
        writer::prepare_output_dir(&out).unwrap();
        let report = Writer::new(vec![Sink::Files(out.clone())]).write(&writer::documents(&results));
        assert_eq!(report.failed, 0);

        outputs.insert(run, std::fs::read(out.join("borrow+checker.json")).unwrap());
    }

    assert_eq!(outputs[&0], outputs[&1]);
    let text = String::from_utf8(outputs[&0].clone()).unwrap();
    let first = text.find("https://borrow-checker.example/page").unwrap();
    let second = text.find("https://shared.example/").unwrap();
    assert!(first < second);
    assert!(text.starts_with("{\n    \""));
    assert!(!text.ends_with('\n'));
}
