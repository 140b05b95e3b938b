//! Bounded worker pool for per-file generation jobs.
//!
//! Every plan entry is enqueued before any worker starts, then the queue is
//! closed; workers detect exhaustion when `recv` fails rather than by
//! counting. One job produces exactly one [`FileJobResult`], failures
//! included — a failed generation or write never takes the pool down.
//!
//! Worker 0 is the only worker allowed to stream fragments to the terminal;
//! everyone else issues blocking calls. One live stream is readable, three
//! interleaved ones are not, and throughput comes from the blocking workers
//! anyway. All other terminal traffic during a dispatch goes through the
//! shared progress bar, which is safe under concurrent updates.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use indicatif::ProgressBar;

use crate::ai::{GenerateRequest, Generator, StreamChunk};
use crate::error::Error;
use crate::files;
use codeloom_core::cache::ResponseCache;
use codeloom_core::extract::extract_content;
use codeloom_core::plan::{PlanFile, ProjectPlan};
use codeloom_core::prompt;

/// Outcome of one per-file job. Exactly one exists per plan entry.
#[derive(Debug, Clone)]
pub struct FileJobResult {
    pub path: String,
    pub error: Option<String>,
}

impl FileJobResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub concurrency: usize,
    /// Allow worker 0 to stream its jobs' fragments live.
    pub stream_first: bool,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Directory all plan paths are resolved under.
    pub root: PathBuf,
}

/// Aggregate outcome of a dispatched plan.
#[derive(Debug)]
pub struct DispatchReport {
    pub success_count: usize,
    pub results: Vec<FileJobResult>,
}

impl DispatchReport {
    pub fn failures(&self) -> Vec<&FileJobResult> {
        self.results.iter().filter(|r| !r.success()).collect()
    }
}

/// Execute one generation job per plan file with bounded concurrency.
///
/// `progress` is shared by all workers and incremented once per completed
/// job; pass [`ProgressBar::hidden`] to run silently. Per-job errors are
/// collected into the report, never propagated.
pub async fn dispatch(
    generator: Arc<dyn Generator>,
    cache: Option<ResponseCache>,
    plan: &ProjectPlan,
    opts: DispatchOptions,
    progress: ProgressBar,
) -> DispatchReport {
    let total = plan.files.len();

    // Enqueue everything up front, then close the queue by dropping the
    // sender so workers see exhaustion as a recv error.
    let (job_tx, job_rx) = async_channel::unbounded::<PlanFile>();
    for file in &plan.files {
        // Unbounded queue with a live receiver: this cannot fail.
        if job_tx.send(file.clone()).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    let (result_tx, result_rx) = async_channel::unbounded::<FileJobResult>();
    let plan = Arc::new(plan.clone());
    let opts = Arc::new(opts);

    let mut workers = Vec::new();
    for worker_id in 0..opts.concurrency.max(1) {
        let jobs = job_rx.clone();
        let results = result_tx.clone();
        let generator = Arc::clone(&generator);
        let cache = cache.clone();
        let plan = Arc::clone(&plan);
        let opts = Arc::clone(&opts);
        let progress = progress.clone();

        workers.push(tokio::spawn(async move {
            let streaming = opts.stream_first && worker_id == 0;
            while let Ok(file) = jobs.recv().await {
                let result = run_job(
                    generator.as_ref(),
                    cache.as_ref(),
                    &plan,
                    &file,
                    &opts,
                    streaming,
                    &progress,
                )
                .await;
                progress.inc(1);
                if results.send(result).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(result_tx);

    let mut results = Vec::with_capacity(total);
    while let Ok(result) = result_rx.recv().await {
        results.push(result);
    }
    for worker in workers {
        let _ = worker.await;
    }

    let success_count = results.iter().filter(|r| r.success()).count();
    DispatchReport {
        success_count,
        results,
    }
}

async fn run_job(
    generator: &dyn Generator,
    cache: Option<&ResponseCache>,
    plan: &ProjectPlan,
    file: &PlanFile,
    opts: &DispatchOptions,
    streaming: bool,
    progress: &ProgressBar,
) -> FileJobResult {
    let fail = |message: String| FileJobResult {
        path: file.path.clone(),
        error: Some(message),
    };

    let dest = match resolve_within_root(&opts.root, &file.path) {
        Ok(dest) => dest,
        Err(message) => return fail(message),
    };

    let file_prompt = prompt::build_file_prompt(file, plan);

    // Cache errors are silent misses; a hit skips the provider entirely.
    if let Some(cache) = cache {
        if let Some(content) = cache.get(&file_prompt, &opts.model) {
            log::debug!("cache hit for {}", file.path);
            return match files::write_with_parents(&dest, &content) {
                Ok(()) => FileJobResult {
                    path: file.path.clone(),
                    error: None,
                },
                Err(err) => fail(err.to_string()),
            };
        }
    }

    let request = GenerateRequest {
        prompt: file_prompt.clone(),
        model: opts.model.clone(),
        temperature: opts.temperature,
        max_tokens: opts.max_tokens,
    };

    let raw = if streaming {
        stream_generation(generator, request, &file.path, progress).await
    } else {
        generator.generate(request).await.map(|resp| resp.content)
    };

    let content = match raw {
        Ok(raw) => extract_content(&raw),
        Err(err) => return fail(err.to_string()),
    };

    if let Some(cache) = cache {
        if let Err(err) = cache.set(&file_prompt, &opts.model, &content) {
            log::debug!("cache write failed for {}: {err}", file.path);
        }
    }

    match files::write_with_parents(&dest, &content) {
        Ok(()) => FileJobResult {
            path: file.path.clone(),
            error: None,
        },
        Err(err) => fail(err.to_string()),
    }
}

/// Consume a fragment stream, echoing fragments live. The progress bar is
/// suspended around each print so bar redraws and fragment text cannot
/// corrupt each other.
async fn stream_generation(
    generator: &dyn Generator,
    request: GenerateRequest,
    path: &str,
    progress: &ProgressBar,
) -> Result<String, Error> {
    let chunks = generator.generate_stream(request).await?;

    progress.println(format!("{} {}", "[streaming]".cyan(), path));

    let mut content = String::new();
    while let Ok(item) = chunks.recv().await {
        let chunk: StreamChunk = item?;

        if !chunk.content.is_empty() {
            progress.suspend(|| {
                use std::io::Write;
                let mut out = std::io::stdout();
                let _ = write!(out, "{}", chunk.content);
                let _ = out.flush();
            });
            content.push_str(&chunk.content);
        }

        if chunk.done {
            break;
        }
    }
    progress.suspend(|| {
        use std::io::Write;
        let _ = writeln!(std::io::stdout());
    });

    Ok(content)
}

/// Resolve a plan path under the project root, rejecting anything that
/// would land outside it.
fn resolve_within_root(root: &Path, rel: &str) -> Result<PathBuf, String> {
    let rel_path = Path::new(rel);
    let escapes = rel_path.is_absolute()
        || rel_path
            .components()
            .any(|part| matches!(part, Component::ParentDir | Component::Prefix(_)));

    if escapes {
        return Err(format!("refusing to write outside the project root: {rel}"));
    }

    Ok(root.join(rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{GenerateResponse, Usage};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Generator double: deterministic content, optional failures keyed by a
    /// marker in the prompt, and a high-water mark of concurrent calls.
    struct StubGenerator {
        fail_marker: Option<String>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                fail_marker: None,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_on(marker: &str) -> Self {
            Self {
                fail_marker: Some(marker.to_string()),
                ..Self::new()
            }
        }

        async fn track<T>(&self, work: impl std::future::Future<Output = T>) -> T {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let out = work.await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    #[async_trait]
    impl Generator for StubGenerator {
        async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, Error> {
            self.track(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if let Some(marker) = &self.fail_marker {
                    if req.prompt.contains(marker.as_str()) {
                        return Err(Error::Network("stub connection reset".to_string()));
                    }
                }
                Ok(GenerateResponse {
                    content: format!("// generated ({} chars of prompt)", req.prompt.len()),
                    model: req.model,
                    finish_reason: "stop".to_string(),
                    usage: Usage::default(),
                })
            })
            .await
        }

        async fn generate_stream(
            &self,
            _req: GenerateRequest,
        ) -> Result<async_channel::Receiver<Result<StreamChunk, Error>>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = async_channel::bounded(4);
            tokio::spawn(async move {
                for content in ["part one\n", "part two\n"] {
                    let _ = tx
                        .send(Ok(StreamChunk {
                            content: content.to_string(),
                            done: false,
                        }))
                        .await;
                }
                let _ = tx
                    .send(Ok(StreamChunk {
                        content: String::new(),
                        done: true,
                    }))
                    .await;
            });
            Ok(rx)
        }

        async fn health_check(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    fn create_test_plan(paths: &[&str]) -> ProjectPlan {
        ProjectPlan {
            project_name: "fixture".to_string(),
            description: "dispatch test fixture".to_string(),
            files: paths
                .iter()
                .map(|path| PlanFile {
                    path: path.to_string(),
                    description: format!("description for {path}"),
                })
                .collect(),
            setup_commands: vec![],
        }
    }

    fn create_test_options(root: &Path, concurrency: usize) -> DispatchOptions {
        DispatchOptions {
            concurrency,
            stream_first: false,
            model: "stub-model".to_string(),
            temperature: 0.7,
            max_tokens: 100,
            root: root.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_every_plan_entry_yields_exactly_one_result() {
        let dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["a.py", "src/b.py", "src/c.py", "docs/d.md", "e.txt"]);
        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        let report = dispatch(
            generator,
            None,
            &plan,
            create_test_options(dir.path(), 2),
            ProgressBar::hidden(),
        )
        .await;

        assert_eq!(report.results.len(), 5);
        assert_eq!(report.success_count, 5);

        let result_paths: BTreeSet<&str> = report.results.iter().map(|r| r.path.as_str()).collect();
        let plan_paths: BTreeSet<&str> = plan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(result_paths, plan_paths);

        for file in &plan.files {
            assert!(dir.path().join(&file.path).exists(), "{} missing", file.path);
        }
    }

    #[tokio::test]
    async fn test_one_failed_job_does_not_abort_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["ok1.py", "bad.py", "ok2.py", "ok3.py", "ok4.py"]);
        let stub = Arc::new(StubGenerator::failing_on("bad.py"));
        let generator: Arc<dyn Generator> = stub.clone();

        let report = dispatch(
            generator,
            None,
            &plan,
            create_test_options(dir.path(), 2),
            ProgressBar::hidden(),
        )
        .await;

        assert_eq!(report.results.len(), 5);
        assert_eq!(report.success_count, 4);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, "bad.py");
        assert!(failures[0].error.as_deref().unwrap().contains("connection reset"));

        assert!(!dir.path().join("bad.py").exists());
        assert!(dir.path().join("ok4.py").exists());
    }

    #[tokio::test]
    async fn test_concurrency_stays_within_bound() {
        let dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["1.py", "2.py", "3.py", "4.py", "5.py", "6.py"]);
        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        let report = dispatch(
            generator,
            None,
            &plan,
            create_test_options(dir.path(), 2),
            ProgressBar::hidden(),
        )
        .await;

        assert_eq!(report.success_count, 6);
        assert!(
            stub.max_in_flight.load(Ordering::SeqCst) <= 2,
            "saw {} concurrent generations with concurrency 2",
            stub.max_in_flight.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["cached.py"]);
        let cache = ResponseCache::new(cache_dir.path());
        let opts = create_test_options(dir.path(), 1);

        let file_prompt = prompt::build_file_prompt(&plan.files[0], &plan);
        cache.set(&file_prompt, &opts.model, "print('from cache')").unwrap();

        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        let report = dispatch(generator, Some(cache), &plan, opts, ProgressBar::hidden()).await;

        assert_eq!(report.success_count, 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cached.py")).unwrap(),
            "print('from cache')"
        );
    }

    #[tokio::test]
    async fn test_successful_generation_populates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["fresh.py"]);
        let cache = ResponseCache::new(cache_dir.path());
        let opts = create_test_options(dir.path(), 1);
        let file_prompt = prompt::build_file_prompt(&plan.files[0], &plan);

        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        dispatch(generator, Some(cache.clone()), &plan, opts.clone(), ProgressBar::hidden()).await;

        let cached = cache.get(&file_prompt, &opts.model);
        assert!(cached.is_some());
        assert_eq!(
            cached.unwrap(),
            std::fs::read_to_string(dir.path().join("fresh.py")).unwrap()
        );
    }

    #[tokio::test]
    async fn test_path_escaping_the_root_is_a_failed_job() {
        let dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["fine.py", "../escape.py"]);
        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        let report = dispatch(
            generator,
            None,
            &plan,
            create_test_options(dir.path(), 2),
            ProgressBar::hidden(),
        )
        .await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failures()[0].path, "../escape.py");
        assert!(!dir.path().parent().unwrap().join("escape.py").exists());
    }

    #[tokio::test]
    async fn test_streaming_worker_assembles_full_content() {
        let dir = tempfile::tempdir().unwrap();
        let plan = create_test_plan(&["streamed.txt"]);
        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn Generator> = stub.clone();

        let mut opts = create_test_options(dir.path(), 1);
        opts.stream_first = true;

        let report = dispatch(generator, None, &plan, opts, ProgressBar::hidden()).await;

        assert_eq!(report.success_count, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("streamed.txt")).unwrap(),
            "part one\npart two"
        );
    }

    #[test]
    fn test_resolve_within_root() {
        let root = Path::new("/project");

        assert!(resolve_within_root(root, "src/main.rs").is_ok());
        assert!(resolve_within_root(root, "/etc/passwd").is_err());
        assert!(resolve_within_root(root, "../sibling.txt").is_err());
        assert!(resolve_within_root(root, "a/../../b").is_err());
    }
}
