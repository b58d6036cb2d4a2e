use std::{io::Write, path::Path, sync::Arc};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use tempfile::TempDir;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    trace,
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

use crate::{Encoder, EncoderOptions, FilesystemCacheStore, InMemoryCacheStore};

pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Collects the messages of WARN events.
#[derive(Clone, Default)]
struct WarningCollector(Arc<Mutex<Vec<String>>>);

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for WarningCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().push(visitor.0);
        }
    }
}

/// Runs `f` on the current thread and returns the warnings it logged.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let collector = WarningCollector::default();
    let subscriber = tracing_subscriber::registry().with(collector.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    let warnings = collector.0.lock().clone();
    (result, warnings)
}

pub fn create_new_file_with_random_content(path: &Path, mut size: usize, seed: u64) -> Vec<u8> {
    let mut file = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .unwrap();

    trace!(?path, "creating temp file");

    const BUF_SIZE: usize = 8192;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut write_buf = [0; BUF_SIZE];
    let mut content = Vec::with_capacity(size);
    while size > 0 {
        rng.fill_bytes(&mut write_buf[..]);
        let chunk = &write_buf[..size.min(BUF_SIZE)];
        file.write_all(chunk).unwrap();
        content.extend_from_slice(chunk);
        size -= chunk.len();
    }
    content
}

pub struct TestEnv {
    pub dir: TempDir,
    pub encoder: Encoder,
}

impl TestEnv {
    pub fn in_memory(block_size: i64) -> Self {
        setup_test_logging();
        Self {
            dir: TempDir::with_prefix("hashplay_test").unwrap(),
            encoder: Encoder::new(
                Arc::new(InMemoryCacheStore::new()),
                EncoderOptions { block_size },
            ),
        }
    }

    pub fn on_disk(block_size: i64) -> Self {
        setup_test_logging();
        let dir = TempDir::with_prefix("hashplay_test").unwrap();
        let store = FilesystemCacheStore::new(dir.path().join("cache"));
        Self {
            encoder: Encoder::new(Arc::new(store), EncoderOptions { block_size }),
            dir,
        }
    }

    /// Writes a file of `size` random bytes, returning its path and content.
    pub fn file(&self, name: &str, size: usize) -> (std::path::PathBuf, Vec<u8>) {
        let path = self.dir.path().join(name);
        let content = create_new_file_with_random_content(&path, size, size as u64);
        (path, content)
    }
}
