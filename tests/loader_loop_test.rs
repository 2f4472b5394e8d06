//! The spawned reconciliation loop, fed through a fake watcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use logvm::loader::{LoadMetrics, ProgramLoader};
use logvm::vfs::MemFs;
use logvm::watcher::{FakeWatcher, WatchEvent};

fn program(dir: &str, name: &str) -> PathBuf {
    Path::new(dir).join(name)
}

#[tokio::test]
async fn test_loop_applies_events_in_order_and_stops_on_close() {
    let fs = Arc::new(MemFs::new());
    fs.create_dir_all("/progs");
    fs.write_file("/progs/a.mtail", "counter a\n/a/ { a++ }\n");
    let (watcher, events) = FakeWatcher::new();
    let watcher = Arc::new(watcher);
    let counters = Arc::new(LoadMetrics::new());

    let loader = Arc::new(
        ProgramLoader::builder()
            .watcher(watcher.clone())
            .filesystem(fs.clone())
            .counters(counters.clone())
            .build()
            .unwrap(),
    );
    loader.load_all(Path::new("/progs")).unwrap();

    let task = Arc::clone(&loader).spawn(events);

    fs.write_file("/progs/b.mtail", "counter b\n/b/ { b++ }\n");
    watcher
        .inject(WatchEvent::Create(program("/progs", "b.mtail")))
        .unwrap();
    watcher
        .inject(WatchEvent::Update(program("/progs", "b.mtail")))
        .unwrap();
    watcher
        .inject(WatchEvent::Unknown {
            kind: "Other".to_string(),
            paths: Vec::new(),
        })
        .unwrap();
    watcher
        .inject(WatchEvent::Update(program("/progs", "missing.mtail")))
        .unwrap();
    watcher
        .inject(WatchEvent::Delete(program("/progs", "a.mtail")))
        .unwrap();
    watcher.close();

    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("loop did not stop after close")
        .unwrap();

    assert_eq!(loader.engine().names(), vec!["b.mtail"]);
    assert_eq!(loader.watched(), vec!["b.mtail", "missing.mtail"]);
    assert_eq!(counters.loads("b.mtail"), 1);
    assert_eq!(counters.errors("missing.mtail"), 1);
}

#[tokio::test]
async fn test_engine_readable_while_loop_runs() {
    let fs = Arc::new(MemFs::new());
    fs.create_dir_all("/progs");
    let (watcher, events) = FakeWatcher::new();
    let watcher = Arc::new(watcher);

    let loader = Arc::new(
        ProgramLoader::builder()
            .watcher(watcher.clone())
            .filesystem(fs.clone())
            .build()
            .unwrap(),
    );
    let engine = Arc::clone(loader.engine());
    let task = Arc::clone(&loader).spawn(events);

    for i in 0..50 {
        fs.write_file("/progs/p.mtail", format!("counter p\n/line{i}$/ {{ p++ }}\n"));
        watcher
            .inject(WatchEvent::Update(program("/progs", "p.mtail")))
            .unwrap();
        // Either no instance yet or exactly one
        assert!(engine.snapshot().len() <= 1);
        tokio::task::yield_now().await;
    }
    watcher.close();
    task.await.unwrap();

    assert_eq!(engine.len(), 1);
    assert_eq!(engine.process_line("line49"), 1);
    assert_eq!(engine.process_line("line48"), 0);
}

#[tokio::test]
async fn test_loop_progresses_while_async_caller_is_busy() {
    let fs = Arc::new(MemFs::new());
    fs.create_dir_all("/progs");
    fs.write_file("/progs/a.mtail", "counter a\n/a/ { a++ }\n");
    let (watcher, events) = FakeWatcher::new();
    let watcher = Arc::new(watcher);

    let loader = Arc::new(
        ProgramLoader::builder()
            .watcher(watcher.clone())
            .filesystem(fs.clone())
            .build()
            .unwrap(),
    );
    let task = Arc::clone(&loader).spawn(events);

    watcher
        .inject(WatchEvent::Update(program("/progs", "a.mtail")))
        .unwrap();

    // Never yield to the runtime; the loop must make progress on its own thread
    let start = std::time::Instant::now();
    while loader.engine().lookup("a.mtail").is_none() {
        assert!(start.elapsed() < Duration::from_secs(10), "loop did not run");
        std::thread::sleep(Duration::from_millis(10));
    }

    watcher.close();
    task.await.unwrap();
}
