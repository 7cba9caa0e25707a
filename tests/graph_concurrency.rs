//! Concurrency scenarios for the component graph and unit output
//!
//! These drive the library from many threads at once and check that the
//! shared state stays consistent.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use stackrun::sink::{OutputLocks, OutputSink, SharedSink, UnitWriter};
use stackrun::{Component, Components, ThreadSafeComponents, Unit, UnitsMap};

#[test]
fn registry_keeps_one_instance_per_path() {
    let registry = ThreadSafeComponents::new();
    let paths: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("/nowhere/unit-{i}"))).collect();

    let kept: Vec<Vec<Component>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                scope.spawn(|| {
                    paths
                        .iter()
                        .map(|path| registry.ensure_component(Component::from(Unit::new(path))).0)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(registry.len(), paths.len());

    for (index, path) in paths.iter().enumerate() {
        let canonical = registry.find_by_path(path).unwrap();
        for per_thread in &kept {
            assert!(per_thread[index].ptr_eq(&canonical));
        }
    }
}

#[test]
fn linking_from_many_threads_records_each_edge_once() {
    let hub = Arc::new(Unit::new("/nowhere/hub"));
    let spokes: Vec<Arc<Unit>> = (0..32)
        .map(|i| Arc::new(Unit::new(format!("/nowhere/spoke-{i}"))))
        .collect();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let hub = Component::from(Arc::clone(&hub));
                for spoke in &spokes {
                    Component::from(Arc::clone(spoke)).add_dependency(&hub);
                }
            });
        }
    });

    assert_eq!(hub.dependents().len(), spokes.len());
    for spoke in &spokes {
        assert_eq!(spoke.dependencies().len(), 1);
    }

    let components: Components = std::iter::once(Component::from(Arc::clone(&hub)))
        .chain(spokes.iter().map(|s| Component::from(Arc::clone(s))))
        .collect();
    assert!(components.cycle_check().is_ok());
}

#[test]
fn display_during_linking_never_tears() {
    let app = Arc::new(Unit::new("/nowhere/app"));
    let dependencies: Vec<Arc<Unit>> = (0..50)
        .map(|i| Arc::new(Unit::new(format!("/nowhere/dep-{i:02}"))))
        .collect();
    let done = AtomicBool::new(false);

    let rendered: Vec<String> = thread::scope(|scope| {
        let readers: Vec<_> = (0..10)
            .map(|_| {
                scope.spawn(|| {
                    let mut seen = Vec::new();
                    while !done.load(Ordering::Acquire) {
                        seen.push(app.to_string());
                    }
                    seen.push(app.to_string());
                    seen
                })
            })
            .collect();

        let app_component = Component::from(Arc::clone(&app));
        for dependency in &dependencies {
            app_component.add_dependency(&Component::from(Arc::clone(dependency)));
        }
        done.store(true, Ordering::Release);

        readers.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    let prefix = "Unit /nowhere/app (excluded: false, assume applied: false, dependencies: [";
    for text in &rendered {
        let list = text
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix("])"))
            .unwrap_or_else(|| panic!("malformed rendering: {text}"));

        if list.is_empty() {
            continue;
        }

        let shown: Vec<&str> = list.split(", ").collect();
        let expected: Vec<String> = dependencies[..shown.len()]
            .iter()
            .map(|d| d.path().display().to_string())
            .collect();
        assert_eq!(shown, expected);
    }

    assert_eq!(rendered.last().map(|t| t.matches("dep-").count()), Some(50));
}

#[test]
fn units_map_links_registry_contents() {
    let registry = ThreadSafeComponents::new();

    thread::scope(|scope| {
        for i in 0..10 {
            let registry = &registry;
            scope.spawn(move || {
                let source = match i {
                    0 => String::new(),
                    _ => format!("[dependencies]\npaths = [\"../u{}\"]\n", i - 1),
                };
                let config = stackrun::config::UnitConfig::parse(&source).unwrap();
                let unit = Unit::new(format!("/nowhere/u{i}")).with_config(config);
                registry.ensure_component(Component::from(unit));
            });
        }
    });

    let components = registry.to_components();
    UnitsMap::from_components(&components)
        .cross_link_dependencies(false)
        .unwrap();

    let last = components.find_by_path(&PathBuf::from("/nowhere/u9")).unwrap();
    assert_eq!(last.dependencies()[0].path(), PathBuf::from("/nowhere/u8"));
    assert!(components.cycle_check().is_ok());
}

/// Accepts one byte per call so unsynchronized writers would interleave
#[derive(Default)]
struct TrickleSink {
    bytes: Mutex<Vec<u8>>,
}

impl OutputSink for TrickleSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match buf.first() {
            Some(byte) => {
                self.bytes.lock().push(*byte);
                thread::yield_now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn concurrent_unit_writers_keep_lines_whole() {
    let trickle = Arc::new(TrickleSink::default());
    let sink: SharedSink = trickle.clone();
    let locks = Arc::new(OutputLocks::new());

    thread::scope(|scope| {
        for unit in 0..8 {
            let mut writer = UnitWriter::with_locks(Arc::clone(&sink), Arc::clone(&locks));
            scope.spawn(move || {
                for line in 0..20 {
                    writeln!(writer, "unit {unit} line {line} payload payload payload").unwrap();
                }
            });
        }
    });

    let output = String::from_utf8(trickle.bytes.lock().clone()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 8 * 20);

    let expected: HashSet<String> = (0..8)
        .flat_map(|unit| (0..20).map(move |line| format!("unit {unit} line {line} payload payload payload")))
        .collect();
    let actual: HashSet<String> = lines.iter().map(|l| l.to_string()).collect();
    assert_eq!(actual, expected);
    assert_eq!(locks.len(), 1);
}

#[test]
fn writers_to_different_sinks_do_not_share_locks() {
    let first = Arc::new(TrickleSink::default());
    let second = Arc::new(TrickleSink::default());
    let locks = Arc::new(OutputLocks::new());

    thread::scope(|scope| {
        for sink in [first.clone() as SharedSink, second.clone() as SharedSink] {
            let mut writer = UnitWriter::with_locks(sink, Arc::clone(&locks));
            scope.spawn(move || {
                write!(writer, "no newline yet").unwrap();
                writer.flush().unwrap();
            });
        }
    });

    assert_eq!(locks.len(), 2);
    assert_eq!(first.bytes.lock().as_slice(), b"no newline yet");
    assert_eq!(second.bytes.lock().as_slice(), b"no newline yet");
}
