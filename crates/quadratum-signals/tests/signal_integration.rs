//! Integration tests for signal dispatch.
//!
//! Tests cover: payload delivery, bubbling through a page-level parent,
//! per-form filtering by payload, receiver replacement, concurrent dispatch
//! from several threads, and receivers that panic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use quadratum_signals::Signal;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Notice {
    form_id: String,
    name: &'static str,
}

fn notice(form_id: &str, name: &'static str) -> Notice {
    Notice {
        form_id: form_id.to_string(),
        name,
    }
}

// ═════════════════════════════════════════════════════════════════════
// 1. Payload delivery
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_receiver_gets_payload() {
    let signal: Signal<Notice> = Signal::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&received);

    signal.connect(
        "capture",
        Arc::new(move |n: &Notice| r.lock().unwrap().push(n.clone())),
    );

    signal.send(&notice("contact", "view"));
    assert_eq!(*received.lock().unwrap(), vec![notice("contact", "view")]);
}

// ═════════════════════════════════════════════════════════════════════
// 2. Bubbling: form signals share one page-level parent
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_page_listener_sees_every_form() {
    let page: Arc<Signal<Notice>> = Arc::new(Signal::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    page.connect(
        "analytics",
        Arc::new(move |n: &Notice| s.lock().unwrap().push(n.form_id.clone())),
    );

    let contact = Signal::child_of(Arc::clone(&page));
    let quote = Signal::child_of(Arc::clone(&page));

    contact.send(&notice("contact", "view"));
    quote.send(&notice("quote", "view"));
    quote.send(&notice("quote", "step"));

    assert_eq!(*seen.lock().unwrap(), vec!["contact", "quote", "quote"]);
}

#[test]
fn test_local_receivers_run_before_parent() {
    let page: Arc<Signal<Notice>> = Arc::new(Signal::new());
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = Arc::clone(&order);
    page.connect("page", Arc::new(move |_: &Notice| o.lock().unwrap().push("page")));

    let form = Signal::child_of(Arc::clone(&page));
    let o = Arc::clone(&order);
    form.connect("form", Arc::new(move |_: &Notice| o.lock().unwrap().push("form")));

    assert_eq!(form.send(&notice("contact", "submit")), 2);
    assert_eq!(*order.lock().unwrap(), vec!["form", "page"]);
}

#[test]
fn test_three_level_chain() {
    let root: Arc<Signal<u8>> = Arc::new(Signal::new());
    let middle = Arc::new(Signal::child_of(Arc::clone(&root)));
    let leaf = Signal::child_of(Arc::clone(&middle));

    let hits = Arc::new(AtomicUsize::new(0));
    for signal in [&*root, &*middle, &leaf] {
        let h = Arc::clone(&hits);
        signal.connect(
            "hit",
            Arc::new(move |_: &u8| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }

    assert_eq!(leaf.send(&1), 3);
    assert_eq!(middle.send(&1), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

// ═════════════════════════════════════════════════════════════════════
// 3. Filtering by payload
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_receiver_filters_by_form_id() {
    let page: Arc<Signal<Notice>> = Arc::new(Signal::new());
    let quote_only = Arc::new(AtomicUsize::new(0));
    let q = Arc::clone(&quote_only);
    page.connect(
        "quote-watcher",
        Arc::new(move |n: &Notice| {
            if n.form_id == "quote" {
                q.fetch_add(1, Ordering::SeqCst);
            }
        }),
    );

    let contact = Signal::child_of(Arc::clone(&page));
    let quote = Signal::child_of(Arc::clone(&page));
    contact.send(&notice("contact", "submit"));
    quote.send(&notice("quote", "submit"));

    assert_eq!(quote_only.load(Ordering::SeqCst), 1);
}

// ═════════════════════════════════════════════════════════════════════
// 4. Re-connecting under the same id
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_reconnect_does_not_duplicate_delivery() {
    let signal: Signal<()> = Signal::new();
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let h = Arc::clone(&hits);
        signal.connect(
            "init",
            Arc::new(move |(): &()| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
    }

    assert_eq!(signal.receiver_count(), 1);
    signal.send(&());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ═════════════════════════════════════════════════════════════════════
// 5. Concurrent dispatch
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_send_from_many_threads() {
    let page: Arc<Signal<usize>> = Arc::new(Signal::new());
    let total = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&total);
    page.connect(
        "sum",
        Arc::new(move |n: &usize| {
            t.fetch_add(*n, Ordering::SeqCst);
        }),
    );

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let form = Signal::child_of(Arc::clone(&page));
            thread::spawn(move || {
                for _ in 0..10 {
                    form.send(&i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 10 * (1 + 2 + ... + 8)
    assert_eq!(total.load(Ordering::SeqCst), 360);
}

#[test]
fn test_connect_while_other_threads_send() {
    let signal: Arc<Signal<()>> = Arc::new(Signal::new());
    let sender = {
        let s = Arc::clone(&signal);
        thread::spawn(move || {
            for _ in 0..100 {
                s.send(&());
            }
        })
    };
    for i in 0..20 {
        signal.connect(format!("r{i}"), Arc::new(|(): &()| {}));
    }
    sender.join().unwrap();
    assert_eq!(signal.receiver_count(), 20);
}

// ═════════════════════════════════════════════════════════════════════
// 6. Panicking receivers
// ═════════════════════════════════════════════════════════════════════

#[test]
fn test_panicking_receiver_propagates() {
    let signal: Arc<Signal<()>> = Arc::new(Signal::new());
    signal.connect("boom", Arc::new(|(): &()| panic!("receiver failed")));

    // Dispatch does not catch panics; the sender sees them.
    let s = Arc::clone(&signal);
    let result = thread::spawn(move || s.send(&())).join();
    assert!(result.is_err());

    // The snapshot is taken before delivery, so the lock is not poisoned.
    assert!(signal.disconnect("boom"));
    assert_eq!(signal.send(&()), 0);
}
