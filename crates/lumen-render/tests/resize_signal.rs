// SPDX-License-Identifier: CEPL-1.0
use std::thread;

use lumen_render::{RenderSize, ResizeSignal, ResizeState};

#[test]
fn posts_from_another_thread_are_seen_by_the_render_thread() {
    let signal = ResizeSignal::new();
    let producer = signal.clone();

    thread::spawn(move || {
        for w in 1..=100u32 {
            producer.post(w * 10, w * 5);
        }
    })
    .join()
    .unwrap();

    assert_eq!(signal.take(), Some(RenderSize::new(1000, 500)));
    assert_eq!(signal.take(), None);
}

#[test]
fn drained_size_drives_the_resize_tracker() {
    let signal = ResizeSignal::new();
    let mut state = ResizeState::new(RenderSize::new(800, 600));
    state.finish_rebuild(RenderSize::new(800, 600));

    let producer = signal.clone();
    thread::spawn(move || producer.post(0, 0)).join().unwrap();

    if let Some(size) = signal.take() {
        state.set_back_buffer_size(size.width, size.height);
    }
    assert!(state.is_minimized());
    assert!(state.is_pending());
}

#[test]
fn concurrent_posts_never_tear() {
    let signal = ResizeSignal::new();
    let writers: Vec<_> = (1..=4u32)
        .map(|k| {
            let s = signal.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    s.post(k, k * 100);
                }
            })
        })
        .collect();

    for _ in 0..1000 {
        if let Some(size) = signal.take() {
            assert_eq!(size.height, size.width * 100);
        }
    }
    for w in writers {
        w.join().unwrap();
    }
}
