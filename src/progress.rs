use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts one processed item and logs ` ... processed n/total (p%)` every
/// `every` items and on the last one.
pub fn log_progress(counter: &AtomicUsize, total: usize, every: usize) -> usize {
    let processed = counter.fetch_add(1, Ordering::Relaxed) + 1;
    if every == 0 || processed % every == 0 || processed == total {
        log::info!(
            " ... processed {}/{} ({}%)",
            processed,
            total,
            percent(processed, total)
        );
    }
    processed
}

fn percent(processed: usize, total: usize) -> usize {
    if total == 0 {
        return 100;
    }
    (processed * 100 / total).min(100)
}
