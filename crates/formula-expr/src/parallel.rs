#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::ThreadPool;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

/// Batches smaller than this are filtered on the calling thread.
pub(crate) const MIN_PARALLEL_BATCH: usize = 256;

/// Crate-local Rayon pool used for batch record filtering.
///
/// Building the global Rayon pool can fail under heavy resource pressure, after which Rayon
/// panics on first use. A pool we build ourselves can fail gracefully instead, in which case
/// callers filter on the current thread.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Worker count for the filter pool: `FORMULA_EXPR_THREADS`, then `RAYON_NUM_THREADS`, then the
/// machine's available parallelism.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn filter_pool_threads() -> usize {
    ["FORMULA_EXPR_THREADS", "RAYON_NUM_THREADS"]
        .into_iter()
        .find_map(|var| {
            std::env::var(var)
                .ok()
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
        })
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_rayon_pool() -> Option<ThreadPool> {
    let requested = filter_pool_threads().max(1);
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|idx| format!("formula-expr-{idx}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::debug!("rayon pool with {requested} threads failed ({err}); retrying with 1");
            try_build(1).ok()
        }
        Err(err) => {
            log::debug!("rayon pool unavailable ({err}); filtering sequentially");
            None
        }
    }
}

/// Returns the crate-local Rayon thread pool, if one could be created.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
pub(crate) fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_rayon_pool).as_ref()
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn filter_on_pool<T, E, F>(items: &[T], pred: &F) -> Option<Result<Vec<usize>, E>>
where
    T: Sync,
    E: Send,
    F: Fn(&T) -> Result<bool, E> + Sync,
{
    use rayon::prelude::*;

    let pool = rayon_pool()?;
    Some(pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .filter_map(|(idx, item)| match pred(item) {
                Ok(true) => Some(Ok(idx)),
                Ok(false) => None,
                Err(err) => Some(Err(err)),
            })
            .collect()
    }))
}

#[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
fn filter_on_pool<T, E, F>(_items: &[T], _pred: &F) -> Option<Result<Vec<usize>, E>>
where
    F: Fn(&T) -> Result<bool, E>,
{
    None
}

/// Applies `pred` to every item and returns the indices it accepted, in input order.
///
/// Stops at (and returns) an error. With several failing items, which error is reported is
/// unspecified when running in parallel.
pub(crate) fn filter_indices<T, E, F>(items: &[T], pred: F) -> Result<Vec<usize>, E>
where
    T: Sync,
    E: Send,
    F: Fn(&T) -> Result<bool, E> + Sync,
{
    if items.len() >= MIN_PARALLEL_BATCH {
        if let Some(out) = filter_on_pool(items, &pred) {
            return out;
        }
    }

    let mut kept = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        if pred(item)? {
            kept.push(idx);
        }
    }
    Ok(kept)
}
