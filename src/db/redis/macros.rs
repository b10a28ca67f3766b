/// Read-through caching around an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background write with `$ttl` seconds to live and
/// returns it. A failed cache read is logged and handled as a miss; errors of
/// `$block` propagate with `?`, so the enclosing function must return
/// `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let thumbnail: Option<String> = cached!(cache, CacheKey::ChannelThumbnail(id), 86_400, async {
///     fetch_thumbnail(&id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(cached)) => Ok(cached),
            lookup => {
                if let Err(e) = lookup {
                    tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                }
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
