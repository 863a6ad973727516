//! 캐시 통계 출력.

use stockdash_cache::{CacheFamily, CoordinatorStats};

/// 계열별 통계 표. 활동이 없는 계열은 생략합니다.
pub fn format_stats(stats: &[(CacheFamily, CoordinatorStats)]) -> Vec<String> {
    stats
        .iter()
        .filter(|(_, s)| s.hits + s.misses + s.deduplicated > 0)
        .map(|(family, s)| {
            format!(
                "{:<14} hit {:>4} · miss {:>4} · dedup {:>4} · fail {:>4} · hit rate {:>5.1}%",
                family.name(),
                s.hits,
                s.misses,
                s.deduplicated,
                s.failures,
                s.hit_rate() * 100.0
            )
        })
        .collect()
}
