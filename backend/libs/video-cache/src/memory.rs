use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::{CacheBackend, CacheError, CacheResult};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local cache with Redis semantics for the commands in [`CacheBackend`].
///
/// `set_unavailable(true)` makes every command fail like a dropped Redis
/// connection, for exercising the fallback paths.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Remaining TTL of a live key; `None` for missing or persistent keys.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|e| e.live(now))
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> CacheResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "cache unavailable",
            ))));
        }
        Ok(())
    }

    /// Lock and drop expired entries first, so every command sees live keys only.
    fn live_entries(&self) -> CacheResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.check()?;
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, e| e.live(now));
        Ok(entries)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::InvalidData(format!("WRONGTYPE operation against key {key}"))
}

/// Redis-style glob supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

/// Clamp a Redis rank range (negative = from the end) to `0..len`.
fn rank_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.live_entries()?;
        match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> CacheResult<()> {
        let mut entries = self.live_entries()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: ttl_secs.map(|s| Instant::now() + Duration::from_secs(s)),
            },
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> CacheResult<bool> {
        let mut entries = self.live_entries()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.live_entries()?.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live_entries()?.contains_key(key))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut entries = self.live_entries()?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Str("0".to_string()),
            expires_at: None,
        });
        let current = match &entry.value {
            Value::Str(s) => s.parse::<i64>().map_err(|_| {
                CacheError::InvalidData(format!("value at {key} is not an integer"))
            })?,
            Value::ZSet(_) => return Err(wrong_type(key)),
        };
        let next = current + delta;
        entry.value = Value::Str(next.to_string());
        Ok(next)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> CacheResult<()> {
        let mut entries = self.live_entries()?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::ZSet(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::ZSet(set) => {
                set.insert(member.to_string(), score);
                Ok(())
            }
            Value::Str(_) => Err(wrong_type(key)),
        }
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> CacheResult<Vec<(String, f64)>> {
        let entries = self.live_entries()?;
        let set = match entries.get(key) {
            None => return Ok(Vec::new()),
            Some(Entry {
                value: Value::ZSet(set),
                ..
            }) => set,
            Some(_) => return Err(wrong_type(key)),
        };

        let mut members: Vec<(String, f64)> =
            set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        // Redis orders equal scores by member, reversed for ZREVRANGE.
        members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

        Ok(match rank_bounds(members.len(), start, stop) {
            Some((from, to)) => members[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn scan_match(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let entries = self.live_entries()?;
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check()
    }
}
