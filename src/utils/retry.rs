use std::time::Duration;

/// Jittered exponential backoff for transient storage failures.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(400),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryPolicy {
    /// For writes that must not be dropped lightly (completions, usage).
    pub fn durable() -> Self {
        Self {
            max_attempts: 6,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(1000),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }

    pub async fn run<F, Fut, T, E>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempts_left = self.max_attempts;
        let mut backoff = self.base_backoff;

        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempts_left = attempts_left.saturating_sub(1);
                    if attempts_left == 0 {
                        return Err(e);
                    }

                    let jitter = match self.jitter_max {
                        Some(max) if max.as_millis() > 0 => {
                            Duration::from_millis(rand::random::<u64>() % (max.as_millis() as u64 + 1))
                        }
                        _ => Duration::ZERO,
                    };
                    tokio::time::sleep(backoff + jitter).await;

                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter_max: None,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = AtomicUsize::new(0);
        let res: Result<usize, &'static str> = fast_policy(3)
            .run(|| async {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(res, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);
        let res: Result<(), &'static str> = fast_policy(2)
            .run(|| async {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("always")
            })
            .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
